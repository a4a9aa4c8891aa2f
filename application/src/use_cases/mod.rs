//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod aggregator;
pub mod dispatch;
pub mod intake;
pub mod ledger;
pub mod notification;
pub mod registry;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;
