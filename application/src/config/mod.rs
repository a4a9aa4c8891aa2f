//! Application-level configuration.
//!
//! - [`WaitParams`]: callback wait timeout and polling fallback budget

pub mod wait_params;

pub use wait_params::WaitParams;
