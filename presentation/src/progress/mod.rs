//! Progress reporting while a caller waits for a result

pub mod reporter;
