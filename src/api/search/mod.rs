pub mod types;
pub mod query;

pub use types::*;
pub use query::*;
