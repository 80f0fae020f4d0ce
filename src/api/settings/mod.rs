pub mod types;
pub mod capture;

pub use types::*;
pub use capture::*;
