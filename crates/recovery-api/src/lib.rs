pub mod data_id;
pub mod types;
pub mod validation;

pub use data_id::*;
pub use types::*;
pub use validation::*;
