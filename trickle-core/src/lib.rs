mod error;
pub mod model;

pub use error::ModelError;
pub use model::*;
