pub mod config;
pub mod error;
pub mod runner;

pub use config::{CommandSpec, ValidatorConfig};
pub use error::{Result, ValidationError};
pub use runner::{CheckOutcome, CommandValidator, ValidationReport, Validator};
