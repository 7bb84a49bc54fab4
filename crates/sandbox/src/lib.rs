pub mod error;
pub mod guard;
pub mod manager;

pub use error::{Result, SandboxError};
pub use guard::SandboxGuard;
pub use manager::{SandboxManager, SandboxProvider};
