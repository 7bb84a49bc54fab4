pub mod error;
pub mod git;
pub mod traits;

pub use error::{GitError, Result};
pub use git::GitCli;
pub use traits::GitOps;
