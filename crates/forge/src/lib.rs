pub mod client;
pub mod error;
pub mod types;

pub use client::{ForgeApi, ForgeClient};
pub use error::{ForgeError, Result};
pub use types::{CreatePrRequest, PullRequest, RepoConfig};
