pub mod changes;
pub mod collector;
pub mod completion;
pub mod error;
pub mod modifier;

pub use changes::{parse_file_blocks, ChangeReport, FileOutcome};
pub use collector::{CollectLimits, SourceBundle};
pub use completion::{CompletionBackend, OpenAiClient};
pub use error::{CoderError, Result};
pub use modifier::{CodeModifier, CodeModTool};
