//! 书籍记录的模型与持久化。

use thiserror::Error;

use crate::storage::StorageError;

mod model;
mod sizes;
mod store;

pub use model::{Book, BookRecord, Chapter, Direction, MetadataUpdate};
pub use sizes::{SizeSummary, summarize_sizes};
pub use store::{BookStore, ResetPolicy};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("chapter index {index} out of range (book has {len} chapters)")]
    InvalidIndex { index: usize, len: usize },
    #[error("invalid {field}: {reason}")]
    InvalidMetadata {
        field: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
