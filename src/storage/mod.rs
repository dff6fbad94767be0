//! 持久化键值存储。
//!
//! 整个程序只有两个命名空间：
//! - `book`: 当前书籍记录（单例）
//! - `cache`: 图片缓存（URL → CachedImage）
//!
//! `BookStore` 与 `ImageCache` 都通过构造参数拿到 `Arc<dyn Storage>`，
//! 测试里换成 `MemoryStorage` 即可。

use std::io;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStorage;
pub(crate) use file::write_atomic;
pub use memory::MemoryStorage;
#[cfg(test)]
pub(crate) use memory::FailingStorage;

pub const BOOK_KEY: &str = "book";
pub const CACHE_KEY: &str = "cache";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("stored value for `{key}` is not valid json: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("value for `{key}` could not be encoded as json: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// 清空全部命名空间。
    fn clear(&self) -> Result<(), StorageError>;
}
