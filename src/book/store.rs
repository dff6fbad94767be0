use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Book, BookError, BookRecord};
use crate::image_cache::ImageCache;
use crate::storage::{BOOK_KEY, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// 清空整个存储，同时让图片缓存快照失效。
    ClearAll,
    /// 只删除书籍记录，保留图片缓存。
    BookOnly,
}

impl ResetPolicy {
    pub fn from_flag(clear_cache_on_reset: bool) -> Self {
        if clear_cache_on_reset {
            ResetPolicy::ClearAll
        } else {
            ResetPolicy::BookOnly
        }
    }
}

pub struct BookStore {
    storage: Arc<dyn Storage>,
}

impl BookStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 读取书籍；不存在或结构不符时返回默认书籍。
    pub fn load(&self) -> Result<Book, BookError> {
        let Some(value) = self.storage.get(BOOK_KEY)? else {
            debug!(target: "book_store", "no stored book, using default");
            return Ok(Book::default());
        };
        match serde_json::from_value::<BookRecord>(value) {
            Ok(record) => Ok(Book::from_record(record)),
            Err(e) => {
                warn!(target: "book_store", error = %e, "书籍记录结构不符，回退为默认书籍");
                Ok(Book::default())
            }
        }
    }

    pub fn save(&self, book: &Book) -> Result<(), BookError> {
        let value = serde_json::to_value(book.to_record()).map_err(|source| {
            crate::storage::StorageError::Encode {
                key: BOOK_KEY.to_string(),
                source,
            }
        })?;
        self.storage.set(BOOK_KEY, value)?;
        debug!(
            target: "book_store",
            title = %book.title(),
            chapters = book.chapters.len(),
            pages = book.num_of_pages(),
            "书籍已保存"
        );
        Ok(())
    }

    pub fn reset(&self, cache: &mut ImageCache, policy: ResetPolicy) -> Result<Book, BookError> {
        match policy {
            ResetPolicy::ClearAll => {
                self.storage.clear()?;
                cache.invalidate();
            }
            ResetPolicy::BookOnly => self.storage.remove(BOOK_KEY)?,
        }
        info!(target: "book_store", ?policy, "书籍已重置");
        Ok(Book::default())
    }
}
