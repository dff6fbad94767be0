//! 按缓存尺寸统计页面数量，帮助决定书的页面宽高。

use serde::Serialize;

use super::Book;
use crate::image_cache::{CacheError, ImageCache};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeSummary {
    /// `"宽,高"`
    pub size: String,
    pub count: usize,
}

/// 数量降序；数量相同时保持首次出现的顺序。
pub fn summarize_sizes(book: &Book, cache: &mut ImageCache) -> Result<Vec<SizeSummary>, CacheError> {
    let mut rows: Vec<SizeSummary> = Vec::new();
    for page in book.chapters.iter().flat_map(|c| c.pages.iter()) {
        let img = cache.get(page, false)?;
        let size = format!("{},{}", img.width, img.height);
        match rows.iter_mut().find(|r| r.size == size) {
            Some(row) => row.count += 1,
            None => rows.push(SizeSummary { size, count: 1 }),
        }
    }
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(rows)
}
