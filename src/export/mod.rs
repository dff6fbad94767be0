//! 导出：把书中每个页面 URL 经图片缓存解析成可嵌入的图片资源，
//! 再交给归档写入器（EPUB）打包。
//!
//! - `resource`: 图片资源描述与惰性字节提供者
//! - `pipeline`: 解析全部页面并调用写入器
//! - `epub_writer`: 基于 epub-builder 的固定版式 EPUB 写入器

use std::io;

use thiserror::Error;

use crate::book::{Book, Direction};
use crate::image_cache::CacheError;

pub mod epub_writer;
pub mod pipeline;
pub mod resource;

pub use epub_writer::EpubWriter;
pub use pipeline::export;
pub use resource::ImageResource;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("the book has no pages to export")]
    EmptyBook,
    #[error("epub build failed: {0}")]
    Epub(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// 写入器上报的进度（当前 / 最大）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportProgress {
    pub current: usize,
    pub maximum: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    /// 空串表示未设置。
    pub language: String,
    pub direction: Direction,
    pub page_width: u32,
    pub page_height: u32,
    pub page_bg_color: String,
}

impl From<&Book> for BookMetadata {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            author: book.author.clone(),
            language: book.language().to_string(),
            direction: book.direction,
            page_width: book.page_width(),
            page_height: book.page_height(),
            page_bg_color: book.page_bg_color().to_string(),
        }
    }
}

pub struct ExportChapter<'a> {
    pub title: String,
    pub pages: Vec<ImageResource<'a>>,
}

/// 交给写入器的完整输入：元数据 + 按章节/页面顺序排列的资源。
pub struct ExportManifest<'a> {
    pub metadata: BookMetadata,
    pub chapters: Vec<ExportChapter<'a>>,
}

impl<'a> ExportManifest<'a> {
    pub fn page_count(&self) -> usize {
        self.chapters.iter().map(|c| c.pages.len()).sum()
    }

    pub fn resources(&self) -> impl Iterator<Item = &ImageResource<'a>> + '_ {
        self.chapters.iter().flat_map(|c| c.pages.iter())
    }
}

pub trait ArchiveWriter {
    fn write(
        &mut self,
        manifest: &ExportManifest<'_>,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<Vec<u8>, ExportError>;
}
