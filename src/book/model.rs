//! 书籍数据模型。
//!
//! 存储中的记录形如：
//! ```json
//! {
//!   "title": "New Book",
//!   "author": "Author",
//!   "language": "ja",
//!   "direction": "rtl",
//!   "pageWidth": 800,
//!   "pageHeight": 1200,
//!   "pageBgColor": "#FFFFFF",
//!   "chapters": [
//!     {
//!       "title": "title of the chapter",
//!       "sourceUrl": "http://foo/bar/1.html",
//!       "pages": ["http://foo/bar/1/1.jpg", "http://foo/bar/1/2.jpg"]
//!     }
//!   ]
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BookError;

pub const DEFAULT_TITLE: &str = "New Book";
pub const DEFAULT_PAGE_WIDTH: u32 = 800;
pub const DEFAULT_PAGE_HEIGHT: u32 = 1200;
pub const DEFAULT_PAGE_BG_COLOR: &str = "#FFFFFF";
/// 语言检测给出的“无法确定”。
pub const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    #[default]
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ltr" => Ok(Direction::Ltr),
            "rtl" => Ok(Direction::Rtl),
            other => Err(format!("unknown reading direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub pages: Vec<String>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            pages,
        }
    }
}

/// 存储边界上的记录：所有字段可缺省，缺省/空值在转换为 [`Book`] 时回落到默认值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_bg_color: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    title: String,
    pub author: String,
    language: Option<String>,
    pub direction: Direction,
    page_width: u32,
    page_height: u32,
    page_bg_color: String,
    pub chapters: Vec<Chapter>,
}

impl Default for Book {
    fn default() -> Self {
        Self::from_record(BookRecord::default())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// 读取时空值会回退为默认值，这类值在写入时就拒绝，保证 save → load 不变。
fn require_text(field: &'static str, value: &str) -> Result<(), BookError> {
    if value.trim().is_empty() {
        return Err(BookError::InvalidMetadata {
            field,
            reason: "must not be empty",
        });
    }
    Ok(())
}

fn require_positive(field: &'static str, value: u32) -> Result<(), BookError> {
    if value == 0 {
        return Err(BookError::InvalidMetadata {
            field,
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

impl Book {
    pub fn from_record(record: BookRecord) -> Self {
        Self {
            title: non_empty(record.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            author: record.author.unwrap_or_default(),
            language: non_empty(record.language),
            direction: record.direction.unwrap_or_default(),
            page_width: record
                .page_width
                .filter(|w| *w > 0)
                .unwrap_or(DEFAULT_PAGE_WIDTH),
            page_height: record
                .page_height
                .filter(|h| *h > 0)
                .unwrap_or(DEFAULT_PAGE_HEIGHT),
            page_bg_color: non_empty(record.page_bg_color)
                .unwrap_or_else(|| DEFAULT_PAGE_BG_COLOR.to_string()),
            chapters: record.chapters,
        }
    }

    /// 转为持久化记录（不含 `num_of_pages` 等派生值）。
    pub fn to_record(&self) -> BookRecord {
        BookRecord {
            title: Some(self.title.clone()),
            author: Some(self.author.clone()),
            language: self.language.clone(),
            direction: Some(self.direction),
            page_width: Some(self.page_width),
            page_height: Some(self.page_height),
            page_bg_color: Some(self.page_bg_color.clone()),
            chapters: self.chapters.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), BookError> {
        let title = title.into();
        require_text("title", &title)?;
        self.title = title;
        Ok(())
    }

    pub fn page_width(&self) -> u32 {
        self.page_width
    }

    pub fn page_height(&self) -> u32 {
        self.page_height
    }

    pub fn set_page_size(&mut self, width: u32, height: u32) -> Result<(), BookError> {
        require_positive("pageWidth", width)?;
        require_positive("pageHeight", height)?;
        self.page_width = width;
        self.page_height = height;
        Ok(())
    }

    pub fn page_bg_color(&self) -> &str {
        &self.page_bg_color
    }

    pub fn set_page_bg_color(&mut self, color: impl Into<String>) -> Result<(), BookError> {
        let color = color.into();
        require_text("pageBgColor", &color)?;
        self.page_bg_color = color;
        Ok(())
    }

    pub fn num_of_pages(&self) -> usize {
        self.chapters.iter().map(|c| c.pages.len()).sum()
    }

    /// 未设置时为空串。
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }

    /// `und` 与空值不会覆盖已有语言。
    pub fn set_language(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() || value == UNDETERMINED_LANGUAGE {
            return;
        }
        self.language = Some(value.to_ascii_lowercase());
    }

    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(Chapter {
            title: chapter.title,
            source_url: chapter.source_url,
            pages: chapter.pages,
        });
    }

    pub fn chapter(&self, index: usize) -> Result<&Chapter, BookError> {
        self.chapters.get(index).ok_or(BookError::InvalidIndex {
            index,
            len: self.chapters.len(),
        })
    }

    pub fn update_chapter(&mut self, index: usize, chapter: Chapter) -> Result<(), BookError> {
        let len = self.chapters.len();
        let slot = self
            .chapters
            .get_mut(index)
            .ok_or(BookError::InvalidIndex { index, len })?;
        *slot = chapter;
        Ok(())
    }

    pub fn delete_chapter(&mut self, index: usize) -> Result<Chapter, BookError> {
        if index >= self.chapters.len() {
            return Err(BookError::InvalidIndex {
                index,
                len: self.chapters.len(),
            });
        }
        Ok(self.chapters.remove(index))
    }

    /// 先校验全部字段，任一字段非法时书籍保持不变。
    pub fn apply_metadata(&mut self, update: MetadataUpdate) -> Result<(), BookError> {
        if let Some(title) = update.title.as_deref() {
            require_text("title", title)?;
        }
        if let Some(w) = update.page_width {
            require_positive("pageWidth", w)?;
        }
        if let Some(h) = update.page_height {
            require_positive("pageHeight", h)?;
        }
        if let Some(color) = update.page_bg_color.as_deref() {
            require_text("pageBgColor", color)?;
        }

        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(language) = update.language {
            self.set_language(&language);
        }
        if let Some(direction) = update.direction {
            self.direction = direction;
        }
        if let Some(w) = update.page_width {
            self.page_width = w;
        }
        if let Some(h) = update.page_height {
            self.page_height = h;
        }
        if let Some(color) = update.page_bg_color {
            self.page_bg_color = color;
        }
        Ok(())
    }
}

/// 元数据编辑表单；`None` 表示不修改。
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub direction: Option<Direction>,
    pub page_width: Option<u32>,
    pub page_height: Option<u32>,
    pub page_bg_color: Option<String>,
}
