//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use crate::image_cache::capture::MIN_IMAGE_WIDTH;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 存储配置
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default)]
    pub save_path: String,

    // 抓取配置
    #[serde(default = "default_min_image_width")]
    pub min_image_width: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    // 行为配置
    #[serde(default = "default_true")]
    pub clear_cache_on_reset: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            save_path: String::new(),
            min_image_width: default_min_image_width(),
            jpeg_quality: default_jpeg_quality(),
            clear_cache_on_reset: default_true(),
            show_progress: default_true(),
            base_dir: None,
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 6] = [
            FieldMeta {
                name: "storage_dir",
                description: "书籍与图片缓存的存储目录（相对路径基于数据目录）",
            },
            FieldMeta {
                name: "save_path",
                description: "EPUB 导出目录（留空则为数据目录）",
            },
            FieldMeta {
                name: "min_image_width",
                description: "抓取时忽略宽度小于该值的图片（像素）",
            },
            FieldMeta {
                name: "jpeg_quality",
                description: "缓存图片重新编码为 JPEG 时的质量（1-100）",
            },
            FieldMeta {
                name: "clear_cache_on_reset",
                description: "重置书籍时是否同时清空图片缓存",
            },
            FieldMeta {
                name: "show_progress",
                description: "导出时是否显示进度条",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if self.storage_dir.trim().is_empty() {
            return Err("storage_dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn with_base_dir(mut self, base: Option<&Path>) -> Self {
        self.base_dir = base.map(Path::to_path_buf);
        self
    }

    fn base(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let p = PathBuf::from(raw.trim());
        if p.is_absolute() { p } else { self.base().join(p) }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.resolve(&self.storage_dir)
    }

    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            self.base()
        } else {
            self.resolve(&self.save_path)
        }
    }
}

pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let repl = replacement.chars().next().unwrap_or('_');
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' | '"' | '<' | '>' | '/' | '\\' | '|' | '?' | '*' => repl,
            c if (c as u32) < 32 => repl,
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    if RESERVED.contains(&cleaned.to_uppercase().as_str()) {
        cleaned.insert(0, '_');
    }

    if cleaned.len() > max_len {
        // 不能在多字节字符中间截断
        let mut end = max_len;
        while end > 0 && !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }
    cleaned
}

fn default_true() -> bool {
    true
}

fn default_storage_dir() -> String {
    "storage".to_string()
}

fn default_min_image_width() -> u32 {
    MIN_IMAGE_WIDTH
}

fn default_jpeg_quality() -> u8 {
    100
}
