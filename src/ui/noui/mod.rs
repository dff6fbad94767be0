//! 命令行交互入口。
//!
//! 子命令：`status` 查看概要，`capture` 从本地图片追加章节，`meta` 编辑元数据，
//! `chapter-update`/`chapter-delete` 修改章节，`sizes` 统计页面尺寸，
//! `export` 导出 EPUB，`reset` 清空书籍。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::base_system::context::Config;
use crate::book::{BookStore, Direction};
use crate::image_cache::ImageCache;
use crate::storage::{FileStorage, Storage};

mod capture;
mod editor;
mod export;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 显示当前书籍概要
    Status,
    /// 从本地图片抓取一个章节并追加到书中
    Capture {
        /// 章节标题
        #[arg(long)]
        title: String,
        /// 章节来源页面 URL
        #[arg(long, default_value = "")]
        source_url: String,
        /// 检测到的页面语言（`und` 会被忽略）
        #[arg(long)]
        language: Option<String>,
        /// 图片：`URL=PATH` 或仅 `PATH`（以 file:// URL 作为缓存 key）
        #[arg(required = true)]
        images: Vec<String>,
    },
    /// 编辑书籍元数据
    Meta {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        direction: Option<Direction>,
        #[arg(long)]
        page_width: Option<u32>,
        #[arg(long)]
        page_height: Option<u32>,
        #[arg(long)]
        page_bg_color: Option<String>,
    },
    /// 修改章节标题或页面列表
    ChapterUpdate {
        index: usize,
        #[arg(long)]
        title: Option<String>,
        /// 替换整个页面列表（按顺序）
        #[arg(long, num_args = 1..)]
        pages: Option<Vec<String>>,
    },
    /// 删除章节
    ChapterDelete {
        index: usize,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// 按图片尺寸统计页面数量
    Sizes,
    /// 导出 EPUB
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// 清空书籍（以及图片缓存）
    Reset {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

/// 一次命令执行所需的上下文。
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) books: BookStore,
    pub(crate) cache: ImageCache,
}

impl Session {
    pub(crate) fn open(config: Config) -> Result<Self> {
        let path = config.storage_path();
        let storage: Arc<dyn Storage> = Arc::new(
            FileStorage::open(&path)
                .with_context(|| format!("failed to open storage at {}", path.display()))?,
        );
        Ok(Self {
            config,
            books: BookStore::new(storage.clone()),
            cache: ImageCache::new(storage),
        })
    }
}

pub fn run(config: Config, command: Command) -> Result<()> {
    let mut session = Session::open(config)?;
    match command {
        Command::Status => editor::show_status(&session),
        Command::Capture {
            title,
            source_url,
            language,
            images,
        } => capture::add_chapter(&mut session, title, source_url, language, &images),
        Command::Meta {
            title,
            author,
            language,
            direction,
            page_width,
            page_height,
            page_bg_color,
        } => editor::update_metadata(
            &session,
            crate::book::MetadataUpdate {
                title,
                author,
                language,
                direction,
                page_width,
                page_height,
                page_bg_color,
            },
        ),
        Command::ChapterUpdate {
            index,
            title,
            pages,
        } => editor::update_chapter(&session, index, title, pages),
        Command::ChapterDelete { index, yes } => editor::delete_chapter(&session, index, yes),
        Command::Sizes => editor::show_sizes(&mut session),
        Command::Export { output } => export::export_book(&mut session, output),
        Command::Reset { yes } => editor::reset(&mut session, yes),
    }
}

pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    let answer = read_line(&format!("{prompt} [y/N]: "))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}
