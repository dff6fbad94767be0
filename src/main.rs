//! comic-epub-maker 命令行入口。

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use comic_epub_maker::base_system::config::load_or_create;
use comic_epub_maker::base_system::context::Config;
use comic_epub_maker::base_system::logging::{LogOptions, LogSystem};
use comic_epub_maker::ui;
use tracing::{debug, error};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "comic-epub-maker", version = VERSION)]
#[command(about = "Collect comic pages into a book and export it as EPUB")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 数据目录路径（存放 config.yml、storage 和 logs）
    #[arg(long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: ui::noui::Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let log = init_logging(cli.debug, data_dir)?;
    debug!(target: "startup", "comic-epub-maker v{VERSION}");

    let config = load_or_create::<Config>(data_dir)
        .context("failed to load config.yml")?
        .with_base_dir(data_dir);

    let result = ui::noui::run(config, cli.command);
    if let Err(err) = &result {
        error!(target: "startup", "{err:#}");
    }
    log.safe_exit();
    result
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    LogSystem::init_with_base(opts, base_dir).context("failed to initialize logging")
}
