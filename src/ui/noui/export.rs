use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use super::Session;
use crate::base_system::context::safe_fs_name;
use crate::export::{EpubWriter, ExportProgress, export};
use crate::storage::write_atomic;

pub(super) fn export_book(session: &mut Session, output: Option<PathBuf>) -> Result<()> {
    let book = session.books.load()?;
    let output = output.unwrap_or_else(|| {
        session
            .config
            .default_save_dir()
            .join(format!("{}.epub", safe_fs_name(book.title(), "_", 120)))
    });

    let bar = if session.config.show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} 导出 [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Some(bar)
    } else {
        None
    };

    let mut on_progress = |p: ExportProgress| {
        if let Some(bar) = bar.as_ref() {
            bar.set_length(p.maximum as u64);
            bar.set_position(p.current as u64);
        }
    };
    let result = export(&book, &mut session.cache, &mut EpubWriter::new(), &mut on_progress);
    if let Some(bar) = bar.as_ref() {
        bar.finish_and_clear();
    }
    let bytes = result?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_atomic(&output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Exported {} pages to {}", book.num_of_pages(), output.display());
    Ok(())
}
