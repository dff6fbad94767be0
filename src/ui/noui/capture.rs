use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use super::Session;
use crate::book::Chapter;
use crate::image_cache::capture::{Candidate, CaptureOptions, capture_images};

/// 快速添加：抓取图片 → 设置语言 → 追加章节 → 保存。
pub(super) fn add_chapter(
    session: &mut Session,
    title: String,
    source_url: String,
    language: Option<String>,
    inputs: &[String],
) -> Result<()> {
    let mut candidates = Vec::with_capacity(inputs.len());
    for input in inputs {
        let (url, path) = parse_input(input)?;
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read image {}", path.display()))?;
        candidates.push(Candidate { url, bytes });
    }

    let opts = CaptureOptions::from(&session.config);
    let pages = capture_images(&mut session.cache, candidates, opts)?;
    if pages.is_empty() {
        bail!("Fail to add this page.");
    }

    let mut book = session.books.load()?;
    if let Some(lang) = language.as_deref() {
        book.set_language(lang);
    }
    let count = pages.len();
    book.add_chapter(Chapter::new(title, source_url, pages));
    session.books.save(&book)?;

    info!(target: "capture", chapters = book.chapters.len(), pages = book.num_of_pages(), "章节已追加");
    println!("Added with {count} images.");
    Ok(())
}

/// `URL=PATH` 或 `PATH`；后者以规范化路径的 file:// URL 作为 key。
fn parse_input(input: &str) -> Result<(String, std::path::PathBuf)> {
    if let Some((url, path)) = input.rsplit_once('=')
        && url.contains("://")
    {
        return Ok((url.to_string(), Path::new(path).to_path_buf()));
    }
    let path = Path::new(input);
    let canonical = path
        .canonicalize()
        .with_context(|| format!("image not found: {input}"))?;
    let url = format!(
        "file://{}",
        canonical.to_string_lossy().replace('\\', "/")
    );
    Ok((url, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_keeps_query_string() {
        let (url, path) = parse_input("https://cdn.example/p/1.jpg?w=800=./pages/1.png").unwrap();
        assert_eq!(url, "https://cdn.example/p/1.jpg?w=800");
        assert_eq!(path, Path::new("./pages/1.png"));
    }

    #[test]
    fn bare_path_becomes_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("p1.png");
        fs::write(&file, b"x").unwrap();
        let (url, path) = parse_input(file.to_str().unwrap()).unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("p1.png"));
        assert!(path.is_absolute());
    }

    #[test]
    fn missing_bare_path_is_an_error() {
        assert!(parse_input("/definitely/not/here.png").is_err());
    }
}
