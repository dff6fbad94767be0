//! 导出主流程。
//!
//! 先同步缓存并为每一页建立资源描述；任意一页不在缓存中即整体失败，
//! 写入器不会被调用（缺页的书等同于损坏的书）。

use tracing::{debug, info};

use super::{
    ArchiveWriter, BookMetadata, ExportChapter, ExportError, ExportManifest, ExportProgress,
    ImageResource,
};
use crate::book::Book;
use crate::image_cache::ImageCache;

/// 为书中所有页面建立资源描述，顺序与章节/页面顺序一致。
pub fn resolve_manifest<'a>(
    book: &Book,
    cache: &'a ImageCache,
) -> Result<ExportManifest<'a>, ExportError> {
    let mut index = 0usize;
    let mut chapters = Vec::with_capacity(book.chapters.len());
    for chapter in &book.chapters {
        let mut pages = Vec::with_capacity(chapter.pages.len());
        for url in &chapter.pages {
            let cached = cache.lookup(url)?;
            pages.push(ImageResource::from_cache(index, url, cached, cache));
            index += 1;
        }
        chapters.push(ExportChapter {
            title: chapter.title.clone(),
            pages,
        });
    }
    debug!(target: "export", pages = index, "页面资源解析完成");
    Ok(ExportManifest {
        metadata: BookMetadata::from(book),
        chapters,
    })
}

pub fn export(
    book: &Book,
    cache: &mut ImageCache,
    writer: &mut dyn ArchiveWriter,
    progress: &mut dyn FnMut(ExportProgress),
) -> Result<Vec<u8>, ExportError> {
    cache.ensure_synced()?;
    let cache: &ImageCache = cache;

    let manifest = resolve_manifest(book, cache)?;
    if manifest.page_count() == 0 {
        return Err(ExportError::EmptyBook);
    }
    let bytes = writer.write(&manifest, progress)?;
    info!(
        target: "export",
        title = %book.title(),
        chapters = manifest.chapters.len(),
        pages = manifest.page_count(),
        bytes = bytes.len(),
        "导出完成"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::book::Chapter;
    use crate::image_cache::{CacheError, CachedImage};
    use crate::storage::{MemoryStorage, Storage};

    /// 记录收到的资源并逐个取字节的假写入器。
    #[derive(Default)]
    struct RecordingWriter {
        calls: usize,
        hrefs: Vec<String>,
        sizes: Vec<(u32, u32)>,
        payloads: Vec<Vec<u8>>,
    }

    impl ArchiveWriter for RecordingWriter {
        fn write(
            &mut self,
            manifest: &ExportManifest<'_>,
            progress: &mut dyn FnMut(ExportProgress),
        ) -> Result<Vec<u8>, ExportError> {
            self.calls += 1;
            let maximum = manifest.page_count();
            for (i, res) in manifest.resources().enumerate() {
                self.hrefs.push(res.href.clone());
                self.sizes.push((res.width, res.height));
                self.payloads.push(res.data()?);
                progress(ExportProgress {
                    current: i + 1,
                    maximum,
                });
            }
            Ok(b"archive".to_vec())
        }
    }

    fn cache_with(urls: &[(&str, u32, u8)]) -> ImageCache {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage);
        cache
            .insert(
                urls.iter()
                    .map(|(u, w, b)| (u.to_string(), CachedImage::jpeg(*w, 1200, &[*b]))),
            )
            .unwrap();
        cache.invalidate();
        cache
    }

    fn book_with(pages: &[&str]) -> Book {
        let mut book = Book::default();
        book.add_chapter(Chapter::new(
            "Chapter 1",
            "http://s/1",
            pages.iter().map(|p| p.to_string()).collect(),
        ));
        book
    }

    #[test]
    fn three_cached_pages_export_in_order() {
        let mut cache = cache_with(&[
            ("http://s/1/a.jpg", 801, 1),
            ("http://s/1/b.jpg", 802, 2),
            ("http://s/1/c.jpg", 803, 3),
        ]);
        let book = book_with(&["http://s/1/c.jpg", "http://s/1/a.jpg", "http://s/1/b.jpg"]);
        let mut writer = RecordingWriter::default();
        let mut seen = Vec::new();

        let out = export(&book, &mut cache, &mut writer, &mut |p| seen.push(p)).unwrap();

        assert_eq!(out, b"archive");
        assert_eq!(
            writer.hrefs,
            vec![
                "images/image_00000.jpg",
                "images/image_00001.jpg",
                "images/image_00002.jpg"
            ]
        );
        assert_eq!(writer.sizes, vec![(803, 1200), (801, 1200), (802, 1200)]);
        assert_eq!(writer.payloads, vec![vec![3], vec![1], vec![2]]);
        assert_eq!(seen.last(), Some(&ExportProgress { current: 3, maximum: 3 }));
    }

    #[test]
    fn missing_page_fails_whole_export() {
        let mut cache = cache_with(&[("http://s/1/a.jpg", 800, 1), ("http://s/1/c.jpg", 800, 3)]);
        let book = book_with(&["http://s/1/a.jpg", "http://s/1/b.jpg", "http://s/1/c.jpg"]);
        let mut writer = RecordingWriter::default();

        let err = export(&book, &mut cache, &mut writer, &mut |_| {}).unwrap_err();
        match err {
            ExportError::Cache(CacheError::NotFound { url }) => {
                assert_eq!(url, "http://s/1/b.jpg")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(writer.calls, 0);
        assert!(writer.payloads.is_empty());
    }

    #[test]
    fn book_without_pages_is_not_exported() {
        let mut cache = cache_with(&[("a", 800, 1)]);
        let mut writer = RecordingWriter::default();

        let err = export(&Book::default(), &mut cache, &mut writer, &mut |_| {}).unwrap_err();
        assert!(matches!(err, ExportError::EmptyBook));

        let mut book = Book::default();
        book.add_chapter(Chapter::new("blank", "", Vec::new()));
        let err = export(&book, &mut cache, &mut writer, &mut |_| {}).unwrap_err();
        assert!(matches!(err, ExportError::EmptyBook));
        assert_eq!(writer.calls, 0);
    }

    #[test]
    fn ids_continue_across_chapters() {
        let mut cache = cache_with(&[("a", 800, 1), ("b", 800, 2)]);
        let mut book = book_with(&["a"]);
        book.add_chapter(Chapter::new("Chapter 2", "", vec!["b".into(), "a".into()]));

        cache.ensure_synced().unwrap();
        let manifest = resolve_manifest(&book, &cache).unwrap();
        let ids: Vec<_> = manifest.resources().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["image_00000", "image_00001", "image_00002"]);
        assert_eq!(manifest.chapters[1].title, "Chapter 2");
        assert_eq!(manifest.chapters[1].pages[1].source_url, "a");
    }
}
