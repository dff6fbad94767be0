//! 完整流程：抓取 → 追加章节 → 重新打开存储 → 导出 → 重置。

use std::io::{Cursor, Read};
use std::sync::Arc;

use comic_epub_maker::book::{BookStore, Chapter, ResetPolicy};
use comic_epub_maker::export::{EpubWriter, ExportError, export};
use comic_epub_maker::image_cache::capture::{Candidate, CaptureOptions, capture_images};
use comic_epub_maker::image_cache::{CacheError, ImageCache};
use comic_epub_maker::storage::{FileStorage, Storage};

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, shade, shade]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn open(dir: &std::path::Path) -> (BookStore, ImageCache) {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir).unwrap());
    (BookStore::new(storage.clone()), ImageCache::new(storage))
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
fn capture_persist_and_export() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (books, mut cache) = open(dir.path());
        let urls = capture_images(
            &mut cache,
            vec![
                Candidate {
                    url: "https://comic.example/ep1/01.png".into(),
                    bytes: png(400, 600, 10),
                },
                Candidate {
                    url: "https://comic.example/ep1/banner.png".into(),
                    bytes: png(120, 40, 90),
                },
                Candidate {
                    url: "https://comic.example/ep1/02.png".into(),
                    bytes: png(400, 600, 200),
                },
            ],
            CaptureOptions::default(),
        )
        .unwrap();
        assert_eq!(urls.len(), 2);

        let mut book = books.load().unwrap();
        book.set_language("ja");
        book.add_chapter(Chapter::new("Episode 1", "https://comic.example/ep1", urls));
        books.save(&book).unwrap();
    }

    // 新进程视角：重新打开同一目录
    let (books, mut cache) = open(dir.path());
    let book = books.load().unwrap();
    assert_eq!(book.num_of_pages(), 2);
    assert_eq!(book.language(), "ja");

    let bytes = export(&book, &mut cache, &mut EpubWriter::new(), &mut |_| {}).unwrap();
    let names = entry_names(&bytes);
    assert!(names.iter().any(|n| n.ends_with("images/image_00000.jpg")));
    assert!(names.iter().any(|n| n.ends_with("images/image_00001.jpg")));
    assert!(!names.iter().any(|n| n.ends_with("image_00002.jpg")));

    let mut archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
    let opf_name = names
        .iter()
        .find(|n| n.ends_with("content.opf"))
        .unwrap()
        .clone();
    let mut opf = String::new();
    archive
        .by_name(&opf_name)
        .unwrap()
        .read_to_string(&mut opf)
        .unwrap();
    assert!(opf.contains("pre-paginated"));
    assert!(opf.contains("page-progression-direction=\"rtl\""));

    let mut jpeg = Vec::new();
    let image_name = names
        .iter()
        .find(|n| n.ends_with("images/image_00000.jpg"))
        .unwrap()
        .clone();
    archive
        .by_name(&image_name)
        .unwrap()
        .read_to_end(&mut jpeg)
        .unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 600));
}

#[test]
fn reset_then_export_of_stale_pages_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (books, mut cache) = open(dir.path());
    let urls = capture_images(
        &mut cache,
        vec![Candidate {
            url: "https://comic.example/a.png".into(),
            bytes: png(300, 300, 0),
        }],
        CaptureOptions::default(),
    )
    .unwrap();

    let mut book = books.load().unwrap();
    book.add_chapter(Chapter::new("A", "", urls));
    books.save(&book).unwrap();

    let fresh = books.reset(&mut cache, ResetPolicy::ClearAll).unwrap();
    assert_eq!(fresh.num_of_pages(), 0);

    // 旧的书籍记录（内存中）引用的图片已随重置清除
    let err = export(&book, &mut cache, &mut EpubWriter::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Cache(CacheError::NotFound { ref url }) if url == "https://comic.example/a.png"
    ));
}
