//! 固定版式（pre-paginated）漫画 EPUB 写入器。

use std::io::{Cursor, Read as _, Write as _};

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use tracing::debug;

use super::{ArchiveWriter, BookMetadata, ExportError, ExportManifest, ExportProgress, ImageResource};
use crate::book::Direction;

/// 用于从书名 + 作者确定性生成 UUID v5 的命名空间，
/// 同一本书重复导出时 dc:identifier 不变。
const EPUB_UUID_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x3f, 0x1c, 0x52, 0x0e, 0x7a, 0x41, 0x4b, 0x8e, 0x9d, 0x06, 0x2b, 0xc1, 0x58, 0xe4, 0x90, 0x7d,
]);

const GENERATOR: &str = concat!("comic-epub-maker ", env!("CARGO_PKG_VERSION"));

const RENDITION_META: &str = "<meta property=\"rendition:layout\">pre-paginated</meta>\n    \
<meta property=\"rendition:orientation\">auto</meta>\n    \
<meta property=\"rendition:spread\">landscape</meta>\n  ";

const STYLE: &str = "html, body { margin:0; padding:0; width:100%; height:100%; }
.page { width:100%; height:100%; margin:0; padding:0; text-align:center; }
.page img { max-width:100%; max-height:100%; object-fit:contain; }";

#[derive(Debug, Default)]
pub struct EpubWriter;

impl EpubWriter {
    pub fn new() -> Self {
        Self
    }
}

fn epub_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Epub(e.to_string())
}

pub fn stable_uuid(meta: &BookMetadata) -> uuid::Uuid {
    let seed = format!("{}\u{1f}{}", meta.title, meta.author);
    uuid::Uuid::new_v5(&EPUB_UUID_NAMESPACE, seed.as_bytes())
}

impl ArchiveWriter for EpubWriter {
    fn write(
        &mut self,
        manifest: &ExportManifest<'_>,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<Vec<u8>, ExportError> {
        if manifest.page_count() == 0 {
            return Err(ExportError::EmptyBook);
        }
        let meta = &manifest.metadata;
        let maximum = manifest.page_count() + 1;
        let mut current = 0usize;
        progress(ExportProgress { current, maximum });

        let zip = ZipLibrary::new().map_err(epub_err)?;
        let mut book = EpubBuilder::new(zip).map_err(epub_err)?;
        book.epub_version(EpubVersion::V30);
        book.set_uuid(stable_uuid(meta));
        book.metadata("title", meta.title.as_str()).map_err(epub_err)?;
        book.metadata("toc_name", meta.title.as_str()).map_err(epub_err)?;
        if !meta.author.trim().is_empty() {
            book.metadata("author", meta.author.trim()).map_err(epub_err)?;
        }
        // 未设置语言时沿用 epub-builder 的默认值
        if !meta.language.is_empty() {
            book.metadata("lang", meta.language.as_str()).map_err(epub_err)?;
        }
        book.metadata("generator", GENERATOR).map_err(epub_err)?;
        book.stylesheet(Cursor::new(STYLE)).map_err(epub_err)?;

        for (chapter_no, chapter) in manifest.chapters.iter().enumerate() {
            for (page_no, res) in chapter.pages.iter().enumerate() {
                // 字节只在这里才从缓存解码
                let bytes = res.data()?;
                if current == 0 {
                    book.add_cover_image(res.href.as_str(), Cursor::new(bytes), res.media_type.as_str())
                        .map_err(epub_err)?;
                } else {
                    book.add_resource(res.href.as_str(), Cursor::new(bytes), res.media_type.as_str())
                        .map_err(epub_err)?;
                }

                let file_name = format!("page_{current:05}.xhtml");
                let html = wrap_page_html(meta, &chapter.title, res);
                let mut content = EpubContent::new(file_name, Cursor::new(html));
                if page_no == 0 {
                    let title = if chapter.title.trim().is_empty() {
                        format!("Chapter {}", chapter_no + 1)
                    } else {
                        chapter.title.clone()
                    };
                    content = content.title(title);
                    if chapter_no == 0 {
                        content = content.reftype(ReferenceType::Text);
                    }
                }
                book.add_content(content).map_err(epub_err)?;

                current += 1;
                progress(ExportProgress { current, maximum });
            }
        }

        let mut buffer = Vec::new();
        book.generate(&mut buffer).map_err(epub_err)?;
        let out = apply_fixed_layout(buffer, meta.direction)?;
        debug!(target: "epub_writer", pages = current, bytes = out.len(), "epub 打包完成");

        progress(ExportProgress {
            current: maximum,
            maximum,
        });
        Ok(out)
    }
}

/// 重写生成好的 zip：在 content.opf 中加入固定版式元数据与翻页方向。
/// 条目顺序与压缩方式保持不变（mimetype 必须是第一个且不压缩）。
fn apply_fixed_layout(epub_bytes: Vec<u8>, direction: Direction) -> Result<Vec<u8>, ExportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(epub_bytes))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let compression = entry.compression();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, compression, data));
    }
    drop(archive);

    let mut out = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut out);
        for (name, compression, data) in entries {
            let options = zip::write::FileOptions::default().compression_method(compression);
            writer.start_file(&name, options)?;
            if name.ends_with("content.opf") {
                match String::from_utf8(data) {
                    Ok(text) => writer.write_all(patch_opf(&text, direction).as_bytes())?,
                    Err(e) => writer.write_all(&e.into_bytes())?,
                }
            } else {
                writer.write_all(&data)?;
            }
        }
        writer.finish()?;
    }
    Ok(out.into_inner())
}

fn patch_opf(opf: &str, direction: Direction) -> String {
    let mut text = if opf.contains("rendition:layout") {
        opf.to_string()
    } else {
        opf.replacen("</metadata>", &format!("{RENDITION_META}</metadata>"), 1)
    };

    let Some(start) = text.find("<spine") else {
        return text;
    };
    let Some(len) = text[start..].find('>') else {
        return text;
    };
    let tag = &text[start..start + len];
    let attr = format!("page-progression-direction=\"{}\"", direction.as_str());
    let new_tag = if let Some(pos) = tag.find("page-progression-direction=\"") {
        let value_start = pos + "page-progression-direction=\"".len();
        match tag[value_start..].find('"') {
            Some(end) => format!("{}{}{}", &tag[..pos], attr, &tag[value_start + end + 1..]),
            None => tag.to_string(),
        }
    } else {
        let trimmed = tag.trim_end_matches('/');
        let self_closing = trimmed.len() != tag.len();
        format!("{} {}{}", trimmed, attr, if self_closing { "/" } else { "" })
    };
    text.replace_range(start..start + len, &new_tag);
    text
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn wrap_page_html(meta: &BookMetadata, chapter_title: &str, res: &ImageResource<'_>) -> String {
    let lang = if meta.language.is_empty() {
        "en"
    } else {
        meta.language.as_str()
    };
    format!(
        "<?xml version='1.0' encoding='utf-8'?>\n<!DOCTYPE html>\n<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n  <head>\n    <title>{title}</title>\n    <meta name=\"viewport\" content=\"width={w}, height={h}\"/>\n    <link href=\"stylesheet.css\" rel=\"stylesheet\" type=\"text/css\"/>\n  </head>\n  <body style=\"background-color:{bg};\">\n    <div class=\"page\"><img src=\"{src}\" width=\"{iw}\" height=\"{ih}\" alt=\"\"/></div>\n  </body>\n</html>",
        lang = html_escape(lang),
        title = html_escape(chapter_title),
        w = meta.page_width,
        h = meta.page_height,
        bg = html_escape(&meta.page_bg_color),
        src = html_escape(&res.href),
        iw = res.width,
        ih = res.height,
    )
}
