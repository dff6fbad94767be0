//! 书籍编辑：概要、元数据、章节、尺寸统计、重置。

use anyhow::Result;

use super::{Session, confirm};
use crate::book::{Chapter, MetadataUpdate, ResetPolicy, summarize_sizes};

pub(super) fn show_status(session: &Session) -> Result<()> {
    let book = session.books.load()?;
    println!("Title:    {}", book.title());
    if !book.author.is_empty() {
        println!("Author:   {}", book.author);
    }
    println!(
        "Language: {}",
        if book.language().is_empty() {
            "-"
        } else {
            book.language()
        }
    );
    println!(
        "Layout:   {} {}x{} {}",
        book.direction,
        book.page_width(),
        book.page_height(),
        book.page_bg_color()
    );
    println!("Chapters: {}", book.chapters.len());
    println!("Pages:    {}", book.num_of_pages());

    if book.chapters.is_empty() {
        println!("-- No Chapter added");
    }
    for (i, chapter) in book.chapters.iter().enumerate() {
        println!("  [{i}] {} ({} pages)", chapter.title, chapter.pages.len());
    }
    Ok(())
}

pub(super) fn update_metadata(session: &Session, update: MetadataUpdate) -> Result<()> {
    let mut book = session.books.load()?;
    book.apply_metadata(update)?;
    session.books.save(&book)?;
    println!("Saved!");
    Ok(())
}

pub(super) fn update_chapter(
    session: &Session,
    index: usize,
    title: Option<String>,
    pages: Option<Vec<String>>,
) -> Result<()> {
    let mut book = session.books.load()?;
    let current = book.chapter(index)?.clone();
    let updated = Chapter {
        title: title.unwrap_or(current.title),
        source_url: current.source_url,
        pages: pages.unwrap_or(current.pages),
    };
    book.update_chapter(index, updated)?;
    session.books.save(&book)?;
    println!("Saved!");
    Ok(())
}

pub(super) fn delete_chapter(session: &Session, index: usize, yes: bool) -> Result<()> {
    delete_chapter_with(session, index, |_| {
        Ok(yes || confirm("Do you want to delete this chapter?")?)
    })
}

/// 先确认下标有效，再询问是否删除。
fn delete_chapter_with(
    session: &Session,
    index: usize,
    ask: impl FnOnce(&Chapter) -> Result<bool>,
) -> Result<()> {
    let mut book = session.books.load()?;
    if !ask(book.chapter(index)?)? {
        return Ok(());
    }
    let removed = book.delete_chapter(index)?;
    session.books.save(&book)?;
    println!("Deleted! ({})", removed.title);
    Ok(())
}

pub(super) fn show_sizes(session: &mut Session) -> Result<()> {
    let book = session.books.load()?;
    let rows = summarize_sizes(&book, &mut session.cache)?;
    println!("{:<16} count", "size (w,h)");
    for row in rows {
        println!("{:<16} {}", row.size, row.count);
    }
    Ok(())
}

pub(super) fn reset(session: &mut Session, yes: bool) -> Result<()> {
    let book = session.books.load()?;
    if !yes && !confirm(&format!("Do you want to reset all the data of \"{}\"?", book.title()))? {
        return Ok(());
    }
    let policy = ResetPolicy::from_flag(session.config.clear_cache_on_reset);
    session.books.reset(&mut session.cache, policy)?;
    println!("Reset!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use super::*;
    use crate::base_system::context::Config;
    use crate::book::{Book, BookError, BookStore};
    use crate::image_cache::ImageCache;
    use crate::storage::{MemoryStorage, Storage};

    fn session_with_one_chapter() -> Session {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let books = BookStore::new(storage.clone());
        let mut book = Book::default();
        book.add_chapter(Chapter::new("only", "", vec!["http://p/1.jpg".into()]));
        books.save(&book).unwrap();
        Session {
            config: Config::default(),
            books,
            cache: ImageCache::new(storage),
        }
    }

    #[test]
    fn out_of_range_delete_fails_before_asking() {
        let session = session_with_one_chapter();
        let asked = Cell::new(false);
        let err = delete_chapter_with(&session, 4, |_| {
            asked.set(true);
            Ok(true)
        })
        .unwrap_err();
        assert!(!asked.get());
        assert!(matches!(
            err.downcast_ref::<BookError>(),
            Some(BookError::InvalidIndex { index: 4, len: 1 })
        ));
        assert_eq!(session.books.load().unwrap().chapters.len(), 1);
    }

    #[test]
    fn declined_delete_keeps_chapter() {
        let session = session_with_one_chapter();
        delete_chapter_with(&session, 0, |chapter| {
            assert_eq!(chapter.title, "only");
            Ok(false)
        })
        .unwrap();
        assert_eq!(session.books.load().unwrap().chapters.len(), 1);

        delete_chapter_with(&session, 0, |_| Ok(true)).unwrap();
        assert!(session.books.load().unwrap().chapters.is_empty());
    }
}
