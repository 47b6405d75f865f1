//! Chapter/book navigation guards.
//!
//! Pure functions over the book catalog; callers must not issue a
//! navigation that these reject.

use crate::BookCatalog;

pub fn can_step_back(chapter: u32) -> bool {
    chapter > 1
}

pub fn can_step_forward(catalog: &BookCatalog, abbr: &str, chapter: u32) -> bool {
    match catalog.chapter_count(abbr) {
        Some(count) => chapter < count,
        None => false,
    }
}

/// Guard for a direct chapter jump. Unknown books reject every chapter.
pub fn chapter_in_range(catalog: &BookCatalog, abbr: &str, chapter: u32) -> bool {
    match catalog.chapter_count(abbr) {
        Some(count) => (1..=count).contains(&chapter),
        None => false,
    }
}

/// Display text for a book selection; falls back to the abbreviation
/// while the catalog has not loaded yet.
pub fn display_name_or_abbr<'a>(catalog: &'a BookCatalog, abbr: &'a str) -> &'a str {
    match catalog.by_abbr(abbr) {
        Some(entry) => entry.name.as_str(),
        None => abbr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BookCatalogEntry, Testament};

    fn catalog() -> BookCatalog {
        BookCatalog::new(vec![
            BookCatalogEntry {
                abbr: "Gen".to_string(),
                name: "Genesis".to_string(),
                testament: Testament::Ot,
                chapters: 50,
            },
            BookCatalogEntry {
                abbr: "Jude".to_string(),
                name: "Jude".to_string(),
                testament: Testament::Nt,
                chapters: 1,
            },
        ])
    }

    #[test]
    fn first_chapter_cannot_step_back() {
        assert!(!can_step_back(1));
        assert!(can_step_back(2));
    }

    #[test]
    fn last_chapter_cannot_step_forward() {
        let catalog = catalog();
        assert!(can_step_forward(&catalog, "Gen", 49));
        assert!(!can_step_forward(&catalog, "Gen", 50));
        assert!(!can_step_forward(&catalog, "Jude", 1));
    }

    #[test]
    fn unknown_book_rejects_all_steps() {
        let catalog = catalog();
        assert!(!can_step_forward(&catalog, "Xyz", 1));
        assert!(!chapter_in_range(&catalog, "Xyz", 1));
    }

    #[test]
    fn chapter_jump_bounds() {
        let catalog = catalog();
        assert!(chapter_in_range(&catalog, "Gen", 1));
        assert!(chapter_in_range(&catalog, "Gen", 50));
        assert!(!chapter_in_range(&catalog, "Gen", 0));
        assert!(!chapter_in_range(&catalog, "Gen", 51));
    }

    #[test]
    fn display_falls_back_to_abbr_without_catalog() {
        let empty = BookCatalog::default();
        assert_eq!(display_name_or_abbr(&empty, "Gen"), "Gen");
        assert_eq!(display_name_or_abbr(&catalog(), "Gen"), "Genesis");
    }
}
