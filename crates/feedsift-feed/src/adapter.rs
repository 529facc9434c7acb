//! Adapting raw entries into canonical items.
//!
//! Adaptation is total: any parsed entry yields an [`Item`], with fields the
//! source did not provide left absent rather than defaulted.

use feedsift_expr::Item;

use crate::model::RawEntry;

/// Maps one raw entry into the canonical item schema.
///
/// - `URL` is the entry permalink, or empty when there is none.
/// - `Title` is set only when non-empty.
/// - `Author` is the first author with a non-blank name.
/// - Tags are the non-blank categories, in order.
/// - `Content` is the full body; the summary is not substituted for it.
pub fn to_item(entry: &RawEntry) -> Item {
    let mut builder = Item::builder(entry.link.clone().unwrap_or_default());

    if let Some(title) = entry.title.as_deref().filter(|t| !t.is_empty()) {
        builder = builder.title(title);
    }
    if let Some(author) = entry.first_author() {
        builder = builder.author(author.name.as_str());
    }
    builder = builder.tags(
        entry
            .categories
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(String::as_str),
    );
    if let Some(content) = &entry.content {
        builder = builder.content(content.as_str());
    }
    if let Some(published) = entry.published {
        builder = builder.published(published);
    }
    if let Some(updated) = entry.updated {
        builder = builder.updated(updated);
    }

    builder.build()
}

/// Adapts every entry, preserving order.
pub fn adapt_all(entries: &[RawEntry]) -> Vec<Item> {
    entries.iter().map(to_item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawPerson;
    use chrono::{TimeZone, Utc};

    fn full_entry() -> RawEntry {
        RawEntry {
            id: "go-1".to_string(),
            link: Some("https://go.example.com/learning".to_string()),
            title: Some("Learning Go".to_string()),
            summary: Some("Intro".to_string()),
            content: Some("<p>Body</p>".to_string()),
            authors: vec![RawPerson::new("Rob"), RawPerson::new("Ken")],
            categories: vec!["rust".to_string(), "go".to_string(), "python".to_string()],
            published: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()),
            updated: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_full_entry() {
        let item = to_item(&full_entry());
        assert_eq!(item.url(), "https://go.example.com/learning");
        assert_eq!(item.title(), Some("Learning Go"));
        assert_eq!(item.author(), Some("Rob"));
        assert_eq!(item.joined_tags().as_deref(), Some("rust,go,python"));
        assert_eq!(item.content(), Some("<p>Body</p>"));
        assert_eq!(item.content_length(), Some(11));
        assert_eq!(item.published(), full_entry().published);
        assert_eq!(item.updated(), full_entry().updated);
    }

    #[test]
    fn test_empty_entry_leaves_fields_absent() {
        let item = to_item(&RawEntry::default());
        assert_eq!(item.url(), "");
        assert_eq!(item.title(), None);
        assert_eq!(item.author(), None);
        assert_eq!(item.tags(), None);
        assert_eq!(item.content(), None);
        assert_eq!(item.content_length(), None);
        assert_eq!(item.published(), None);
        assert_eq!(item.updated(), None);
    }

    #[test]
    fn test_empty_title_is_absent() {
        let entry = RawEntry {
            title: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(to_item(&entry).title(), None);
    }

    #[test]
    fn test_empty_content_is_present() {
        let entry = RawEntry {
            content: Some(String::new()),
            ..Default::default()
        };
        let item = to_item(&entry);
        assert_eq!(item.content(), Some(""));
        assert_eq!(item.content_length(), Some(0));
    }

    #[test]
    fn test_summary_is_not_content() {
        let entry = RawEntry {
            summary: Some("Only a summary".to_string()),
            ..Default::default()
        };
        assert_eq!(to_item(&entry).content(), None);
    }

    #[test]
    fn test_blank_author_names_are_skipped() {
        let entry = RawEntry {
            authors: vec![RawPerson::new("")],
            ..Default::default()
        };
        assert_eq!(to_item(&entry).author(), None);
    }

    #[test]
    fn test_blank_categories_are_dropped() {
        let entry = RawEntry {
            categories: vec![" ".to_string()],
            ..Default::default()
        };
        assert_eq!(to_item(&entry).tags(), None);
    }

    #[test]
    fn test_adapt_all_preserves_order() {
        let entries: Vec<RawEntry> = ["a", "b", "c"]
            .iter()
            .map(|title| RawEntry {
                title: Some(title.to_string()),
                ..Default::default()
            })
            .collect();
        let titles: Vec<_> = adapt_all(&entries)
            .iter()
            .map(|item| item.title().unwrap_or_default().to_string())
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }
}
