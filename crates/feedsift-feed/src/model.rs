//! Dialect-neutral parsed feed model.
//!
//! Whatever the source dialect (RSS 0.9x/1.0/2.0, Atom, JSON Feed), a fetched
//! feed is reduced to these types before adaptation and rendering. Text fields
//! keep their raw bodies; nothing is normalized here.

use chrono::{DateTime, Utc};

/// A fetched and parsed feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    pub meta: FeedMeta,
    /// Entries in document order.
    pub entries: Vec<RawEntry>,
}

/// Feed-level metadata, copied through to rendered output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMeta {
    pub id: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<RawPerson>,
    pub image: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
}

/// One feed entry as the source described it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub id: String,
    /// The entry permalink.
    pub link: Option<String>,
    pub title: Option<String>,
    /// Description or summary text.
    pub summary: Option<String>,
    /// Full body, e.g. `content:encoded` or Atom `<content>`.
    pub content: Option<String>,
    pub authors: Vec<RawPerson>,
    pub categories: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPerson {
    pub name: String,
    pub email: Option<String>,
}

impl RawPerson {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
        }
    }

    /// `email (name)` when both are known, as RSS expects.
    pub fn rss_contact(&self) -> String {
        match &self.email {
            Some(email) if !self.name.is_empty() => format!("{} ({})", email, self.name),
            Some(email) => email.clone(),
            None => self.name.clone(),
        }
    }
}

impl RawEntry {
    /// The first author with a non-blank name.
    pub fn first_author(&self) -> Option<&RawPerson> {
        self.authors.iter().find(|p| !p.name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_contact_formats() {
        let mut person = RawPerson::new("Rob");
        assert_eq!(person.rss_contact(), "Rob");

        person.email = Some("rob@example.com".to_string());
        assert_eq!(person.rss_contact(), "rob@example.com (Rob)");

        person.name.clear();
        assert_eq!(person.rss_contact(), "rob@example.com");
    }

    #[test]
    fn test_first_author_skips_blank_names() {
        let entry = RawEntry {
            authors: vec![RawPerson::new("  "), RawPerson::new("Ken")],
            ..Default::default()
        };
        assert_eq!(entry.first_author().map(|p| p.name.as_str()), Some("Ken"));
    }
}
