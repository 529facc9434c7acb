//! The canonical feed item.

use chrono::{DateTime, Utc};

/// A normalized feed entry, independent of the source feed dialect.
///
/// `url` is always present (empty when the source has no permalink). Every
/// other field is optional: an absent field is distinct from a present but
/// empty one, and expressions that read an absent field fail for that item
/// rather than seeing a default.
///
/// Items are immutable once built; use [`Item::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    url: String,
    title: Option<String>,
    author: Option<String>,
    tags: Option<Vec<String>>,
    content: Option<String>,
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl Item {
    /// Starts building an item with the given permalink.
    pub fn builder(url: impl Into<String>) -> ItemBuilder {
        ItemBuilder {
            item: Item {
                url: url.into(),
                ..Item::default()
            },
        }
    }

    /// The entry permalink, empty if unknown.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// The ordered tag list. Never an empty slice: an item without tags
    /// has no tag list at all.
    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    /// The tags joined with `,`, as exposed to expressions via `Tags`.
    pub fn joined_tags(&self) -> Option<String> {
        self.tags.as_ref().map(|tags| tags.join(","))
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Length of the content in Unicode scalar values, present only when
    /// the content is.
    pub fn content_length(&self) -> Option<usize> {
        self.content.as_ref().map(|content| content.chars().count())
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// A short human-readable identifier used in error reports: the URL,
    /// falling back to the title.
    pub fn label(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => "<untitled>".to_string(),
        }
    }
}

/// Builder for [`Item`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.item.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.item.author = Some(author.into());
        self
    }

    /// Sets the tags. An empty iterator leaves the item without tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.item.tags = if tags.is_empty() { None } else { Some(tags) };
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.item.content = Some(content.into());
        self
    }

    pub fn published(mut self, published: DateTime<Utc>) -> Self {
        self.item.published = Some(published);
        self
    }

    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.item.updated = Some(updated);
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
