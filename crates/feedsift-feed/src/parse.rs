//! Parsing fetched bytes into a [`RawFeed`].

use feed_rs::model::{Entry, Feed, Link, Person, Text};

use crate::error::FetchError;
use crate::model::{FeedMeta, RawEntry, RawFeed, RawPerson};

/// Parses an RSS, Atom or JSON Feed document.
///
/// `location` only names the source in errors.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the bytes are not a recognizable feed.
pub fn parse_feed(bytes: &[u8], location: &str) -> Result<RawFeed, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })?;
    Ok(RawFeed::from(feed))
}

impl From<Feed> for RawFeed {
    fn from(feed: Feed) -> Self {
        let meta = FeedMeta {
            id: feed.id,
            title: text(feed.title),
            link: primary_link(&feed.links),
            description: text(feed.description),
            authors: people(feed.authors),
            image: feed.logo.or(feed.icon).map(|image| image.uri),
            updated: feed.updated,
            published: feed.published,
        };
        let entries = feed.entries.into_iter().map(RawEntry::from).collect();
        RawFeed { meta, entries }
    }
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        RawEntry {
            link: primary_link(&entry.links),
            id: entry.id,
            title: text(entry.title),
            summary: text(entry.summary),
            content: entry.content.and_then(|content| content.body),
            authors: people(entry.authors),
            categories: entry
                .categories
                .into_iter()
                .map(|category| category.term)
                .collect(),
            published: entry.published,
            updated: entry.updated,
        }
    }
}

fn text(text: Option<Text>) -> Option<String> {
    text.map(|t| t.content)
}

fn people(people: Vec<Person>) -> Vec<RawPerson> {
    people
        .into_iter()
        .map(|person| RawPerson {
            name: person.name,
            email: person.email,
        })
        .collect()
}

/// The alternate link if one is marked, else the first link.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|link| link.href.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Go Blog</title>
    <link>https://go.example.com</link>
    <description>News about Go</description>
    <item>
      <title>Learning Go</title>
      <link>https://go.example.com/learning</link>
      <guid isPermaLink="false">go-1</guid>
      <description>A short intro</description>
      <content:encoded><![CDATA[<p>Full text</p>]]></content:encoded>
      <dc:creator>Rob</dc:creator>
      <category>go</category>
      <category>tutorial</category>
      <pubDate>Sat, 01 Jun 2024 11:00:00 GMT</pubDate>
    </item>
    <item>
      <title></title>
      <guid isPermaLink="false">go-2</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Rust Log</title>
  <id>urn:rust-log</id>
  <updated>2024-06-01T10:00:00Z</updated>
  <link rel="self" href="https://rust.example.com/atom.xml"/>
  <link rel="alternate" href="https://rust.example.com/"/>
  <entry>
    <title>Rust is safe</title>
    <id>urn:rust-log:1</id>
    <updated>2024-06-01T09:00:00Z</updated>
    <link href="https://rust.example.com/safe"/>
    <author><name>Ferris</name></author>
    <content type="html">&lt;p&gt;Borrowing&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_entry() {
        let feed = parse_feed(RSS.as_bytes(), "go.xml").unwrap();
        assert_eq!(feed.meta.title.as_deref(), Some("Go Blog"));
        assert_eq!(feed.entries.len(), 2);

        let entry = &feed.entries[0];
        assert_eq!(entry.id, "go-1");
        assert_eq!(entry.link.as_deref(), Some("https://go.example.com/learning"));
        assert_eq!(entry.title.as_deref(), Some("Learning Go"));
        assert_eq!(entry.summary.as_deref(), Some("A short intro"));
        assert_eq!(entry.content.as_deref(), Some("<p>Full text</p>"));
        assert_eq!(entry.authors[0].name, "Rob");
        assert_eq!(entry.categories, vec!["go", "tutorial"]);
        assert!(entry.published.is_some());
    }

    #[test]
    fn test_parse_rss_sparse_entry() {
        let feed = parse_feed(RSS.as_bytes(), "go.xml").unwrap();
        let entry = &feed.entries[1];
        assert_eq!(entry.link, None);
        assert_eq!(entry.content, None);
        assert!(entry.authors.is_empty());
        assert!(entry.published.is_none());
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let feed = parse_feed(ATOM.as_bytes(), "rust.xml").unwrap();
        assert_eq!(feed.meta.link.as_deref(), Some("https://rust.example.com/"));
        assert!(feed.meta.updated.is_some());

        let entry = &feed.entries[0];
        assert_eq!(entry.link.as_deref(), Some("https://rust.example.com/safe"));
        assert_eq!(entry.authors[0].name, "Ferris");
        assert_eq!(entry.content.as_deref(), Some("<p>Borrowing</p>"));
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = parse_feed(b"this is not a feed", "junk.txt").unwrap_err();
        assert!(matches!(err, FetchError::Parse { ref location, .. } if location == "junk.txt"));
    }
}
