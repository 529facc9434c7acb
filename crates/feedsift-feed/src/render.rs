//! Re-serializing filtered entries.
//!
//! Every format carries the same subset of each entry: title, link,
//! description, content, author, id and timestamps. Entries are written in
//! the order given.

use std::fmt;
use std::str::FromStr;

use atom_syndication::{FixedDateTime, Text};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::EncodingError;
use crate::model::{FeedMeta, RawEntry, RawPerson};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Output representation for a filtered feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// JSON Feed 1.1.
    #[default]
    Json,
    /// RSS 2.0.
    Rss,
    /// Atom 1.0.
    Atom,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Rss, OutputFormat::Atom];

    /// Resolves a request parameter, falling back to JSON for absent or
    /// unrecognized values.
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|p| p.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Rss => "rss",
            OutputFormat::Atom => "atom",
        }
    }

    /// The HTTP content type of rendered output.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Rss => "application/rss+xml",
            OutputFormat::Atom => "application/atom+xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "rss" => Ok(OutputFormat::Rss),
            "atom" => Ok(OutputFormat::Atom),
            other => Err(format!(
                "unknown format '{}': expected json, rss or atom",
                other
            )),
        }
    }
}

/// Renders a feed holding `entries` under the source feed's metadata.
///
/// `now` stands in for a missing feed-level update time.
///
/// # Errors
///
/// Returns an [`EncodingError`] if the serializer fails.
pub fn render(
    meta: &FeedMeta,
    entries: &[RawEntry],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> Result<String, EncodingError> {
    match format {
        OutputFormat::Json => render_json(meta, entries),
        OutputFormat::Rss => render_rss(meta, entries, now),
        OutputFormat::Atom => render_atom(meta, entries, now),
    }
}

// ==================== JSON Feed ====================

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    home_page_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authors: Vec<JsonAuthor<'a>>,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
struct JsonAuthor<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    content_html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authors: Vec<JsonAuthor<'a>>,
}

fn render_json(meta: &FeedMeta, entries: &[RawEntry]) -> Result<String, EncodingError> {
    let feed = JsonFeed {
        version: JSON_FEED_VERSION,
        title: meta.title.as_deref().unwrap_or_default(),
        home_page_url: meta.link.as_deref(),
        description: meta.description.as_deref(),
        icon: meta.image.as_deref(),
        authors: json_authors(&meta.authors),
        items: entries
            .iter()
            .map(|entry| JsonItem {
                id: &entry.id,
                url: entry.link.as_deref(),
                title: entry.title.as_deref(),
                summary: entry.summary.as_deref(),
                content_html: entry
                    .content
                    .as_deref()
                    .or(entry.summary.as_deref())
                    .unwrap_or_default(),
                date_published: entry.published,
                date_modified: entry.updated,
                authors: json_authors(entry.first_author().into_iter()),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&feed).map_err(|e| EncodingError::new(OutputFormat::Json, e))
}

fn json_authors<'a>(people: impl IntoIterator<Item = &'a RawPerson>) -> Vec<JsonAuthor<'a>> {
    people
        .into_iter()
        .filter(|p| !p.name.trim().is_empty())
        .map(|p| JsonAuthor { name: &p.name })
        .collect()
}

// ==================== RSS ====================

fn render_rss(
    meta: &FeedMeta,
    entries: &[RawEntry],
    now: DateTime<Utc>,
) -> Result<String, EncodingError> {
    let mut channel = rss::Channel::default();
    channel.set_title(meta.title.clone().unwrap_or_default());
    channel.set_link(meta.link.clone().unwrap_or_default());
    channel.set_description(meta.description.clone().unwrap_or_default());
    channel.set_managing_editor(meta.authors.first().map(RawPerson::rss_contact));
    channel.set_pub_date(meta.published.map(|d| d.to_rfc2822()));
    channel.set_last_build_date(meta.updated.unwrap_or(now).to_rfc2822());
    channel.set_items(entries.iter().map(rss_item).collect::<Vec<_>>());

    let buf = channel
        .write_to(Vec::new())
        .map_err(|e| EncodingError::new(OutputFormat::Rss, e))?;
    String::from_utf8(buf).map_err(|e| EncodingError::new(OutputFormat::Rss, e))
}

fn rss_item(entry: &RawEntry) -> rss::Item {
    let mut item = rss::Item::default();
    item.set_title(entry.title.clone());
    item.set_link(entry.link.clone());
    item.set_description(entry.summary.clone());
    item.set_content(entry.content.clone());
    item.set_author(entry.first_author().map(RawPerson::rss_contact));
    item.set_pub_date(entry.published.map(|d| d.to_rfc2822()));
    if !entry.id.is_empty() {
        let mut guid = rss::Guid::default();
        guid.set_permalink(entry.link.as_deref() == Some(entry.id.as_str()));
        guid.set_value(entry.id.clone());
        item.set_guid(guid);
    }
    item
}

// ==================== Atom ====================

fn render_atom(
    meta: &FeedMeta,
    entries: &[RawEntry],
    now: DateTime<Utc>,
) -> Result<String, EncodingError> {
    let mut feed = atom_syndication::Feed::default();
    feed.set_title(Text::plain(meta.title.clone().unwrap_or_default()));
    feed.set_id(atom_id(&meta.id, meta.link.as_deref()));
    feed.set_updated(fixed(meta.updated.unwrap_or(now)));
    feed.set_subtitle(meta.description.clone().map(Text::plain));
    feed.set_logo(meta.image.clone());
    feed.set_links(meta.link.as_deref().map(atom_link).into_iter().collect::<Vec<_>>());
    feed.set_authors(meta.authors.iter().map(atom_person).collect::<Vec<_>>());
    feed.set_entries(
        entries
            .iter()
            .map(|entry| atom_entry(entry, now))
            .collect::<Vec<_>>(),
    );

    let buf = feed
        .write_to(Vec::new())
        .map_err(|e| EncodingError::new(OutputFormat::Atom, e))?;
    String::from_utf8(buf).map_err(|e| EncodingError::new(OutputFormat::Atom, e))
}

fn atom_entry(entry: &RawEntry, now: DateTime<Utc>) -> atom_syndication::Entry {
    let mut out = atom_syndication::Entry::default();
    out.set_title(Text::plain(entry.title.clone().unwrap_or_default()));
    out.set_id(atom_id(&entry.id, entry.link.as_deref()));
    // Atom requires <updated>.
    out.set_updated(fixed(entry.updated.or(entry.published).unwrap_or(now)));
    out.set_published(entry.published.map(fixed));
    out.set_summary(entry.summary.clone().map(Text::html));
    out.set_links(entry.link.as_deref().map(atom_link).into_iter().collect::<Vec<_>>());
    out.set_authors(entry.first_author().map(atom_person).into_iter().collect::<Vec<_>>());
    if let Some(body) = &entry.content {
        let mut content = atom_syndication::Content::default();
        content.set_content_type("html".to_string());
        content.set_value(body.clone());
        out.set_content(content);
    }
    out
}

fn atom_id(id: &str, link: Option<&str>) -> String {
    if id.is_empty() {
        link.unwrap_or_default().to_string()
    } else {
        id.to_string()
    }
}

fn atom_link(href: &str) -> atom_syndication::Link {
    let mut link = atom_syndication::Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn atom_person(person: &RawPerson) -> atom_syndication::Person {
    let mut out = atom_syndication::Person::default();
    out.set_name(person.name.clone());
    out.set_email(person.email.clone());
    out
}

fn fixed(timestamp: DateTime<Utc>) -> FixedDateTime {
    timestamp.fixed_offset()
}
