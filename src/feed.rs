//! RSS feed document building.
//!
//! The destination feed is treated as an envelope plus an ordered list of
//! entries. Appending is a list operation: existing bytes before the closing
//! `</channel>` marker are carried through untouched, new entries are
//! rendered immediately before it. Entry fields are XML-escaped except for
//! `description`, which is embedded as a raw CDATA block (pre-formatted HTML
//! content by convention).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::Post;

const CHANNEL_CLOSE: &str = "</channel>";

/// RFC 822 style date used by RSS `pubDate`/`lastBuildDate`.
const RSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed document: no closing {CHANNEL_CLOSE} marker")]
    MissingChannelClose,
}

/// A single feed entry, rendered as an `<item>` block.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub description: String,
    pub link: String,
    pub guid: String,
    pub pub_date: DateTime<Utc>,
}

impl FeedEntry {
    /// Build an entry from a post and its resolved publication instant.
    #[must_use]
    pub fn from_post(post: &Post, pub_date: DateTime<Utc>) -> Self {
        Self {
            title: post.title.clone(),
            description: post.description.clone(),
            link: post.link.clone(),
            guid: post.guid.clone(),
            pub_date,
        }
    }

    fn render(&self) -> String {
        format!(
            "\n    <item>\n        <title>{}</title>\n        <description><![CDATA[{}]]></description>\n        <link>{}</link>\n        <guid>{}</guid>\n        <pubDate>{}</pubDate>\n    </item>",
            escape_xml(&self.title),
            self.description,
            escape_xml(&self.link),
            escape_xml(&self.guid),
            self.pub_date.format(RSS_DATE_FORMAT),
        )
    }
}

/// A feed document split at the closing channel marker.
///
/// `head` is every byte of the existing document before `</channel>`,
/// including any existing entries; it is never rewritten. New entries are
/// appended as structured values and only rendered on serialization, so
/// existing entry order and bytes are preserved by construction.
#[derive(Debug)]
pub struct FeedDocument {
    head: String,
    entries: Vec<FeedEntry>,
    tail: String,
}

impl FeedDocument {
    /// Synthesize a new, empty feed with the given envelope fields.
    #[must_use]
    pub fn new(title: &str, description: &str, link: &str, now: DateTime<Utc>) -> Self {
        let head = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n    <title>{}</title>\n    <description>{}</description>\n    <link>{}</link>\n    <lastBuildDate>{}</lastBuildDate>",
            escape_xml(title),
            escape_xml(description),
            escape_xml(link),
            now.format(RSS_DATE_FORMAT),
        );
        Self {
            head,
            entries: Vec::new(),
            tail: format!("\n{CHANNEL_CLOSE}\n</rss>"),
        }
    }

    /// Parse an existing document by locating its closing channel marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker is absent.
    pub fn parse(content: &str) -> Result<Self, FeedError> {
        let idx = content
            .find(CHANNEL_CLOSE)
            .ok_or(FeedError::MissingChannelClose)?;
        Ok(Self {
            head: content[..idx].to_string(),
            entries: Vec::new(),
            tail: content[idx..].to_string(),
        })
    }

    /// Append an entry. Existing entries are never reordered or rewritten.
    pub fn push_entry(&mut self, entry: FeedEntry) {
        self.entries.push(entry);
    }

    /// Serialize: head bytes verbatim, new entries in insertion order, tail.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.head.clone();
        for entry in &self.entries {
            out.push_str(&entry.render());
        }
        out.push_str(&self.tail);
        out
    }
}

/// Produce the new feed content for a post.
///
/// Empty or whitespace-only `existing` content synthesizes a fresh document
/// from the post's envelope fields; otherwise the entry is inserted before
/// the existing closing marker. Pure in both inputs; `now` only feeds the
/// `lastBuildDate` of a newly created document.
///
/// # Errors
///
/// Returns an error if non-empty content has no closing channel marker.
pub fn build_feed(
    existing: &str,
    post: &Post,
    pub_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<String, FeedError> {
    let mut doc = if existing.trim().is_empty() {
        FeedDocument::new(&post.feed_title, &post.feed_description, &post.feed_link, now)
    } else {
        FeedDocument::parse(existing)?
    };
    doc.push_entry(FeedEntry::from_post(post, pub_date));
    Ok(doc.render())
}

/// Escape the five XML-reserved characters with named references.
fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
