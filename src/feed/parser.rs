//! Tolerant RSS 2.0 / Atom extraction.
//!
//! Real-world feeds are frequently malformed: mixed namespaces, CDATA in
//! some fields and raw text in others, single-quoted attributes, missing
//! closing tags. This module extracts by pattern matching instead of strict
//! XML parsing, so a bad element degrades to a missing field rather than a
//! failed document. A [`ParseError`] is returned only when no channel/feed
//! container can be located at all — the caller treats that as "skip this
//! source this run".

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::feed::entities::decode_entities;
use crate::util::text::{collapse_whitespace, strip_tags};

#[derive(Debug, Error)]
pub enum ParseError {
    /// Markup is not Atom and no RSS `<channel>` container was found.
    #[error("no <channel> container found in markup")]
    NoChannel,
    /// Markup looked like Atom but the `<feed>` root could not be located.
    #[error("no <feed> root found in Atom markup")]
    NoFeedRoot,
}

/// Channel/feed metadata plus the normalized item list for one parse call.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub items: Vec<ParsedItem>,
}

/// A single normalized entry. `published_raw` is the verbatim source string
/// (RFC-2822 or ISO-8601); timezone resolution happens at persistence time,
/// never here.
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub published_raw: Option<String>,
    pub thumbnail: Option<String>,
}

/// Detects the wire format and extracts feed metadata and items.
///
/// Atom detection keys off the Atom namespace on the `<feed>` root;
/// everything else is attempted as RSS. Items missing a usable title or
/// link are silently dropped, not reported.
pub fn parse_feed(markup: &str) -> Result<ParsedFeed, ParseError> {
    let p = patterns();
    if p.atom_root.is_match(markup) {
        parse_atom(markup, p)
    } else {
        parse_rss(markup, p)
    }
}

// ============================================================================
// Compiled patterns
// ============================================================================

/// CDATA-or-plain content lookup for one tag. CDATA wins when present and is
/// matched non-greedily.
struct TagPattern {
    cdata: Regex,
    plain: Regex,
}

impl TagPattern {
    fn new(tag: &str) -> Self {
        let t = regex::escape(tag);
        TagPattern {
            cdata: Regex::new(&format!(r"(?is)<{t}(?:\s[^>]*)?>\s*<!\[CDATA\[(.*?)\]\]>")).unwrap(),
            plain: Regex::new(&format!(r"(?is)<{t}(?:\s[^>]*)?>(.*?)</{t}\s*>")).unwrap(),
        }
    }

    fn extract<'a>(&self, block: &'a str) -> Option<&'a str> {
        if let Some(caps) = self.cdata.captures(block) {
            return caps.get(1).map(|m| m.as_str());
        }
        self.plain.captures(block).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

struct Patterns {
    atom_root: Regex,
    channel_open: Regex,
    channel_close: Regex,
    item_open: Regex,
    item_block: Regex,
    feed_open: Regex,
    feed_close: Regex,
    entry_open: Regex,
    entry_block: Regex,
    link_tag: Regex,
    enclosure_tag: Regex,
    media_thumbnail_tag: Regex,
    href_attr: Regex,
    rel_attr: Regex,
    url_attr: Regex,
    type_attr: Regex,
    title: TagPattern,
    link: TagPattern,
    description: TagPattern,
    guid: TagPattern,
    pub_date: TagPattern,
    subtitle: TagPattern,
    summary: TagPattern,
    content: TagPattern,
    published: TagPattern,
    updated: TagPattern,
}

/// Attribute patterns accept both double- and single-quoted values: some
/// platforms emit single-quoted XML.
fn attr_pattern(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i)\b{name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    ))
    .unwrap()
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        atom_root: Regex::new(r"(?is)<feed[^>]*www\.w3\.org/2005/atom").unwrap(),
        channel_open: Regex::new(r"(?i)<channel(?:\s[^>]*)?>").unwrap(),
        channel_close: Regex::new(r"(?i)</channel\s*>").unwrap(),
        item_open: Regex::new(r"(?i)<item[\s>]").unwrap(),
        item_block: Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item\s*>").unwrap(),
        feed_open: Regex::new(r"(?i)<feed(?:\s[^>]*)?>").unwrap(),
        feed_close: Regex::new(r"(?i)</feed\s*>").unwrap(),
        entry_open: Regex::new(r"(?i)<entry[\s>]").unwrap(),
        entry_block: Regex::new(r"(?is)<entry(?:\s[^>]*)?>(.*?)</entry\s*>").unwrap(),
        link_tag: Regex::new(r"(?is)<link\b[^>]*>").unwrap(),
        enclosure_tag: Regex::new(r"(?is)<enclosure\b[^>]*>").unwrap(),
        media_thumbnail_tag: Regex::new(r"(?is)<media:thumbnail\b[^>]*>").unwrap(),
        href_attr: attr_pattern("href"),
        rel_attr: attr_pattern("rel"),
        url_attr: attr_pattern("url"),
        type_attr: attr_pattern("type"),
        title: TagPattern::new("title"),
        link: TagPattern::new("link"),
        description: TagPattern::new("description"),
        guid: TagPattern::new("guid"),
        pub_date: TagPattern::new("pubDate"),
        subtitle: TagPattern::new("subtitle"),
        summary: TagPattern::new("summary"),
        content: TagPattern::new("content"),
        published: TagPattern::new("published"),
        updated: TagPattern::new("updated"),
    })
}

// ============================================================================
// RSS
// ============================================================================

fn parse_rss(markup: &str, p: &Patterns) -> Result<ParsedFeed, ParseError> {
    let open = p.channel_open.find(markup).ok_or(ParseError::NoChannel)?;
    let rest = &markup[open.end()..];
    let channel = match p.channel_close.find(rest) {
        Some(close) => &rest[..close.start()],
        // Unterminated channel: take everything after the open tag
        None => rest,
    };

    // Channel metadata lives before the first item; slicing there keeps the
    // channel <title> from being confused with an item's
    let head = match p.item_open.find(channel) {
        Some(m) => &channel[..m.start()],
        None => channel,
    };

    let mut items = Vec::new();
    for caps in p.item_block.captures_iter(channel) {
        let block = match caps.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let Some(title) = clean_text(p.title.extract(block)) else {
            continue;
        };
        // Feeds that only publish permalink guids get their link from <guid>
        let link = clean_link(p.link.extract(block))
            .or_else(|| clean_link(p.guid.extract(block)));
        let Some(link) = link else {
            continue;
        };

        items.push(ParsedItem {
            title,
            link,
            description: clean_description(p.description.extract(block)),
            published_raw: verbatim(p.pub_date.extract(block)),
            thumbnail: find_thumbnail(block, p),
        });
    }

    Ok(ParsedFeed {
        title: clean_text(p.title.extract(head)).unwrap_or_default(),
        description: clean_description(p.description.extract(head)),
        link: clean_link(p.link.extract(head)),
        items,
    })
}

/// Thumbnail lookup order: an `<enclosure>` whose `type` begins with
/// `image`, then a `<media:thumbnail>`'s `url` attribute. First match wins;
/// absence is not an error.
fn find_thumbnail(block: &str, p: &Patterns) -> Option<String> {
    for m in p.enclosure_tag.find_iter(block) {
        let tag = m.as_str();
        let is_image = attr_value(&p.type_attr, tag)
            .is_some_and(|t| t.to_ascii_lowercase().starts_with("image"));
        if is_image {
            if let Some(url) = attr_value(&p.url_attr, tag) {
                return Some(url);
            }
        }
    }
    p.media_thumbnail_tag
        .find(block)
        .and_then(|m| attr_value(&p.url_attr, m.as_str()))
}

// ============================================================================
// Atom
// ============================================================================

fn parse_atom(markup: &str, p: &Patterns) -> Result<ParsedFeed, ParseError> {
    let open = p.feed_open.find(markup).ok_or(ParseError::NoFeedRoot)?;
    let rest = &markup[open.end()..];
    let body = match p.feed_close.find(rest) {
        Some(close) => &rest[..close.start()],
        None => rest,
    };

    let head = match p.entry_open.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    };

    let mut items = Vec::new();
    for caps in p.entry_block.captures_iter(body) {
        let block = match caps.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let Some(title) = clean_text(p.title.extract(block)) else {
            continue;
        };
        let Some(link) = atom_link(block, p) else {
            continue;
        };

        // Summary wins over full content as the description source
        let description = clean_description(p.summary.extract(block))
            .or_else(|| clean_description(p.content.extract(block)));
        // published wins over updated, both kept verbatim
        let published_raw = verbatim(p.published.extract(block))
            .or_else(|| verbatim(p.updated.extract(block)));

        items.push(ParsedItem {
            title,
            link,
            description,
            published_raw,
            thumbnail: find_thumbnail(block, p),
        });
    }

    Ok(ParsedFeed {
        title: clean_text(p.title.extract(head)).unwrap_or_default(),
        description: clean_description(p.subtitle.extract(head)),
        link: atom_link(head, p),
        items,
    })
}

/// Picks an Atom `<link>`: prefer `rel="alternate"`, otherwise the first
/// link carrying an href.
fn atom_link(block: &str, p: &Patterns) -> Option<String> {
    let mut first = None;
    for m in p.link_tag.find_iter(block) {
        let tag = m.as_str();
        let Some(href) = attr_value(&p.href_attr, tag) else {
            continue;
        };
        if attr_value(&p.rel_attr, tag).as_deref() == Some("alternate") {
            return Some(href);
        }
        if first.is_none() {
            first = Some(href);
        }
    }
    first
}

// ============================================================================
// Field cleanup
// ============================================================================

fn attr_value(re: &Regex, tag: &str) -> Option<String> {
    let caps = re.captures(tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Entity-decoded, whitespace-collapsed text; empty means absent.
fn clean_text(raw: Option<&str>) -> Option<String> {
    let decoded = decode_entities(raw?);
    let collapsed = collapse_whitespace(&decoded);
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Entity-decoded then tag-stripped plain text. Decode-then-strip order is
/// load-bearing: descriptions often arrive with markup escaped as entities.
fn clean_description(raw: Option<&str>) -> Option<String> {
    let decoded = decode_entities(raw?);
    let stripped = strip_tags(&decoded);
    (!stripped.is_empty()).then_some(stripped)
}

/// Links get entity decoding (query strings arrive with `&amp;`) but no
/// other rewriting.
fn clean_link(raw: Option<&str>) -> Option<String> {
    let decoded = decode_entities(raw?.trim()).into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

fn verbatim(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
