//! Feed reader tool: fetches an RSS 2.0 or Atom feed and renders its latest
//! entries as plain text.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::config::RssConfig;
use crate::error::{AgentLineError, Result};
use crate::utils::string::prefix_chars;

use super::{Tool, ToolContext};

const FEED_USER_AGENT: &str = concat!("agentline/", env!("CARGO_PKG_VERSION"));
const MAX_FEED_BYTES: usize = 2 * 1024 * 1024;
const MAX_ENTRIES: usize = 50;
const SUMMARY_CHARS: usize = 300;
const NO_ENTRIES: &str = "フィードに記事が見つかりませんでした。";

/// One feed item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
}

/// A parsed feed, entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

/// `rss`: fetch a feed (by default the configured one) and list its entries.
pub struct RssTool {
    client: Client,
    default_url: String,
    max_entries: usize,
}

impl RssTool {
    /// Build the tool from config. Returns `None` when the tool is disabled.
    pub fn from_config(config: &RssConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Some(Self {
            client,
            default_url: config.default_url.clone(),
            max_entries: config.max_entries.clamp(1, MAX_ENTRIES),
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut response = self
            .client
            .get(url.clone())
            .header("User-Agent", FEED_USER_AGENT)
            .send()
            .await
            .map_err(|e| AgentLineError::Tool(format!("Feed fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentLineError::Tool(format!(
                "Feed fetch failed: HTTP {} from {}",
                status, url
            )));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AgentLineError::Tool(format!("Feed read failed: {}", e)))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_FEED_BYTES {
                return Err(AgentLineError::Tool(format!(
                    "Feed exceeds {} bytes",
                    MAX_FEED_BYTES
                )));
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl Tool for RssTool {
    fn name(&self) -> &str {
        "rss"
    }

    fn description(&self) -> &str {
        "RSS/Atomフィードを取得して最新の記事を一覧します。AWSの最新アップデート（What's New）の確認にはこのツールを使ってください。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["fetch"],
                    "description": "実行する操作（fetch のみ対応）"
                },
                "url": {
                    "type": "string",
                    "description": "フィードのURL（省略時はAWS What's Newのフィード）"
                },
                "max_entries": {
                    "type": "integer",
                    "description": "取得する記事の最大件数",
                    "minimum": 1,
                    "maximum": MAX_ENTRIES
                }
            }
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let action = args.get("action").and_then(Value::as_str).unwrap_or("fetch");
        if action != "fetch" {
            return Err(AgentLineError::Tool(format!(
                "Unsupported rss action '{}' (only 'fetch' is available)",
                action
            )));
        }

        let raw_url = args
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.default_url);
        let url = Url::parse(raw_url)
            .map_err(|e| AgentLineError::Tool(format!("Invalid feed URL '{}': {}", raw_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AgentLineError::Tool(
                "Only http/https feed URLs are allowed".to_string(),
            ));
        }

        let max_entries = args
            .get("max_entries")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(self.max_entries)
            .clamp(1, MAX_ENTRIES);

        let body = self.fetch(&url).await?;
        let feed = parse_feed(&body)?;
        Ok(format_feed(&feed, max_entries))
    }
}

/// Parse an RSS 2.0 (`<item>`) or Atom (`<entry>`) document.
pub fn parse_feed(xml: &str) -> Result<Feed> {
    let mut reader = Reader::from_str(xml);
    let mut feed = Feed::default();
    let mut entry: Option<FeedEntry> = None;
    // Element whose text is being collected, and the text so far
    let mut field: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            AgentLineError::Tool(format!(
                "Invalid feed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                if field.is_some() {
                    // Markup nested inside a text field (Atom xhtml content)
                    continue;
                }
                let name = e.local_name().as_ref().to_vec();
                if matches!(name.as_slice(), b"item" | b"entry") {
                    entry = Some(FeedEntry::default());
                } else if name == b"link" && entry.is_some() {
                    match alternate_href(&e) {
                        Some(href) => set_link(entry.as_mut(), href),
                        None => field = Some(name),
                    }
                } else if is_text_field(&name, entry.is_some()) {
                    text.clear();
                    field = Some(name);
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(href) = alternate_href(&e) {
                        set_link(entry.as_mut(), href);
                    }
                }
            }
            Event::Text(t) if field.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Event::CData(t) if field.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) if field.is_some() => {
                let name = String::from_utf8_lossy(&r).into_owned();
                match resolve_reference(&name) {
                    Some(resolved) => text.push_str(&resolved),
                    None => {
                        text.push('&');
                        text.push_str(&name);
                        text.push(';');
                    }
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if field.as_deref() == Some(name) {
                    store_field(&mut feed, entry.as_mut(), name, text.trim());
                    field = None;
                    text.clear();
                } else if field.is_none() && matches!(name, b"item" | b"entry") {
                    if let Some(done) = entry.take() {
                        feed.entries.push(done);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}

fn is_text_field(tag: &[u8], in_entry: bool) -> bool {
    if !in_entry {
        return tag == b"title";
    }
    matches!(
        tag,
        b"title"
            | b"link"
            | b"pubDate"
            | b"published"
            | b"updated"
            | b"description"
            | b"summary"
            | b"content"
            | b"encoded"
    )
}

/// `href` of an Atom link that points at the entry itself.
fn alternate_href(e: &BytesStart<'_>) -> Option<String> {
    let rel = e
        .try_get_attribute("rel")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
    if rel.as_deref().is_some_and(|rel| rel != "alternate") {
        return None;
    }
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn set_link(entry: Option<&mut FeedEntry>, href: String) {
    if let Some(entry) = entry {
        if entry.link.is_empty() {
            entry.link = href;
        }
    }
}

fn store_field(feed: &mut Feed, entry: Option<&mut FeedEntry>, tag: &[u8], value: &str) {
    let Some(entry) = entry else {
        if tag == b"title" && feed.title.is_empty() {
            feed.title = value.to_string();
        }
        return;
    };

    let slot = match tag {
        b"title" => &mut entry.title,
        b"link" => &mut entry.link,
        b"pubDate" | b"published" | b"updated" => &mut entry.published,
        _ => &mut entry.summary,
    };
    // First occurrence in document order wins
    if slot.is_empty() {
        *slot = value.to_string();
    }
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let code = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

/// Feed summaries are usually escaped HTML; reduce them to one line of text.
fn summary_text(html: &str) -> String {
    let without_tags = match Regex::new(r"(?s)<[^>]+>") {
        Ok(re) => re.replace_all(html, " ").into_owned(),
        Err(_) => html.to_string(),
    };
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > SUMMARY_CHARS {
        format!("{}...", prefix_chars(&collapsed, SUMMARY_CHARS))
    } else {
        collapsed
    }
}

/// Render up to `max_entries` entries as `■ title / link / date / summary` blocks.
pub fn format_feed(feed: &Feed, max_entries: usize) -> String {
    if feed.entries.is_empty() {
        return NO_ENTRIES.to_string();
    }

    let mut parts = Vec::with_capacity(max_entries + 1);
    if !feed.title.is_empty() {
        parts.push(format!("【{}】", feed.title));
    }
    for entry in feed.entries.iter().take(max_entries) {
        let mut block = format!("■ {}", entry.title);
        for line in [entry.link.clone(), entry.published.clone(), summary_text(&entry.summary)] {
            if !line.is_empty() {
                block.push('\n');
                block.push_str(&line);
            }
        }
        parts.push(block);
    }
    parts.join("\n\n")
}
