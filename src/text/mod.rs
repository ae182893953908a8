//! Text Processing
//!
//! Renders poll text to display markup and parses quiz-solution markdown
//! into plain text plus formatting entities.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Inline markdown supported in quiz solutions. Nesting is not supported.
static MARKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(?P<bold>.+?)\*\*|__(?P<italic>.+?)__|`(?P<code>[^`]+?)`|~~(?P<strike>.+?)~~")
        .expect("markdown pattern is valid")
});

/// Formatting applied by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bold,
    Italic,
    Code,
    Strike,
}

/// Formatting span over a text.
///
/// `offset` and `length` count UTF-16 code units, as the wire protocol does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub offset: u32,
    pub length: u32,
}

/// Renders and parses user-visible text
pub trait TextProcessor: Send + Sync {
    /// Render plain text into display markup
    fn render(&self, text: &str) -> String;

    /// Strip markdown from `text`, returning the plain text and its entities
    fn parse_markdown(&self, text: &str) -> (String, Vec<MessageEntity>);
}

/// Default processor: HTML display markup and inline markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownProcessor;

impl MarkdownProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl TextProcessor for MarkdownProcessor {
    fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                _ => out.push(ch),
            }
        }
        out
    }

    fn parse_markdown(&self, text: &str) -> (String, Vec<MessageEntity>) {
        let mut out = String::with_capacity(text.len());
        let mut entities = Vec::new();
        let mut utf16_len = 0usize;
        let mut last = 0usize;

        for caps in MARKDOWN_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let (kind, inner) = match (
                caps.name("bold"),
                caps.name("italic"),
                caps.name("code"),
                caps.name("strike"),
            ) {
                (Some(m), _, _, _) => (EntityKind::Bold, m.as_str()),
                (_, Some(m), _, _) => (EntityKind::Italic, m.as_str()),
                (_, _, Some(m), _) => (EntityKind::Code, m.as_str()),
                (_, _, _, Some(m)) => (EntityKind::Strike, m.as_str()),
                _ => continue,
            };

            let before = &text[last..whole.start()];
            utf16_len += before.encode_utf16().count();
            out.push_str(before);

            let length = inner.encode_utf16().count();
            entities.push(MessageEntity {
                kind,
                offset: utf16_len as u32,
                length: length as u32,
            });
            utf16_len += length;
            out.push_str(inner);
            last = whole.end();
        }

        out.push_str(&text[last..]);
        (out, entities)
    }
}
