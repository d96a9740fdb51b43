//! Line-oriented Markdown used for summary bodies.
//!
//! Each physical line is classified on its own: there is no block state, so
//! fenced code, nested lists and tables are not recognized. Inline markup is
//! limited to `**bold**`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BULLET_MARKER: Regex = Regex::new(r"^\s*[-*]\s*").unwrap();
    static ref NUMBERED: Regex = Regex::new(r"^(\d+\.)\s").unwrap();
    static ref STRONG: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Bullet(Vec<Inline>),
    Numbered { label: String, body: Vec<Inline> },
    Spacer,
    Paragraph(Vec<Inline>),
}

/// Splits `text` into plain and `**strong**` spans.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;

    for captures in STRONG.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        spans.push(Inline::Strong(inner.as_str().to_string()));
        last = whole.end();
    }

    if last < text.len() {
        spans.push(Inline::Text(text[last..].to_string()));
    }
    spans
}

/// Classifies one line. First match wins.
pub fn parse_line(line: &str) -> Block {
    for (marker, level) in [("### ", 3), ("## ", 2), ("# ", 1)] {
        if let Some(text) = line.strip_prefix(marker) {
            return Block::Heading {
                level,
                text: text.to_string(),
            };
        }
    }

    let trimmed = line.trim();
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
        let body = BULLET_MARKER.replace(line, "");
        return Block::Bullet(parse_inline(&body));
    }

    if let Some(captures) = NUMBERED.captures(trimmed) {
        if let (Some(whole), Some(label)) = (captures.get(0), captures.get(1)) {
            return Block::Numbered {
                label: label.as_str().to_string(),
                body: parse_inline(&trimmed[whole.end()..]),
            };
        }
    }

    if trimmed.is_empty() {
        return Block::Spacer;
    }

    Block::Paragraph(parse_inline(line))
}

pub fn parse(body: &str) -> Vec<Block> {
    body.split('\n')
        .map(|line| parse_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}

/// Escapes the three characters that could open markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn inline_html(spans: &[Inline]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => escape_html(text),
            Inline::Strong(text) => format!("<strong>{}</strong>", escape_html(text)),
        })
        .collect()
}

/// Renders blocks as an HTML fragment, one element per line.
pub fn to_html(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Heading { level, text } => {
                format!("<h{level}>{}</h{level}>", escape_html(text))
            }
            Block::Bullet(spans) => format!("<li>{}</li>", inline_html(spans)),
            Block::Numbered { label, body } => format!(
                "<li><span class=\"label\">{}</span> {}</li>",
                escape_html(label),
                inline_html(body)
            ),
            Block::Spacer => "<div class=\"spacer\"></div>".to_string(),
            Block::Paragraph(spans) => format!("<p>{}</p>", inline_html(spans)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
