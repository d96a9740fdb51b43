//! Turns raw model output into a [`SummaryData`].

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::model::{Source, SummaryData};
use crate::prompt::QueryMode;
use crate::types::GroundingChunk;

/// Title shown for a link summary when the model gives none
pub const LINK_SUMMARY_TITLE: &str = "Link Summary";
/// Title given to a grounding chunk that carries no title of its own
pub const WEB_SOURCE_TITLE: &str = "Web Source";

const FALLBACK_TITLE_MAX_CHARS: usize = 100;

lazy_static! {
    static ref TITLE_LINE: Regex = Regex::new(r"(?i)^TITLE:\s*(.*)$").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpretOptions {
    /// Drop the first line from the body when it was borrowed as the title.
    ///
    /// Off by default: the body keeps that line, so it appears twice.
    pub strip_fallback_title: bool,
}

/// Splits `text` into its first line and the remainder after the newline.
fn split_first_line(text: &str) -> (&str, Option<&str>) {
    match text.split_once('\n') {
        Some((first, rest)) => (first.strip_suffix('\r').unwrap_or(first), Some(rest)),
        None => (text, None),
    }
}

/// Drops whole blank lines from the start of `text`.
fn skip_blank_lines(mut text: &str) -> &str {
    loop {
        let (line, rest) = split_first_line(text);
        match rest {
            Some(rest) if line.trim().is_empty() => text = rest,
            None if line.trim().is_empty() => return "",
            _ => return text,
        }
    }
}

/// Extracts the title and the body to display under it.
pub fn extract_title(
    raw: &str,
    query: &str,
    mode: QueryMode,
    options: InterpretOptions,
) -> (String, String) {
    let (first_line, rest) = split_first_line(raw);

    if let Some(captures) = TITLE_LINE.captures(first_line) {
        let title = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        let body = skip_blank_lines(rest.unwrap_or_default()).trim().to_string();
        if !title.is_empty() {
            return (title.to_string(), body);
        }
        debug!("TITLE line present but empty, using placeholder");
        return (placeholder_title(query, mode), body);
    }

    let candidate = first_line.trim();
    if !candidate.is_empty()
        && candidate.chars().count() < FALLBACK_TITLE_MAX_CHARS
        && !candidate.starts_with('#')
    {
        debug!("No TITLE line, borrowing first line as title");
        let body = if options.strip_fallback_title {
            skip_blank_lines(rest.unwrap_or_default()).to_string()
        } else {
            raw.to_string()
        };
        return (candidate.to_string(), body);
    }

    (placeholder_title(query, mode), raw.to_string())
}

fn placeholder_title(query: &str, mode: QueryMode) -> String {
    match mode {
        QueryMode::Url => LINK_SUMMARY_TITLE.to_string(),
        QueryMode::Topic => query.to_string(),
    }
}

/// Collects web citations in the order received.
///
/// Chunks without a web entry or without a URI are skipped.
pub fn extract_sources(chunks: &[GroundingChunk]) -> Vec<Source> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().filter(|uri| !uri.is_empty())?;
            let title = web
                .title
                .as_deref()
                .filter(|title| !title.is_empty())
                .unwrap_or(WEB_SOURCE_TITLE);
            Some(Source {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

/// Builds the structured result for one model response.
pub fn interpret(
    raw: &str,
    chunks: &[GroundingChunk],
    query: &str,
    mode: QueryMode,
    options: InterpretOptions,
) -> SummaryData {
    let (title, summary) = extract_title(raw, query, mode, options);
    let sources = extract_sources(chunks);
    debug!(
        title = %title,
        sources = sources.len(),
        skipped = chunks.len() - sources.len(),
        "Interpreted model response"
    );
    SummaryData {
        title,
        summary,
        sources,
    }
}

/// Keeps the first source for each exact URI, preserving order.
///
/// URIs are compared as written: scheme, trailing slash and query all count.
pub fn dedupe(sources: &[Source]) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|source| seen.insert(source.uri.as_str()))
        .cloned()
        .collect()
}
