use colored::*;
use digest_core::markdown::{self, escape_html, Block, Inline};
use digest_core::model::{HistoryItem, Message, Source, Theme};
use digest_core::dedupe;

const FALLBACK_SOURCE_TITLE: &str = "Reference";

/// Terminal colors for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub heading: Color,
    pub accent: Color,
    pub strong: Color,
    pub muted: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                heading: Color::BrightCyan,
                accent: Color::Yellow,
                strong: Color::BrightWhite,
                muted: Color::BrightBlack,
            },
            Theme::Light => Self {
                heading: Color::Blue,
                accent: Color::Magenta,
                strong: Color::Black,
                muted: Color::BrightBlack,
            },
        }
    }
}

fn render_inline(spans: &[Inline], palette: &Palette) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => text.clone(),
            Inline::Strong(text) => text.color(palette.strong).bold().to_string(),
        })
        .collect()
}

/// Render summary blocks for the terminal, one output line per block
pub fn render_blocks(blocks: &[Block], palette: &Palette) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Heading { level: 1, text } => {
                text.color(palette.heading).bold().underline().to_string()
            }
            Block::Heading { level: 2, text } => text.color(palette.heading).bold().to_string(),
            Block::Heading { text, .. } => text.bold().to_string(),
            Block::Bullet(spans) => {
                format!("  {} {}", "•".color(palette.accent), render_inline(spans, palette))
            }
            Block::Numbered { label, body } => format!(
                "  {} {}",
                label.color(palette.accent).bold(),
                render_inline(body, palette)
            ),
            Block::Spacer => String::new(),
            Block::Paragraph(spans) => render_inline(spans, palette),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn source_title(source: &Source) -> &str {
    if source.title.is_empty() {
        FALLBACK_SOURCE_TITLE
    } else {
        &source.title
    }
}

/// Render the deduplicated citation list, empty when there is nothing to cite
pub fn render_sources(sources: &[Source], palette: &Palette) -> String {
    let unique = dedupe(sources);
    if unique.is_empty() {
        return String::new();
    }

    let mut output = format!("{}\n", "Sources & Citations".color(palette.muted).bold());
    for source in &unique {
        output.push_str(&format!(
            "  {} {} {}\n",
            "↗".color(palette.accent),
            source_title(source),
            source.uri.color(palette.muted)
        ));
    }
    output
}

/// Render a model turn: title header, body, then citations.
/// Failure turns carry no title and are printed bare.
pub fn render_reply(message: &Message, theme: Theme) -> String {
    let palette = Palette::for_theme(theme);

    let mut output = match message.title.as_deref() {
        Some(title) => format!("{}\n\n", title.color(palette.heading).bold()),
        None => String::new(),
    };
    output.push_str(&render_blocks(&markdown::parse(&message.content), &palette));
    output.push('\n');

    let sources = render_sources(message.sources.as_deref().unwrap_or_default(), &palette);
    if !sources.is_empty() {
        output.push('\n');
        output.push_str(&sources);
    }
    output
}

/// Render a model turn as an HTML fragment
pub fn render_html_reply(message: &Message) -> String {
    let mut output = match message.title.as_deref() {
        Some(title) => format!("<h3 class=\"title\">{}</h3>\n", escape_html(title)),
        None => String::new(),
    };
    output.push_str(&markdown::to_html(&markdown::parse(&message.content)));
    output.push('\n');

    let unique = dedupe(message.sources.as_deref().unwrap_or_default());
    if !unique.is_empty() {
        output.push_str("<ul class=\"sources\">\n");
        for source in &unique {
            output.push_str(&format!(
                "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>\n",
                escape_html(&source.uri).replace('"', "&quot;"),
                escape_html(source_title(source))
            ));
        }
        output.push_str("</ul>\n");
    }
    output
}

pub fn print_reply(message: &Message, theme: Theme, html: bool) {
    if html {
        print!("{}", render_html_reply(message));
    } else {
        println!("{}", render_reply(message, theme));
    }
}

/// Render the history list newest first. Entry 1 is the latest, matching `/open`.
pub fn render_history(items: &[HistoryItem], theme: Theme) -> String {
    let palette = Palette::for_theme(theme);
    if items.is_empty() {
        return format!("{}\n", "No history yet.".color(palette.muted));
    }

    let mut output = format!("{}\n", "History:".color(palette.heading).bold());
    for (i, item) in items.iter().rev().enumerate() {
        output.push_str(&format!(
            "  {}. {} {}\n",
            i + 1,
            item.summary_data.title.bold(),
            item.created_at()
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .color(palette.muted)
        ));
        output.push_str(&format!("     {}\n", item.query.color(palette.muted)));
    }
    output
}

pub fn print_history(items: &[HistoryItem], theme: Theme) {
    print!("{}", render_history(items, theme));
}

/// Show usage instructions when no query or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "thread-digest \"https://...\"".green().bold());
    println!("    Summarize the discussion at a link");
    println!();
    println!("  {}", "thread-digest \"your question\"".green().bold());
    println!("    Get a structured answer with sources");
    println!();
    println!("  {}", "thread-digest -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --login <NAME>   Sign in to keep a history");
    println!("  --history        List your history");
    println!("  --toggle-theme   Switch between dark and light output");
    println!("  --help           Show all options");
    println!();
}

pub fn print_interactive_help() {
    println!("{}", "Commands:".cyan());
    println!("  /new          Start a new session");
    println!("  /history      List your history");
    println!("  /open <n>     Reopen history entry n");
    println!("  /clear        Delete your history");
    println!("  /login        Sign in");
    println!("  /logout       Sign out");
    println!("  /theme        Toggle dark/light output");
    println!("  exit | quit   Leave");
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest_core::model::{Message, SummaryData};

    fn entry(id: &str, title: &str, timestamp: i64) -> HistoryItem {
        HistoryItem {
            id: id.into(),
            query: format!("query {}", id),
            summary_data: SummaryData {
                title: title.into(),
                summary: String::new(),
                sources: vec![],
            },
            timestamp,
        }
    }

    fn reply(sources: Vec<Source>) -> Message {
        Message::model(
            "1".into(),
            &SummaryData {
                title: "About <X>".into(),
                summary: "## Hi\n- one\n- **two**\n\npara".into(),
                sources,
            },
            0,
        )
    }

    fn source(title: &str, uri: &str) -> Source {
        Source {
            title: title.into(),
            uri: uri.into(),
        }
    }

    #[test]
    fn test_terminal_reply_without_colors() {
        colored::control::set_override(false);
        let rendered = render_reply(
            &reply(vec![source("A", "https://a"), source("A2", "https://a")]),
            Theme::Dark,
        );
        assert_eq!(
            rendered,
            "About <X>\n\nHi\n  • one\n  • two\n\npara\n\nSources & Citations\n  ↗ A https://a\n"
        );
    }

    #[test]
    fn test_html_reply_escapes_and_dedupes() {
        let html = render_html_reply(&reply(vec![
            source("", "https://a?x=\"1\"&y"),
            source("dup", "https://a?x=\"1\"&y"),
        ]));
        assert!(html.starts_with("<h3 class=\"title\">About &lt;X&gt;</h3>\n<h2>Hi</h2>"));
        assert!(html.contains("<li><strong>two</strong></li>"));
        assert!(html.contains("href=\"https://a?x=&quot;1&quot;&amp;y\""));
        assert!(html.contains(">Reference</a>"));
        assert_eq!(html.matches("<a href").count(), 1);
    }

    #[test]
    fn test_failure_turn_has_no_title_header() {
        colored::control::set_override(false);
        let failure = Message::failure("1".into(), "Request timed out after 5 seconds", 0);
        assert_eq!(
            render_reply(&failure, Theme::Dark),
            "Error: Request timed out after 5 seconds\n"
        );
        assert_eq!(
            render_html_reply(&failure),
            "<p>Error: Request timed out after 5 seconds</p>\n"
        );
    }

    #[test]
    fn test_history_lists_newest_first() {
        colored::control::set_override(false);
        let items = vec![entry("1", "Oldest", 0), entry("2", "Newest", 60_000)];
        assert_eq!(
            render_history(&items, Theme::Dark),
            "History:\n  1. Newest 1970-01-01 00:01\n     query 2\n  2. Oldest 1970-01-01 00:00\n     query 1\n"
        );
        assert_eq!(render_history(&[], Theme::Light), "No history yet.\n");
    }

    #[test]
    fn test_no_sources_renders_nothing() {
        assert_eq!(render_sources(&[], &Palette::for_theme(Theme::Light)), "");
        let html = render_html_reply(&reply(vec![]));
        assert!(!html.contains("sources"));
    }
}
