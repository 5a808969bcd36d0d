// src/notify/format.rs
//! Message composition for the chat destination: markdown to chat markup,
//! chunking under the per-section limit, and block layout.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::summary::ArticleSummary;

/// Slack rejects section text above 3000 characters.
pub const MAX_SECTION_LEN: usize = 3000;
/// Slack header blocks are limited to 150 characters.
pub const MAX_HEADER_LEN: usize = 150;
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    RichText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBlock {
    Header(String),
    Section { text: String, kind: TextKind },
    Divider,
}

impl MessageBlock {
    pub fn rich(text: impl Into<String>) -> Self {
        MessageBlock::Section {
            text: text.into(),
            kind: TextKind::RichText,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Cut to `max_len` characters, marker included.
pub fn truncate_with_marker(line: &str, max_len: usize) -> String {
    if char_len(line) <= max_len {
        return line.to_string();
    }
    let marker_len = char_len(TRUNCATION_MARKER);
    if max_len <= marker_len {
        return line.chars().take(max_len).collect();
    }
    let mut out: String = line.chars().take(max_len - marker_len).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Split `text` into pieces of at most `max_len` characters, preferring line
/// boundaries. A single line longer than `max_len` is truncated with a marker.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }
    if max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    // lines of the chunk being built; a blank line counts as a line
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = char_len(line);
        if line_len > max_len {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
                current.clear();
                current_len = 0;
            }
            chunks.push(truncate_with_marker(line, max_len));
            continue;
        }

        let needed = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };
        if needed > max_len {
            chunks.push(current.join("\n"));
            current.clear();
            current.push(line);
            current_len = line_len;
        } else {
            current.push(line);
            current_len = needed;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

struct MarkupRules {
    fenced: Regex,
    inline: Regex,
    heading: Regex,
    subheading: Regex,
    bold: Regex,
    underscore_bold: Regex,
    link: Regex,
    list_marker: Regex,
    blank_run: Regex,
    placeholder: Regex,
}

fn rules() -> &'static MarkupRules {
    static RULES: OnceCell<MarkupRules> = OnceCell::new();
    RULES.get_or_init(|| MarkupRules {
        fenced: Regex::new(r"(?s)```.*?```").expect("fenced regex"),
        inline: Regex::new(r"`[^`\n]+`").expect("inline code regex"),
        heading: Regex::new(r"(?m)^#{1,2}[ \t]+(.+?)[ \t]*$").expect("heading regex"),
        subheading: Regex::new(r"(?m)^#{3,6}[ \t]+(.+?)[ \t]*$").expect("subheading regex"),
        bold: Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"),
        underscore_bold: Regex::new(r"__(.+?)__").expect("underscore bold regex"),
        link: Regex::new(r"\[(.+?)\]\((.+?)\)").expect("link regex"),
        list_marker: Regex::new(r"(?m)^([ \t]*)[-*•][ \t]+").expect("list marker regex"),
        blank_run: Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank run regex"),
        placeholder: Regex::new("\u{E000}(\\d+)\u{E001}").expect("placeholder regex"),
    })
}

/// Markdown to Slack mrkdwn. Code spans are set aside first so no other rule
/// touches them, then restored verbatim.
pub fn to_chat_markup(text: &str) -> String {
    let r = rules();
    let mut stash: Vec<String> = Vec::new();

    let mut protect = |re: &Regex, input: &str| -> String {
        re.replace_all(input, |caps: &regex::Captures| {
            stash.push(caps[0].to_string());
            format!("\u{E000}{}\u{E001}", stash.len() - 1)
        })
        .into_owned()
    };
    let out = protect(&r.fenced, text);
    let out = protect(&r.inline, &out);

    let out = r.heading.replace_all(&out, "*${1}*");
    let out = r.subheading.replace_all(&out, "_${1}_");
    let out = r.bold.replace_all(&out, "*${1}*");
    let out = r.underscore_bold.replace_all(&out, "_${1}_");
    let out = r.link.replace_all(&out, "<${2}|${1}>");
    let out = r.list_marker.replace_all(&out, "${1}• ");
    let out = r.blank_run.replace_all(&out, "\n\n");

    let restored = r.placeholder.replace_all(&out, |caps: &regex::Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| stash.get(i).cloned())
            .unwrap_or_default()
    });
    restored.trim().to_string()
}

fn link_section(url: &str) -> MessageBlock {
    MessageBlock::rich(format!("<{url}|🔗 Read the original>"))
}

fn push_chunked(blocks: &mut Vec<MessageBlock>, text: &str) {
    for chunk in split_into_chunks(text, MAX_SECTION_LEN) {
        if !chunk.trim().is_empty() {
            blocks.push(MessageBlock::rich(chunk));
        }
    }
}

pub fn format_summary(summary: &ArticleSummary) -> Vec<MessageBlock> {
    let mut blocks = vec![MessageBlock::Header(truncate_with_marker(
        &format!("📰 {}", summary.title),
        MAX_HEADER_LEN,
    ))];
    push_chunked(&mut blocks, &to_chat_markup(&summary.to_markdown()));
    blocks.push(link_section(&summary.url));
    blocks.push(MessageBlock::Divider);
    blocks
}

pub fn format_failure(url: &str, reason: &str) -> Vec<MessageBlock> {
    let mut blocks = vec![MessageBlock::Header("⚠️ Article summary failed".to_string())];
    let body = format!("❌ The article could not be summarized.\n{}", to_chat_markup(reason));
    push_chunked(&mut blocks, &body);
    blocks.push(link_section(url));
    blocks.push(MessageBlock::Divider);
    blocks
}

pub fn format_cycle_completed(item_count: usize, message: &str) -> Vec<MessageBlock> {
    let icon = if item_count == 0 { "💤" } else { "✅" };
    let mut blocks = Vec::new();
    push_chunked(&mut blocks, &format!("{icon} {message}"));
    blocks.push(MessageBlock::Divider);
    blocks
}

pub fn format_cycle_failed(reason: &str) -> Vec<MessageBlock> {
    let mut blocks = Vec::new();
    push_chunked(&mut blocks, &format!("❌ Article check failed.\n{reason}"));
    blocks.push(MessageBlock::Divider);
    blocks
}
