// src/summary/parse.rs
//! Turns the free-text enrichment response into an `ArticleSummary`.
//! Pure: no I/O, so every rule here is unit-tested directly.

use once_cell::sync::OnceCell;
use regex::Regex;

use super::prompt::OFF_TOPIC_SENTINEL;
use super::ArticleSummary;
use crate::error::{ErrorKind, PipelineError};

pub const MAX_BULLETS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Summary,
    Bullets,
}

fn header_line() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("header regex"))
}

/// `Some(None)` for a header we do not use, `None` for a body line.
/// `#SwiftUI` or `#1 tip` are body text: a header needs whitespace after the hashes.
fn classify_header(line: &str) -> Option<Option<Section>> {
    let caps = header_line().captures(line.trim())?;
    let name = caps[1]
        .trim()
        .trim_matches(|c| c == '*' || c == ':')
        .trim()
        .to_lowercase();
    let section = match name.as_str() {
        "title" => Some(Section::Title),
        "summary" => Some(Section::Summary),
        "key points" | "bullets" | "highlights" => Some(Section::Bullets),
        _ => None,
    };
    Some(section)
}

fn numbered_marker() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}[.)]\s+").expect("numbered marker regex"))
}

/// Strip any leading bullet glyphs or list numbering. A `*` only counts as a
/// marker when followed by whitespace, so `**bold** lead` survives.
pub fn strip_bullet_marker(line: &str) -> String {
    let mut t = line.trim();
    while let Some(c) = t.chars().next() {
        let rest = &t[c.len_utf8()..];
        let is_marker = match c {
            '-' | '•' | '·' | '+' | '‣' | '◦' => true,
            '*' => rest.is_empty() || rest.starts_with(char::is_whitespace),
            _ => false,
        };
        if !is_marker {
            break;
        }
        t = rest.trim_start();
    }
    numbered_marker().replace(t, "").trim().to_string()
}

/// Split on `.`, `!`, `?` followed by whitespace or end of text.
pub fn split_sentences(text: &str) -> Vec<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = flat.chars().peekable();

    while let Some(c) = chars.next() {
        cur.push(c);
        let at_boundary = chars.peek().map_or(true, |n| n.is_whitespace());
        if matches!(c, '.' | '!' | '?' | '。') && at_boundary {
            let s = cur.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
            cur.clear();
        }
    }
    let rest = cur.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

pub fn parse_response(url: &str, response: &str) -> Result<ArticleSummary, PipelineError> {
    let body = response.trim();
    if body.is_empty() {
        return Err(PipelineError::for_url(
            ErrorKind::UnexpectedUrl,
            url,
            "empty response, the page was not readable",
        ));
    }
    if body.trim_matches('`').trim() == OFF_TOPIC_SENTINEL {
        return Err(PipelineError::for_url(
            ErrorKind::OffTopic,
            url,
            "content is outside the accepted topics",
        ));
    }

    let mut title: Vec<&str> = Vec::new();
    let mut summary: Vec<&str> = Vec::new();
    let mut bullets: Vec<&str> = Vec::new();
    let mut seen = (false, false);
    let mut current: Option<Section> = None;

    for line in body.lines() {
        if let Some(header) = classify_header(line) {
            // unknown sub-headers stay inside the section being collected
            let Some(section) = header else { continue };
            current = Some(section);
            match section {
                Section::Title => seen.0 = true,
                Section::Summary => seen.1 = true,
                Section::Bullets => {}
            }
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match current {
            Some(Section::Title) => title.push(line),
            Some(Section::Summary) => summary.push(line),
            Some(Section::Bullets) => bullets.push(line),
            None => {}
        }
    }

    let title = title
        .first()
        .map(|t| t.trim_matches(|c| c == '*' || c == '[' || c == ']').trim().to_string())
        .unwrap_or_default();
    if title.is_empty() {
        return Err(PipelineError::for_url(
            ErrorKind::SummaryFailed,
            url,
            if seen.0 { "title section is empty" } else { "response has no title section" },
        ));
    }

    let mut summary_line = summary.join("\n");
    if summary_line.is_empty() {
        return Err(PipelineError::for_url(
            ErrorKind::SummaryFailed,
            url,
            if seen.1 { "summary section is empty" } else { "response has no summary section" },
        ));
    }

    let mut bullets: Vec<String> = bullets
        .iter()
        .map(|b| strip_bullet_marker(b))
        .filter(|b| !b.is_empty())
        .take(MAX_BULLETS)
        .collect();

    if bullets.is_empty() {
        let sentences = split_sentences(&summary_line);
        if let Some(first) = sentences.first() {
            summary_line = first.clone();
        }
        bullets = sentences.into_iter().take(MAX_BULLETS).collect();
    }

    Ok(ArticleSummary {
        url: url.to_string(),
        title,
        summary_line,
        bullets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/article";

    #[test]
    fn parses_all_three_sections() {
        let resp = "
## Title
Swift Concurrency in Practice

## Summary
This article walks through Swift Concurrency.

## Key Points
- async/await basics
* Task and TaskGroup
• Actors for thread-safe state
";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.title, "Swift Concurrency in Practice");
        assert_eq!(s.summary_line, "This article walks through Swift Concurrency.");
        assert_eq!(
            s.bullets,
            vec!["async/await basics", "Task and TaskGroup", "Actors for thread-safe state"]
        );
        assert_eq!(s.url, URL);
    }

    #[test]
    fn missing_bullets_fall_back_to_sentences() {
        let resp = "## Title\nT\n\n## Summary\nFirst point here. Second point! Third?";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.summary_line, "First point here.");
        assert_eq!(s.bullets, vec!["First point here.", "Second point!", "Third?"]);
    }

    #[test]
    fn bullets_are_capped_at_five() {
        let resp = "## Title\nT\n## Summary\nS\n## Key Points\n- 1\n- 2\n- 3\n- 4\n- 5\n- 6\n- 7";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.bullets.len(), MAX_BULLETS);
    }

    #[test]
    fn missing_title_and_summary_is_summary_failed() {
        let err = parse_response(URL, "## Key Points\n- only bullets").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SummaryFailed);
        assert_eq!(err.url.as_deref(), Some(URL));
    }

    #[test]
    fn missing_summary_is_summary_failed() {
        let err = parse_response(URL, "## Title\nSomething").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SummaryFailed);
        assert!(err.message.contains("summary"));
    }

    #[test]
    fn sentinel_is_off_topic() {
        let err = parse_response(URL, "  NOT_RELEVANT \n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::OffTopic);
        let err = parse_response(URL, "`NOT_RELEVANT`").unwrap_err();
        assert_eq!(err.kind, ErrorKind::OffTopic);
    }

    #[test]
    fn empty_response_is_unexpected_url() {
        let err = parse_response(URL, " \n\t ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedUrl);
    }

    #[test]
    fn marker_stripping_handles_numbers_and_glyphs() {
        assert_eq!(strip_bullet_marker("  - item"), "item");
        assert_eq!(strip_bullet_marker("• item"), "item");
        assert_eq!(strip_bullet_marker("2) item"), "item");
        assert_eq!(strip_bullet_marker("10. item"), "item");
        assert_eq!(strip_bullet_marker("-"), "");
        assert_eq!(strip_bullet_marker("* **Actors** isolate state"), "**Actors** isolate state");
    }

    #[test]
    fn headers_tolerate_bold_and_colons() {
        let resp = "### **Title:**\nT\n## summary\nS.";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.title, "T");
        assert_eq!(s.bullets, vec!["S."]);
    }

    #[test]
    fn hashtags_in_body_are_not_headers() {
        let resp = "## Title\nT\n## Summary\n#SwiftUI gets faster lists. Also more.\n## Key Points\n- #1 tip: use lazy stacks";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.summary_line, "#SwiftUI gets faster lists. Also more.");
        assert_eq!(s.bullets, vec!["#1 tip: use lazy stacks"]);
    }

    #[test]
    fn unknown_sub_header_keeps_current_section() {
        let resp = "## Title\nT\n## Summary\n### Overview\nAbout actors.\n## Key Points\n- a";
        let s = parse_response(URL, resp).unwrap();
        assert_eq!(s.summary_line, "About actors.");
        assert_eq!(s.bullets, vec!["a"]);
    }
}
