// src/summary/prompt.rs
//! The fixed instruction sent with every enrichment call.

pub const TITLE_HEADER: &str = "## Title";
pub const SUMMARY_HEADER: &str = "## Summary";
pub const BULLETS_HEADER: &str = "## Key Points";

/// Whole-response value meaning "outside the accepted topic domain".
pub const OFF_TOPIC_SENTINEL: &str = "NOT_RELEVANT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    /// Accepted topic domain, e.g. "Swift/iOS development".
    pub topic: String,
    /// Output language for summary and bullets.
    pub language: String,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            topic: "Swift/iOS development".to_string(),
            language: "English".to_string(),
        }
    }
}

pub fn build_prompt(url: &str, opts: &PromptOptions) -> String {
    format!(
        "You are an expert reviewer of {topic} articles.
Read the web page at the URL below and summarize it for busy developers.

**Rules:**
1. If the page cannot be opened or read, respond with nothing at all (an empty response).
2. If the page is not about {topic}, respond with exactly `{sentinel}` and nothing else.
3. Keep framework, API and technology names in their original English form.
4. Write the summary and key points in {language}.
5. Extract only the technically important points so a reader can decide whether the article is worth reading.

**URL:**
{url}

**Output format (follow it exactly):**
{title_h}
[the article's original title]

{summary_h}
[what the article is about, in one or two lines]

{bullets_h}
- [key point 1]
- [key point 2]
- [key point 3, up to 5 points]
",
        topic = opts.topic,
        language = opts.language,
        sentinel = OFF_TOPIC_SENTINEL,
        url = url,
        title_h = TITLE_HEADER,
        summary_h = SUMMARY_HEADER,
        bullets_h = BULLETS_HEADER,
    )
}
