// src/change_detector.rs
//! Finds new article links by diffing the tracked repository against its cursor.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

use crate::cursor::{CursorDocument, SourceIdentity};
use crate::error::PipelineError;
use crate::ingest::SourceClient;

/// Revisions fetched on a first run; the diff spans oldest..head.
pub const FIRST_RUN_WINDOW: usize = 2;

/// Hosts whose links are videos, not articles.
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredItem {
    pub title: String,
    pub url: String,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub items: Vec<DiscoveredItem>,
    pub new_revision: String,
}

impl Detection {
    fn empty(new_revision: String) -> Self {
        Self {
            items: Vec::new(),
            new_revision,
        }
    }
}

pub struct ChangeDetector<'a> {
    client: &'a dyn SourceClient,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(client: &'a dyn SourceClient) -> Self {
        Self { client }
    }

    /// Does not touch the cursor store; the caller records `new_revision`.
    pub async fn detect(
        &self,
        source: &SourceIdentity,
        doc: &CursorDocument,
    ) -> Result<Detection, PipelineError> {
        let head = self
            .client
            .head_revision(source)
            .await
            .map_err(|e| PipelineError::source_unreachable(&e))?;

        let base = match doc.get(source) {
            None => {
                let recent = self
                    .client
                    .recent_revisions(source, FIRST_RUN_WINDOW)
                    .await
                    .map_err(|e| PipelineError::source_unreachable(&e))?;
                if recent.len() < FIRST_RUN_WINDOW {
                    tracing::info!(%source, revisions = recent.len(), "first run, nothing to diff against");
                    return Ok(Detection::empty(head));
                }
                match recent.last() {
                    Some(oldest) => oldest.clone(),
                    None => return Ok(Detection::empty(head)),
                }
            }
            Some(state) if state.last_processed_revision == head => {
                tracing::info!(%source, %head, "no new revisions");
                return Ok(Detection::empty(head));
            }
            Some(state) => state.last_processed_revision.clone(),
        };

        let diff = self
            .client
            .diff(source, &base, &head)
            .await
            .map_err(|e| PipelineError::source_unreachable(&e))?;

        let items = parse_items(&diff, Utc::now());
        tracing::info!(%source, %base, %head, items = items.len(), "parsed diff");
        Ok(Detection {
            items,
            new_revision: head,
        })
    }
}

fn link_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[(.+?)\]\((.+?)\)").expect("link regex"))
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// True when the link points at a video-hosting domain.
pub fn is_video_link(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            VIDEO_HOSTS.iter().any(|d| host_matches(&host, d))
        }
        Err(_) => {
            let lower = url.to_ascii_lowercase();
            VIDEO_HOSTS.iter().any(|d| lower.contains(d))
        }
    }
}

/// Extract `[title](url)` links from added diff lines, in line then match order.
pub fn parse_items(diff: &str, now: DateTime<Utc>) -> Vec<DiscoveredItem> {
    let re = link_regex();
    let mut items = Vec::new();

    for line in diff
        .lines()
        .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
    {
        for caps in re.captures_iter(line) {
            let (title, url) = (caps[1].trim(), caps[2].trim());
            if is_video_link(url) {
                tracing::trace!(url, "skipping video link");
                continue;
            }
            items.push(DiscoveredItem {
                title: title.to_string(),
                url: url.to_string(),
                discovered_at: now,
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECEMBER_DIFF: &str = "\
+# December 2, 2025
+[Swift News - YouTube Video](https://youtu.be/YCRvVfDGQuY)
+
+[Swift SDK for Android](https://www.swift.org/blog/nightly-swift-sdk-for-android/)
+[Shipaton 2025 Winners](https://www.revenuecat.com/blog/company/shipaton-2025-winners/)
+[RevenueCat App Growth Anual YouTube](https://www.youtube.com/playlist?list=PLsFOrkX_y0B6o8zs8PUOWQbUi_nTQn_uD)
+[SwiftUI Scroll Performance: The 120FPS Challenge](https://blog.jacobstechtavern.com/p/swiftui-scroll-performance-the-120fps)
+[Foundation Models Framework Q&A](https://antongubarenko.substack.com/p/ios-26-foundation-model-framework-f6d)
+[Foundation Models Framework Code Along](https://www.youtube.com/watch?v=S5F196tqRMI)
+[iPhone 17 Screen Sizes](https://useyourloaf.com/blog/iphone-17-screen-sizes/)
+[Text Concatenation vs Text Interpolation](https://nilcoalescing.com/blog/TextConcatenationVsTextInterpolationInSwiftUI/)";

    #[test]
    fn parses_links_and_drops_videos() {
        let now = Utc::now();
        let items = parse_items(DECEMBER_DIFF, now);
        assert_eq!(items.len(), 6);
        assert_eq!(items[0].title, "Swift SDK for Android");
        assert_eq!(
            items[0].url,
            "https://www.swift.org/blog/nightly-swift-sdk-for-android/"
        );
        assert_eq!(items[5].title, "Text Concatenation vs Text Interpolation");
        assert!(items.iter().all(|i| i.discovered_at == now));
        assert!(items.iter().all(|i| !is_video_link(&i.url)));
    }

    #[test]
    fn empty_diff_yields_nothing() {
        assert!(parse_items("", Utc::now()).is_empty());
    }

    #[test]
    fn only_added_lines_count() {
        let diff = "\
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1,2 +1,3 @@
 [Old](https://old.dev/a)
-[Removed](https://gone.dev/b)
+[New](https://new.dev/c)";
        let items = parse_items(diff, Utc::now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://new.dev/c");
    }

    #[test]
    fn multiple_links_on_one_line_keep_left_to_right_order() {
        let diff = "+[A](https://a.dev/1) and [V](https://m.youtube.com/x) then [B](https://b.dev/2)";
        let titles: Vec<_> = parse_items(diff, Utc::now())
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn video_detection_uses_host_not_path() {
        assert!(is_video_link("https://youtu.be/x"));
        assert!(is_video_link("https://www.youtube.com/watch?v=1"));
        assert!(!is_video_link("https://blog.dev/why-i-left-youtube.com-behind"));
        assert!(!is_video_link("https://notyoutube.com/a"));
    }
}
