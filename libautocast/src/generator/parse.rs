//! Turning raw provider text into post content, hashtags and a video script

use regex::Regex;
use std::sync::OnceLock;

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"))
}

fn hashtag_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#\w+(\s+#\w+)*$").expect("hashtag line pattern is valid"))
}

fn script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\[HOOK\](.*?)\[MIDDLE\](.*?)\[CTA\](.*?)(?:\[VISUALS\]|$)")
            .expect("script pattern is valid")
    })
}

/// Hashtag words found anywhere in `text`, without `#`, first occurrence wins
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for capture in hashtag_regex().captures_iter(text) {
        let tag = &capture[1];
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Drop lines that consist only of hashtags; mixed lines stay
pub fn strip_hashtag_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !hashtag_line_regex().is_match(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Three-part short-video script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoScript {
    pub hook: String,
    pub middle: String,
    pub cta: String,
}

impl VideoScript {
    /// Labeled rendering stored on the post
    pub fn render(&self) -> String {
        format!(
            "Hook: {}\n\nMiddle: {}\n\nCTA: {}",
            self.hook, self.middle, self.cta
        )
    }

    fn spoken(&self) -> String {
        [&self.hook, &self.middle, &self.cta]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn clean_segment(segment: &str) -> String {
    segment
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == ':')
        .trim()
        .to_string()
}

/// Locate `[HOOK] ... [MIDDLE] ... [CTA] ...` in order
///
/// Returns the script and the text with every marked section removed. When
/// nothing precedes the hook, the spoken parts become the content.
pub fn extract_script(text: &str) -> Option<(VideoScript, String)> {
    let captures = script_regex().captures(text)?;
    let whole = captures.get(0)?;

    let script = VideoScript {
        hook: clean_segment(&captures[1]),
        middle: clean_segment(&captures[2]),
        cta: clean_segment(&captures[3]),
    };

    let before = text[..whole.start()].trim();
    let content = if before.is_empty() {
        script.spoken()
    } else {
        before.to_string()
    };

    Some((script, content))
}
