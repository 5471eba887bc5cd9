use regex::Regex;
use std::sync::LazyLock;

/// Exact-match interface chrome labels, compared case-insensitively against
/// trimmed lines. The feed renders these as standalone lines around post
/// bodies; the set covers the UI languages observed in scraped groups.
const CHROME_LABELS: &[&str] = &[
    // Reactions / actions
    "like",
    "comment",
    "share",
    "reply",
    "follow",
    "send",
    "save",
    "hide",
    "report",
    // Truncation affordances
    "see more",
    "see less",
    "see original",
    "ver más",
    "ver menos",
    "ver mais",
    "voir plus",
    "voir moins",
    "mehr anzeigen",
    "weniger anzeigen",
    "se mer",
    "show more",
    "read more",
    // Comment UI
    "write a comment…",
    "write a comment...",
    "write a public comment…",
    "most relevant",
    "newest",
    "all comments",
    "view more comments",
    "view previous comments",
    "see translation",
    "translate",
    "hide translation",
    // Badges and moderation chrome
    "admin",
    "moderator",
    "author",
    "top contributor",
    "rising contributor",
    "group expert",
    "edited",
    "follower",
    "shared with public group",
    "public group",
    "all reactions:",
];

/// Relative timestamps: "5d ago", "3 hrs", "just now", "12 minutes ago".
/// (Bare tokens like "5d" already fall to the minimum-length rule.)
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(just now|yesterday|\d+\s?(s|m|h|d|w|secs?|mins?|hrs?)(\s+ago)?|\d+\s?(second|minute|hour|day|week|month|year)s?(\s+ago)?)$",
    )
    .unwrap()
});

/// Engagement counters: "5 comments", "1.2K likes", "3 shares", "14 views".
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\d[\d.,]*\s?[km]?\s?(likes?|comments?|shares?|reactions?|views?|members?|followers?)$",
    )
    .unwrap()
});

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip interface chrome from scraped post text, line by line.
///
/// A line is dropped when, after trimming, it is empty, shorter than 3
/// characters, or matches the chrome tables above. Surviving lines are
/// rejoined with single newlines, blank runs collapse to one blank line,
/// and the result is trimmed. Idempotent: cleaning cleaned text is a no-op.
pub fn clean_text(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| keep_line(line))
        .collect();

    let joined = kept.join("\n");
    let collapsed = BLANK_RUN_RE.replace_all(&joined, "\n\n");
    collapsed.trim().to_string()
}

fn keep_line(line: &str) -> bool {
    if line.len() < 3 {
        return false;
    }
    let lower = line.to_lowercase();
    if CHROME_LABELS.contains(&lower.as_str()) {
        return false;
    }
    !(RELATIVE_TIME_RE.is_match(line) || COUNT_RE.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_feed_chrome_around_content() {
        let raw = "John Doe\n5d\nReal content here.\nLike\nComment\n5 comments";
        let cleaned = clean_text(raw);
        assert!(cleaned.contains("Real content here."));
        assert!(!cleaned.contains("Like"));
        assert!(!cleaned.to_lowercase().contains("comment"));
        assert!(!cleaned.contains("5d"));
    }

    #[test]
    fn is_idempotent() {
        let raw = "See more\nMy grandfather ran the mill on Front Street.\n\n\n\n1.2K likes\n3 shares\nOld photo from 1952, found in the attic.";
        let once = clean_text(raw);
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn drops_short_and_empty_lines() {
        let cleaned = clean_text("ok\n\n  \nA full sentence about the old depot.\nno");
        assert_eq!(cleaned, "A full sentence about the old depot.");
    }

    #[test]
    fn drops_relative_timestamps_and_counts() {
        for line in [
            "3 hrs",
            "12 mins ago",
            "just now",
            "Yesterday",
            "14 comments",
            "1.2K likes",
            "302 members",
        ] {
            assert_eq!(clean_text(line), "", "expected {line:?} to be stripped");
        }
    }

    #[test]
    fn drops_multilingual_see_more_variants() {
        let raw = "Ver más\nLa foto de la estación vieja.\nVoir plus\nMehr anzeigen";
        assert_eq!(clean_text(raw), "La foto de la estación vieja.");
    }

    #[test]
    fn keeps_ordinary_sentences_intact() {
        let body = "Does anyone remember the soda fountain at Miller's Drug?\nMy mother worked there in 1961.";
        assert_eq!(clean_text(body), body);
    }
}
