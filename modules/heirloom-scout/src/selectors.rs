//! Selector candidate chains for the group feed.
//!
//! Ordered newest-markup-first; legacy and mobile shapes sit behind them as
//! fallbacks. When extraction starts logging exhausted chains, capture a page
//! sample, add the new shape at the front, and keep the old entries.

/// The feed container.
pub const FEED_ROOT: &[&str] = &[
    "div[role='feed']",
    "div[data-pagelet='GroupFeed']",
    "#m_group_stories_container",
];

/// One post within the feed.
pub const POST: &[&str] = &[
    "div[role='article']",
    "div[data-ft]",
    "div.userContentWrapper",
];

/// The post body within a post container.
pub const POST_BODY: &[&str] = &[
    "div[data-ad-preview='message']",
    "div[data-ad-comet-preview='message']",
    "div.userContent",
    "div[dir='auto']",
];

/// The author link within a post container.
pub const AUTHOR_LINK: &[&str] = &[
    "h2 a[href]",
    "h3 a[href]",
    "strong a[href]",
    "a[data-hovercard]",
];

/// Permalink (timestamp) anchor within a post container.
pub const PERMALINK: &[&str] = &[
    "a[href*='/posts/']",
    "a[href*='/permalink/']",
    "a[href*='story_fbid']",
    "abbr a[href]",
];

/// Truncation affordances ("see more" in its current and legacy shapes).
pub const SEE_MORE: &[&str] = &[
    "div[role='button'][tabindex='0']:not([aria-hidden])",
    "div.see_more_link_inner",
    "span.see_more_link",
];
