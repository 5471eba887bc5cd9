use serde_json::Value;
use sha2::{Digest, Sha256};
use url::Url;

const FACEBOOK_BASE: &str = "https://www.facebook.com";

/// Query parameters that carry click/session tracking, never identity.
const TRACKING_PARAMS: &[&str] = &[
    "__cft__",
    "__tn__",
    "fbclid",
    "refid",
    "ref",
    "comment_tracking",
    "eav",
    "paipv",
    "mibextid",
    "rdid",
    "hc_ref",
    "fref",
    "notif_id",
    "notif_t",
    "sfnsn",
];

/// First path segments that denote group/page/photo-style resources rather
/// than a personal profile. A link into these never canonicalizes to an
/// author profile.
const NON_PROFILE_SEGMENTS: &[&str] = &[
    "groups",
    "pages",
    "photo",
    "photos",
    "events",
    "watch",
    "reel",
    "hashtag",
    "marketplace",
    "gaming",
    "media",
    "sharer",
    "share",
    "help",
    "login",
];

/// Content digest over `(text, author_link)`: SHA-256 of
/// `text + "|" + author`, lowercase hex, truncated to 32 characters.
/// Truncation is fine for dedup at group scale. Pure: identical inputs
/// always produce identical output.
pub fn fingerprint(text: &str, author_link: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(author_link.unwrap_or("").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

/// Derive a stable post id.
///
/// Priority: `top_level_post_id` from the structured id blob, then
/// `mf_story_key`, then the structured id verbatim when it isn't such a JSON
/// object, then the supplied fallback id, then `hash_<fingerprint>`.
pub fn resolve_post_id(
    structured_id: Option<&str>,
    fallback_id: Option<&str>,
    text: &str,
    author_link: Option<&str>,
) -> String {
    if let Some(raw) = structured_id.map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(id) = structured_id_value(raw) {
            return id;
        }
        return raw.to_string();
    }
    if let Some(id) = fallback_id.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    format!("hash_{}", fingerprint(text, author_link))
}

/// Pull the platform's post id out of a `data-ft`-style JSON blob.
/// Also used to key the network-interception cache.
pub fn structured_id_value(raw: &str) -> Option<String> {
    let Ok(Value::Object(map)) = serde_json::from_str(raw) else {
        return None;
    };
    for key in ["top_level_post_id", "mf_story_key"] {
        match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Extract a post id embedded in a permalink URL
/// (`story_fbid`/`fbid` query params, or a `/posts/{id}` path).
pub fn id_from_permalink(href: &str) -> Option<String> {
    let url = parse_against_base(href)?;
    for param in ["story_fbid", "fbid"] {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == param) {
            if !v.is_empty() {
                return Some(v.into_owned());
            }
        }
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().position(|s| *s == "posts" || *s == "permalink") {
        if let Some(id) = segments.get(pos + 1) {
            return Some((*id).to_string());
        }
    }
    None
}

/// Canonicalize an author href into a single profile-URL shape.
///
/// The platform emits author links in at least six formats; all ID-bearing
/// ones reduce to `profile.php?id={id}`, vanity links reduce to a bare
/// username URL, and links into group/page/photo resources yield `None`.
/// Any parse failure yields `None`, never an error.
pub fn canonical_author_link(href: &str) -> Option<String> {
    let mut url = parse_against_base(href)?;
    strip_tracking_params(&mut url);

    let segments: Vec<String> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    // /stories/{id}/...
    if segments.first().map(String::as_str) == Some("stories") {
        return segments.get(1).map(|id| profile_url(id));
    }

    // /user/{id}
    if segments.first().map(String::as_str) == Some("user") {
        return segments.get(1).map(|id| profile_url(id));
    }

    // /profile.php?id= — already canonical once tracking params are gone
    if segments.first().map(String::as_str) == Some("profile.php") {
        let id = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())?;
        return Some(profile_url(&id));
    }

    // /people/{name}/{id}
    if segments.first().map(String::as_str) == Some("people") {
        return segments.get(2).map(|id| profile_url(id));
    }

    // /groups/{gid}/user/{id}
    if segments.first().map(String::as_str) == Some("groups") {
        if let Some(pos) = segments.iter().position(|s| s == "user") {
            if let Some(id) = segments.get(pos + 1) {
                return Some(profile_url(id));
            }
        }
        return None;
    }

    // Vanity username, unless the segment names a non-profile resource.
    let first = segments.first()?;
    if NON_PROFILE_SEGMENTS.contains(&first.as_str()) || first.ends_with(".php") {
        return None;
    }
    Some(format!("{FACEBOOK_BASE}/{first}"))
}

fn parse_against_base(href: &str) -> Option<Url> {
    let base = Url::parse(FACEBOOK_BASE).ok()?;
    base.join(href.trim()).ok()
}

fn profile_url(id: &str) -> String {
    format!("{FACEBOOK_BASE}/profile.php?id={id}")
}

fn strip_tracking_params(url: &mut Url) {
    if url.query().is_none() {
        return;
    }
    let clean_pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if clean_pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(clean_pairs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("old mill photo", Some("https://www.facebook.com/jane"));
        let b = fingerprint("old mill photo", Some("https://www.facebook.com/jane"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fingerprint_varies_with_text_and_author() {
        let base = fingerprint("old mill photo", Some("https://www.facebook.com/jane"));
        assert_ne!(base, fingerprint("old mill photo!", Some("https://www.facebook.com/jane")));
        assert_ne!(base, fingerprint("old mill photo", Some("https://www.facebook.com/john")));
        assert_ne!(base, fingerprint("old mill photo", None));
    }

    #[test]
    fn post_id_prefers_top_level_post_id() {
        let id = resolve_post_id(Some(r#"{"top_level_post_id":"987654321"}"#), None, "", None);
        assert_eq!(id, "987654321");
    }

    #[test]
    fn post_id_falls_back_to_story_key() {
        let id = resolve_post_id(
            Some(r#"{"mf_story_key":"112233","page_insights":{}}"#),
            None,
            "",
            None,
        );
        assert_eq!(id, "112233");
    }

    #[test]
    fn post_id_accepts_numeric_values() {
        let id = resolve_post_id(Some(r#"{"top_level_post_id":987654321}"#), None, "", None);
        assert_eq!(id, "987654321");
    }

    #[test]
    fn unparseable_structured_id_used_verbatim() {
        let id = resolve_post_id(Some("pfbid0abc123"), None, "", None);
        assert_eq!(id, "pfbid0abc123");
    }

    #[test]
    fn fallback_id_used_when_no_structured_id() {
        let id = resolve_post_id(None, Some("445566"), "", None);
        assert_eq!(id, "445566");
    }

    #[test]
    fn hash_id_as_last_resort() {
        let id = resolve_post_id(None, None, "some text", Some("https://www.facebook.com/jane"));
        assert_eq!(id, format!("hash_{}", fingerprint("some text", Some("https://www.facebook.com/jane"))));
    }

    #[test]
    fn id_from_permalink_shapes() {
        assert_eq!(
            id_from_permalink("/permalink.php?story_fbid=777&id=123"),
            Some("777".to_string())
        );
        assert_eq!(
            id_from_permalink("https://www.facebook.com/groups/123/posts/888/"),
            Some("888".to_string())
        );
        assert_eq!(id_from_permalink("/photo.php"), None);
    }

    #[test]
    fn canonicalizes_stories_links() {
        assert_eq!(
            canonical_author_link("/stories/1234567890/abc/?__cft__=x"),
            Some("https://www.facebook.com/profile.php?id=1234567890".to_string())
        );
    }

    #[test]
    fn canonicalizes_user_links() {
        assert_eq!(
            canonical_author_link("/user/24681012/"),
            Some("https://www.facebook.com/profile.php?id=24681012".to_string())
        );
    }

    #[test]
    fn canonicalizes_profile_php_links() {
        assert_eq!(
            canonical_author_link("https://www.facebook.com/profile.php?id=555&__tn__=R&fbclid=zzz"),
            Some("https://www.facebook.com/profile.php?id=555".to_string())
        );
    }

    #[test]
    fn canonicalizes_people_links() {
        assert_eq!(
            canonical_author_link("/people/Jane-Smith/100044556677/"),
            Some("https://www.facebook.com/profile.php?id=100044556677".to_string())
        );
    }

    #[test]
    fn canonicalizes_group_member_links() {
        assert_eq!(
            canonical_author_link("/groups/112233/user/998877/?comment_tracking=x"),
            Some("https://www.facebook.com/profile.php?id=998877".to_string())
        );
    }

    #[test]
    fn canonicalizes_vanity_usernames() {
        assert_eq!(
            canonical_author_link("/jane.smith.52?ref=feed"),
            Some("https://www.facebook.com/jane.smith.52".to_string())
        );
    }

    #[test]
    fn non_profile_resources_yield_none() {
        assert_eq!(canonical_author_link("/groups/112233/"), None);
        assert_eq!(canonical_author_link("/pages/some-page/123"), None);
        assert_eq!(canonical_author_link("/photo.php?fbid=42"), None);
        assert_eq!(canonical_author_link("/watch/?v=42"), None);
    }

    #[test]
    fn tracking_params_never_survive() {
        for href in [
            "/stories/42/?__cft__=a&__tn__=b",
            "/profile.php?id=7&fbclid=c",
            "/jane?ref=feed&mibextid=d",
        ] {
            let out = canonical_author_link(href).unwrap();
            for param in ["__cft__", "__tn__", "fbclid", "ref", "mibextid"] {
                assert!(!out.contains(param), "{out} still carries {param}");
            }
        }
    }

    #[test]
    fn garbage_hrefs_yield_none() {
        assert_eq!(canonical_author_link(""), None);
        assert_eq!(canonical_author_link("   "), None);
    }
}
