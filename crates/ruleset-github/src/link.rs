//! `Link` header pagination

use regex::Regex;
use std::sync::LazyLock;

static LINK_ENTRY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]*)""#).ok());

/// URL of the `rel="next"` entry in a `Link` header value, if any.
pub fn next_link(header: &str) -> Option<String> {
    let pattern = LINK_ENTRY.as_ref()?;
    pattern
        .captures_iter(header)
        .find(|caps| caps[2].split_whitespace().any(|rel| rel == "next"))
        .map(|caps| caps[1].to_string())
}
