use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Check whether a string is a service identifier (8-4-4-4-12 hex).
pub fn is_uuid(s: &str) -> bool {
    RE_UUID.is_match(s)
}

/// Check whether a string is an absolute http(s) URL.
pub fn is_web_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

/// Validate a base URL for the API. Must be an absolute http(s) URL.
///
/// The trailing slash is dropped so that relative paths (`/spaces/..`) can be
/// appended verbatim.
pub fn parse_base_url(input: &str) -> Result<String> {
    if !is_web_url(input) {
        return Err(Error::Config(format!(
            "provided base URL {input} is not a valid URL"
        )));
    }
    Ok(input.trim_end_matches('/').to_string())
}

/// Resolve a URL returned by the service or built by the caller.
///
/// Absolute URLs (links embedded in API documents) pass through; anything else
/// is treated as a path relative to `base`.
pub fn resolve_url(base: &str, url: &str) -> String {
    if is_web_url(url) {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// Build a link to the planner board showing an iteration's work items.
///
/// The work item type clause is only added when exactly one type is selected,
/// matching what the search query itself filters on.
pub fn plan_link(
    web_url: &str,
    space: &str,
    iteration_id: &str,
    item_types: &[String],
) -> Option<String> {
    let base = format!("{}/{space}/plan", web_url.trim_end_matches('/'));
    let mut url = url::Url::parse(&base).ok()?;

    let mut q = format!("(typegroup.name:Execution $AND iteration:{iteration_id}");
    if let [item_type] = item_types {
        q.push_str(&format!(" $AND workitemtype:{item_type}"));
    }
    q.push(')');

    url.query_pairs_mut()
        .append_pair("q", &q)
        .append_pair("showCompleted", "true");
    Some(url.to_string())
}
