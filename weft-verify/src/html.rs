//! Markup inspection for the live checks.

use std::sync::OnceLock;

use regex::Regex;

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:href|src)=["']([^"']+)["']"#).unwrap())
}

/// Pull `href`/`src` attribute values out of markup, skipping absolute
/// external URLs.
pub fn extract_asset_links(html: &str) -> Vec<String> {
    link_regex()
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|url| !url.starts_with("http"))
        .collect()
}

/// A 2xx body should at least look like an HTML document.
pub fn looks_like_html(body: &str) -> bool {
    body.contains("<html")
}

/// Marker the UI boot check expects in a served entry document.
pub fn has_root_element(body: &str) -> bool {
    body.contains("id=\"root\"")
}
