use url::Url;

/// Feed-path suffixes stripped (trailing match only) when deriving a site URL.
const FEED_SUFFIXES: &[&str] = &[
    "/feed.xml",
    "/rss.xml",
    "/atom.xml",
    "/index.xml",
    "/feed",
    "/rss",
    "/atom",
];

/// Canonicalizes a feed URL for dedup purposes.
///
/// Trims whitespace, prepends `https://` when no `http(s)://` scheme is
/// present, lower-cases scheme and host, strips a leading `www.` label
/// (only a full label — `wwwexample.com` is untouched), drops explicit
/// ports, strips a single trailing slash from the path (root `/` exempt),
/// and preserves the query string verbatim.
///
/// Never fails: input that cannot be parsed as a URL even after scheme
/// insertion is returned scheme-prepended and trimmed, unchanged beyond that.
pub fn normalize_feed_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = match Url::parse(&with_scheme) {
        Ok(u) => u,
        Err(_) => return with_scheme,
    };

    // Url::parse already lower-cases scheme and host
    let host = match parsed.host_str() {
        Some(h) => h,
        None => return with_scheme,
    };
    let host = host.strip_prefix("www.").unwrap_or(host);

    let path = parsed.path();
    let path = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };

    let mut out = format!("{}://{}{}", parsed.scheme(), host, path);
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Derives a best-guess human site URL from a feed URL by stripping a
/// well-known feed-path suffix from the end of the path only. A suffix
/// appearing mid-path (`/feed/@user`) is left intact.
pub fn extract_site_url(feed_url: &str) -> String {
    let normalized = normalize_feed_url(feed_url);
    let parsed = match Url::parse(&normalized) {
        Ok(u) => u,
        Err(_) => return normalized,
    };
    let host = match parsed.host_str() {
        Some(h) => h.to_string(),
        None => return normalized,
    };

    let path = parsed.path();
    let lower = path.to_ascii_lowercase();
    let mut stripped = path;
    for suffix in FEED_SUFFIXES {
        if lower.ends_with(suffix) {
            stripped = &path[..path.len() - suffix.len()];
            break;
        }
    }
    if stripped.is_empty() {
        stripped = "/";
    }

    format!("{}://{}{}", parsed.scheme(), host, stripped)
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
