//! URL normalization helpers: hostname reversal, trim patterns and the
//! length limit.

/// Maximum number of characters kept in a URL.
pub const DEFAULT_URL_LIMIT: usize = 500;

/// Reverse the authority component of a URL (everything between `scheme://`
/// and the next `/`).
///
/// Domain-sharded and CDN URL sets tend to share long suffixes (the
/// reversed TLD and domain), so reversing turns those into shared trie
/// prefixes. The function is its own inverse.
pub fn reverse_hostname(url: &str) -> String {
    let scheme_len = if url.starts_with("https://") {
        8
    } else if url.starts_with("http://") {
        7
    } else {
        return url.to_string();
    };

    let rest = &url[scheme_len..];
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return url.to_string();
    }

    let reversed: String = authority.chars().rev().collect();
    format!("{}{}{}", &url[..scheme_len], reversed, path)
}

/// Limit a URL to `limit` characters, preferring to cut at the query
/// string.
pub fn cleanup_url(url: &str, limit: usize) -> String {
    let char_count = url.chars().count();
    if char_count <= limit {
        return url.to_string();
    }

    if let Some(qs) = url.find('?') {
        let qs_chars = url[..qs].chars().count();
        if qs_chars < limit {
            return format!("{}?...", &url[..qs]);
        }
    }

    // no usable query string, just stop at the limit
    let cut = url
        .char_indices()
        .nth(limit.saturating_sub(3))
        .map(|(i, _)| i)
        .unwrap_or(url.len());
    format!("{}...", &url[..cut])
}

/// Trim the URL at the first matching trim pattern, then apply the length
/// limit.
pub fn trim_url(url: &str, patterns: &[String], limit: usize) -> String {
    for pattern in patterns {
        if pattern.is_empty() {
            continue;
        }
        if let Some(idx) = url.find(pattern.as_str()) {
            return cleanup_url(&format!("{}...", &url[..idx + pattern.len()]), limit);
        }
    }
    cleanup_url(url, limit)
}
