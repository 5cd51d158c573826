//! Paging defaults for operator center listings.

/// Default page size for `GET /centers/all`.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Clamp a user-provided page size to `[1, max]`, defaulting when absent.
pub fn clamp_page_size(size: Option<i64>, default: i64, max: i64) -> i64 {
    size.unwrap_or(default).max(1).min(max)
}

/// Clamp a zero-based page index to non-negative.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(0).max(0)
}

/// Escape `LIKE` metacharacters and wrap the term for substring matching.
///
/// Returns `None` for blank input so callers can skip the filter.
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}
