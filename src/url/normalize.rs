use url::Url;

/// Normalizes a discovered link so that trivially different spellings of the
/// same resource compare equal
///
/// # Normalization Steps
///
/// 1. Remove the fragment (everything after #)
/// 2. Remove an empty query string (trailing ?)
///
/// Scheme and host case are already normalized by [`Url`]. The query is kept
/// otherwise untouched, since reordering it could change what the server
/// returns.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ycrawler::url::normalize_link;
///
/// let url = normalize_link(Url::parse("HTTPS://Example.COM/page?#top").unwrap());
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_link(mut url: Url) -> Url {
    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    url
}
