use url::Url;

/// Extracts the lowercase host from a URL string
///
/// # Examples
///
/// ```
/// use onion_crawler::link::extract_host;
///
/// assert_eq!(
///     extract_host("http://EXAMPLE.onion/path"),
///     Some("example.onion".to_string())
/// );
/// assert_eq!(extract_host("not a url"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}
