use crate::config::CustomHeaders;

/// Collapse an ordered list of `(name, value)` pairs into a header map.
///
/// Pairs with an empty name are dropped; when a name repeats, the last value
/// wins.
pub fn headers_from_pairs<'a, I>(pairs: I) -> CustomHeaders
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let mut headers = CustomHeaders::new();
    for (name, value) in pairs {
        if name.is_empty() {
            continue;
        }
        headers.insert(name.clone(), value.clone());
    }
    headers
}

/// Expand a header map back into an editable list, ordered by name.
pub fn pairs_from_headers(headers: &CustomHeaders) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
