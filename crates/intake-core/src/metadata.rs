//! Metadata extraction: headers, query, method, path.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use intake_model::HeaderValues;

/// Build the case-insensitive, multi-value header mapping.
///
/// Header names arrive already lowercased from the `http` layer. A name
/// seen once stays scalar; each further occurrence promotes or extends the
/// list, preserving arrival order.
pub fn extract_headers(headers: &http::HeaderMap) -> BTreeMap<String, HeaderValues> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match map.entry(name.as_str().to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(HeaderValues::new(text));
            }
            Entry::Occupied(mut entry) => entry.get_mut().push(text),
        }
    }
    map
}

/// Parse a raw query string into a flat mapping.
///
/// Keys stay literal: bracketed keys like `a[0]` are ordinary strings, never
/// coalesced into arrays. Duplicate keys are last-write-wins.
pub fn parse_query(raw: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}
