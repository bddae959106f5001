//! Hop-by-hop header filtering, shared by the outbound and relay legs.

use http::header::{self, HeaderName};
use http::HeaderMap;

/// Connection-scoped headers that never cross the duplicator in either
/// direction.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
];

/// Header names a message lists in its `Connection` value.
fn connection_listed(source: &HeaderMap) -> Vec<HeaderName> {
    source
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// Copy the end-to-end headers of `source`.
///
/// Drops the hop-by-hop set, every header named in `Connection`, and any
/// name in `also_drop`. Repeated headers keep all of their values in order.
pub fn end_to_end(source: &HeaderMap, also_drop: &[&str]) -> HeaderMap {
    let listed = connection_listed(source);
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        let lower = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&lower) || also_drop.contains(&lower) || listed.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
