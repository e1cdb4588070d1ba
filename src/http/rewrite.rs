//! Outbound request rewriting.
//!
//! Each step is a small function over headers or URIs so the proxy pipeline
//! reads as a sequence and each step can be tested alone.

use std::net::IpAddr;

use axum::http::{
    header::{self, HeaderName},
    uri::PathAndQuery,
    HeaderMap, HeaderValue, Uri,
};

use crate::config::{ExtraHeaders, Upstream};
use crate::credential::Credential;

/// Hop-by-hop headers never forwarded to the upstream.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Remove hop-by-hop headers, including any named in `Connection`.
///
/// `TE: trailers` survives since it is the one value an upstream may act on.
/// An upgrade request keeps `Connection: upgrade` and its `Upgrade` protocol
/// so the upstream can switch protocols.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let upgrade = upgrade_type(headers);

    let listed: Vec<HeaderName> = tokens(headers, header::CONNECTION)
        .filter_map(|token| HeaderName::from_bytes(token.as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }

    let keep_trailers = tokens(headers, header::TE).any(|token| token.eq_ignore_ascii_case("trailers"));

    for name in &HOP_BY_HOP {
        headers.remove(name);
    }

    if keep_trailers {
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
    }
    if let Some(protocol) = upgrade {
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(header::UPGRADE, protocol);
    }
}

/// The protocol named by `Upgrade`, when `Connection` carries the `upgrade`
/// token.
pub fn upgrade_type(headers: &HeaderMap) -> Option<HeaderValue> {
    if !tokens(headers, header::CONNECTION).any(|token| token.eq_ignore_ascii_case("upgrade")) {
        return None;
    }
    headers.get(header::UPGRADE).cloned()
}

/// Comma separated tokens across every value of `name`.
fn tokens(headers: &HeaderMap, name: HeaderName) -> impl Iterator<Item = &str> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Append every configured header, keeping values the caller already sent.
pub fn append_extra_headers(headers: &mut HeaderMap, extra: &ExtraHeaders) {
    for (name, value) in extra.iter() {
        headers.append(name.clone(), value.clone());
    }
}

/// Add `credential` to the request's cookies.
///
/// Existing `Cookie` headers are folded into one, with the credential
/// appended as `name=value`. Returns false if the result is not a valid
/// header value, in which case the headers are left untouched.
pub fn append_cookie(headers: &mut HeaderMap, credential: &Credential) -> bool {
    let mut cookie = Vec::new();
    for existing in headers.get_all(header::COOKIE) {
        if !existing.is_empty() {
            cookie.extend_from_slice(existing.as_bytes());
            cookie.extend_from_slice(b"; ");
        }
    }
    cookie.extend_from_slice(credential.name().as_bytes());
    cookie.push(b'=');
    cookie.extend_from_slice(credential.value().as_bytes());

    match HeaderValue::from_bytes(&cookie) {
        Ok(value) => {
            headers.insert(header::COOKIE, value);
            true
        }
        Err(_) => false,
    }
}

/// Append the caller's address to `X-Forwarded-For`.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let prior: Vec<&[u8]> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .map(HeaderValue::as_bytes)
        .collect();

    let mut value = prior.join(&b", "[..]);
    if !value.is_empty() {
        value.extend_from_slice(b", ");
    }
    value.extend_from_slice(client.to_string().as_bytes());

    if let Ok(value) = HeaderValue::from_bytes(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Point `original` at the upstream.
///
/// Scheme and authority come from the upstream. The request path is joined
/// under the upstream's base path and the upstream's query is placed ahead
/// of the request's.
pub fn upstream_uri(upstream: &Upstream, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_path(upstream.base_path(), original.path());
    let query = match (upstream.base_query(), original.query()) {
        (Some(base), Some(q)) if !q.is_empty() => Some(format!("{base}&{q}")),
        (Some(base), _) => Some(base.to_string()),
        (None, q) => q.map(str::to_string),
    };

    let path_and_query = match query {
        Some(q) => format!("{path}?{q}"),
        None => path,
    };

    Uri::builder()
        .scheme(upstream.scheme().clone())
        .authority(upstream.authority().clone())
        .path_and_query(PathAndQuery::try_from(path_and_query)?)
        .build()
}

/// Join two path segments with exactly one slash between them.
fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_header_spec;
    use cookie::Cookie;

    fn upstream(target: &str) -> Upstream {
        Upstream::parse(target).unwrap()
    }

    fn credential(value: &str) -> Credential {
        Cookie::parse(format!("CF_Authorization={value}; Path=/; HttpOnly")).unwrap()
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, X-Private"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn test_strip_hop_by_hop_keeps_te_trailers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TE, HeaderValue::from_static("gzip, trailers"));
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.get(header::TE).unwrap(), "trailers");

        let mut headers = HeaderMap::new();
        headers.insert(header::TE, HeaderValue::from_static("gzip"));
        strip_hop_by_hop(&mut headers);
        assert!(headers.get(header::TE).is_none());
    }

    #[test]
    fn test_strip_hop_by_hop_keeps_upgrade() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("SPDY/3.1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(header::CONNECTION).unwrap(), "upgrade");
        assert_eq!(headers.get(header::UPGRADE).unwrap(), "SPDY/3.1");
    }

    #[test]
    fn test_upgrade_type_needs_connection_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(upgrade_type(&headers).is_none());

        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        assert!(upgrade_type(&headers).is_none());

        headers.insert(header::CONNECTION, HeaderValue::from_static("UPGRADE"));
        assert_eq!(upgrade_type(&headers).unwrap(), "websocket");
    }

    #[test]
    fn test_append_extra_headers_keeps_caller_values() {
        let mut extra = ExtraHeaders::new();
        let (name, value) = parse_header_spec("X-Env: staging").unwrap();
        extra.insert(name, value);

        let mut headers = HeaderMap::new();
        headers.insert("x-env", HeaderValue::from_static("prod"));
        append_extra_headers(&mut headers, &extra);

        let values: Vec<_> = headers.get_all("x-env").iter().collect();
        assert_eq!(values, vec!["prod", "staging"]);
    }

    #[test]
    fn test_append_cookie_without_existing() {
        let mut headers = HeaderMap::new();
        assert!(append_cookie(&mut headers, &credential("abc123")));
        assert_eq!(headers.get(header::COOKIE).unwrap(), "CF_Authorization=abc123");
    }

    #[test]
    fn test_append_cookie_merges_existing() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        append_cookie(&mut headers, &credential("abc123"));

        let values: Vec<_> = headers.get_all(header::COOKIE).iter().collect();
        assert_eq!(values, vec!["a=1; b=2; CF_Authorization=abc123"]);
    }

    #[test]
    fn test_append_forwarded_for() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1".parse().unwrap());
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.1");

        append_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let uri = upstream_uri(&upstream("http://localhost:9000"), &"/widgets/7?color=red".parse().unwrap())
            .unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9000/widgets/7?color=red");
    }

    #[test]
    fn test_upstream_uri_switches_scheme() {
        let uri = upstream_uri(&upstream("https://app.example.com"), &"/".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "https://app.example.com/");
    }

    #[test]
    fn test_upstream_uri_replaces_absolute_form() {
        let original: Uri = "http://caller.local:8080/status".parse().unwrap();
        let uri = upstream_uri(&upstream("http://localhost:9000"), &original).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9000/status");
    }

    #[test]
    fn test_upstream_uri_joins_base_path_and_query() {
        let target = upstream("http://localhost:9000/api/?token=1");
        let uri = upstream_uri(&target, &"/widgets?x=2".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9000/api/widgets?token=1&x=2");

        let target = upstream("http://localhost:9000/api");
        let uri = upstream_uri(&target, &"/widgets".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9000/api/widgets");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "/a"), "/a");
        assert_eq!(join_path("/api", "a"), "/api/a");
        assert_eq!(join_path("", "/a"), "/a");
    }
}
