//! Request dumps for panic logs, with secrets masked.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};

use http::header::{
    AUTHORIZATION, COOKIE, HOST, HeaderName, PROXY_AUTHORIZATION, SET_COOKIE, TRAILER,
    TRANSFER_ENCODING,
};
use http::{HeaderMap, HeaderValue};

use crate::request::Head;

/// Replaces the value of every sensitive header in a dump.
pub const REDACTED: &str = "***REDACTED***";

/// Headers whose values never reach the logs.
pub const SENSITIVE_HEADERS: [HeaderName; 6] = [
    AUTHORIZATION,
    PROXY_AUTHORIZATION,
    COOKIE,
    SET_COOKIE,
    HeaderName::from_static("x-api-key"),
    HeaderName::from_static("x-auth-token"),
];

/// Why a request could not be dumped.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error(transparent)]
    Format(#[from] fmt::Error),
}

/// Renders the request line and headers the way they looked on the wire,
/// with every non-empty [`SENSITIVE_HEADERS`] value replaced by [`REDACTED`].
///
/// Works on a copy of the headers; `head` is left untouched. There is no
/// body in a [`Head`], so the body is never read. Header bytes that are not
/// UTF-8 are shown lossily. An absolute-form target (`http://host/path`) is
/// printed in full.
///
/// ```text
/// POST /login?next=%2F HTTP/1.1
/// Host: example.com
/// Authorization: ***REDACTED***
/// Content-Type: application/json
/// ```
pub fn dump_request(head: &Head) -> Result<String, DumpError> {
    let mut headers = head.headers.clone();
    redact(&mut headers);

    let mut out = String::new();
    if head.uri.scheme().is_some() {
        write!(out, "{} {} {:?}\r\n", head.method, head.uri, head.version)?;
    } else {
        let target = head.uri.path_and_query().map_or("/", |pq| pq.as_str());
        write!(out, "{} {} {:?}\r\n", head.method, target, head.version)?;
    }

    let host = headers
        .get(HOST)
        .map(lossy)
        .or_else(|| head.uri.authority().map(|a| Cow::Borrowed(a.as_str())));
    if let Some(host) = host {
        write!(out, "Host: {host}\r\n")?;
    }

    let mut names: Vec<&HeaderName> = headers
        .keys()
        .filter(|name| ![HOST, TRANSFER_ENCODING, TRAILER].contains(*name))
        .collect();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for name in names {
        let canonical = canonical_name(name);
        for value in headers.get_all(name) {
            write!(out, "{canonical}: {}\r\n", lossy(value))?;
        }
    }

    out.truncate(out.trim_end().len());
    Ok(out)
}

/// [`dump_request`] that cannot fail: any failure, panics included, turns
/// into a `could not dump request: …` line.
pub fn dump_request_safe(head: &Head) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| dump_request(head))) {
        Ok(Ok(dump)) => dump,
        Ok(Err(e)) => format!("could not dump request: {e}"),
        Err(_) => "could not dump request: dump panicked".to_owned(),
    }
}

fn redact(headers: &mut HeaderMap) {
    for name in &SENSITIVE_HEADERS {
        let present = headers.get_all(name).iter().any(|v| !v.is_empty());
        if present {
            headers.insert(name.clone(), HeaderValue::from_static(REDACTED));
        }
    }
}

fn lossy(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

/// `x-api-key` → `X-Api-Key`.
fn canonical_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let c = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use http::{Method, Uri, Version};

    use super::*;

    fn head(headers: &[(&'static str, &'static str)]) -> Head {
        let mut map = HeaderMap::new();
        for &(name, value) in headers {
            map.append(name, HeaderValue::from_static(value));
        }
        Head {
            method: Method::POST,
            uri: Uri::from_static("/login?next=%2F"),
            version: Version::HTTP_11,
            headers: map,
        }
    }

    #[test]
    fn masks_secrets_and_keeps_the_rest() {
        let head = head(&[
            ("host", "example.com"),
            ("authorization", "secret123"),
            ("content-type", "application/json"),
            ("x-api-key", "k-456"),
        ]);

        let dump = dump_request(&head).unwrap();
        assert_eq!(
            dump,
            "POST /login?next=%2F HTTP/1.1\r\n\
             Host: example.com\r\n\
             Authorization: ***REDACTED***\r\n\
             Content-Type: application/json\r\n\
             X-Api-Key: ***REDACTED***"
        );
        assert!(!dump.contains("secret123"));
        assert!(!dump.contains("k-456"));
    }

    #[test]
    fn every_sensitive_header_is_masked() {
        let head = head(&[
            ("authorization", "a"),
            ("proxy-authorization", "b"),
            ("cookie", "c=1"),
            ("set-cookie", "d=2"),
            ("x-api-key", "e"),
            ("x-auth-token", "f"),
        ]);

        let dump = dump_request(&head).unwrap();
        assert_eq!(dump.matches(REDACTED).count(), SENSITIVE_HEADERS.len());
    }

    #[test]
    fn repeated_secret_collapses_to_one_marker() {
        let head = head(&[("cookie", "a=1"), ("cookie", "b=2")]);
        let dump = dump_request(&head).unwrap();
        assert!(dump.ends_with("Cookie: ***REDACTED***"));
        assert!(!dump.contains("a=1"));
        assert!(!dump.contains("b=2"));
    }

    #[test]
    fn empty_secret_is_left_alone() {
        let head = head(&[("authorization", "")]);
        let dump = dump_request(&head).unwrap();
        assert!(dump.contains("Authorization:"));
        assert!(!dump.contains(REDACTED));
    }

    #[test]
    fn original_headers_unchanged() {
        let head = head(&[("authorization", "secret123")]);
        dump_request(&head).unwrap();
        assert_eq!(head.headers["authorization"], "secret123");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let head = Head {
            uri: Uri::from_static("https://api.example.com/v1/items"),
            version: Version::HTTP_2,
            ..Head::default()
        };
        let dump = dump_request(&head).unwrap();
        assert_eq!(dump, "GET https://api.example.com/v1/items HTTP/2.0\r\nHost: api.example.com");
    }

    #[test]
    fn proxy_target_keeps_scheme_and_authority() {
        let mut head = head(&[("host", "upstream.internal")]);
        head.method = Method::GET;
        head.uri = Uri::from_static("http://upstream.internal:8080/status?full=1");
        let dump = dump_request(&head).unwrap();
        assert_eq!(
            dump,
            "GET http://upstream.internal:8080/status?full=1 HTTP/1.1\r\n\
             Host: upstream.internal"
        );
    }

    #[test]
    fn empty_duplicate_does_not_hide_a_later_secret() {
        let head = head(&[("cookie", ""), ("cookie", "session=topsecret")]);
        let dump = dump_request(&head).unwrap();
        assert!(!dump.contains("topsecret"));
        assert!(dump.ends_with("Cookie: ***REDACTED***"));
        assert_eq!(dump.matches("Cookie:").count(), 1);
    }

    #[test]
    fn framing_headers_are_skipped() {
        let head = head(&[("transfer-encoding", "chunked"), ("trailer", "x-checksum")]);
        let dump = dump_request(&head).unwrap();
        assert_eq!(dump, "POST /login?next=%2F HTTP/1.1");
    }

    #[test]
    fn non_utf8_value_is_shown_lossily() {
        let mut head = head(&[("host", "example.com"), ("authorization", "secret123")]);
        head.headers.insert("x-filename", HeaderValue::from_bytes(b"caf\xe9.txt").unwrap());

        let dump = dump_request_safe(&head);
        assert!(dump.starts_with("POST /login?next=%2F HTTP/1.1\r\nHost: example.com"));
        assert!(dump.contains("Authorization: ***REDACTED***"));
        assert!(dump.ends_with("X-Filename: caf\u{FFFD}.txt"));
        assert!(!dump.contains("secret123"));
    }

    #[test]
    fn non_utf8_host_is_shown_lossily() {
        let mut head = head(&[]);
        head.headers.insert(HOST, HeaderValue::from_bytes(b"ex\xffample.com").unwrap());
        let dump = dump_request(&head).unwrap();
        assert_eq!(dump, "POST /login?next=%2F HTTP/1.1\r\nHost: ex\u{FFFD}ample.com");
    }
}
