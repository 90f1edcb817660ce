//! Response handling shared by the Swift and WebDAV clients

use jiff::Timestamp;
use reqwest::Response;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, LAST_MODIFIED};
use rft_core::{ObjectMetadata, WireError, WireResult};

pub(crate) const OBJECT_MANIFEST: &str = "x-object-manifest";
pub(crate) const STATIC_LARGE_OBJECT: &str = "x-static-large-object";

/// Request that never produced a status
pub(crate) fn transport(err: reqwest::Error) -> WireError {
    if err.is_timeout() {
        WireError::transport(format!("Request timeout: {err}"))
    } else {
        WireError::transport(err.to_string())
    }
}

/// Pass successful responses, turn every other status into a wire error
pub(crate) async fn check(response: Response) -> WireResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => format!("{} {status}", url.path()),
        text => format!("{} {status}: {text}", url.path()),
    };
    Err(WireError::http(status.as_u16(), message))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parse an RFC 7231 date, e.g. `Wed, 15 Nov 1995 04:58:08 GMT`
pub(crate) fn http_date(value: &str) -> Option<Timestamp> {
    jiff::fmt::rfc2822::parse(value).ok().map(|zoned| zoned.timestamp())
}

/// Object metadata from the headers of a HEAD response
pub(crate) fn metadata(headers: &HeaderMap) -> ObjectMetadata {
    ObjectMetadata {
        size: header(headers, CONTENT_LENGTH.as_str())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0),
        etag: header(headers, ETAG.as_str()).map(|etag| etag.trim_matches('"').to_string()),
        content_type: header(headers, CONTENT_TYPE.as_str()).map(str::to_string),
        modified: header(headers, LAST_MODIFIED.as_str()).and_then(http_date),
        storage_class: None,
        manifest: header(headers, OBJECT_MANIFEST).map(str::to_string),
        static_large_object: header(headers, STATIC_LARGE_OBJECT)
            .is_some_and(|value| value.eq_ignore_ascii_case("true")),
    }
}

/// Percent-encode every segment of a slash separated path
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
        headers.insert(ETAG, HeaderValue::from_static("\"d41d8cd9\""));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Fri, 13 Feb 2009 23:31:30 GMT"),
        );
        headers.insert(OBJECT_MANIFEST, HeaderValue::from_static("segments/big.iso"));

        let metadata = metadata(&headers);
        assert_eq!(metadata.size, 1024);
        assert_eq!(metadata.etag.as_deref(), Some("d41d8cd9"));
        assert_eq!(metadata.content_type.as_deref(), Some("text/plain"));
        assert_eq!(metadata.modified.map(|t| t.as_second()), Some(1_234_567_890));
        assert_eq!(metadata.manifest.as_deref(), Some("segments/big.iso"));
        assert!(metadata.is_manifest());
    }

    #[test]
    fn test_static_large_object_flag() {
        let mut headers = HeaderMap::new();
        headers.insert(STATIC_LARGE_OBJECT, HeaderValue::from_static("True"));
        assert!(metadata(&headers).static_large_object);
        assert!(!metadata(&HeaderMap::new()).static_large_object);
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("dir/a b/c#1"), "dir/a%20b/c%231");
        assert_eq!(encode_path("dir/"), "dir/");
    }
}
