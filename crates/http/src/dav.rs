//! WebDAV client

use async_trait::async_trait;
use http::Method;
use reqwest::{Client, RequestBuilder, Response};
use rft_core::protocol::dav::DavHandle;
use rft_core::{ObjectMetadata, WireError, WireResult};
use url::Url;

use crate::response::{check, encode_path, metadata, transport};

const DESTINATION: &str = "Destination";
const OVERWRITE: &str = "Overwrite";

/// WebDAV client with basic authentication
pub struct DavClient {
    client: Client,
    base: Url,
    username: String,
    password: Option<String>,
}

impl DavClient {
    /// Client rooted at `base`; remote paths are resolved below its path
    pub fn new(base: Url, username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base,
            username: username.into(),
            password,
        }
    }

    /// Absolute URL of a remote path, keeping a trailing slash
    fn resource_url(&self, path: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{}", encode_path(path))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.resource_url(path));
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, self.password.as_deref())
        }
    }

    async fn send(&self, request: RequestBuilder) -> WireResult<Response> {
        check(request.send().await.map_err(transport)?).await
    }

    async fn transfer(&self, verb: &[u8], from: &str, to: &str, overwrite: bool) -> WireResult<()> {
        let method = Method::from_bytes(verb)
            .map_err(|e| WireError::transport(format!("Invalid method: {e}")))?;
        let request = self
            .request(method, from)
            .header(DESTINATION, self.resource_url(to))
            .header(OVERWRITE, if overwrite { "T" } else { "F" });
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl DavHandle for DavClient {
    async fn delete(&self, path: &str) -> WireResult<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn move_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()> {
        self.transfer(b"MOVE", from, to, overwrite).await
    }

    async fn copy_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()> {
        self.transfer(b"COPY", from, to, overwrite).await
    }

    async fn head(&self, path: &str) -> WireResult<ObjectMetadata> {
        let response = self.send(self.request(Method::HEAD, path)).await?;
        Ok(metadata(response.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_url() {
        let client = DavClient::new(
            "https://dav.example.net/remote.php/dav/files/user/".parse().unwrap(),
            "user",
            Some("secret".to_string()),
        );
        assert_eq!(
            client.resource_url("/Documents/a b.txt"),
            "https://dav.example.net/remote.php/dav/files/user/Documents/a%20b.txt"
        );
        assert_eq!(
            client.resource_url("/Documents/"),
            "https://dav.example.net/remote.php/dav/files/user/Documents/"
        );
        assert_eq!(
            client.resource_url("/"),
            "https://dav.example.net/remote.php/dav/files/user/"
        );
    }
}
