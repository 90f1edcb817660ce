//! Session bootstrap from host profiles

use std::sync::Arc;

use rft_core::protocol::{dav, s3, swift};
use rft_core::{
    Capabilities, Error, HostProfile, Protocol, RegionCache, Result, Session, mapping,
};
use rft_http::{DavClient, SwiftAuth, SwiftClient};
use rft_s3::{S3Client, S3Options};
use tracing::debug;
use url::Url;

/// Region name of single-region Swift accounts without a configured region
const DEFAULT_SWIFT_REGION: &str = "default";

/// Open session of one configured host
pub struct Connection {
    pub name: String,
    pub capabilities: Capabilities,
}

fn endpoint_url(profile: &HostProfile) -> Result<Url> {
    Url::parse(&profile.endpoint)
        .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {e}", profile.endpoint)))
}

fn required(value: Option<String>, what: &str, name: &str) -> Result<String> {
    value.ok_or_else(|| Error::Config(format!("Host '{name}' has no {what}")))
}

/// Connect to the host profile `name`
pub async fn connect(name: &str, profile: &HostProfile) -> Result<Connection> {
    let url = endpoint_url(profile)?;
    let host = url.host_str().unwrap_or_default().to_string();
    let username = profile.username.clone().unwrap_or_default();
    debug!(host = %host, protocol = %profile.protocol, "Connecting");

    let capabilities = match profile.protocol {
        Protocol::S3 => {
            let secret = required(profile.resolve_secret(name), "secret key", name)?;
            let custom = !host.ends_with("amazonaws.com");
            let options = S3Options {
                endpoint: custom.then(|| profile.endpoint.clone()),
                region: profile
                    .region
                    .clone()
                    .unwrap_or_else(|| s3::DEFAULT_REGION.to_string()),
                path_style: custom,
                ..S3Options::new(username.clone(), secret)
            };
            let client = S3Client::new(options).await;
            s3::capabilities(Session::new(host, username, client), RegionCache::global())
        }
        Protocol::Swift => {
            let auth = SwiftAuth {
                auth_url: url,
                user: required(profile.username.clone(), "username", name)?,
                key: required(profile.resolve_secret(name), "API key", name)?,
                region: profile
                    .region
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SWIFT_REGION.to_string()),
            };
            let client = SwiftClient::authenticate(&auth)
                .await
                .map_err(|e| mapping::map(&e))?;
            swift::capabilities(Session::new(host, username, client), RegionCache::global())
        }
        Protocol::Dav => {
            let client = DavClient::new(url, username.clone(), profile.resolve_secret(name));
            dav::capabilities(Session::new(host, username, client))
        }
        Protocol::Ftp | Protocol::Sftp => {
            return Err(Error::Unsupported(format!(
                "No {} client is available for host '{name}'",
                profile.protocol
            )));
        }
    };

    Ok(Connection {
        name: name.to_string(),
        capabilities,
    })
}

/// Shared by commands that talk to two hosts of the same account
pub fn same_host(a: &str, b: &str) -> Result<()> {
    if a == b {
        Ok(())
    } else {
        Err(Error::Unsupported(format!(
            "Source and target must be on the same host ({a} and {b})"
        )))
    }
}
