//! Channel loading.
//!
//! A channel location is either an `http(s)://` URL or a local path
//! (optionally prefixed with `file://`). Channels are fetched fresh on every
//! call.

use std::time::Duration;

use tracing::debug;

use crate::api::Channel;
use crate::api::channel::CHANNEL_KIND;
use crate::error::KcupError;

/// The published stable channel.
pub const DEFAULT_CHANNEL: &str =
    "https://raw.githubusercontent.com/kubernetes/kops/master/channels/stable.yaml";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch and parse the channel at `location`.
pub async fn load_channel(location: &str) -> Result<Channel, KcupError> {
    debug!("Loading channel from {}", location);

    let contents = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_http(location).await?
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| KcupError::ChannelFetch {
                location: location.to_string(),
                reason: e.to_string(),
            })?
    };

    parse_channel(location, &contents)
}

async fn fetch_http(location: &str) -> Result<String, KcupError> {
    let fetch_error = |reason: String| KcupError::ChannelFetch {
        location: location.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(location)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("unexpected HTTP status {status}")));
    }

    response.text().await.map_err(|e| fetch_error(e.to_string()))
}

/// Parse channel YAML, attributing failures to `location`.
///
/// Documents of any other kind are rejected.
pub fn parse_channel(location: &str, contents: &str) -> Result<Channel, KcupError> {
    let parse_error = |reason: String| KcupError::ChannelParse {
        location: location.to_string(),
        reason,
    };

    let channel: Channel = serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string()))?;
    if channel.kind != CHANNEL_KIND {
        return Err(parse_error(format!(
            "expected kind {CHANNEL_KIND:?}, found {:?}",
            channel.kind
        )));
    }

    debug!(
        "Parsed channel {:?}: {} images, cluster overlay {}",
        channel.metadata.name,
        channel.spec.images.len(),
        if channel.spec.cluster.is_some() {
            "present"
        } else {
            "absent"
        }
    );
    Ok(channel)
}
