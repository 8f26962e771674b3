//! One status snapshot of the device

use peplink_api::{Client, WanStatus};
use serde::Serialize;
use tracing::debug;

/// What gets printed per poll.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub firmware: String,
    pub wan: Vec<WanStatus>,
}

impl StatusReport {
    pub async fn collect(client: &Client) -> peplink_api::Result<Self> {
        let firmware = client.firmware_version().await?;
        let wan = client.wan_status().await?;
        debug!(firmware = %firmware, wan_links = wan.len(), "collected device status");
        Ok(Self { firmware, wan })
    }
}
