//! Firmware information (`/api/info.frw.version`)
//!
//! The device lists every firmware image it holds as an ordered collection;
//! the running one is flagged `inUse`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};

pub const FIRMWARE_PATH: &str = "/api/info.frw.version";

/// One firmware image slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Firmware {
    pub version: String,
    pub bootable: bool,
    pub in_use: bool,
}

/// Version of the first image flagged in use, in listing order.
pub fn select_in_use(images: Vec<Firmware>) -> Result<String> {
    images
        .into_iter()
        .find(|fw| fw.in_use)
        .map(|fw| fw.version)
        .ok_or_else(|| Error::NotFound("no firmware image is marked in use".into()))
}

impl Client {
    /// All firmware images, in device order.
    pub async fn firmware_images(&self) -> Result<Vec<Firmware>> {
        self.get_ordered(FIRMWARE_PATH).await
    }

    /// Version string of the running firmware.
    pub async fn firmware_version(&self) -> Result<String> {
        let images = self.firmware_images().await?;
        debug!(images = images.len(), "fetched firmware listing");
        select_in_use(images)
    }
}
