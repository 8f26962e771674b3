//! WAN connection status (`/api/status.wan.connection`)
//!
//! Fields the device leaves out (disabled links, `lite=yes`, link types that
//! do not apply) keep their zero or empty default. Per-type detail objects
//! are `None` unless the device sent them.

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::ordered::Ordered;

pub const WAN_STATUS_PATH: &str = "/api/status.wan.connection";

/// One WAN link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WanStatus {
    pub name: String,
    /// UI LED colour: empty, gray, red, yellow, green or flash
    pub status_led: String,
    pub as_lan: bool,
    pub enable: bool,
    pub locked: bool,
    pub management_only: bool,
    /// Only sent while a scheduled link is off
    pub scheduled_off: bool,
    pub message: String,
    /// Seconds
    pub uptime: u64,
    /// modem, wireless, gobi, cellular, ipsec, adsl, ethernet, wifi, wovlan.
    /// Cellular links report `gobi` before firmware 8.0.1.
    #[serde(rename = "type")]
    pub kind: String,
    pub virtual_type: String,
    /// Absent when the link is disabled
    pub priority: u32,
    pub groupset: u32,
    pub ip: String,
    pub mask: u32,
    pub gateway: String,
    /// dhcp, static, ppp
    pub method: String,
    pub mode: String,
    pub routing_mode: String,
    pub dns: Vec<String>,
    /// The device's own spelling.
    #[serde(rename = "aditionalIp")]
    pub additional_ip: Vec<String>,
    /// Absent when automatic
    pub mtu: u32,
    pub mss: u32,
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireless: Option<WifiInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modem: Option<ModemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cellular: Option<CellularInfo>,
    /// Pre-8.0.1 name of `cellular`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gobi: Option<CellularInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WifiInfo {
    pub ssid: String,
    pub bssid: String,
    pub signal: Signal,
}

/// Radio measurements. Which ones are present depends on the link type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Signal {
    pub rssi: f64,
    pub sinr: f64,
    pub snr: f64,
    pub ecio: f64,
    pub rsrp: f64,
    pub rsrq: f64,
    /// Wi-Fi only
    pub strength: f64,
}

/// USB modem adaptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModemInfo {
    pub name: String,
    pub vendor_id: u32,
    pub product_id: u32,
    pub manufacturer: String,
    pub carrier: Carrier,
    /// 0 to 5
    pub signal_level: u8,
    pub network: String,
    pub mobile_type: String,
    pub imsi: String,
    pub iccid: Vec<String>,
    pub esn: Vec<String>,
    pub mtn: Vec<String>,
    pub apn: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub dial_number: String,
    pub band: Vec<Band>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gobi: Option<CellularInfo>,
}

/// Built-in cellular module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellularInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roaming_status: Option<RoamingStatus>,
    /// Deprecated in 8.0.1 in favour of `mobile_type`
    pub network: String,
    pub mobile_type: String,
    pub module_power_on: bool,
    pub sim: Ordered<SimInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_sim: Option<RemoteSim>,
    pub carrier: Carrier,
    pub carrier_aggregation: bool,
    pub signal_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meid: Option<Meid>,
    pub imei: String,
    pub esn: String,
    pub mode: String,
    pub data_technology: String,
    pub band: Vec<Band>,
    pub rat: Vec<Rat>,
    pub mcc: String,
    pub mnc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_tower: Option<CellTower>,
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
}

/// One SIM slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimInfo {
    /// In Use, SIM Card Detected, No SIM Card Detected
    pub status: String,
    pub active: bool,
    pub sim_card_detected: bool,
    pub auto_apn: bool,
    pub apn: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub imsi: String,
    pub iccid: String,
    pub mtn: String,
}

/// Only present when remote SIM is enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteSim {
    pub imsi: String,
    pub serial_number: String,
    pub slot: u32,
    #[serde(alias = "autoApp")]
    pub auto_apn: bool,
    pub apn: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Radio access technology and the bands it is using.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rat {
    pub name: String,
    pub band: Vec<Band>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Band {
    pub name: String,
    pub channel: u32,
    pub channel_width: String,
    pub signal: Signal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Carrier {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoamingStatus {
    /// 0, 1 or 2
    pub code: i64,
    pub message: String,
}

/// Mobile Equipment Identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meid {
    pub hex: String,
    pub dec: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellTower {
    pub cell_id: u64,
    pub cell_plmn: u64,
    pub cell_utran_id: u64,
    pub tac: u64,
}

impl Client {
    /// Status of every WAN link, in device order.
    pub async fn wan_status(&self) -> Result<Vec<WanStatus>> {
        self.get_ordered(WAN_STATUS_PATH).await
    }
}
