//! Device inventory records, capabilities and status decoding.

use crate::crypto::HubCipher;
use crate::error::{Ics2000Error, Result};
use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

const STATUS_INDEX_ON_OFF: usize = 0;
const STATUS_INDEX_TEMPERATURE: usize = 4;
const STATUS_INDEX_HUMIDITY: usize = 11;

/// Attributes a device class can be driven or read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    pub can_switch: bool,
    pub can_dim: bool,
    pub can_set_color_temperature: bool,
    pub can_read_temperature: bool,
    pub can_read_humidity: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        can_switch: false,
        can_dim: false,
        can_set_color_temperature: false,
        can_read_temperature: false,
        can_read_humidity: false,
    };

    pub const SWITCH: Capabilities = Capabilities {
        can_switch: true,
        ..Capabilities::NONE
    };

    pub const DIMMER: Capabilities = Capabilities {
        can_switch: true,
        can_dim: true,
        ..Capabilities::NONE
    };

    pub const ZIGBEE_LIGHT: Capabilities = Capabilities {
        can_switch: true,
        can_dim: true,
        can_set_color_temperature: true,
        ..Capabilities::NONE
    };

    pub const CLIMATE_SENSOR: Capabilities = Capabilities {
        can_read_temperature: true,
        can_read_humidity: true,
        ..Capabilities::NONE
    };
}

define_device_type! {
    Lamp = 1 => Capabilities::SWITCH,
    Dimmer = 2 => Capabilities::DIMMER,
    OpenClose = 3 => Capabilities::SWITCH,
    Zigbee = 12 => Capabilities::ZIGBEE_LIGHT,
    DimmableLamp = 24 => Capabilities::DIMMER,
    KakuSchakelaar = 41 => Capabilities::SWITCH,
    ZigbeeTemperatureHumiditySensor = 46 => Capabilities::CLIMATE_SENSOR,
}

impl DeviceType {
    /// Zigbee devices take the zigbee function codes for on/off and dimming.
    pub fn is_zigbee(&self) -> bool {
        matches!(
            self,
            DeviceType::Zigbee | DeviceType::ZigbeeTemperatureHumiditySensor
        )
    }
}

/// A device from the synced inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub id: u32,
    pub device_type: DeviceType,
}

impl DeviceRecord {
    pub fn capabilities(&self) -> Capabilities {
        self.device_type.capabilities()
    }

    /// Decode one decrypted inventory entry.
    ///
    /// Entries without `module.info` are not devices (scenes, rooms, ...).
    pub fn from_json(data: &Value) -> std::result::Result<Self, SkipReason> {
        let module = data.get("module").ok_or(SkipReason::NotADevice)?;
        if module.get("info").is_none() {
            return Err(SkipReason::NotADevice);
        }
        let name = module
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SkipReason::MissingField("name"))?;
        let id = module
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(SkipReason::MissingField("id"))?;
        let code = module
            .get("device")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(SkipReason::MissingField("device"))?;

        Ok(Self {
            name: name.to_string(),
            id,
            device_type: DeviceType::from_code(code),
        })
    }
}

/// Why an inventory entry was not turned into a device.
#[derive(Error, Debug, Clone)]
pub enum SkipReason {
    #[error("entry has no encrypted data field")]
    MissingData,
    #[error("could not decrypt entry: {0}")]
    Decrypt(Ics2000Error),
    #[error("decrypted entry is not JSON: {0}")]
    InvalidJson(String),
    #[error("entry is not a device")]
    NotADevice,
    #[error("device entry lacks '{0}'")]
    MissingField(&'static str),
}

/// An inventory entry that was not decoded, kept with the reason.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub raw: Value,
    pub reason: SkipReason,
}

/// Outcome of an inventory sync: decoded devices plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub devices: Vec<DeviceRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn decode_record(raw: &Value, cipher: &HubCipher) -> std::result::Result<DeviceRecord, SkipReason> {
    let data = raw
        .get("data")
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingData)?;
    let text = cipher.decrypt_base64(data).map_err(SkipReason::Decrypt)?;
    let json: Value =
        serde_json::from_str(&text).map_err(|e| SkipReason::InvalidJson(e.to_string()))?;
    DeviceRecord::from_json(&json)
}

/// Decrypt and decode every inventory entry returned by a sync.
pub fn decode_records(raw: &[Value], cipher: &HubCipher) -> SyncReport {
    let mut report = SyncReport::default();
    for entry in raw {
        match decode_record(entry, cipher) {
            Ok(device) => {
                debug!(
                    "{} : {} ({:?})",
                    device.name, device.id, device.device_type
                );
                report.devices.push(device);
            }
            Err(reason) => {
                match reason {
                    SkipReason::NotADevice => debug!("Skipping inventory entry: {}", reason),
                    _ => warn!("Skipping inventory entry: {}", reason),
                }
                report.skipped.push(SkippedRecord {
                    raw: entry.clone(),
                    reason,
                });
            }
        }
    }
    info!(
        "Decoded {} devices ({} entries skipped)",
        report.devices.len(),
        report.skipped.len()
    );
    report
}

/// Function values reported for an entity, in function-code order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    pub functions: Vec<Value>,
}

impl DeviceStatus {
    pub fn new(functions: Vec<Value>) -> Self {
        Self { functions }
    }

    /// Decode the reply of an `entity.php` get-multiple request.
    ///
    /// Anything other than one entry with a non-blank `status` yields an empty status.
    pub fn from_reply(reply: &[Value], cipher: &HubCipher) -> Result<Self> {
        let status = match reply {
            [entry] => match entry.get("status").and_then(Value::as_str) {
                Some(s) if !s.trim().is_empty() => s,
                _ => return Ok(Self::default()),
            },
            _ => return Ok(Self::default()),
        };

        let text = cipher.decrypt_base64(status)?;
        let json: Value = serde_json::from_str(&text)?;
        match json.get("module").and_then(|m| m.get("functions")) {
            Some(Value::Array(values)) => Ok(Self::new(values.clone())),
            Some(_) => Err(Ics2000Error::DecodeError(
                "status functions is not a list".into(),
            )),
            None => Ok(Self::default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn function(&self, index: usize) -> Option<f64> {
        self.functions.get(index).and_then(Value::as_f64)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.function(STATUS_INDEX_ON_OFF).map(|v| v == 1.0)
    }

    /// Temperature in degrees Celsius.
    pub fn temperature(&self) -> Option<f64> {
        self.function(STATUS_INDEX_TEMPERATURE).map(centi_to_unit)
    }

    /// Relative humidity in percent.
    pub fn humidity(&self) -> Option<f64> {
        self.function(STATUS_INDEX_HUMIDITY).map(centi_to_unit)
    }
}

/// Hundredths to units, rounded to two decimals.
fn centi_to_unit(raw: f64) -> f64 {
    let value = raw / 100.0;
    (value * 100.0).round() / 100.0
}
