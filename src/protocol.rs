//! ICS-2000 command wire format.
//! Builds the fixed 43-byte header around an encrypted JSON instruction body.

use crate::crypto::HubCipher;
use crate::error::{Ics2000Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// UDP port the hub listens on for discovery and local commands.
pub const HUB_PORT: u16 = 2012;

pub const HEADER_LEN: usize = 43;
pub const COMMAND_TYPE_CONTROL: u8 = 128;
pub const COMMAND_MAGIC: u32 = 653213;

const OFFSET_FRAME: usize = 0;
const OFFSET_TYPE: usize = 2;
const OFFSET_MAC: usize = 3;
const OFFSET_MAGIC: usize = 9;
const OFFSET_ENTITY: usize = 29;
const OFFSET_LENGTH: usize = 41;

pub const COLOR_TEMPERATURE_MIN: i64 = 0;
pub const COLOR_TEMPERATURE_MAX: i64 = 600;
pub const ZIGBEE_DIM_MIN: i64 = 1;
pub const ZIGBEE_DIM_MAX: i64 = 254;

define_function_code! {
    Power = 0,
    Dim = 1,
    ZigbeeSwitch = 3,
    ZigbeeDim = 4,
    ZigbeeColorTemperature = 9,
}

/// Saturating clamp into `[min, max]`.
pub fn constrain<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Hardware address of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Bare lowercase hex, as the cloud API expects it.
    pub fn to_bare_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for MacAddress {
    type Err = Ics2000Error;

    /// Accepts `AA:BB:CC:DD:EE:FF` or bare `AABBCCDDEEFF`.
    fn from_str(s: &str) -> Result<Self> {
        let bare: String = s.trim().chars().filter(|c| *c != ':').collect();
        if bare.len() != 12 {
            return Err(Ics2000Error::InvalidMac(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&bare, &mut bytes)
            .map_err(|_| Ics2000Error::InvalidMac(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "{}", parts.join(":"))
    }
}

/// Scalar carried in the `value` field of a command body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandValue {
    Int(i64),
    Text(String),
}

impl From<i64> for CommandValue {
    fn from(v: i64) -> Self {
        CommandValue::Int(v)
    }
}

impl From<i32> for CommandValue {
    fn from(v: i32) -> Self {
        CommandValue::Int(v.into())
    }
}

impl From<u32> for CommandValue {
    fn from(v: u32) -> Self {
        CommandValue::Int(v.into())
    }
}

impl From<&str> for CommandValue {
    fn from(v: &str) -> Self {
        CommandValue::Text(v.to_string())
    }
}

impl From<String> for CommandValue {
    fn from(v: String) -> Self {
        CommandValue::Text(v)
    }
}

#[derive(Serialize)]
struct ModuleBody<'a> {
    module: ModuleFields<'a>,
}

#[derive(Serialize)]
struct ModuleFields<'a> {
    id: u32,
    function: u32,
    value: &'a CommandValue,
}

/// A single control instruction addressed to one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub frame: u8,
    pub mac: MacAddress,
    pub command_type: u8,
    pub magic: u32,
    pub entity_id: u32,
    /// `IV + ciphertext` of the JSON body
    pub encrypted_payload: Vec<u8>,
}

impl Command {
    /// Build a control command, encrypting its body under `cipher`.
    pub fn new(
        mac: MacAddress,
        entity_id: u32,
        function: impl Into<u32>,
        value: impl Into<CommandValue>,
        cipher: &HubCipher,
    ) -> Result<Self> {
        let body = Self::body(entity_id, function.into(), &value.into())?;
        let encrypted_payload = cipher.encrypt(body.as_bytes())?;
        if encrypted_payload.len() > u16::MAX as usize {
            return Err(Ics2000Error::PayloadTooLarge(encrypted_payload.len()));
        }
        Ok(Self {
            frame: 0,
            mac,
            command_type: COMMAND_TYPE_CONTROL,
            magic: COMMAND_MAGIC,
            entity_id,
            encrypted_payload,
        })
    }

    /// Compact JSON instruction body, e.g. `{"module":{"id":3,"function":0,"value":1}}`.
    pub fn body(entity_id: u32, function: u32, value: &CommandValue) -> Result<String> {
        let body = ModuleBody {
            module: ModuleFields {
                id: entity_id,
                function,
                value,
            },
        };
        Ok(serde_json::to_string(&body)?)
    }

    /// Serialize to the binary packet sent over UDP.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload_len = u16::try_from(self.encrypted_payload.len())
            .map_err(|_| Ics2000Error::PayloadTooLarge(self.encrypted_payload.len()))?;
        let mut header = [0u8; HEADER_LEN];
        header[OFFSET_FRAME] = self.frame;
        header[OFFSET_TYPE] = self.command_type;
        header[OFFSET_MAC..OFFSET_MAC + 6].copy_from_slice(self.mac.bytes());
        LittleEndian::write_u32(&mut header[OFFSET_MAGIC..OFFSET_MAGIC + 4], self.magic);
        LittleEndian::write_u32(
            &mut header[OFFSET_ENTITY..OFFSET_ENTITY + 4],
            self.entity_id,
        );
        LittleEndian::write_u16(&mut header[OFFSET_LENGTH..OFFSET_LENGTH + 2], payload_len);

        let mut data = Vec::with_capacity(HEADER_LEN + self.encrypted_payload.len());
        data.extend_from_slice(&header);
        data.extend_from_slice(&self.encrypted_payload);
        Ok(data)
    }

    /// Hex form submitted to the cloud `command.php` endpoint.
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Parse a binary packet back into its fields.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Ics2000Error::DecodeError("Header too short".into()));
        }
        let payload_len =
            LittleEndian::read_u16(&data[OFFSET_LENGTH..OFFSET_LENGTH + 2]) as usize;
        if data.len() != HEADER_LEN + payload_len {
            return Err(Ics2000Error::DecodeError(format!(
                "Length field says {} payload bytes, packet carries {}",
                payload_len,
                data.len() - HEADER_LEN
            )));
        }

        let mut mac = [0u8; 6];
        mac.copy_from_slice(&data[OFFSET_MAC..OFFSET_MAC + 6]);

        Ok(Self {
            frame: data[OFFSET_FRAME],
            mac: MacAddress(mac),
            command_type: data[OFFSET_TYPE],
            magic: LittleEndian::read_u32(&data[OFFSET_MAGIC..OFFSET_MAGIC + 4]),
            entity_id: LittleEndian::read_u32(&data[OFFSET_ENTITY..OFFSET_ENTITY + 4]),
            encrypted_payload: data[HEADER_LEN..].to_vec(),
        })
    }

    /// Decrypt the JSON body.
    pub fn decrypt_body(&self, cipher: &HubCipher) -> Result<Value> {
        let plaintext = cipher.decrypt(&self.encrypted_payload)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Encode one control instruction into a ready-to-send packet.
pub fn encode(
    mac: &MacAddress,
    entity_id: u32,
    function: impl Into<u32>,
    value: impl Into<CommandValue>,
    cipher: &HubCipher,
) -> Result<Vec<u8>> {
    Command::new(*mac, entity_id, function, value, cipher)?.to_bytes()
}
