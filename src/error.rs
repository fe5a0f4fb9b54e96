//! Error types and result definitions for the ics2000 crate.
//! Includes hub-specific error codes and conversion from IO/JSON/HTTP errors.

use thiserror::Error;

/// Represents all possible errors that can occur when talking to the hub or its cloud.
#[derive(Error, Debug, Clone)]
pub enum Ics2000Error {
    /// Standard IO error (socket setup, send failure, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request could not be completed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Login was rejected or returned no AES key
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The cloud rejected a submitted command
    #[error("Could not send command {command}: {response}")]
    Transport { command: String, response: String },

    /// The gateway check did not confirm a hub for this account
    #[error("No hub found for mac/user {0}")]
    HubNotFound(String),

    /// MAC address is not 6 colon-separated hex octets
    #[error("Invalid MAC address '{0}'")]
    InvalidMac(String),

    /// AES key is not 16 bytes of hex
    #[error("Invalid AES key")]
    InvalidKey,

    /// Failed to encrypt a command payload
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Failed to decrypt cloud data (wrong key or corrupt blob)
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Command payload does not fit the 16-bit length field
    #[error("Payload of {0} bytes exceeds the packet length field")]
    PayloadTooLarge(usize),

    /// Failed to decode hex, base64 or a binary packet
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Entity id not present in the synced inventory
    #[error("Device {0} not found")]
    DeviceNotFound(u32),

    /// The device's type does not support the requested operation
    #[error("Device {id} does not support {operation}")]
    Unsupported { id: u32, operation: &'static str },
}

/// A specialized Result type for hub operations.
pub type Result<T> = std::result::Result<T, Ics2000Error>;

impl From<std::io::Error> for Ics2000Error {
    fn from(err: std::io::Error) -> Self {
        Ics2000Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Ics2000Error {
    fn from(err: serde_json::Error) -> Self {
        Ics2000Error::Json(err.to_string())
    }
}

impl From<reqwest::Error> for Ics2000Error {
    fn from(err: reqwest::Error) -> Self {
        Ics2000Error::Http(err.without_url().to_string())
    }
}

impl From<hex::FromHexError> for Ics2000Error {
    fn from(err: hex::FromHexError) -> Self {
        Ics2000Error::DecodeError(err.to_string())
    }
}

impl From<base64::DecodeError> for Ics2000Error {
    fn from(err: base64::DecodeError) -> Self {
        Ics2000Error::DecodeError(err.to_string())
    }
}

impl Ics2000Error {
    pub fn code(&self) -> u32 {
        match self {
            Ics2000Error::Io(_) => ERR_CONNECT,
            Ics2000Error::Json(_) => ERR_JSON,
            Ics2000Error::Http(_) => ERR_CONNECT,
            Ics2000Error::Authentication(_) => ERR_AUTH,
            Ics2000Error::Transport { .. } => ERR_CLOUD,
            Ics2000Error::HubNotFound(_) => ERR_NO_HUB,
            Ics2000Error::InvalidMac(_) => ERR_PARAMS,
            Ics2000Error::InvalidKey => ERR_KEY,
            Ics2000Error::EncryptionFailed => ERR_KEY,
            Ics2000Error::DecryptionFailed => ERR_KEY,
            Ics2000Error::PayloadTooLarge(_) => ERR_PAYLOAD,
            Ics2000Error::DecodeError(_) => ERR_PAYLOAD,
            Ics2000Error::DeviceNotFound(_) => ERR_DEVICE,
            Ics2000Error::Unsupported { .. } => ERR_FUNCTION,
        }
    }

    /// True for errors raised while establishing a session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Ics2000Error::Authentication(_) | Ics2000Error::HubNotFound(_) | Ics2000Error::InvalidKey
        )
    }
}

define_error_codes! {
    ERR_SUCCESS = 0 => "Success",
    ERR_JSON = 900 => "Invalid JSON Response",
    ERR_CONNECT = 901 => "Network Error: Unable to Connect",
    ERR_PAYLOAD = 904 => "Unexpected Payload",
    ERR_FUNCTION = 907 => "Function Not Supported by Device",
    ERR_PARAMS = 912 => "Invalid Parameters",
    ERR_CLOUD = 913 => "Error Response from Cloud",
    ERR_KEY = 914 => "Check AES key",
    ERR_AUTH = 920 => "Login Failed",
    ERR_NO_HUB = 921 => "Hub Not Found",
    ERR_DEVICE = 922 => "Device Not Found",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_command_and_response() {
        let err = Ics2000Error::Transport {
            command: "0a0b".into(),
            response: "denied".into(),
        };
        assert_eq!(err.to_string(), "Could not send command 0a0b: denied");
        assert_eq!(err.code(), ERR_CLOUD);
    }

    #[test]
    fn error_messages_resolve() {
        assert_eq!(get_error_message(ERR_AUTH), "Login Failed");
        assert_eq!(get_error_message(12345), "Unknown Error");
    }

    #[test]
    fn fatal_errors() {
        assert!(Ics2000Error::Authentication("x".into()).is_fatal());
        assert!(!Ics2000Error::DeviceNotFound(3).is_fatal());
    }
}
