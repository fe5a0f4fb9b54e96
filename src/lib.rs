//! # ics2000
//!
//! Client for the Trust ICS-2000 home automation hub. Logs in to the vendor
//! cloud, decrypts the device inventory and controls lamps, dimmers, switches
//! and sensors, either directly over UDP once the hub is found on the local
//! network or relayed through the cloud.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ics2000::HubBuilder;
//!
//! # async fn run() -> ics2000::error::Result<()> {
//! let hub = HubBuilder::new("00:11:22:33:44:55", "me@example.com", "PASSWORD_HASH")
//!     .connect()
//!     .await?;
//! for device in hub.devices() {
//!     println!("{} ({})", device.name, device.id);
//! }
//! hub.turn_on(3).await?;
//! # Ok(())
//! # }
//! ```
//!
#[macro_use]
mod macros;
pub mod cloud;
pub mod crypto;
pub mod device;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod scanner;
pub mod sync;
pub mod transport;

pub use device::{Capabilities, DeviceRecord, DeviceStatus, DeviceType, SyncReport};
pub use error::Ics2000Error;
pub use hub::{Hub, HubBuilder};
pub use protocol::{Command, CommandValue, FunctionCode, MacAddress};
pub use scanner::Scanner;
pub use transport::Route;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_matches_package() {
        assert_eq!(super::version(), env!("CARGO_PKG_VERSION"));
    }
}
