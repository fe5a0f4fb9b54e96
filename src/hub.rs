//! Hub session: credentials, AES key, inventory and the discovered local address.
//! Orchestrates encode, route selection and delivery for every device operation.

use crate::cloud::{CloudClient, Credentials, DEFAULT_BASE_URL};
use crate::crypto::HubCipher;
use crate::device::{Capabilities, DeviceRecord, DeviceStatus, SyncReport, decode_records};
use crate::error::{Ics2000Error, Result};
use crate::protocol::{
    COLOR_TEMPERATURE_MAX, COLOR_TEMPERATURE_MIN, Command, CommandValue, FunctionCode, HUB_PORT,
    MacAddress, ZIGBEE_DIM_MAX, ZIGBEE_DIM_MIN, constrain,
};
use crate::scanner::Scanner;
use crate::transport::{Route, deliver};
use log::{debug, info, warn};
use std::net::IpAddr;
use tokio::time::Duration;

/// Highest level accepted by classic (non-zigbee) dimmers.
pub const DIMMER_LEVEL_MAX: i64 = 15;

const SENTINEL_READING: f64 = -1.0;

/// Configures and opens a [`Hub`] session.
#[derive(Debug, Clone)]
pub struct HubBuilder {
    mac: String,
    email: String,
    password_hash: String,
    base_url: String,
    device_unique_id: Option<String>,
    platform: Option<String>,
    local_ip: Option<IpAddr>,
    discovery: bool,
    scanner: Scanner,
    local_port: u16,
}

impl HubBuilder {
    pub fn new<M, E, P>(mac: M, email: E, password_hash: P) -> Self
    where
        M: Into<String>,
        E: Into<String>,
        P: Into<String>,
    {
        Self {
            mac: mac.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            device_unique_id: None,
            platform: None,
            local_ip: None,
            discovery: true,
            scanner: Scanner::new(),
            local_port: HUB_PORT,
        }
    }

    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn device_unique_id<S: Into<String>>(mut self, id: S) -> Self {
        self.device_unique_id = Some(id.into());
        self
    }

    pub fn platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Pin the hub address and skip discovery.
    pub fn local_ip(mut self, ip: IpAddr) -> Self {
        self.local_ip = Some(ip);
        self
    }

    /// Enable or disable local discovery. Disabled means every command goes through the cloud.
    pub fn discovery(mut self, enabled: bool) -> Self {
        self.discovery = enabled;
        self
    }

    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.scanner = self.scanner.with_timeout(timeout);
        self
    }

    /// Replace the scanner used for discovery.
    pub fn scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// UDP port local commands are sent to.
    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    fn cloud_client(&self) -> Result<CloudClient> {
        let mac: MacAddress = self.mac.parse()?;
        let mut credentials = Credentials::new(mac, &self.email, &self.password_hash);
        if let Some(id) = &self.device_unique_id {
            credentials.device_unique_id = id.clone();
        }
        if let Some(platform) = &self.platform {
            credentials.platform = platform.clone();
        }
        Ok(CloudClient::with_base_url(credentials, &self.base_url))
    }

    /// Log in, pull the device inventory and locate the hub on the local network.
    ///
    /// Login failures abort. A discovery miss is not an error: the session then
    /// relays commands through the cloud.
    pub async fn connect(self) -> Result<Hub> {
        let cloud = self.cloud_client()?;
        let login = cloud.login().await?;

        let mut hub = Hub {
            mac: cloud.credentials().mac,
            cloud,
            cipher: login.cipher,
            home_id: login.home_id,
            devices: Vec::new(),
            local_ip: self.local_ip,
            scanner: self.scanner,
            local_port: self.local_port,
            discovery: self.discovery,
        };

        hub.pull_devices().await?;

        if hub.local_ip.is_none() && hub.discovery {
            hub.rediscover().await;
        }
        info!(
            "Hub {} ready: {} devices, local address {:?}",
            hub.mac,
            hub.devices.len(),
            hub.local_ip
        );
        Ok(hub)
    }

    /// Confirm with the cloud that a hub exists for these credentials, then connect.
    pub async fn connect_checked(self) -> Result<Hub> {
        let cloud = self.cloud_client()?;
        if !cloud.check_hub().await? {
            return Err(Ics2000Error::HubNotFound(format!(
                "{}/{}",
                self.mac, self.email
            )));
        }
        self.connect().await
    }
}

/// An authenticated session with one hub.
///
/// Not meant for concurrent mutation: operations that change the inventory or
/// the local address take `&mut self`.
#[derive(Debug)]
pub struct Hub {
    mac: MacAddress,
    cloud: CloudClient,
    cipher: HubCipher,
    home_id: String,
    devices: Vec<DeviceRecord>,
    local_ip: Option<IpAddr>,
    scanner: Scanner,
    local_port: u16,
    discovery: bool,
}

// -------------------------------------------------------------------------
// Session state
// -------------------------------------------------------------------------
impl Hub {
    pub fn mac(&self) -> &MacAddress {
        &self.mac
    }

    pub fn home_id(&self) -> &str {
        &self.home_id
    }

    pub fn local_ip(&self) -> Option<IpAddr> {
        self.local_ip
    }

    /// Override the hub address; `None` forces cloud delivery.
    pub fn set_local_ip(&mut self, ip: Option<IpAddr>) {
        self.local_ip = ip;
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn device(&self, id: u32) -> Result<&DeviceRecord> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or(Ics2000Error::DeviceNotFound(id))
    }

    /// Re-pull the inventory, replacing the current list in one step.
    pub async fn pull_devices(&mut self) -> Result<SyncReport> {
        let raw = self.cloud.sync(&self.home_id).await?;
        let report = decode_records(&raw, &self.cipher);
        self.devices = report.devices.clone();
        Ok(report)
    }

    /// Run discovery again, e.g. after the hub got a new DHCP lease.
    ///
    /// Socket failures during discovery are treated like a miss.
    pub async fn rediscover(&mut self) -> Option<IpAddr> {
        self.local_ip = match self.scanner.discover().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Discovery failed, falling back to cloud: {}", e);
                None
            }
        };
        self.local_ip
    }

    /// Route the next command would take.
    pub fn route(&self) -> Route {
        Route::select(self.local_ip, self.local_port)
    }
}

// -------------------------------------------------------------------------
// Commands
// -------------------------------------------------------------------------
impl Hub {
    /// Build a command for `entity` under the session key.
    pub fn simple_command(
        &self,
        entity: u32,
        function: impl Into<u32>,
        value: impl Into<CommandValue>,
    ) -> Result<Command> {
        Command::new(self.mac, entity, function, value, &self.cipher)
    }

    /// Deliver a command over the currently selected route.
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        deliver(self.route(), command, &self.cloud).await
    }

    async fn run(
        &self,
        entity: u32,
        function: FunctionCode,
        value: impl Into<CommandValue>,
    ) -> Result<()> {
        let value = value.into();
        debug!(
            "Entity {}: function {:?} value {:?}",
            entity, function, value
        );
        let command = self.simple_command(entity, function, value)?;
        self.send_command(&command).await
    }

    pub async fn turn_on(&self, entity: u32) -> Result<()> {
        self.run(entity, FunctionCode::Power, 1).await
    }

    pub async fn turn_off(&self, entity: u32) -> Result<()> {
        self.run(entity, FunctionCode::Power, 0).await
    }

    /// Dim a classic dimmer. The level is sent as is.
    pub async fn dim(&self, entity: u32, level: i64) -> Result<()> {
        self.run(entity, FunctionCode::Dim, level).await
    }

    /// Colour temperature of a zigbee light, clamped to `[0, 600]`.
    pub async fn zigbee_color_temp(&self, entity: u32, color_temp: i64) -> Result<()> {
        let value = constrain(color_temp, COLOR_TEMPERATURE_MIN, COLOR_TEMPERATURE_MAX);
        self.run(entity, FunctionCode::ZigbeeColorTemperature, value)
            .await
    }

    /// Dim level of a zigbee light, clamped to `[1, 254]`.
    pub async fn zigbee_dim(&self, entity: u32, dim_level: i64) -> Result<()> {
        let value = constrain(dim_level, ZIGBEE_DIM_MIN, ZIGBEE_DIM_MAX);
        self.run(entity, FunctionCode::ZigbeeDim, value).await
    }

    /// Zigbee on/off. The value travels as the string `"1"` or `"0"`.
    pub async fn zigbee_switch(&self, entity: u32, power: bool) -> Result<()> {
        let value = if power { "1" } else { "0" };
        self.run(entity, FunctionCode::ZigbeeSwitch, value).await
    }
}

// -------------------------------------------------------------------------
// Capability-checked device control
// -------------------------------------------------------------------------
impl Hub {
    fn require(
        &self,
        id: u32,
        check: fn(&Capabilities) -> bool,
        operation: &'static str,
    ) -> Result<&DeviceRecord> {
        let device = self.device(id)?;
        if !check(&device.capabilities()) {
            return Err(Ics2000Error::Unsupported { id, operation });
        }
        Ok(device)
    }

    /// Switch a device on or off with the encoding its type expects.
    pub async fn switch(&self, id: u32, on: bool) -> Result<()> {
        let device = self.require(id, |c| c.can_switch, "switching")?;
        if device.device_type.is_zigbee() {
            self.zigbee_switch(id, on).await
        } else if on {
            self.turn_on(id).await
        } else {
            self.turn_off(id).await
        }
    }

    /// Set the brightness of a dimmable device.
    ///
    /// Classic dimmers take `0..=15`; zigbee lights take `1..=254`. Levels are clamped.
    pub async fn set_level(&self, id: u32, level: i64) -> Result<()> {
        let device = self.require(id, |c| c.can_dim, "dimming")?;
        if device.device_type.is_zigbee() {
            self.zigbee_dim(id, level).await
        } else {
            self.dim(id, constrain(level, 0, DIMMER_LEVEL_MAX)).await
        }
    }

    pub async fn set_color_temperature(&self, id: u32, color_temp: i64) -> Result<()> {
        self.require(id, |c| c.can_set_color_temperature, "colour temperature")?;
        self.zigbee_color_temp(id, color_temp).await
    }
}

// -------------------------------------------------------------------------
// Status
// -------------------------------------------------------------------------
impl Hub {
    /// Fetch and decrypt the function values of an entity.
    pub async fn device_status(&self, entity: u32) -> Result<DeviceStatus> {
        let reply = self.cloud.entity_status(&self.home_id, entity).await?;
        DeviceStatus::from_reply(&reply, &self.cipher)
    }

    /// On/off state; `false` when the cloud reports nothing.
    pub async fn lamp_status(&self, entity: u32) -> Result<bool> {
        Ok(self.device_status(entity).await?.is_on().unwrap_or(false))
    }

    /// Temperature in °C; `-1.0` when the cloud reports nothing.
    pub async fn temperature(&self, entity: u32) -> Result<f64> {
        Ok(self
            .device_status(entity)
            .await?
            .temperature()
            .unwrap_or(SENTINEL_READING))
    }

    /// Relative humidity in %; `-1.0` when the cloud reports nothing.
    pub async fn humidity(&self, entity: u32) -> Result<f64> {
        Ok(self
            .device_status(entity)
            .await?
            .humidity()
            .unwrap_or(SENTINEL_READING))
    }
}
