//! Blocking wrappers around the async session and scanner.
//!
//! Each call drives a private current-thread tokio runtime to completion,
//! so these types must not be used from inside another tokio runtime.

use crate::device::{DeviceRecord, DeviceStatus, SyncReport};
use crate::error::Result;
use crate::hub::{self, HubBuilder};
use crate::protocol::{Command, CommandValue, MacAddress};
use crate::scanner::Scanner;
use crate::transport::Route;
use std::net::IpAddr;
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Locate the hub with a blocking discovery run.
pub fn discover(scanner: &Scanner) -> Result<Option<IpAddr>> {
    runtime()?.block_on(scanner.discover())
}

/// Blocking counterpart of [`crate::Hub`].
pub struct Hub {
    runtime: Runtime,
    inner: hub::Hub,
}

impl Hub {
    pub fn connect(builder: HubBuilder) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(builder.connect())?;
        Ok(Self { runtime, inner })
    }

    pub fn connect_checked(builder: HubBuilder) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(builder.connect_checked())?;
        Ok(Self { runtime, inner })
    }

    /// Access the underlying async session.
    pub fn inner(&self) -> &hub::Hub {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut hub::Hub {
        &mut self.inner
    }

    pub fn mac(&self) -> &MacAddress {
        self.inner.mac()
    }

    pub fn home_id(&self) -> &str {
        self.inner.home_id()
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        self.inner.devices()
    }

    pub fn device(&self, id: u32) -> Result<&DeviceRecord> {
        self.inner.device(id)
    }

    pub fn local_ip(&self) -> Option<IpAddr> {
        self.inner.local_ip()
    }

    pub fn set_local_ip(&mut self, ip: Option<IpAddr>) {
        self.inner.set_local_ip(ip);
    }

    pub fn route(&self) -> Route {
        self.inner.route()
    }

    pub fn pull_devices(&mut self) -> Result<SyncReport> {
        self.runtime.block_on(self.inner.pull_devices())
    }

    pub fn rediscover(&mut self) -> Option<IpAddr> {
        self.runtime.block_on(self.inner.rediscover())
    }

    pub fn simple_command(
        &self,
        entity: u32,
        function: impl Into<u32>,
        value: impl Into<CommandValue>,
    ) -> Result<Command> {
        self.inner.simple_command(entity, function, value)
    }

    pub fn send_command(&self, command: &Command) -> Result<()> {
        self.runtime.block_on(self.inner.send_command(command))
    }

    pub fn turn_on(&self, entity: u32) -> Result<()> {
        self.runtime.block_on(self.inner.turn_on(entity))
    }

    pub fn turn_off(&self, entity: u32) -> Result<()> {
        self.runtime.block_on(self.inner.turn_off(entity))
    }

    pub fn dim(&self, entity: u32, level: i64) -> Result<()> {
        self.runtime.block_on(self.inner.dim(entity, level))
    }

    pub fn zigbee_color_temp(&self, entity: u32, color_temp: i64) -> Result<()> {
        self.runtime
            .block_on(self.inner.zigbee_color_temp(entity, color_temp))
    }

    pub fn zigbee_dim(&self, entity: u32, dim_level: i64) -> Result<()> {
        self.runtime.block_on(self.inner.zigbee_dim(entity, dim_level))
    }

    pub fn zigbee_switch(&self, entity: u32, power: bool) -> Result<()> {
        self.runtime.block_on(self.inner.zigbee_switch(entity, power))
    }

    pub fn switch(&self, id: u32, on: bool) -> Result<()> {
        self.runtime.block_on(self.inner.switch(id, on))
    }

    pub fn set_level(&self, id: u32, level: i64) -> Result<()> {
        self.runtime.block_on(self.inner.set_level(id, level))
    }

    pub fn set_color_temperature(&self, id: u32, color_temp: i64) -> Result<()> {
        self.runtime
            .block_on(self.inner.set_color_temperature(id, color_temp))
    }

    pub fn device_status(&self, entity: u32) -> Result<DeviceStatus> {
        self.runtime.block_on(self.inner.device_status(entity))
    }

    pub fn lamp_status(&self, entity: u32) -> Result<bool> {
        self.runtime.block_on(self.inner.lamp_status(entity))
    }

    pub fn temperature(&self, entity: u32) -> Result<f64> {
        self.runtime.block_on(self.inner.temperature(entity))
    }

    pub fn humidity(&self, entity: u32) -> Result<f64> {
        self.runtime.block_on(self.inner.humidity(entity))
    }
}
