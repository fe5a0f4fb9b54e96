//! Vendor cloud API client.
//! Thin wrappers around the `account.php`, `gateway.php`, `entity.php` and
//! `command.php` endpoints. All calls are plain GET requests with query parameters.

use crate::crypto::HubCipher;
use crate::error::{Ics2000Error, Result};
use crate::protocol::MacAddress;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://trustsmartcloud2.com/ics2000_api/";
pub const DEFAULT_DEVICE_UNIQUE_ID: &str = "android";
pub const DEFAULT_PLATFORM: &str = "Android";

const ENDPOINT_ACCOUNT: &str = "account.php";
const ENDPOINT_GATEWAY: &str = "gateway.php";
const ENDPOINT_ENTITY: &str = "entity.php";
const ENDPOINT_COMMAND: &str = "command.php";

const ACTION_LOGIN: &str = "login";
const ACTION_CHECK: &str = "check";
const ACTION_SYNC: &str = "sync";
const ACTION_GET_MULTIPLE: &str = "get-multiple";
const ACTION_ADD: &str = "add";

/// Account credentials sent with every cloud request.
#[derive(Clone)]
pub struct Credentials {
    pub mac: MacAddress,
    pub email: String,
    pub password_hash: String,
    pub device_unique_id: String,
    pub platform: String,
}

impl Credentials {
    pub fn new<E, P>(mac: MacAddress, email: E, password_hash: P) -> Self
    where
        E: Into<String>,
        P: Into<String>,
    {
        Self {
            mac,
            email: email.into(),
            password_hash: password_hash.into(),
            device_unique_id: DEFAULT_DEVICE_UNIQUE_ID.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mac", &self.mac)
            .field("email", &self.email)
            .field("device_unique_id", &self.device_unique_id)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub cipher: HubCipher,
    pub home_id: String,
}

#[derive(Deserialize)]
struct LoginReply {
    #[serde(default)]
    homes: Vec<HomeEntry>,
}

#[derive(Deserialize)]
struct HomeEntry {
    aes_key: Option<String>,
    #[serde(default)]
    home_id: Value,
}

/// CloudClient issues requests against the vendor API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl CloudClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    pub fn with_base_url<U: Into<String>>(credentials: Credentials, base_url: U) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    fn base_params(&self, action: &'static str) -> Vec<(&'static str, String)> {
        vec![
            ("action", action.to_string()),
            ("email", self.credentials.email.clone()),
            ("mac", self.credentials.mac.to_bare_hex()),
            ("password_hash", self.credentials.password_hash.clone()),
        ]
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<(StatusCode, String)> {
        let url = self.url(endpoint);
        debug!("GET {} (action={})", url, params[0].1);
        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} answered {} ({} bytes)", endpoint, status, body.len());
        Ok((status, body))
    }

    /// Logs in and returns the account AES key and home id.
    pub async fn login(&self) -> Result<Login> {
        debug!("Logging in user {}", self.credentials.email);
        let mut params = self.base_params(ACTION_LOGIN);
        params.push(("device_unique_id", self.credentials.device_unique_id.clone()));
        params.push(("platform", self.credentials.platform.clone()));

        let (status, body) = self.get(ENDPOINT_ACCOUNT, &params).await?;
        if status != StatusCode::OK {
            warn!("Login for {} rejected with {}", self.credentials.email, status);
            return Err(Ics2000Error::Authentication(format!(
                "Could not login user {}",
                self.credentials.email
            )));
        }

        let reply: LoginReply = serde_json::from_str(&body).map_err(|_| {
            Ics2000Error::Authentication(format!(
                "Unexpected login response for user {}",
                self.credentials.email
            ))
        })?;
        let home = reply.homes.into_iter().next();
        let (aes_key, home_id) = match home {
            Some(HomeEntry {
                aes_key: Some(key),
                home_id,
            }) => (key, home_id),
            _ => {
                return Err(Ics2000Error::Authentication(format!(
                    "Could not get AES key for user {}",
                    self.credentials.email
                )));
            }
        };

        let cipher = HubCipher::from_hex(&aes_key)?;
        let home_id = match home_id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        info!("Successfully got AES key (home {})", home_id);
        Ok(Login { cipher, home_id })
    }

    /// Asks the cloud whether a hub is registered for these credentials.
    pub async fn check_hub(&self) -> Result<bool> {
        let params = self.base_params(ACTION_CHECK);
        let (status, body) = self.get(ENDPOINT_GATEWAY, &params).await?;
        if status != StatusCode::OK {
            return Ok(false);
        }
        Ok(parse_check_reply(&body))
    }

    /// Pulls the encrypted device inventory.
    pub async fn sync(&self, home_id: &str) -> Result<Vec<Value>> {
        let mut params = self.base_params(ACTION_SYNC);
        params.push(("home_id", home_id.to_string()));
        let (_, body) = self.get(ENDPOINT_GATEWAY, &params).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches the encrypted status entries for one entity.
    pub async fn entity_status(&self, home_id: &str, entity_id: u32) -> Result<Vec<Value>> {
        let mut params = self.base_params(ACTION_GET_MULTIPLE);
        params.push(("home_id", home_id.to_string()));
        params.push(("entity_id", format!("[{}]", entity_id)));
        let (_, body) = self.get(ENDPOINT_ENTITY, &params).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Submits a hex-encoded command for the cloud to relay to the hub.
    pub async fn add_command(&self, command: &str) -> Result<()> {
        let mut params = self.base_params(ACTION_ADD);
        params.push(("device_unique_id", self.credentials.device_unique_id.clone()));
        params.push(("command", command.to_string()));

        let (status, body) = self.get(ENDPOINT_COMMAND, &params).await?;
        if status != StatusCode::OK {
            return Err(Ics2000Error::Transport {
                command: command.to_string(),
                response: body,
            });
        }
        Ok(())
    }
}

/// The check reply is a two-element list whose second entry is `"true"` for a known hub.
/// Single-quoted lists are accepted as well.
fn parse_check_reply(body: &str) -> bool {
    let parsed = serde_json::from_str::<Vec<Value>>(body)
        .or_else(|_| serde_json::from_str::<Vec<Value>>(&body.replace('\'', "\"")));
    match parsed {
        Ok(items) => match items.get(1) {
            Some(Value::String(s)) => s == "true",
            Some(Value::Bool(b)) => *b,
            _ => false,
        },
        Err(_) => false,
    }
}
