//! Data models for the OpenList admin API.

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BatchError, Result};

/// Driver name OpenList uses for Aliyun Drive share mounts.
pub const ALIYUN_SHARE_DRIVER: &str = "AliyundriveShare";

/// Driver name OpenList uses for PikPak share mounts.
pub const PIKPAK_SHARE_DRIVER: &str = "PikPakShare";

/// Driver name OpenList uses for OneDrive app (client credential) mounts.
pub const ONEDRIVE_APP_DRIVER: &str = "OnedriveAPP";

/// Envelope returned by every OpenList endpoint.
///
/// `code == 200` is the only success signal; the HTTP status is not consulted.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Decode the untyped `data` field into a concrete shape.
    pub fn decode_data<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }

    /// Turn a logical failure into an [`BatchError::ApiError`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BatchError::ApiError {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `data` of a successful login.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `data` of `GET /api/admin/storage/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageList {
    #[serde(default)]
    pub content: Vec<StorageItem>,
    #[serde(default)]
    pub total: u64,
}

/// A storage mount as reported by the remote service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageItem {
    pub id: u64,
    pub mount_path: String,
    pub order: i64,
    pub driver: String,
    pub cache_expiration: i64,
    pub status: String,
    pub addition: String,
    pub remark: String,
    pub modified: Option<DateTime<FixedOffset>>,
    pub disabled: bool,
    pub disable_index: bool,
    pub enable_sign: bool,
    pub order_by: String,
    pub order_direction: String,
    pub extract_folder: String,
    pub web_proxy: bool,
    pub webdav_policy: String,
    pub proxy_range: bool,
    pub down_proxy_url: String,
    pub disable_proxy_sign: bool,
}

impl std::fmt::Display for StorageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.disabled { "disabled" } else { "enabled" };
        let status = if self.status.is_empty() { "-" } else { &self.status };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.id, self.driver, state, status, self.mount_path
        )
    }
}

/// Body of `POST /api/admin/storage/create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageRequest {
    pub mount_path: String,
    pub order: i64,
    pub remark: String,
    pub cache_expiration: i64,
    pub web_proxy: bool,
    pub webdav_policy: String,
    pub down_proxy_url: String,
    pub proxy_range: bool,
    pub disable_proxy_sign: bool,
    pub order_by: String,
    pub order_direction: String,
    pub extract_folder: String,
    pub disable_index: bool,
    pub enable_sign: bool,
    pub driver: String,
    /// Driver specific settings, serialized as a JSON string.
    pub addition: String,
}

/// Body of `POST /api/admin/storage/update`: a full request plus the target id.
#[derive(Debug, Clone, Serialize)]
pub struct StorageUpdateRequest {
    pub id: u64,
    pub status: String,
    #[serde(flatten)]
    pub request: StorageRequest,
}

/// Addition payload of an `AliyundriveShare` mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliyunShareAddition {
    pub refresh_token: String,
    pub share_id: String,
    #[serde(default)]
    pub share_pwd: String,
    #[serde(default)]
    pub root_folder_id: String,
    #[serde(default)]
    pub order_by: String,
    #[serde(default)]
    pub order_direction: String,
}

/// Addition payload of a `PikPakShare` mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PikPakShareAddition {
    #[serde(default)]
    pub root_folder_id: String,
    pub share_id: String,
    #[serde(default)]
    pub share_pwd: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub use_transcoding_address: bool,
}

/// Addition payload of an `OnedriveAPP` mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnedriveAppAddition {
    #[serde(default)]
    pub root_folder_path: String,
    #[serde(default)]
    pub region: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub tenant_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub chunk_size: u32,
}

/// The `addition` field of a mount, decoded according to its driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Addition {
    AliyunShare(AliyunShareAddition),
    PikPakShare(PikPakShareAddition),
    OnedriveApp(OnedriveAppAddition),
}

impl Addition {
    pub fn driver(&self) -> &'static str {
        match self {
            Self::AliyunShare(_) => ALIYUN_SHARE_DRIVER,
            Self::PikPakShare(_) => PIKPAK_SHARE_DRIVER,
            Self::OnedriveApp(_) => ONEDRIVE_APP_DRIVER,
        }
    }

    /// Serialize the payload into the string form stored in `addition`.
    pub fn encode(&self) -> Result<String> {
        let encoded = match self {
            Self::AliyunShare(a) => serde_json::to_string(a)?,
            Self::PikPakShare(a) => serde_json::to_string(a)?,
            Self::OnedriveApp(a) => serde_json::to_string(a)?,
        };
        Ok(encoded)
    }

    /// Decode a raw `addition` string using the shape registered for `driver`.
    pub fn decode(driver: &str, raw: &str) -> Result<Self> {
        match driver {
            ALIYUN_SHARE_DRIVER => Ok(Self::AliyunShare(serde_json::from_str(raw)?)),
            PIKPAK_SHARE_DRIVER => Ok(Self::PikPakShare(serde_json::from_str(raw)?)),
            ONEDRIVE_APP_DRIVER => Ok(Self::OnedriveApp(serde_json::from_str(raw)?)),
            other => Err(BatchError::UnsupportedDriver(other.to_string())),
        }
    }
}
