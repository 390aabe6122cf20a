//! YAML configuration and descriptor files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BatchError, Result};

/// Main configuration file name.
pub const CONFIG_FILE: &str = "config.yaml";

/// Aliyun Drive share descriptors.
pub const ALIYUN_SHARE_FILE: &str = "aliyun_share.yaml";

/// PikPak share descriptors.
pub const PIKPAK_SHARE_FILE: &str = "pikpak_share.yaml";

/// OneDrive app descriptors.
pub const ONEDRIVE_APP_FILE: &str = "onedrive_app.yaml";

/// Templates written on first run, keyed by file name.
const TEMPLATES: &[(&str, &str)] = &[
    (CONFIG_FILE, include_str!("templates/config.yaml")),
    (ALIYUN_SHARE_FILE, include_str!("templates/aliyun_share.yaml")),
    (PIKPAK_SHARE_FILE, include_str!("templates/pikpak_share.yaml")),
    (ONEDRIVE_APP_FILE, include_str!("templates/onedrive_app.yaml")),
];

/// Descriptors grouped as `category -> name -> descriptor`.
///
/// Each entry becomes the mount `/category/name`.
pub type ShareList = BTreeMap<String, BTreeMap<String, String>>;

/// Look up an embedded template by file name.
pub fn template(filename: &str) -> Option<&'static str> {
    TEMPLATES
        .iter()
        .find(|(name, _)| *name == filename)
        .map(|(_, content)| *content)
}

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub url: String,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub aliyun_share: AliyunShareConfig,
    #[serde(default)]
    pub pikpak_share: PikPakShareConfig,
    #[serde(default)]
    pub onedrive_app: OnedriveAppConfig,
}

/// OpenList admin credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliyunShareConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PikPakShareConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub use_transcoding_address: bool,
}

impl Default for PikPakShareConfig {
    fn default() -> Self {
        Self {
            enable: false,
            username: String::new(),
            password: String::new(),
            platform: default_platform(),
            device_id: String::new(),
            use_transcoding_address: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnedriveAppConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

impl Default for OnedriveAppConfig {
    fn default() -> Self {
        Self {
            enable: false,
            region: default_region(),
            tenants: Vec::new(),
        }
    }
}

/// One Azure app registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub id: u32,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_platform() -> String {
    "android".to_string()
}

fn default_region() -> String {
    "global".to_string()
}

/// A value still holding its template placeholder counts as unset.
fn is_unset(value: &str, placeholder: &str) -> bool {
    value.is_empty() || value == placeholder
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if is_unset(&self.url, "OPENLIST_URL") {
            return Err(BatchError::InvalidConfig("url is not set".to_string()));
        }

        let has_auth = !is_unset(&self.auth.username, "USERNAME")
            && !is_unset(&self.auth.password, "PASSWORD");
        let has_token = !is_unset(&self.token, "OPENLIST_TOKEN");
        if !has_auth && !has_token {
            return Err(BatchError::InvalidConfig(
                "either token or auth username/password must be set".to_string(),
            ));
        }

        if self.aliyun_share.enable
            && is_unset(&self.aliyun_share.refresh_token, "ALI_YUNPAN_REFRESH_TOKEN")
        {
            return Err(BatchError::InvalidConfig(
                "aliyun_share requires refresh_token".to_string(),
            ));
        }

        if self.onedrive_app.enable {
            if self.onedrive_app.tenants.is_empty() {
                return Err(BatchError::InvalidConfig(
                    "onedrive_app requires at least one tenant".to_string(),
                ));
            }
            for (i, tenant) in self.onedrive_app.tenants.iter().enumerate() {
                if is_unset(&tenant.client_id, "CLIENT_ID")
                    || is_unset(&tenant.client_secret, "CLIENT_SECRET")
                    || is_unset(&tenant.tenant_id, "TENANT_ID")
                {
                    return Err(BatchError::InvalidConfig(format!(
                        "onedrive_app tenant #{} is incomplete",
                        i + 1
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Persists the main configuration, e.g. after a token refresh.
pub trait ConfigSaver: Send + Sync {
    fn save_config(&self, config: &Config) -> Result<()>;
}

/// Reads and writes configuration files inside a working directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    work_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        let work_dir = work_dir.as_ref();
        let work_dir = if work_dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            work_dir.to_path_buf()
        };
        Self { work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Load `config.yaml`.
    pub fn load_config(&self) -> Result<Config> {
        let content = fs::read_to_string(self.file_path(CONFIG_FILE))?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load a descriptor file.
    pub fn load_share_list(&self, filename: &str) -> Result<ShareList> {
        let content = fs::read_to_string(self.file_path(filename))?;
        // An empty or all-comment file parses as null.
        let list: Option<ShareList> = serde_yaml::from_str(&content)?;
        Ok(list.unwrap_or_default())
    }

    /// Write a descriptor file, replacing any existing one.
    pub fn save_share_list(&self, filename: &str, list: &ShareList) -> Result<()> {
        let content = serde_yaml::to_string(list)?;
        fs::write(self.file_path(filename), content)?;
        debug!(file = filename, categories = list.len(), "Saved share list");
        Ok(())
    }

    pub fn file_exists(&self, filename: &str) -> bool {
        self.file_path(filename).is_file()
    }

    /// Write the embedded template for `filename` into the working directory.
    pub fn generate_template(&self, filename: &str) -> Result<()> {
        let content =
            template(filename).ok_or_else(|| BatchError::TemplateNotFound(filename.to_string()))?;
        fs::write(self.file_path(filename), content)?;
        Ok(())
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.work_dir.join(filename)
    }
}

impl ConfigSaver for ConfigLoader {
    fn save_config(&self, config: &Config) -> Result<()> {
        let content = serde_yaml::to_string(config)?;
        fs::write(self.file_path(CONFIG_FILE), content)?;
        debug!(dir = %self.work_dir.display(), "Saved configuration");
        Ok(())
    }
}
