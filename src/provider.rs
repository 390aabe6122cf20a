//! Storage providers: turn a descriptor string into an OpenList mount request.

use tracing::debug;

use crate::config::Tenant;
use crate::error::{BatchError, Result};
use crate::models::{
    Addition, AliyunShareAddition, OnedriveAppAddition, PikPakShareAddition, StorageItem,
    StorageRequest, ALIYUN_SHARE_DRIVER, ONEDRIVE_APP_DRIVER, PIKPAK_SHARE_DRIVER,
};
use crate::url_parser::{
    aliyun_share_url, parse_aliyun_share, parse_pikpak_share, pikpak_share_url, ShareLink,
};

/// Cache TTL (minutes) given to every new mount.
pub const DEFAULT_CACHE_EXPIRATION: i64 = 30;

/// WebDAV policy given to every new mount.
pub const DEFAULT_WEBDAV_POLICY: &str = "302_redirect";

/// Upload chunk size (MB) for OneDrive app mounts.
pub const ONEDRIVE_CHUNK_SIZE: u32 = 5;

/// A backend whose mounts can be created from a descriptor string.
pub trait Provider: Send + Sync {
    /// Human readable label used in log lines.
    fn name(&self) -> &str;

    /// Driver identifier expected by OpenList.
    fn driver(&self) -> &'static str;

    /// Parse `descriptor` and build the mount request for `mount_path`.
    fn build_request(&self, mount_path: &str, descriptor: &str) -> Result<StorageRequest>;
}

/// A provider whose existing mounts can have their credential replaced.
pub trait UpdatableProvider: Provider {
    fn build_update_request(&self, item: &StorageItem, new_credential: &str) -> Result<StorageRequest>;
}

/// Fill the fixed defaults around an encoded addition.
fn new_request(mount_path: &str, addition: &Addition) -> Result<StorageRequest> {
    Ok(StorageRequest {
        mount_path: mount_path.to_string(),
        order: 0,
        remark: String::new(),
        cache_expiration: DEFAULT_CACHE_EXPIRATION,
        web_proxy: false,
        webdav_policy: DEFAULT_WEBDAV_POLICY.to_string(),
        down_proxy_url: String::new(),
        proxy_range: false,
        disable_proxy_sign: false,
        order_by: String::new(),
        order_direction: String::new(),
        extract_folder: String::new(),
        disable_index: false,
        enable_sign: false,
        driver: addition.driver().to_string(),
        addition: addition.encode()?,
    })
}

/// Aliyun Drive share links, mounted with a shared refresh token.
#[derive(Debug, Clone)]
pub struct AliyunShare {
    refresh_token: String,
}

impl AliyunShare {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

impl Provider for AliyunShare {
    fn name(&self) -> &str {
        "Aliyun Drive"
    }

    fn driver(&self) -> &'static str {
        ALIYUN_SHARE_DRIVER
    }

    fn build_request(&self, mount_path: &str, descriptor: &str) -> Result<StorageRequest> {
        let link = parse_aliyun_share(descriptor)?;
        let addition = Addition::AliyunShare(AliyunShareAddition {
            refresh_token: self.refresh_token.clone(),
            share_id: link.share_id,
            share_pwd: link.password,
            root_folder_id: link.folder_id,
            order_by: String::new(),
            order_direction: String::new(),
        });
        new_request(mount_path, &addition)
    }
}

impl UpdatableProvider for AliyunShare {
    fn build_update_request(&self, item: &StorageItem, new_credential: &str) -> Result<StorageRequest> {
        let mut addition: AliyunShareAddition = serde_json::from_str(&item.addition)?;
        addition.refresh_token = new_credential.to_string();
        debug!(mount_path = %item.mount_path, share_id = %addition.share_id, "Rebuilding Aliyun mount");

        Ok(StorageRequest {
            mount_path: item.mount_path.clone(),
            order: item.order,
            remark: item.remark.clone(),
            cache_expiration: item.cache_expiration,
            web_proxy: item.web_proxy,
            webdav_policy: item.webdav_policy.clone(),
            down_proxy_url: item.down_proxy_url.clone(),
            proxy_range: item.proxy_range,
            disable_proxy_sign: item.disable_proxy_sign,
            order_by: item.order_by.clone(),
            order_direction: item.order_direction.clone(),
            extract_folder: item.extract_folder.clone(),
            disable_index: item.disable_index,
            enable_sign: item.enable_sign,
            driver: item.driver.clone(),
            addition: Addition::AliyunShare(addition).encode()?,
        })
    }
}

/// PikPak share links.
#[derive(Debug, Clone, Default)]
pub struct PikPakShare {
    pub username: String,
    pub password: String,
    pub platform: String,
    pub device_id: String,
    pub use_transcoding_address: bool,
}

impl Provider for PikPakShare {
    fn name(&self) -> &str {
        "PikPak"
    }

    fn driver(&self) -> &'static str {
        PIKPAK_SHARE_DRIVER
    }

    fn build_request(&self, mount_path: &str, descriptor: &str) -> Result<StorageRequest> {
        let link = parse_pikpak_share(descriptor)?;
        let addition = Addition::PikPakShare(PikPakShareAddition {
            root_folder_id: link.folder_id,
            share_id: link.share_id,
            share_pwd: link.password,
            username: self.username.clone(),
            password: self.password.clone(),
            platform: self.platform.clone(),
            device_id: self.device_id.clone(),
            use_transcoding_address: self.use_transcoding_address,
        });
        new_request(mount_path, &addition)
    }
}

/// OneDrive accounts reached through app registrations, one per tenant.
///
/// Descriptors look like `tenantIndex:account[:path]`, where `tenantIndex`
/// is 1-based into the configured tenant list.
#[derive(Debug, Clone)]
pub struct OnedriveApp {
    region: String,
    tenants: Vec<Tenant>,
}

impl OnedriveApp {
    pub fn new(region: impl Into<String>, tenants: Vec<Tenant>) -> Self {
        Self {
            region: region.into(),
            tenants,
        }
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }
}

impl Provider for OnedriveApp {
    fn name(&self) -> &str {
        "OneDrive App"
    }

    fn driver(&self) -> &'static str {
        ONEDRIVE_APP_DRIVER
    }

    fn build_request(&self, mount_path: &str, descriptor: &str) -> Result<StorageRequest> {
        let fields: Vec<&str> = descriptor.split(':').collect();
        if !(2..=3).contains(&fields.len()) {
            return Err(BatchError::invalid_descriptor(
                descriptor,
                "expected tenantIndex:account[:path]",
            ));
        }

        let index: i64 = fields[0].trim().parse().map_err(|_| {
            BatchError::invalid_descriptor(descriptor, format!("tenant index {:?} is not a number", fields[0]))
        })?;
        let tenant = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.tenants.get(i))
            .ok_or(BatchError::TenantOutOfRange {
                index,
                count: self.tenants.len(),
            })?;
        let root_folder_path = fields
            .get(2)
            .filter(|path| !path.is_empty())
            .map(|path| path.to_string())
            .unwrap_or_else(|| "/".to_string());

        let addition = Addition::OnedriveApp(OnedriveAppAddition {
            root_folder_path,
            region: self.region.clone(),
            client_id: tenant.client_id.clone(),
            client_secret: tenant.client_secret.clone(),
            tenant_id: tenant.tenant_id.clone(),
            email: fields[1].to_string(),
            chunk_size: ONEDRIVE_CHUNK_SIZE,
        });
        new_request(mount_path, &addition)
    }
}

/// Rebuild the descriptor string a decoded share addition was created from.
pub fn share_descriptor(addition: &Addition) -> Result<String> {
    match addition {
        Addition::AliyunShare(a) => Ok(aliyun_share_url(&ShareLink {
            share_id: a.share_id.clone(),
            folder_id: a.root_folder_id.clone(),
            password: a.share_pwd.clone(),
        })),
        Addition::PikPakShare(a) => Ok(pikpak_share_url(&ShareLink {
            share_id: a.share_id.clone(),
            folder_id: a.root_folder_id.clone(),
            password: a.share_pwd.clone(),
        })),
        Addition::OnedriveApp(_) => Err(BatchError::UnsupportedDriver(
            addition.driver().to_string(),
        )),
    }
}
