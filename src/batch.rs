//! Batch operations against the OpenList storage admin API.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::client::OpenListClient;
use crate::config::{Config, ConfigSaver, ShareList};
use crate::error::{BatchError, Result};
use crate::models::{
    Addition, LoginRequest, LoginResponse, StorageItem, StorageList, StorageRequest,
    StorageUpdateRequest,
};
use crate::provider::{share_descriptor, OnedriveApp, Provider, UpdatableProvider};

pub const LOGIN_ENDPOINT: &str = "/api/auth/login";
pub const STORAGE_LIST_ENDPOINT: &str = "/api/admin/storage/list";
pub const STORAGE_CREATE_ENDPOINT: &str = "/api/admin/storage/create";
pub const STORAGE_UPDATE_ENDPOINT: &str = "/api/admin/storage/update";
pub const STORAGE_DELETE_ENDPOINT: &str = "/api/admin/storage/delete";

/// Status forced onto mounts rewritten by [`BatchService::update_credential`].
const UPDATED_STATUS: &str = "work";

/// Outcome counts of a best-effort batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    fn record(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl FromIterator<bool> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut summary = Self::default();
        for ok in iter {
            summary.record(ok);
        }
        summary
    }
}

/// Mount path for a descriptor entry.
pub fn mount_path(category: &str, name: &str) -> String {
    format!("/{}/{}", category, name)
}

/// Split a mount path into `(category, name)`.
///
/// Returns `None` when the path has fewer than two non-empty segments.
/// Segments past the first are kept together as the name.
pub fn split_mount_path(mount_path: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = mount_path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() < 2 {
        return None;
    }
    Some((parts[0].to_string(), parts[1..].join("/")))
}

/// Owns the authenticated session and runs every storage operation.
pub struct BatchService {
    config: Config,
    client: OpenListClient,
    saver: Arc<dyn ConfigSaver>,
}

impl BatchService {
    /// Create a service for the instance described by `config`.
    ///
    /// # Arguments
    /// * `config` - Main configuration; its token is used as the session token
    /// * `saver` - Where the configuration is written after a token refresh
    pub fn new(config: Config, saver: Arc<dyn ConfigSaver>) -> Result<Self> {
        let client = OpenListClient::new(&config.url, &config.token, config.timeout())?;
        Ok(Self {
            config,
            client,
            saver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check the current token by listing storages.
    ///
    /// Transport failures count as an invalid token.
    pub async fn validate_token(&self) -> bool {
        match self.client.get(STORAGE_LIST_ENDPOINT).await {
            Ok(response) => {
                if !response.is_success() {
                    debug!(code = response.code, message = %response.message, "Token rejected");
                }
                response.is_success()
            }
            Err(e) => {
                debug!(error = %e, "Token check failed");
                false
            }
        }
    }

    /// Log in with the configured credentials and persist the new token.
    pub async fn refresh_token(&mut self) -> Result<()> {
        let request = LoginRequest {
            username: &self.config.auth.username,
            password: &self.config.auth.password,
        };
        let response = self.client.post(LOGIN_ENDPOINT, &request).await?;
        if !response.is_success() {
            return Err(BatchError::AuthenticationError(response.message));
        }

        let login: LoginResponse = response.decode_data()?;
        self.client.set_token(login.token.as_str());
        self.config.token = login.token;

        self.saver
            .save_config(&self.config)
            .map_err(|e| BatchError::PersistError(e.to_string()))?;

        info!("Token refreshed");
        Ok(())
    }

    /// Fetch every storage mount.
    pub async fn list_storages(&self) -> Result<StorageList> {
        let response = self.client.get(STORAGE_LIST_ENDPOINT).await?.into_result()?;
        response.decode_data()
    }

    pub async fn add_storage(&self, request: &StorageRequest) -> Result<()> {
        self.client
            .post(STORAGE_CREATE_ENDPOINT, request)
            .await?
            .into_result()?;
        Ok(())
    }

    pub async fn update_storage(&self, request: &StorageUpdateRequest) -> Result<()> {
        self.client
            .post(STORAGE_UPDATE_ENDPOINT, request)
            .await?
            .into_result()?;
        Ok(())
    }

    pub async fn delete_storage(&self, id: u64) -> Result<()> {
        let endpoint = format!("{}?id={}", STORAGE_DELETE_ENDPOINT, id);
        self.client.post_empty(&endpoint).await?.into_result()?;
        Ok(())
    }

    /// Create one mount per entry of `shares`, all requests in flight at once.
    ///
    /// Failures are logged per entry and never abort the rest of the batch.
    pub async fn batch_add_shares<P: Provider + ?Sized>(
        &self,
        provider: &P,
        shares: &ShareList,
    ) -> BatchSummary {
        let tasks = shares.iter().flat_map(move |(category, entries)| {
            entries.iter().map(move |(name, descriptor)| {
                self.add_entry(provider, category, name, descriptor)
            })
        });

        let summary: BatchSummary = join_all(tasks).await.into_iter().collect();
        info!(
            provider = provider.name(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch finished"
        );
        summary
    }

    /// Create one OneDrive app mount per `tenantIndex:account[:path]` entry.
    pub async fn batch_add_apps(&self, provider: &OnedriveApp, apps: &ShareList) -> BatchSummary {
        self.batch_add_shares(provider, apps).await
    }

    async fn add_entry<P: Provider + ?Sized>(
        &self,
        provider: &P,
        category: &str,
        name: &str,
        descriptor: &str,
    ) -> bool {
        let mount_path = mount_path(category, name);

        let request = match provider.build_request(&mount_path, descriptor) {
            Ok(request) => request,
            Err(e) => {
                warn!(provider = provider.name(), category, name, error = %e, "Failed to build mount request");
                return false;
            }
        };

        match self.add_storage(&request).await {
            Ok(()) => {
                info!(provider = provider.name(), category, name, "Mount added");
                true
            }
            Err(e) => {
                warn!(provider = provider.name(), category, name, error = %e, "Failed to add mount");
                false
            }
        }
    }

    /// Delete every disabled mount.
    pub async fn delete_disabled_storages(&self) -> Result<BatchSummary> {
        let list = self.list_storages().await?;
        let targets = list.content.iter().filter(|item| item.disabled);
        Ok(self.delete_items(targets).await)
    }

    /// Delete every mount.
    pub async fn delete_all_storages(&self) -> Result<BatchSummary> {
        let list = self.list_storages().await?;
        Ok(self.delete_items(list.content.iter()).await)
    }

    /// Delete the given mount ids one after another.
    pub async fn delete_storages_by_id(&self, ids: &[u64]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for &id in ids {
            let ok = match self.delete_storage(id).await {
                Ok(()) => {
                    info!(id, "Storage deleted");
                    true
                }
                Err(e) => {
                    warn!(id, error = %e, "Failed to delete storage");
                    false
                }
            };
            summary.record(ok);
        }
        summary
    }

    async fn delete_items<'a, I>(&self, items: I) -> BatchSummary
    where
        I: Iterator<Item = &'a StorageItem>,
    {
        let mut summary = BatchSummary::default();
        for item in items {
            let ok = match self.delete_storage(item.id).await {
                Ok(()) => {
                    info!(id = item.id, mount_path = %item.mount_path, "Storage deleted");
                    true
                }
                Err(e) => {
                    warn!(id = item.id, mount_path = %item.mount_path, error = %e, "Failed to delete storage");
                    false
                }
            };
            summary.record(ok);
        }
        summary
    }

    /// Replace the credential of every mount driven by `provider`.
    ///
    /// Mounts of other drivers are left alone.
    pub async fn update_credential<P: UpdatableProvider + ?Sized>(
        &self,
        provider: &P,
        new_credential: &str,
    ) -> Result<BatchSummary> {
        let list = self.list_storages().await?;
        let mut summary = BatchSummary::default();

        for item in list.content.iter().filter(|item| item.driver == provider.driver()) {
            let request = match provider.build_update_request(item, new_credential) {
                Ok(request) => request,
                Err(e) => {
                    warn!(mount_path = %item.mount_path, error = %e, "Failed to build update request");
                    summary.record(false);
                    continue;
                }
            };

            let update = StorageUpdateRequest {
                id: item.id,
                status: UPDATED_STATUS.to_string(),
                request,
            };
            let ok = match self.update_storage(&update).await {
                Ok(()) => {
                    info!(id = item.id, mount_path = %item.mount_path, "Storage updated");
                    true
                }
                Err(e) => {
                    warn!(id = item.id, mount_path = %item.mount_path, error = %e, "Failed to update storage");
                    false
                }
            };
            summary.record(ok);
        }

        Ok(summary)
    }

    /// Rebuild a descriptor collection from the mounts of `driver`.
    ///
    /// Mounts whose path or addition cannot be turned back into an entry are
    /// skipped with a warning.
    pub async fn export_by_driver(&self, driver: &str) -> Result<ShareList> {
        let list = self.list_storages().await?;
        let mut shares = ShareList::new();

        for item in list.content.iter().filter(|item| item.driver == driver) {
            let Some((category, name)) = split_mount_path(&item.mount_path) else {
                warn!(mount_path = %item.mount_path, "Skipping mount path without category/name");
                continue;
            };

            let descriptor = match Addition::decode(&item.driver, &item.addition)
                .and_then(|addition| share_descriptor(&addition))
            {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(mount_path = %item.mount_path, error = %e, "Skipping mount");
                    continue;
                }
            };

            shares.entry(category).or_default().insert(name, descriptor);
        }

        Ok(shares)
    }

    /// Release network resources.
    pub fn close(self) {
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_path() {
        assert_eq!(mount_path("movies", "foo"), "/movies/foo");
    }

    #[test]
    fn test_split_mount_path() {
        assert_eq!(
            split_mount_path("/movies/foo"),
            Some(("movies".to_string(), "foo".to_string()))
        );
        assert_eq!(
            split_mount_path("//movies//foo/"),
            Some(("movies".to_string(), "foo".to_string()))
        );
        assert_eq!(
            split_mount_path("/a/b/c"),
            Some(("a".to_string(), "b/c".to_string()))
        );
        assert_eq!(split_mount_path("/single"), None);
        assert_eq!(split_mount_path("/"), None);
    }

    #[test]
    fn test_summary_from_outcomes() {
        let summary: BatchSummary = vec![true, false, true, true].into_iter().collect();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 4);
    }
}
