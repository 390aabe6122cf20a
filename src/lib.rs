//! openlist_batch - bulk storage management for OpenList.
//!
//! This library provides functionality to:
//! - Mount Aliyun Drive and PikPak share links and OneDrive app accounts in bulk
//! - Replace the refresh token of every Aliyun Drive share mount
//! - Delete disabled (or all) storages
//! - Export existing share mounts back into a descriptor file
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use openlist_batch::{AliyunShare, BatchService, ConfigLoader, ALIYUN_SHARE_FILE};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = Arc::new(ConfigLoader::new("."));
//!     let config = loader.load_config()?;
//!     let shares = loader.load_share_list(ALIYUN_SHARE_FILE)?;
//!     let provider = AliyunShare::new(config.aliyun_share.refresh_token.clone());
//!
//!     let mut service = BatchService::new(config, loader)?;
//!     if !service.validate_token().await {
//!         service.refresh_token().await?;
//!     }
//!
//!     let summary = service.batch_add_shares(&provider, &shares).await;
//!     println!("{} added, {} failed", summary.succeeded, summary.failed);
//!     service.close();
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod url_parser;

// Re-exports for convenience
pub use batch::{BatchService, BatchSummary};
pub use client::OpenListClient;
pub use config::{
    Config, ConfigLoader, ConfigSaver, ShareList, ALIYUN_SHARE_FILE, CONFIG_FILE,
    ONEDRIVE_APP_FILE, PIKPAK_SHARE_FILE,
};
pub use error::{BatchError, Result};
pub use models::{StorageItem, StorageRequest};
pub use provider::{AliyunShare, OnedriveApp, PikPakShare, Provider, UpdatableProvider};
