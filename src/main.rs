//! openlist_batch CLI - Manage OpenList storages in bulk.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use openlist_batch::models::{ALIYUN_SHARE_DRIVER, PIKPAK_SHARE_DRIVER};
use openlist_batch::{
    AliyunShare, BatchService, Config, ConfigLoader, OnedriveApp, PikPakShare, ALIYUN_SHARE_FILE,
    CONFIG_FILE, ONEDRIVE_APP_FILE, PIKPAK_SHARE_FILE,
};

/// CLI tool for managing OpenList storages in bulk.
#[derive(Parser)]
#[command(name = "openlist_batch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding config.yaml and the share files.
    #[arg(long, env = "OPENLIST_BATCH_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount every entry of each enabled provider (default).
    Add,

    /// List storages on the server.
    List,

    /// Delete storages.
    Delete {
        #[arg(value_enum)]
        mode: DeleteMode,
    },

    /// Delete storages by id.
    DeleteId {
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Push a new credential to existing storages.
    Update {
        #[arg(value_enum)]
        target: UpdateTarget,
    },

    /// Export share storages of a driver into a share file.
    Export {
        /// Driver to export (AliyundriveShare or PikPakShare).
        #[arg(default_value = PIKPAK_SHARE_DRIVER)]
        driver: String,

        /// Output file name inside the work dir.
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DeleteMode {
    /// Only disabled storages.
    Disabled,
    /// Every storage. Use with care.
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum UpdateTarget {
    /// Aliyun Drive refresh token from config.yaml.
    Aliyun,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let loader = ConfigLoader::new(&cli.work_dir);

    if !loader.file_exists(CONFIG_FILE) {
        loader
            .generate_template(CONFIG_FILE)
            .with_context(|| format!("Failed to write {} template", CONFIG_FILE))?;
        info!("Generated {}, fill it in and run again", CONFIG_FILE);
        return Ok(());
    }

    let config = loader
        .load_config()
        .with_context(|| format!("Failed to load {:?}", cli.work_dir.join(CONFIG_FILE)))?;
    config.validate().context("Invalid configuration")?;

    let command = cli.command.unwrap_or(Commands::Add);
    if matches!(command, Commands::Add) && scaffold_share_files(&loader, &config)? {
        return Ok(());
    }

    let mut service = BatchService::new(config.clone(), Arc::new(loader.clone()))
        .context("Failed to create OpenList client")?;

    if !service.validate_token().await {
        warn!("Token is invalid, logging in again");
        service.refresh_token().await.context("Failed to refresh token")?;
    }

    match command {
        Commands::Add => add_storages(&service, &config, &loader).await,

        Commands::List => {
            let list = service.list_storages().await.context("Failed to list storages")?;
            if list.content.is_empty() {
                println!("No storages found.");
            } else {
                println!("{:<6} {:<18} {:<9} {:<10} {}", "ID", "DRIVER", "STATE", "STATUS", "MOUNT PATH");
                println!("{}", "-".repeat(80));
                for item in &list.content {
                    println!("{}", item);
                }
            }
        }

        Commands::Delete { mode } => {
            let summary = match mode {
                DeleteMode::Disabled => {
                    info!("Deleting disabled storages");
                    service.delete_disabled_storages().await
                }
                DeleteMode::All => {
                    warn!("Deleting ALL storages");
                    service.delete_all_storages().await
                }
            }
            .context("Failed to delete storages")?;
            info!(deleted = summary.succeeded, failed = summary.failed, "Delete finished");
        }

        Commands::DeleteId { ids } => {
            let summary = service.delete_storages_by_id(&ids).await;
            info!(deleted = summary.succeeded, failed = summary.failed, "Delete finished");
        }

        Commands::Update { target } => match target {
            UpdateTarget::Aliyun => {
                if !config.aliyun_share.enable {
                    bail!("aliyun_share is not enabled in {}", CONFIG_FILE);
                }
                let token = &config.aliyun_share.refresh_token;
                let provider = AliyunShare::new(token.as_str());
                info!("Updating Aliyun Drive refresh token");
                let summary = service
                    .update_credential(&provider, token)
                    .await
                    .context("Failed to update storages")?;
                info!(updated = summary.succeeded, failed = summary.failed, "Update finished");
            }
        },

        Commands::Export { driver, output } => {
            let output = match output.as_deref().or_else(|| default_export_file(&driver)) {
                Some(file) => file.to_string(),
                None => bail!("No default share file for driver {}, pass --output", driver),
            };
            let shares = service
                .export_by_driver(&driver)
                .await
                .with_context(|| format!("Failed to export {} storages", driver))?;
            loader
                .save_share_list(&output, &shares)
                .with_context(|| format!("Failed to write {}", output))?;
            let count: usize = shares.values().map(|entries| entries.len()).sum();
            info!(driver = %driver, count, file = %output, "Export finished");
        }
    }

    service.close();
    info!("Done.");
    Ok(())
}

/// Write templates for enabled providers whose share file is missing.
///
/// Returns true when at least one file was generated.
fn scaffold_share_files(loader: &ConfigLoader, config: &Config) -> Result<bool> {
    let wanted = [
        (config.aliyun_share.enable, ALIYUN_SHARE_FILE),
        (config.pikpak_share.enable, PIKPAK_SHARE_FILE),
        (config.onedrive_app.enable, ONEDRIVE_APP_FILE),
    ];

    let mut generated = false;
    for (enabled, file) in wanted {
        if enabled && !loader.file_exists(file) {
            loader
                .generate_template(file)
                .with_context(|| format!("Failed to write {} template", file))?;
            info!("Generated {}, add your entries and run again", file);
            generated = true;
        }
    }
    Ok(generated)
}

async fn add_storages(service: &BatchService, config: &Config, loader: &ConfigLoader) {
    if config.aliyun_share.enable {
        match loader.load_share_list(ALIYUN_SHARE_FILE) {
            Ok(shares) => {
                info!("Adding Aliyun Drive shares");
                let provider = AliyunShare::new(config.aliyun_share.refresh_token.as_str());
                service.batch_add_shares(&provider, &shares).await;
            }
            Err(e) => warn!(file = ALIYUN_SHARE_FILE, error = %e, "Failed to load share list"),
        }
    }

    if config.pikpak_share.enable {
        match loader.load_share_list(PIKPAK_SHARE_FILE) {
            Ok(shares) => {
                info!("Adding PikPak shares");
                let pikpak = &config.pikpak_share;
                let provider = PikPakShare {
                    username: pikpak.username.clone(),
                    password: pikpak.password.clone(),
                    platform: pikpak.platform.clone(),
                    device_id: pikpak.device_id.clone(),
                    use_transcoding_address: pikpak.use_transcoding_address,
                };
                service.batch_add_shares(&provider, &shares).await;
            }
            Err(e) => warn!(file = PIKPAK_SHARE_FILE, error = %e, "Failed to load share list"),
        }
    }

    if config.onedrive_app.enable {
        match loader.load_share_list(ONEDRIVE_APP_FILE) {
            Ok(apps) => {
                info!("Adding OneDrive app accounts");
                let provider = OnedriveApp::new(
                    config.onedrive_app.region.as_str(),
                    config.onedrive_app.tenants.clone(),
                );
                service.batch_add_apps(&provider, &apps).await;
            }
            Err(e) => warn!(file = ONEDRIVE_APP_FILE, error = %e, "Failed to load share list"),
        }
    }

    info!("Batch add finished");
}

fn default_export_file(driver: &str) -> Option<&'static str> {
    match driver {
        PIKPAK_SHARE_DRIVER => Some(PIKPAK_SHARE_FILE),
        ALIYUN_SHARE_DRIVER => Some(ALIYUN_SHARE_FILE),
        _ => None,
    }
}
