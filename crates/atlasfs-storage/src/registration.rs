//! Startup registration with the naming server.
//!
//! A storage node announces itself with an inventory of every file under
//! its root. The naming server answers with the subset it already knows
//! about; those local copies are stale duplicates, so the node deletes
//! them and prunes whatever directories the deletions leave empty.

use std::path::Path;

use atlasfs_core::proto::{ExceptionBody, RegisterRequest, RegisterResponse};

use crate::config::StorageConfig;
use crate::disk::LocalDisk;

/// Every regular file under `root` as a sorted list of `/`-rooted
/// relative paths. Directories themselves are not inventory.
pub fn scan_inventory(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    collect_files(root, "", &mut files);
    files.sort();
    files
}

fn collect_files(dir: &Path, prefix: &str, files: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "could not scan directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let path = format!("{prefix}/{}", name.to_string_lossy());
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            collect_files(&entry.path(), &path, files);
        } else {
            files.push(path);
        }
    }
}

/// Remove every directory under `root` that holds no files, bottom-up.
/// The root itself always stays.
pub fn prune_empty_dirs(root: &Path) {
    prune(root);
}

fn prune(dir: &Path) -> bool {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    let mut empty = true;
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && prune(&entry.path()) && std::fs::remove_dir(entry.path()).is_ok() {
            continue;
        }
        empty = false;
    }
    empty
}

/// POST the inventory to the naming server's registration endpoint and
/// return the files it reports as already owned elsewhere.
pub async fn register_with_naming(
    config: &StorageConfig,
    files: Vec<String>,
) -> anyhow::Result<Vec<String>> {
    let request = RegisterRequest {
        storage_ip: config.advertise_ip.clone(),
        client_port: config.client_port,
        command_port: config.command_port,
        files,
    };
    let client = reqwest::Client::new();
    let response = client
        .post(config.registration_url())
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        let body: RegisterResponse = response.json().await?;
        return Ok(body.files);
    }
    match response.json::<ExceptionBody>().await {
        Ok(body) => anyhow::bail!(
            "naming server refused registration ({status}): {}",
            body.exception_info
        ),
        Err(_) => anyhow::bail!("naming server refused registration ({status})"),
    }
}

/// Announce this node and reconcile the local root against the answer.
///
/// Registration failures are logged, not fatal: the node keeps serving
/// whatever it has, it just never receives placements or replicas.
pub async fn bootstrap(config: &StorageConfig) {
    let files = scan_inventory(&config.root);
    tracing::info!(files = files.len(), "scanned storage root");

    match register_with_naming(config, files).await {
        Ok(stale) => {
            if !stale.is_empty() {
                let disk = LocalDisk::new(&config.root);
                for file in &stale {
                    if !disk.delete(file).await {
                        tracing::warn!(%file, "could not delete duplicate file");
                    }
                }
                prune_empty_dirs(&config.root);
            }
            let kept = scan_inventory(&config.root);
            tracing::info!(
                duplicates = stale.len(),
                kept = kept.len(),
                "registered with naming server"
            );
        }
        Err(err) => {
            tracing::warn!(%err, "registration failed; serving unregistered");
        }
    }
}
