use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::kubeconfig::KubeconfigSummary;
use crate::provider::{ClusterProvider, ClusterRecord, KubeconfigBundle};
use crate::{Error, Result};

/// Owner read/write only.
pub const KUBECONFIG_MODE: u32 = 0o600;

/// Finds the id of the first cluster labelled exactly `name`.
pub fn resolve_cluster_id(records: &[ClusterRecord], name: &str) -> Result<String> {
    let mut matches = records.iter().filter(|record| record.label == name);

    let found = matches.next().ok_or_else(|| Error::ClusterNotFound {
        name: name.to_string(),
        available: records.iter().map(|record| record.label.clone()).collect(),
    })?;

    let duplicates = matches.count();
    if duplicates > 0 {
        warn!(
            label = name,
            id = %found.id,
            duplicates,
            "several clusters share this label, using the first"
        );
    }

    Ok(found.id.clone())
}

/// Decodes the first bundle's base64 payload. Line wrapping inside the
/// payload is ignored.
pub fn decode_bundle(bundles: &[KubeconfigBundle]) -> Result<Vec<u8>> {
    let bundle = bundles
        .first()
        .ok_or_else(|| Error::InvalidCredentialBundle("provider returned no bundles".into()))?;

    let payload: String = bundle
        .kubeconfig
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| Error::InvalidCredentialBundle(format!("bad base64: {err}")))?;

    if decoded.is_empty() {
        return Err(Error::InvalidCredentialBundle("bundle is empty".into()));
    }

    Ok(decoded)
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(Error::io(dir))
        }
        _ => Ok(()),
    }
}

/// Writes `contents` to `path`, replacing anything already there, and
/// restricts the file to its owner. Missing parent directories are created,
/// so this also works outside of [`Fetcher::fetch`].
pub fn write_kubeconfig(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(KUBECONFIG_MODE);
    }

    let mut file = options.open(path).map_err(Error::io(path))?;

    // `mode` only applies when the file is created.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(KUBECONFIG_MODE))
            .map_err(Error::io(path))?;
    }

    file.write_all(contents).map_err(Error::io(path))?;
    file.sync_all().map_err(Error::io(path))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote kubeconfig");
    Ok(())
}

/// Moves an existing file at `path` aside to `<name>_<timestamp>`.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let now = Local::now().format("%Y%m%dT%H%M%S%.3f");
    let backup = path.with_file_name(format!("{file_name}_{now}"));

    fs::rename(path, &backup).map_err(Error::io(path))?;
    info!(backup = %backup.display(), "backed up existing kubeconfig");

    Ok(Some(backup))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub cluster_id: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub backup: Option<PathBuf>,
    pub summary: Option<KubeconfigSummary>,
}

/// Resolves a cluster by label and installs its kubeconfig.
pub struct Fetcher<P> {
    provider: P,
    target: PathBuf,
    backup: bool,
}

impl<P: ClusterProvider> Fetcher<P> {
    pub fn new(provider: P, target: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            target: target.into(),
            backup: false,
        }
    }

    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn fetch(&self, cluster: &str) -> Result<FetchOutcome> {
        ensure_parent_dir(&self.target)?;

        let records = self.provider.list_clusters()?;
        let cluster_id = resolve_cluster_id(&records, cluster)?;
        info!(cluster, id = %cluster_id, "resolved cluster");

        let bundles = self.provider.kubeconfig_bundles(&cluster_id)?;
        let contents = decode_bundle(&bundles)?;

        let summary = match KubeconfigSummary::from_slice(&contents) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!("decoded kubeconfig is not valid YAML: {err}");
                None
            }
        };

        let backup = if self.backup {
            backup_existing(&self.target)?
        } else {
            None
        };

        write_kubeconfig(&self.target, &contents)?;

        Ok(FetchOutcome {
            cluster_id,
            path: self.target.clone(),
            bytes: contents.len(),
            backup,
            summary,
        })
    }
}
