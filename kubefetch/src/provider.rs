use std::ffi::{OsStr, OsString};
use std::process::Command;

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use tracing::debug;

use crate::{Error, Result};

/// A cluster as reported by the provider's listing call.
///
/// Only the fields needed for lookup and listing are kept.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusterRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub k8s_version: Option<String>,
}

impl ClusterRecord {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            region: None,
            k8s_version: None,
        }
    }
}

/// linode-cli emits numeric ids; other providers use strings.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

/// A base64 encoded kubeconfig document.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigBundle {
    pub kubeconfig: String,
}

pub trait ClusterProvider {
    fn list_clusters(&self) -> Result<Vec<ClusterRecord>>;

    fn kubeconfig_bundles(&self, cluster_id: &str) -> Result<Vec<KubeconfigBundle>>;
}

impl<P: ClusterProvider + ?Sized> ClusterProvider for &P {
    fn list_clusters(&self) -> Result<Vec<ClusterRecord>> {
        (**self).list_clusters()
    }

    fn kubeconfig_bundles(&self, cluster_id: &str) -> Result<Vec<KubeconfigBundle>> {
        (**self).kubeconfig_bundles(cluster_id)
    }
}

/// Talks to Linode Kubernetes Engine through `linode-cli`.
///
/// Arguments are always passed as an argument vector, so nothing the caller
/// supplies is ever interpreted by a shell.
#[derive(Debug, Clone)]
pub struct LinodeCli {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl Default for LinodeCli {
    fn default() -> Self {
        Self::new("linode-cli")
    }
}

impl LinodeCli {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before the subcommand, for wrappers such as
    /// `python3 -m linodecli`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn run_json<T: DeserializeOwned>(&self, operation: &'static str, args: &[&OsStr]) -> Result<T> {
        debug!(program = ?self.program, ?args, "running provider CLI");

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .output()
            .map_err(|source| Error::ProviderSpawn {
                operation,
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::ProviderFailed {
                operation,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|source| Error::ProviderOutput { operation, source })
    }
}

impl ClusterProvider for LinodeCli {
    fn list_clusters(&self) -> Result<Vec<ClusterRecord>> {
        self.run_json(
            "list clusters",
            &["lke", "clusters-list", "--json"].map(OsStr::new),
        )
    }

    fn kubeconfig_bundles(&self, cluster_id: &str) -> Result<Vec<KubeconfigBundle>> {
        self.run_json(
            "view kubeconfig",
            &["lke", "kubeconfig-view", cluster_id, "--json"].map(OsStr::new),
        )
    }
}
