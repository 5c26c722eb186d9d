//! Just enough of the kubeconfig format to report what was installed.
//!
//! Unknown fields are ignored: provider-issued configs carry users, contexts
//! and extensions we have no reason to look at.

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    pub server: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub name: String,
    pub cluster: ClusterSpec,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ContextSpec {
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub context: ContextSpec,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct KubeconfigSummary {
    pub current_context: Option<String>,
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

impl KubeconfigSummary {
    pub fn from_slice(data: &[u8]) -> serde_yaml::Result<Self> {
        serde_yaml::from_slice(data)
    }

    /// The API server the current context points at.
    pub fn server(&self) -> Option<&str> {
        let current = self.current_context.as_deref()?;
        let cluster = &self
            .contexts
            .iter()
            .find(|ctx| ctx.name == current)?
            .context
            .cluster;

        self.clusters
            .iter()
            .find(|cls| &cls.name == cluster)
            .map(|cls| cls.cluster.server.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LKE_CONFIG: &str = r#"
apiVersion: v1
kind: Config
preferences: {}
clusters:
- cluster:
    certificate-authority-data: LS0tLS1CRUdJTg==
    server: https://0a1b2c.us-east-1.linodelke.net:443
  name: lke12345
users:
- name: lke12345-admin
  user:
    token: secret
contexts:
- context:
    cluster: lke12345
    namespace: default
    user: lke12345-admin
  name: lke12345-ctx
current-context: lke12345-ctx
"#;

    #[test]
    fn reads_provider_config() {
        let summary = KubeconfigSummary::from_slice(LKE_CONFIG.as_bytes()).unwrap();

        assert_eq!(summary.current_context.as_deref(), Some("lke12345-ctx"));
        assert_eq!(summary.contexts[0].context.namespace.as_deref(), Some("default"));
        assert_eq!(
            summary.server(),
            Some("https://0a1b2c.us-east-1.linodelke.net:443")
        );
    }

    #[test]
    fn dangling_context_has_no_server() {
        let summary = KubeconfigSummary::from_slice(b"current-context: missing\n").unwrap();
        assert_eq!(summary.server(), None);
    }

    #[test]
    fn rejects_non_mapping() {
        assert!(KubeconfigSummary::from_slice(b"- just\n- a list\n").is_err());
    }
}
