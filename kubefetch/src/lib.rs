pub mod error;
pub mod fetch;
pub mod kubeconfig;
pub mod provider;

use std::path::{Path, PathBuf};

pub use error::Error;
pub use fetch::*;
pub use provider::{ClusterProvider, ClusterRecord, KubeconfigBundle, LinodeCli};

pub type Result<T> = std::result::Result<T, Error>;

pub fn kube_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .ok_or(Error::HomeNotSet)?;
    Ok(Path::new(&home).join(".kube"))
}

/// The conventional kubeconfig location, `~/.kube/config`.
pub fn default_kubeconfig_path() -> Result<PathBuf> {
    Ok(kube_dir()?.join("config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kube_dir_needs_home() {
        temp_env::with_var_unset("HOME", || {
            assert!(matches!(kube_dir(), Err(Error::HomeNotSet)));
            assert!(matches!(default_kubeconfig_path(), Err(Error::HomeNotSet)));
        });

        temp_env::with_var("HOME", Some(""), || {
            assert!(matches!(kube_dir(), Err(Error::HomeNotSet)));
        });
    }

    #[test]
    fn default_path_is_under_home() {
        temp_env::with_var("HOME", Some("/home/someone"), || {
            assert_eq!(
                default_kubeconfig_path().unwrap(),
                Path::new("/home/someone/.kube/config")
            );
        });
    }
}
