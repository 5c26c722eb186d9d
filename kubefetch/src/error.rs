use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no cluster labelled {name:?} (available: {})", format_labels(.available))]
    ClusterNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid credential bundle: {0}")]
    InvalidCredentialBundle(String),

    #[error("{operation}: failed to run {program:?}: {source}")]
    ProviderSpawn {
        operation: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{operation}: provider CLI exited with {status}: {stderr}")]
    ProviderFailed {
        operation: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{operation}: unexpected provider output: {source}")]
    ProviderOutput {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("HOME is not set, cannot locate the kube directory")]
    HomeNotSet,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}

fn format_labels(labels: &[String]) -> String {
    if labels.is_empty() {
        "none".to_string()
    } else {
        labels.join(", ")
    }
}
