use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use console::style;
use tabular::{row, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kubefetch::{default_kubeconfig_path, ClusterProvider, Fetcher, LinodeCli};

/// Install a Linode Kubernetes Engine cluster's kubeconfig locally.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Label of the cluster to fetch credentials for
    #[arg(long, required_unless_present = "list")]
    cluster: Option<String>,

    /// List the clusters visible to the provider CLI and exit
    #[arg(long, conflicts_with_all = ["cluster", "backup"])]
    list: bool,

    /// Where to write the kubeconfig [default: ~/.kube/config]
    #[arg(short, long, env = "KUBEFETCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Provider CLI to invoke
    #[arg(long, env = "KUBEFETCH_PROVIDER_CLI", default_value = "linode-cli")]
    provider_cli: String,

    /// Argument placed before the provider subcommand, repeatable
    /// (e.g. `--provider-cli python3 --provider-arg=-m --provider-arg linodecli`)
    #[arg(long = "provider-arg", value_name = "ARG", allow_hyphen_values = true)]
    provider_args: Vec<String>,

    /// Move an existing kubeconfig aside instead of overwriting it
    #[arg(long)]
    backup: bool,

    /// More logging, repeatable
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list_clusters(provider: &impl ClusterProvider) -> anyhow::Result<()> {
    let clusters = provider.list_clusters()?;

    let mut table = Table::new("{:<}  {:<}  {:<}  {:<}");
    table.add_row(row!("ID", "LABEL", "REGION", "VERSION"));
    for cluster in &clusters {
        table.add_row(row!(
            &cluster.id,
            &cluster.label,
            cluster.region.as_deref().unwrap_or("-"),
            cluster.k8s_version.as_deref().unwrap_or("-")
        ));
    }
    print!("{table}");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let provider = LinodeCli::new(&args.provider_cli).with_args(&args.provider_args);

    if args.list {
        return list_clusters(&provider);
    }

    let cluster = args.cluster.context("--cluster is required")?;
    let output = match args.output {
        Some(path) => path,
        None => default_kubeconfig_path()?,
    };
    debug!(
        output = %output.display(),
        provider = %args.provider_cli,
        provider_args = ?args.provider_args,
        "fetching kubeconfig"
    );

    let fetcher = Fetcher::new(provider, output).backup(args.backup);
    let outcome = fetcher
        .fetch(&cluster)
        .with_context(|| format!("Fetching kubeconfig for cluster {cluster:?}"))?;

    if let Some(backup) = &outcome.backup {
        println!("Previous kubeconfig moved to {}", backup.display());
    }
    println!(
        "{} kubeconfig for {} (id {}) written to {}",
        style("✔").green(),
        style(&cluster).bold(),
        outcome.cluster_id,
        fetcher.target().display()
    );
    if let Some(summary) = &outcome.summary {
        if let (Some(context), Some(server)) = (&summary.current_context, summary.server()) {
            println!("  context {context} → {server}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn cluster_is_required() {
        assert!(Args::try_parse_from(["fetch-kubeconfig"]).is_err());

        let args = Args::try_parse_from(["fetch-kubeconfig", "--cluster", "prod"]).unwrap();
        assert_eq!(args.cluster.as_deref(), Some("prod"));
        assert!(!args.backup);
    }

    #[test]
    fn list_needs_no_cluster() {
        let args = Args::try_parse_from(["fetch-kubeconfig", "--list"]).unwrap();
        assert!(args.list);
        assert!(args.cluster.is_none());

        assert!(Args::try_parse_from(["fetch-kubeconfig", "--list", "--cluster", "x"]).is_err());
    }

    #[test]
    fn provider_args_repeat() {
        let args = Args::try_parse_from([
            "fetch-kubeconfig",
            "--cluster",
            "a",
            "--provider-cli",
            "python3",
            "--provider-arg",
            "-m",
            "--provider-arg",
            "linodecli",
        ])
        .unwrap();
        assert_eq!(args.provider_cli, "python3");
        assert_eq!(args.provider_args, vec!["-m", "linodecli"]);
    }

    #[test]
    fn verbosity_counts() {
        let args = Args::try_parse_from(["fetch-kubeconfig", "--cluster", "a", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
