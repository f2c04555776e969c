use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;

/// Build a client from `kubeconfig`, or infer the configuration when `None`.
///
/// Inference uses the in-cluster service account when running in a pod and
/// falls back to `$KUBECONFIG` / `~/.kube/config`.
pub async fn build_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .with_context(|| format!("Invalid kubeconfig {}", path.display()))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    tracing::debug!(cluster_url = %config.cluster_url, "Loaded Kubernetes configuration");

    Client::try_from(config).context("Failed to build Kubernetes client")
}

/// Ask the API server for its version to confirm it is reachable.
pub async fn check_connectivity(client: &Client) -> Result<String> {
    let info = client
        .apiserver_version()
        .await
        .context("Failed to reach Kubernetes API server")?;
    Ok(info.git_version)
}
