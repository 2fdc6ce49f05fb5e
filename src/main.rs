use std::sync::Arc;

use aci_kubelet_provider::args::Args;
use aci_kubelet_provider::config::Conf;
use aci_kubelet_provider::error::Error;
use aci_kubelet_provider::http_client::HttpContainerGroupClient;
use aci_kubelet_provider::listers::{ConfigMapLister, PodLister, SecretLister};
use aci_kubelet_provider::tracker::StatusUpdater;
use aci_kubelet_provider::utils::trace;
use aci_kubelet_provider::Provider;
use clap::Parser;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};
use tracing::{event, Level};

/// The pod lister a production deployment backs with the node-agent
/// framework's informer cache
///
/// That informer mechanism is explicitly outside this crate's scope; this
/// stand-in always reports no pods so the binary still starts and the
/// Tracker's loop still runs.
struct NoInformerPods;

#[async_trait::async_trait]
impl PodLister for NoInformerPods {
    async fn list_pods(&self, _node_name: &str) -> Result<Vec<Pod>, Error> {
        Ok(vec![])
    }

    async fn get_pod(&self, _namespace: &str, _name: &str) -> Result<Option<Pod>, Error> {
        Ok(None)
    }
}

#[async_trait::async_trait]
impl SecretLister for NoInformerPods {
    async fn get_secret(&self, _namespace: &str, _name: &str) -> Result<Option<Secret>, Error> {
        Ok(None)
    }
}

#[async_trait::async_trait]
impl ConfigMapLister for NoInformerPods {
    async fn get_config_map(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<ConfigMap>, Error> {
        Ok(None)
    }
}

/// The status updater a production deployment backs with the node-agent
/// framework's pod status update API
///
/// Logs every reconciled pod status at info level as a stand-in.
struct LoggingStatusUpdater;

#[async_trait::async_trait]
impl StatusUpdater for LoggingStatusUpdater {
    async fn update_pod_status(&self, pod: Pod) -> Result<(), Error> {
        event!(
            Level::INFO,
            msg = "pod status reconciled",
            namespace = ?pod.metadata.namespace,
            name = ?pod.metadata.name,
            phase = ?pod.status.as_ref().and_then(|s| s.phase.clone()),
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let conf = Conf::new(&args.config).expect("Failed to load config");
    trace::setup("AciKubeletProvider", &conf.tracing);

    let host_ip = std::env::var("VKUBELET_POD_IP").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let client = Arc::new(HttpContainerGroupClient::new(
        conf.ccs_endpoint.clone(),
        conf.ccs_bearer_token.clone(),
    ));
    let pods: Arc<NoInformerPods> = Arc::new(NoInformerPods);

    let provider = Provider::new(
        conf,
        args.node_name,
        host_ip,
        client,
        pods.clone(),
        pods.clone(),
        pods,
        Arc::new(LoggingStatusUpdater),
    );

    let tracker = provider.tracker();
    let tracker_handle = tokio::spawn(async move { tracker.start().await });

    event!(Level::INFO, msg = "provider started");
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    provider.tracker().stop();
    tracker_handle.await.expect("pods tracker task panicked");
}
