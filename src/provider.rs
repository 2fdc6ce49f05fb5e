//! The Provider Facade
//!
//! Exposes the node-agent operations this provider implements and routes
//! each one to the Builder, Status Projector, Pods Tracker, and the injected
//! listers/client. The facade owns no container-group state itself; the
//! Cloud Container Service is the source of truth and the Tracker is the
//! only long-lived task.
use std::collections::BTreeMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, NodeStatus, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::instrument;

use crate::builder;
use crate::client::{ContainerGroupClient, LogOptions};
use crate::config::Conf;
use crate::error::Error;
use crate::listers::{ConfigMapLister, PodLister, SecretLister};
use crate::remote::{parse_creation_timestamp, tag_keys, ContainerGroup};
use crate::status::project_pod_status;
use crate::tracker::{PodsTracker, StatusUpdater};

/// The three node labels this provider stamps via `ConfigureNode`
const LABEL_EXCLUDE_BALANCER: &str = "alpha.service-controller.kubernetes.io/exclude-balancer";
const LABEL_EXCLUDE_FROM_LB: &str = "node.kubernetes.io/exclude-from-external-load-balancers";
const LABEL_MANAGED: &str = "kubernetes.azure.com/managed";

/// A closable, in-memory readable stream of container log content
///
/// The Cloud Container Service's log API returns fully buffered content
/// rather than a live tail, so this wraps that content in a cursor rather
/// than bridging to a genuine async source.
pub struct LogStream(Cursor<Vec<u8>>);

impl LogStream {
    fn new(content: String) -> Self {
        LogStream(Cursor::new(content.into_bytes()))
    }

    /// Close the stream
    ///
    /// A no-op: the content is already fully buffered in memory, so there is
    /// no underlying resource to release. Kept so callers written against a
    /// closable log stream need no special-casing.
    pub async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl AsyncRead for LogStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let pos = self.0.position() as usize;
        let data = self.0.get_ref();
        let remaining = &data[pos.min(data.len())..];
        let amt = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.0.set_position((pos + amt) as u64);
        Poll::Ready(Ok(()))
    }
}

/// Reconstruct a minimal pod shell from a container group's identity tags
///
/// Returns `None` if any of the identity tags are missing, which disqualifies
/// the group from being surfaced as a pod at all.
fn pod_from_tags(group: &ContainerGroup) -> Option<Pod> {
    let name = group.tags.get(tag_keys::POD_NAME)?.clone();
    let namespace = group.tags.get(tag_keys::NAMESPACE)?.clone();
    let node_name = group.tags.get(tag_keys::NODE_NAME)?.clone();
    let uid = group.tags.get(tag_keys::UID).cloned();
    let created = group
        .tags
        .get(tag_keys::CREATION_TIMESTAMP)
        .map(|raw| parse_creation_timestamp(raw));

    Some(Pod {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            uid,
            creation_timestamp: created.map(Time),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some(node_name),
            ..Default::default()
        }),
        status: None,
    })
}

/// The Provider Facade: the single entry point the node-agent framework drives
pub struct Provider {
    conf: Conf,
    node_name: String,
    host_ip: String,
    client: Arc<dyn ContainerGroupClient>,
    pods: Arc<dyn PodLister>,
    secrets: Arc<dyn SecretLister>,
    config_maps: Arc<dyn ConfigMapLister>,
    tracker: Arc<PodsTracker>,
}

impl Provider {
    /// Build a new facade, wiring up its Tracker
    ///
    /// # Arguments
    ///
    /// * `conf` - The provider's configuration
    /// * `node_name` - The name this provider is registered as with the orchestrator
    /// * `host_ip` - This provider's internal IP, stamped onto every projected pod
    /// * `client` - The Cloud Container Service client
    /// * `pods` - The pod lister
    /// * `secrets` - The secret lister
    /// * `config_maps` - The config map lister
    /// * `updater` - The callback the Tracker uses to push reconciled pod status
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conf: Conf,
        node_name: String,
        host_ip: String,
        client: Arc<dyn ContainerGroupClient>,
        pods: Arc<dyn PodLister>,
        secrets: Arc<dyn SecretLister>,
        config_maps: Arc<dyn ConfigMapLister>,
        updater: Arc<dyn StatusUpdater>,
    ) -> Self {
        let tracker = Arc::new(PodsTracker::new(
            pods.clone(),
            client.clone(),
            updater,
            conf.aci_resource_group.clone(),
            node_name.clone(),
            host_ip.clone(),
            Duration::from_secs(conf.resync_seconds),
        ));
        Provider {
            conf,
            node_name,
            host_ip,
            client,
            pods,
            secrets,
            config_maps,
            tracker,
        }
    }

    /// The Tracker backing this facade, handed to `main.rs` to spawn
    pub fn tracker(&self) -> Arc<PodsTracker> {
        self.tracker.clone()
    }

    /// Build and submit a container group for a new pod, then register it with the Tracker
    #[instrument(name = "Provider::create_pod", skip(self, pod), fields(pod = ?pod.metadata.name), err(Debug))]
    pub async fn create_pod(&self, pod: &Pod) -> Result<(), Error> {
        let group = builder::build(
            pod,
            &self.conf,
            &self.node_name,
            self.secrets.as_ref(),
            self.config_maps.as_ref(),
            self.client.as_ref(),
        )
        .await?;
        self.client
            .create_container_group(&self.conf.aci_resource_group, &group)
            .await?;
        if let (Some(namespace), Some(name)) =
            (pod.metadata.namespace.as_deref(), pod.metadata.name.as_deref())
        {
            self.tracker.register(namespace, name).await;
        }
        Ok(())
    }

    /// Idempotently create or replace a pod's container group
    ///
    /// The Cloud Container Service's create call is itself idempotent (an
    /// ARM-style PUT), so updating a pod shares exactly the same build and
    /// submit path as creating one.
    pub async fn update_pod(&self, pod: &Pod) -> Result<(), Error> {
        self.create_pod(pod).await
    }

    /// Delete a container group by namespace and pod name directly
    pub async fn delete_container_group(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let group_name = builder::container_group_name(namespace, name);
        self.client
            .delete_container_group(&self.conf.aci_resource_group, &group_name)
            .await
    }

    /// Delete a pod's container group, then surface its terminated state through the Tracker
    ///
    /// The terminated-state update is emitted only once the delete call has
    /// succeeded; a failed delete leaves the Tracker's registration (and any
    /// future reconcile) untouched.
    #[instrument(name = "Provider::delete_pod", skip(self, pod), fields(pod = ?pod.metadata.name), err(Debug))]
    pub async fn delete_pod(&self, pod: &Pod) -> Result<(), Error> {
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .ok_or_else(|| Error::validation("pod has no namespace"))?;
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::validation("pod has no name"))?;
        self.delete_container_group(&namespace, &name).await?;
        self.tracker.emit_deleted(pod).await?;
        Ok(())
    }

    /// Fetch a pod by namespace and name, reconstructed from its container group's identity tags
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error> {
        let group_name = builder::container_group_name(namespace, name);
        let group = match self
            .client
            .get_container_group_info(&self.conf.aci_resource_group, namespace, &group_name, &self.node_name)
            .await
        {
            Ok(group) => group,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let Some(mut pod) = pod_from_tags(&group) else {
            return Ok(None);
        };
        pod.status = Some(project_pod_status(&group, &self.host_ip)?);
        Ok(Some(pod))
    }

    /// Fetch only a pod's status by namespace and name
    pub async fn get_pod_status(&self, namespace: &str, name: &str) -> Result<Option<PodStatus>, Error> {
        Ok(self.get_pod(namespace, name).await?.and_then(|pod| pod.status))
    }

    /// List every pod this provider's container groups represent
    ///
    /// Lists all remote groups in the configured resource group and filters
    /// to those tagged with this provider's node name.
    pub async fn get_pods(&self) -> Result<Vec<Pod>, Error> {
        let groups = self
            .client
            .get_container_group_list(&self.conf.aci_resource_group)
            .await?;
        let mut pods = Vec::new();
        for group in groups {
            if group.tags.get(tag_keys::NODE_NAME).map(String::as_str) != Some(self.node_name.as_str()) {
                continue;
            }
            if let Some(mut pod) = pod_from_tags(&group) {
                pod.status = Some(project_pod_status(&group, &self.host_ip)?);
                pods.push(pod);
            }
        }
        Ok(pods)
    }

    /// Fetch a single container's logs, proxied through the Cloud Container Service
    ///
    /// Returns `None` (no error) when the service has no log content yet.
    pub async fn get_container_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        opts: &LogOptions,
    ) -> Result<Option<LogStream>, Error> {
        let group_name = builder::container_group_name(namespace, pod_name);
        let content = self
            .client
            .list_logs(&self.conf.aci_resource_group, &group_name, container, opts)
            .await?;
        Ok(content.map(LogStream::new))
    }

    /// Stamp this provider's labels and advertised capacity onto a virtual node
    pub fn configure_node(&self, node: &mut Node) {
        let labels = node.metadata.labels.get_or_insert_with(BTreeMap::new);
        labels.insert(LABEL_EXCLUDE_BALANCER.to_owned(), "true".to_owned());
        labels.insert(LABEL_EXCLUDE_FROM_LB.to_owned(), "true".to_owned());
        labels.insert(LABEL_MANAGED.to_owned(), "false".to_owned());

        let mut capacity = BTreeMap::new();
        capacity.insert("cpu".to_owned(), Quantity(self.conf.capacity.cpu.clone()));
        capacity.insert("memory".to_owned(), Quantity(self.conf.capacity.memory.clone()));
        capacity.insert("pods".to_owned(), Quantity(self.conf.capacity.pods.clone()));

        let status = node.status.get_or_insert_with(NodeStatus::default);
        status.allocatable = Some(capacity.clone());
        status.capacity = Some(capacity);
    }
}
