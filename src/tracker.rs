//! The Pods Tracker
//!
//! A long-running reconciler, started once at provider initialization, that
//! keeps pod status current with what the Cloud Container Service is
//! actually observing: it lists the pods assigned to this node, fetches each
//! one's container group, projects status, and hands the mutated pod to a
//! [`StatusUpdater`] callback. It also owns the "pod deleted remotely"
//! transition: if the CCS no longer has a container group for a pod this
//! tracker registered, it synthesizes a terminated state for every
//! container so the orchestrator notices.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{
    ContainerState as PodContainerState, ContainerStateTerminated,
    ContainerStatus as PodContainerStatus, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

use crate::builder::container_group_name;
use crate::client::ContainerGroupClient;
use crate::error::Error;
use crate::listers::PodLister;
use crate::status::project_pod_status;

/// The exit code synthesized for every container when a pod's container
/// group disappears from the Cloud Container Service out-of-band.
///
/// Conventionally `0` in the source this provider is modeled on, which
/// conflates a deleted-by-user termination with a normal successful exit;
/// kept for compatibility with existing tooling that matches on it.
pub const CONTAINER_EXIT_CODE_POD_DELETED: i32 = 0;

/// The reason stamped on a container's terminated state when its container
/// group was deleted out-of-band
pub const STATUS_REASON_POD_DELETED: &str = "NotFound";

/// The message stamped on a container's terminated state when its container
/// group was deleted out-of-band
pub const STATUS_MESSAGE_POD_DELETED: &str =
    "The container group backing this pod could not be found";

/// A capability the Tracker calls back into to push a reconciled pod status
///
/// Kept narrow and separate from the Provider Facade so the Tracker does not
/// need to hold (and the facade does not need to expose) anything beyond
/// this single operation, breaking the cycle a facade-owned tracker would
/// otherwise create.
#[async_trait::async_trait]
pub trait StatusUpdater: Send + Sync {
    /// Push a pod whose status has just been reconciled back to the orchestrator
    async fn update_pod_status(&self, pod: Pod) -> Result<(), Error>;
}

/// Synthesize a terminated status for every container in a pod whose
/// container group has been deleted out-of-band
///
/// # Arguments
///
/// * `pod` - The pod whose container group is gone
pub fn mark_pod_deleted(pod: &Pod) -> PodStatus {
    let container_names: Vec<String> = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default();
    let existing = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.clone())
        .unwrap_or_default();
    let now = Time(chrono::Utc::now());

    let statuses: Vec<PodContainerStatus> = container_names
        .into_iter()
        .map(|name| {
            let prior = existing.iter().find(|s| s.name == name);
            PodContainerStatus {
                name: name.clone(),
                image: prior.map(|s| s.image.clone()).unwrap_or_default(),
                image_id: String::new(),
                container_id: prior.and_then(|s| s.container_id.clone()),
                ready: false,
                restart_count: prior.map(|s| s.restart_count).unwrap_or(0),
                state: Some(PodContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: CONTAINER_EXIT_CODE_POD_DELETED,
                        reason: Some(STATUS_REASON_POD_DELETED.to_owned()),
                        message: Some(STATUS_MESSAGE_POD_DELETED.to_owned()),
                        started_at: None,
                        finished_at: Some(now.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                last_state: prior.and_then(|s| s.state.clone()),
                started: Some(false),
                ..Default::default()
            }
        })
        .collect();

    PodStatus {
        phase: Some("Failed".to_owned()),
        container_statuses: Some(statuses),
        ..pod.status.clone().unwrap_or_default()
    }
}

/// The asynchronous reconciler that keeps tracked pods' status current
pub struct PodsTracker {
    pods: Arc<dyn PodLister>,
    client: Arc<dyn ContainerGroupClient>,
    updater: Arc<dyn StatusUpdater>,
    resource_group: String,
    node_name: String,
    host_ip: String,
    tick: Duration,
    tracked: Mutex<HashSet<(String, String)>>,
    shutdown: CancellationToken,
}

impl PodsTracker {
    /// Build a new tracker
    ///
    /// # Arguments
    ///
    /// * `pods` - The pod lister used to discover which pods are ours to track
    /// * `client` - The Cloud Container Service client
    /// * `updater` - The callback used to push reconciled pod status
    /// * `resource_group` - The resource group container groups live in
    /// * `node_name` - The name this provider is registered as with the orchestrator
    /// * `host_ip` - This provider's internal IP, stamped onto every reconciled pod
    /// * `tick` - How often to reconcile
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pods: Arc<dyn PodLister>,
        client: Arc<dyn ContainerGroupClient>,
        updater: Arc<dyn StatusUpdater>,
        resource_group: String,
        node_name: String,
        host_ip: String,
        tick: Duration,
    ) -> Self {
        PodsTracker {
            pods,
            client,
            updater,
            resource_group,
            node_name,
            host_ip,
            tick,
            tracked: Mutex::new(HashSet::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a pod as ours to track
    ///
    /// The facade calls this only after a `CreatePod` submission has
    /// succeeded, so the tracker never observes a group before it exists.
    pub async fn register(&self, namespace: &str, name: &str) {
        self.tracked
            .lock()
            .await
            .insert((namespace.to_owned(), name.to_owned()));
    }

    /// Deregister a pod, called after `DeletePod` returns
    pub async fn deregister(&self, namespace: &str, name: &str) {
        self.tracked
            .lock()
            .await
            .remove(&(namespace.to_owned(), name.to_owned()));
    }

    /// Check whether a pod is currently registered
    pub async fn is_tracked(&self, namespace: &str, name: &str) -> bool {
        self.tracked
            .lock()
            .await
            .contains(&(namespace.to_owned(), name.to_owned()))
    }

    /// A handle that can be used to request a graceful shutdown of [`Self::start`]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request that the tracker's reconcile loop stop after its current tick
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Emit a terminated status for a pod this tracker has registered, then deregister it
    ///
    /// Used by the facade's `DeletePod` so the terminated-state transition is
    /// visible to the orchestrator before the delete call returns, rather
    /// than waiting for the next reconcile tick. A no-op if the pod was
    /// never registered.
    pub async fn emit_deleted(&self, pod: &Pod) -> Result<(), Error> {
        let Some(namespace) = pod.metadata.namespace.clone() else {
            return Ok(());
        };
        let Some(name) = pod.metadata.name.clone() else {
            return Ok(());
        };
        if !self.is_tracked(&namespace, &name).await {
            return Ok(());
        }
        let status = mark_pod_deleted(pod);
        let mut updated = pod.clone();
        updated.status = Some(status);
        self.updater.update_pod_status(updated).await?;
        self.deregister(&namespace, &name).await;
        Ok(())
    }

    /// Reconcile every pod assigned to this node exactly once
    #[instrument(name = "PodsTracker::reconcile_once", skip(self), err(Debug))]
    pub async fn reconcile_once(&self) -> Result<(), Error> {
        let pods = self.pods.list_pods(&self.node_name).await?;
        for pod in pods {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.reconcile_pod(pod).await?;
        }
        Ok(())
    }

    /// Reconcile a single pod against the Cloud Container Service
    async fn reconcile_pod(&self, pod: Pod) -> Result<(), Error> {
        let Some(namespace) = pod.metadata.namespace.clone() else {
            return Ok(());
        };
        let Some(name) = pod.metadata.name.clone() else {
            return Ok(());
        };
        let group_name = container_group_name(&namespace, &name);

        match self
            .client
            .get_container_group_info(&self.resource_group, &namespace, &group_name, &self.node_name)
            .await
        {
            Ok(group) => match project_pod_status(&group, &self.host_ip) {
                Ok(status) => {
                    let mut updated = pod;
                    updated.status = Some(status);
                    self.updater.update_pod_status(updated).await
                }
                Err(err) => {
                    event!(
                        Level::WARN,
                        msg = "failed to project pod status",
                        namespace = %namespace,
                        name = %name,
                        error = %err,
                    );
                    Ok(())
                }
            },
            Err(Error::NotFound(_)) => {
                if self.is_tracked(&namespace, &name).await {
                    let status = mark_pod_deleted(&pod);
                    let mut updated = pod;
                    updated.status = Some(status);
                    self.updater.update_pod_status(updated).await?;
                    self.deregister(&namespace, &name).await;
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Run the reconcile loop until [`Self::stop`] is called
    pub async fn start(&self) {
        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    event!(Level::INFO, msg = "pods tracker stopping");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(err) = self.reconcile_once().await {
                        event!(Level::ERROR, msg = "pods tracker reconcile failed", error = %err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LogOptions;
    use crate::remote::{ContainerGroup, RegionCapability};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use tokio::sync::Mutex as AsyncMutex;

    struct EmptyPods(Vec<Pod>);
    #[async_trait::async_trait]
    impl PodLister for EmptyPods {
        async fn list_pods(&self, _node_name: &str) -> Result<Vec<Pod>, Error> {
            Ok(self.0.clone())
        }
        async fn get_pod(&self, _ns: &str, _name: &str) -> Result<Option<Pod>, Error> {
            Ok(None)
        }
    }

    struct NotFoundClient;
    #[async_trait::async_trait]
    impl ContainerGroupClient for NotFoundClient {
        async fn create_container_group(
            &self,
            _rg: &str,
            _g: &ContainerGroup,
        ) -> Result<ContainerGroup, Error> {
            unimplemented!()
        }
        async fn get_container_group_info(
            &self,
            _rg: &str,
            _ns: &str,
            name: &str,
            _node_name: &str,
        ) -> Result<ContainerGroup, Error> {
            Err(Error::not_found(format!("{name} not found")))
        }
        async fn get_container_group_list(&self, _rg: &str) -> Result<Vec<ContainerGroup>, Error> {
            Ok(vec![])
        }
        async fn delete_container_group(&self, _rg: &str, _name: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn list_logs(
            &self,
            _rg: &str,
            _cg: &str,
            _container: &str,
            _opts: &LogOptions,
        ) -> Result<Option<String>, Error> {
            Ok(None)
        }
        async fn list_capabilities(&self, _region: &str) -> Result<Vec<RegionCapability>, Error> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct RecordingUpdater {
        updates: AsyncMutex<Vec<Pod>>,
    }
    #[async_trait::async_trait]
    impl StatusUpdater for RecordingUpdater {
        async fn update_pod_status(&self, pod: Pod) -> Result<(), Error> {
            self.updates.lock().await.push(pod);
            Ok(())
        }
    }

    fn pod(namespace: &str, name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                namespace: Some(namespace.to_owned()),
                name: Some(name.to_owned()),
                ..Default::default()
            },
            spec: Some(k8s_openapi::api::core::v1::PodSpec {
                containers: vec![k8s_openapi::api::core::v1::Container {
                    name: "app".to_owned(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn untracked_not_found_pod_is_ignored() {
        let updater = Arc::new(RecordingUpdater::default());
        let tracker = PodsTracker::new(
            Arc::new(EmptyPods(vec![pod("default", "demo")])),
            Arc::new(NotFoundClient),
            updater.clone(),
            "rg".to_owned(),
            "node-1".to_owned(),
            "10.0.0.1".to_owned(),
            Duration::from_secs(5),
        );
        tracker.reconcile_once().await.unwrap();
        assert!(updater.updates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn tracked_not_found_pod_gets_terminated_status() {
        let updater = Arc::new(RecordingUpdater::default());
        let tracker = PodsTracker::new(
            Arc::new(EmptyPods(vec![pod("default", "demo")])),
            Arc::new(NotFoundClient),
            updater.clone(),
            "rg".to_owned(),
            "node-1".to_owned(),
            "10.0.0.1".to_owned(),
            Duration::from_secs(5),
        );
        tracker.register("default", "demo").await;
        tracker.reconcile_once().await.unwrap();
        let updates = updater.updates.lock().await;
        assert_eq!(updates.len(), 1);
        let status = updates[0].status.as_ref().unwrap();
        let container_status = &status.container_statuses.as_ref().unwrap()[0];
        let terminated = container_status
            .state
            .as_ref()
            .unwrap()
            .terminated
            .as_ref()
            .unwrap();
        assert_eq!(terminated.exit_code, CONTAINER_EXIT_CODE_POD_DELETED);
        assert_eq!(
            terminated.reason.as_deref(),
            Some(STATUS_REASON_POD_DELETED)
        );
        assert!(!tracker.is_tracked("default", "demo").await);
    }

    #[tokio::test]
    async fn deregister_removes_tracking() {
        let tracker = PodsTracker::new(
            Arc::new(EmptyPods(vec![])),
            Arc::new(NotFoundClient),
            Arc::new(RecordingUpdater::default()),
            "rg".to_owned(),
            "node-1".to_owned(),
            "10.0.0.1".to_owned(),
            Duration::from_secs(5),
        );
        tracker.register("default", "demo").await;
        assert!(tracker.is_tracked("default", "demo").await);
        tracker.deregister("default", "demo").await;
        assert!(!tracker.is_tracked("default", "demo").await);
    }
}
