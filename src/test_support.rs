//! In-memory fakes for the capability traits this crate defines
//!
//! Gated behind the `test-utilities` feature, mirroring the teacher
//! workspace's own `test_utilities` module: downstream integration tests
//! (and this crate's own doctests) can exercise the Provider Facade and the
//! Pods Tracker end-to-end without a live cluster or cloud account.
use std::collections::HashMap;
use std::sync::Mutex;

use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};

use crate::client::{ContainerGroupClient, LogOptions};
use crate::error::Error;
use crate::listers::{ConfigMapLister, PodLister, SecretLister};
use crate::remote::{ContainerGroup, RegionCapability};
use crate::tracker::StatusUpdater;

/// An in-memory Cloud Container Service double
///
/// Keeps container groups in a simple map keyed by name; `create` overwrites
/// any existing entry, matching the real service's idempotent PUT semantics.
#[derive(Default)]
pub struct FakeContainerGroupClient {
    groups: Mutex<HashMap<String, ContainerGroup>>,
    logs: Mutex<HashMap<String, String>>,
    capabilities: Mutex<Vec<RegionCapability>>,
}

impl FakeContainerGroupClient {
    /// Build an empty fake with no groups, logs, or region capabilities
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a region capability the fake should report from `list_capabilities`
    pub fn with_capability(self, capability: RegionCapability) -> Self {
        self.capabilities.lock().unwrap().push(capability);
        self
    }

    /// Seed log content for a container, keyed as `<group>/<container>`
    pub fn with_logs(self, group: &str, container: &str, content: &str) -> Self {
        self.logs
            .lock()
            .unwrap()
            .insert(format!("{group}/{container}"), content.to_owned());
        self
    }

    /// Read back a stored group by name, for assertions in a caller's tests
    pub fn group(&self, name: &str) -> Option<ContainerGroup> {
        self.groups.lock().unwrap().get(name).cloned()
    }
}

#[async_trait::async_trait]
impl ContainerGroupClient for FakeContainerGroupClient {
    async fn create_container_group(
        &self,
        _resource_group: &str,
        group: &ContainerGroup,
    ) -> Result<ContainerGroup, Error> {
        self.groups
            .lock()
            .unwrap()
            .insert(group.name.clone(), group.clone());
        Ok(group.clone())
    }

    async fn get_container_group_info(
        &self,
        _resource_group: &str,
        _namespace: &str,
        name: &str,
        _node_name: &str,
    ) -> Result<ContainerGroup, Error> {
        self.groups
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("container group {name} not found")))
    }

    async fn get_container_group_list(
        &self,
        _resource_group: &str,
    ) -> Result<Vec<ContainerGroup>, Error> {
        Ok(self.groups.lock().unwrap().values().cloned().collect())
    }

    async fn delete_container_group(&self, _resource_group: &str, name: &str) -> Result<(), Error> {
        self.groups.lock().unwrap().remove(name);
        Ok(())
    }

    async fn list_logs(
        &self,
        _resource_group: &str,
        container_group: &str,
        container: &str,
        _opts: &LogOptions,
    ) -> Result<Option<String>, Error> {
        let key = format!("{container_group}/{container}");
        Ok(self.logs.lock().unwrap().get(&key).cloned())
    }

    async fn list_capabilities(&self, _region: &str) -> Result<Vec<RegionCapability>, Error> {
        Ok(self.capabilities.lock().unwrap().clone())
    }
}

/// An in-memory pod lister backed by a fixed set of pods
#[derive(Default)]
pub struct FakePodLister {
    pods: Mutex<Vec<Pod>>,
}

impl FakePodLister {
    /// Build a fake seeded with the given pods
    pub fn new(pods: Vec<Pod>) -> Self {
        FakePodLister {
            pods: Mutex::new(pods),
        }
    }

    /// Replace the set of pods this fake reports
    pub fn set(&self, pods: Vec<Pod>) {
        *self.pods.lock().unwrap() = pods;
    }
}

#[async_trait::async_trait]
impl PodLister for FakePodLister {
    async fn list_pods(&self, node_name: &str) -> Result<Vec<Pod>, Error> {
        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|pod| {
                pod.spec
                    .as_ref()
                    .and_then(|spec| spec.node_name.as_deref())
                    == Some(node_name)
            })
            .cloned()
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error> {
        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .find(|pod| {
                pod.metadata.namespace.as_deref() == Some(namespace)
                    && pod.metadata.name.as_deref() == Some(name)
            })
            .cloned())
    }
}

/// An in-memory secret lister backed by a fixed `namespace/name -> Secret` map
#[derive(Default)]
pub struct FakeSecretLister {
    secrets: Mutex<HashMap<(String, String), Secret>>,
}

impl FakeSecretLister {
    /// Build an empty fake
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret at the given namespace and name
    pub fn with_secret(self, namespace: &str, name: &str, secret: Secret) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_owned(), name.to_owned()), secret);
        self
    }
}

#[async_trait::async_trait]
impl SecretLister for FakeSecretLister {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned())
    }
}

/// An in-memory config map lister backed by a fixed `namespace/name -> ConfigMap` map
#[derive(Default)]
pub struct FakeConfigMapLister {
    config_maps: Mutex<HashMap<(String, String), ConfigMap>>,
}

impl FakeConfigMapLister {
    /// Build an empty fake
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a config map at the given namespace and name
    pub fn with_config_map(self, namespace: &str, name: &str, config_map: ConfigMap) -> Self {
        self.config_maps
            .lock()
            .unwrap()
            .insert((namespace.to_owned(), name.to_owned()), config_map);
        self
    }
}

#[async_trait::async_trait]
impl ConfigMapLister for FakeConfigMapLister {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, Error> {
        Ok(self
            .config_maps
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned())
    }
}

/// A status updater that records every pod it is given, for test assertions
#[derive(Default)]
pub struct RecordingStatusUpdater {
    updates: Mutex<Vec<Pod>>,
}

impl RecordingStatusUpdater {
    /// Build an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a snapshot of every pod status pushed so far
    pub fn updates(&self) -> Vec<Pod> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StatusUpdater for RecordingStatusUpdater {
    async fn update_pod_status(&self, pod: Pod) -> Result<(), Error> {
        self.updates.lock().unwrap().push(pod);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod_on(node_name: &str, namespace: &str, name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                namespace: Some(namespace.to_owned()),
                name: Some(name.to_owned()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some(node_name.to_owned()),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn pod_lister_filters_by_node_name() {
        let fake = FakePodLister::new(vec![
            pod_on("node-a", "default", "one"),
            pod_on("node-b", "default", "two"),
        ]);
        let pods = fake.list_pods("node-a").await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn container_group_client_round_trips() {
        let fake = FakeContainerGroupClient::new();
        let group = ContainerGroup {
            name: "default-demo".to_owned(),
            location: "westus2".to_owned(),
            os_type: "Linux".to_owned(),
            tags: Default::default(),
            properties: Default::default(),
        };
        fake.create_container_group("rg", &group).await.unwrap();
        let fetched = fake
            .get_container_group_info("rg", "default", "default-demo", "node-1")
            .await
            .unwrap();
        assert_eq!(fetched.name, "default-demo");
    }

    #[tokio::test]
    async fn recording_status_updater_collects_updates() {
        let updater = RecordingStatusUpdater::new();
        updater
            .update_pod_status(pod_on("node-a", "default", "one"))
            .await
            .unwrap();
        assert_eq!(updater.updates().len(), 1);
    }
}
