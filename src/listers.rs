//! Capability interfaces for the orchestrator's informer-backed listers
//!
//! The core never talks to the orchestrator's API server directly; it reads
//! through these narrow traits so tests can supply fixed pod/secret data
//! instead of standing up a cluster.
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};

use crate::error::Error;

/// Read access to pods known to the orchestrator
#[async_trait::async_trait]
pub trait PodLister: Send + Sync {
    /// List every pod assigned to the given node
    async fn list_pods(&self, node_name: &str) -> Result<Vec<Pod>, Error>;

    /// Fetch a single pod by namespace and name, if it still exists
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error>;
}

/// Read access to secrets, used to resolve env vars and image pull credentials
#[async_trait::async_trait]
pub trait SecretLister: Send + Sync {
    /// Fetch a secret by namespace and name, if it exists
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error>;
}

/// Read access to config maps, used to resolve env vars and volume sources
#[async_trait::async_trait]
pub trait ConfigMapLister: Send + Sync {
    /// Fetch a config map by namespace and name, if it exists
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, Error>;
}
