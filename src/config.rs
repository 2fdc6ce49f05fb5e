//! The shared config for the provider
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Helps serde default the provider OS to Linux
fn default_os() -> String {
    "Linux".to_owned()
}

/// Helps serde default the region to a region with broad availability
fn default_location() -> String {
    "westus2".to_owned()
}

/// Helps serde default the tracker's reconcile interval to 5 seconds
fn default_resync_seconds() -> u64 {
    5
}

/// Helps serde default the advertised node CPU capacity
fn default_node_cpu() -> String {
    "20".to_owned()
}

/// Helps serde default the advertised node memory capacity
fn default_node_memory() -> String {
    "400Gi".to_owned()
}

/// Helps serde default the advertised node pod capacity
fn default_node_pods() -> String {
    "1000".to_owned()
}

/// The node capacity/allocatable values this provider advertises to the orchestrator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeCapacityConf {
    /// The CPU quantity to advertise (Kubernetes quantity syntax, e.g. "20")
    #[serde(default = "default_node_cpu")]
    pub cpu: String,
    /// The memory quantity to advertise (Kubernetes quantity syntax, e.g. "400Gi")
    #[serde(default = "default_node_memory")]
    pub memory: String,
    /// The pod count to advertise
    #[serde(default = "default_node_pods")]
    pub pods: String,
}

impl Default for NodeCapacityConf {
    fn default() -> Self {
        NodeCapacityConf {
            cpu: default_node_cpu(),
            memory: default_node_memory(),
            pods: default_node_pods(),
        }
    }
}

/// The network settings for container groups this provider creates
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkConf {
    /// The name of the virtual network to join container groups to
    #[serde(default)]
    pub vnet_name: Option<String>,
    /// The resource group the virtual network lives in
    #[serde(default)]
    pub vnet_resource_group: Option<String>,
}

/// The tracing/logging settings for the provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TracingConf {
    /// The log level to filter traces at (e.g. "info", "debug")
    #[serde(default = "default_tracing_level")]
    pub level: String,
}

/// Helps serde default the tracing level to info
fn default_tracing_level() -> String {
    "info".to_owned()
}

impl Default for TracingConf {
    fn default() -> Self {
        TracingConf {
            level: default_tracing_level(),
        }
    }
}

/// configs for the ACI node provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conf {
    /// The resource group container groups are created in
    pub aci_resource_group: String,
    /// The region container groups are created in
    #[serde(default = "default_location")]
    pub aci_region: String,
    /// The default region used when a pod does not request a specific one
    #[serde(default = "default_location")]
    pub location: String,
    /// The operating system this provider schedules pods for
    #[serde(default = "default_os")]
    pub provider_operating_system: String,
    /// The virtual network settings to join container groups to
    #[serde(default)]
    pub network: NetworkConf,
    /// How often the pods tracker reconciles pods against the Cloud Container Service
    #[serde(default = "default_resync_seconds")]
    pub resync_seconds: u64,
    /// Tracing/logging settings
    #[serde(default)]
    pub tracing: TracingConf,
    /// The node capacity/allocatable values this provider advertises
    #[serde(default)]
    pub capacity: NodeCapacityConf,
    /// The base URL of the Cloud Container Service's REST API
    #[serde(default)]
    pub ccs_endpoint: String,
    /// The bearer token presented to the Cloud Container Service, if any
    #[serde(default)]
    pub ccs_bearer_token: Option<String>,
}

impl Conf {
    /// Creates a new [`Conf`] object
    ///
    /// Loads the base config from a YAML file then overlays any `ACI_*` /
    /// `LOCATION` / `PROVIDER_OPERATING_SYSTEM` environment variables on top.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to use when reading the config file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let conf: Conf = config::Config::builder()
            // load from a file first
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Yaml))
            // then overlay any environment args ontop
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_omitted() {
        let net = NetworkConf::default();
        assert!(net.vnet_name.is_none());
        assert_eq!(default_os(), "Linux");
        assert_eq!(default_location(), "westus2");
        assert_eq!(default_resync_seconds(), 5);
    }
}
