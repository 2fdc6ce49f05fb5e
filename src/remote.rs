//! Plain-record wire schema for the Cloud Container Service (CCS)
//!
//! These types mirror what the CCS accepts/returns over its REST API. They are
//! deliberately separate from the `k8s-openapi` pod types: the pod side of the
//! translation is an externally-owned, already-typed schema we only read from,
//! while this side is the schema we own and submit.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A co-scheduled set of containers submitted to the Cloud Container Service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerGroup {
    /// The name of this container group, derived from the owning pod's identity
    pub name: String,
    /// The region this container group is created in
    pub location: String,
    /// The OS the containers in this group run under
    pub os_type: String,
    /// Tags carrying the originating pod's identity
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// The bulk of the container group's submitted/observed state
    pub properties: ContainerGroupProperties,
}

/// The tag keys used to round-trip pod identity onto a container group
pub mod tag_keys {
    pub const POD_NAME: &str = "PodName";
    pub const NAMESPACE: &str = "Namespace";
    pub const NODE_NAME: &str = "NodeName";
    pub const UID: &str = "UID";
    pub const CREATION_TIMESTAMP: &str = "CreationTimestamp";
}

/// The properties of a container group: what's submitted and what's observed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerGroupProperties {
    /// The containers in this group, ordered to match the owning pod's `spec.containers`
    #[serde(default)]
    pub containers: Vec<Container>,
    /// The init containers in this group, ordered to match the owning pod's `spec.initContainers`
    #[serde(default)]
    pub init_containers: Vec<Container>,
    /// The volumes available to containers in this group
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Credentials for pulling images from private registries
    #[serde(default)]
    pub image_registry_credentials: Vec<RegistryCredential>,
    /// The restart policy applied to the group as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
    /// The IP address assigned to this group, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddress>,
    /// The virtual network profile this group is attached to, if configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,
    /// Where diagnostic output from this group should be sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
    /// DNS settings applied to every container in this group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfiguration>,
    /// The ARM provisioning state (e.g. "Creating", "Succeeded", "Failed")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// The observed runtime state of this group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<ContainerGroupInstanceView>,
}

/// The IP address assigned to a container group
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct IpAddress {
    pub ip: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

/// A single exposed port on a container group's IP
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PortMapping {
    pub port: i32,
    pub protocol: String,
}

/// The virtual network a container group is joined to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkProfile {
    pub id: String,
}

/// DNS settings applied to every container in a group
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DnsConfiguration {
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

/// The observed runtime state of a whole container group
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerGroupInstanceView {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A single container within a container group
///
/// Mirrors the ARM wire shape: the outer record is just identity, everything
/// else (image, resources, probes, the observed instance view) lives under
/// `properties`, which a malformed upstream payload may omit entirely.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Container {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerProperties>,
}

/// The submitted/observed details of a single container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerProperties {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    pub resources: ResourceRequirements,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<ContainerInstanceView>,
}

/// A port exposed by a single container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerPort {
    pub port: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// An environment variable as submitted to the CCS
///
/// Exactly one of `value`/`secure_value` is set: plain values round-trip in
/// the clear, secrets never appear in a subsequent read of the group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_value: Option<String>,
}

/// Resource requests and optional limits for a container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRequirements {
    pub requests: ResourceRequests,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceLimits>,
}

/// The minimum resources a container is guaranteed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRequests {
    pub cpu: f64,
    pub memory_in_gb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuResource>,
}

/// The ceiling resources a container may use
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuResource>,
}

/// A GPU request, gated on region capability at submission time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GpuResource {
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// Where a volume is mounted within a container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// A liveness or readiness probe; exactly one of `exec`/`http_get` is set
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Probe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetAction>,
    pub initial_delay_seconds: i32,
    pub period_seconds: i32,
    pub timeout_seconds: i32,
    pub success_threshold: i32,
    pub failure_threshold: i32,
}

/// A probe that execs a command inside the container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExecAction {
    pub command: Vec<String>,
}

/// A probe that issues an HTTP GET against the container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HttpGetAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub port: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// A volume made available to containers in a group
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_file: Option<AzureFileVolume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<GitRepoVolume>,
}

/// An Azure File share mounted as a volume
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AzureFileVolume {
    pub share_name: String,
    pub storage_account_name: String,
    pub storage_account_key: String,
    #[serde(default)]
    pub read_only: bool,
}

/// A git repo cloned into a volume at container start
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GitRepoVolume {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Credentials for a single private registry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryCredential {
    pub server: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl std::fmt::Debug for RegistryCredential {
    /// never print the password, even in debug output
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("server", &self.server)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// The observed runtime state of a single container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInstanceView {
    #[serde(default)]
    pub restart_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<ContainerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<ContainerState>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// One of waiting/running/terminated for a single container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    /// One of "Waiting", "Running", "Terminated"
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_status: Option<String>,
}

/// An event emitted by the CCS about a container group or container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub count: i32,
}

/// A single region's reported capabilities, used to gate GPU requests
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RegionCapability {
    pub location: String,
    #[serde(default)]
    pub gpu: Option<String>,
}

/// Render a [`CreationTimestamp`] tag value in the source's non-RFC layout
///
/// The source formats this with Go's `time.Time` default `String()` method,
/// which is not one of `chrono`'s built-in layouts: a space-separated
/// date/time with nanosecond precision, numeric UTC offset, and a trailing
/// zone abbreviation (e.g. `"2024-01-02 15:04:05.123456789 +0000 UTC"`).
///
/// [`CreationTimestamp`]: tag_keys::CREATION_TIMESTAMP
pub fn format_creation_timestamp(ts: &DateTime<Utc>) -> String {
    format!("{} UTC", ts.format("%Y-%m-%d %H:%M:%S%.9f %z"))
}

/// Parse a [`CreationTimestamp`] tag value written by [`format_creation_timestamp`]
///
/// `chrono` has no parser for the trailing zone-abbreviation token (`%Z` is
/// format-only), so the token is trimmed before parsing; it is redundant with
/// the numeric offset that precedes it. Falls back to now on any parse
/// failure, per the source's own tolerance for foreign/legacy tag values.
///
/// [`CreationTimestamp`]: tag_keys::CREATION_TIMESTAMP
pub fn parse_creation_timestamp(raw: &str) -> DateTime<Utc> {
    let without_zone_name = raw.rsplit_once(' ').map_or(raw, |(rest, _)| rest);
    DateTime::parse_from_str(without_zone_name, "%Y-%m-%d %H:%M:%S%.f %z")
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod timestamp_tests {
    use super::*;

    #[test]
    fn round_trips_through_format_and_parse() {
        let ts = Utc::now();
        let formatted = format_creation_timestamp(&ts);
        let parsed = parse_creation_timestamp(&formatted);
        assert_eq!(ts.timestamp_nanos_opt(), parsed.timestamp_nanos_opt());
    }

    #[test]
    fn garbage_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_creation_timestamp("not a timestamp");
        assert!(parsed >= before);
    }
}
