//! The capability interface this provider needs from the Cloud Container Service
//!
//! Modeled on the narrow `Scheduler` trait this workspace already uses to
//! abstract over scheduling backends: a small set of async methods, no
//! assumed transport, so tests can inject an in-memory fake instead of a live
//! cloud account.
use crate::error::Error;
use crate::remote::{ContainerGroup, RegionCapability};

/// Options controlling a single container-logs request
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Only return this many trailing lines, if set
    pub tail_lines: Option<i64>,
    /// Only return logs emitted in the last N seconds, if set
    pub since_seconds: Option<i64>,
    /// Prefix each line with its timestamp
    pub timestamps: bool,
    /// Fetch logs for the previous (crashed/restarted) instance of the container
    pub previous: bool,
}

/// The operations this provider needs from the Cloud Container Service
#[async_trait::async_trait]
pub trait ContainerGroupClient: Send + Sync {
    /// Submit a new container group for creation
    async fn create_container_group(
        &self,
        resource_group: &str,
        group: &ContainerGroup,
    ) -> Result<ContainerGroup, Error>;

    /// Fetch a single container group's current state
    ///
    /// Returns `Error::NotFound` when no group with this name exists.
    async fn get_container_group_info(
        &self,
        resource_group: &str,
        namespace: &str,
        name: &str,
        node_name: &str,
    ) -> Result<ContainerGroup, Error>;

    /// List every container group in a resource group
    async fn get_container_group_list(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ContainerGroup>, Error>;

    /// Delete a container group by name
    async fn delete_container_group(&self, resource_group: &str, name: &str)
        -> Result<(), Error>;

    /// Fetch logs for a single container in a group
    ///
    /// Returns `None` when the CCS has no log content yet, which is not an error.
    async fn list_logs(
        &self,
        resource_group: &str,
        container_group: &str,
        container: &str,
        opts: &LogOptions,
    ) -> Result<Option<String>, Error>;

    /// List the capabilities (including GPU SKUs) available in a region
    async fn list_capabilities(&self, region: &str) -> Result<Vec<RegionCapability>, Error>;
}
