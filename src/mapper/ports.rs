//! Maps pod container ports onto the remote schema
use k8s_openapi::api::core::v1::ContainerPort as PodContainerPort;

use crate::remote::ContainerPort;

/// Map a container's ports verbatim
///
/// No deduplication is performed across containers in the same group; if the
/// CCS rejects a duplicate it surfaces that as a remote error.
pub fn map_ports(ports: &[PodContainerPort]) -> Vec<ContainerPort> {
    ports
        .iter()
        .map(|p| ContainerPort {
            port: p.container_port,
            protocol: p.protocol.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_pass_through() {
        let pod_ports = vec![PodContainerPort {
            container_port: 8080,
            protocol: Some("TCP".to_owned()),
            ..Default::default()
        }];
        let mapped = map_ports(&pod_ports);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].port, 8080);
        assert_eq!(mapped[0].protocol.as_deref(), Some("TCP"));
    }
}
