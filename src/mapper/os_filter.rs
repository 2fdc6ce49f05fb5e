//! Removes OS-incompatible volumes/mounts from a built container group
use std::collections::BTreeSet;

use crate::remote::ContainerGroup;

/// The path the orchestrator projects the service-account token volume onto
pub const SERVICE_ACCOUNT_MOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Strip the orchestrator-injected service-account secret volume on Windows
///
/// The Windows container runtime the CCS runs can't mount it; on Linux this
/// is a no-op. Must run after containers and volumes are fully mapped.
pub fn apply(os_type: &str, group: &mut ContainerGroup) {
    if !os_type.eq_ignore_ascii_case("windows") {
        return;
    }

    let mut removed_volume_names = BTreeSet::new();
    for container in group
        .properties
        .containers
        .iter_mut()
        .chain(group.properties.init_containers.iter_mut())
    {
        let Some(props) = container.properties.as_mut() else {
            continue;
        };
        props.volume_mounts.retain(|mount| {
            let keep = mount.mount_path != SERVICE_ACCOUNT_MOUNT_PATH;
            if !keep {
                removed_volume_names.insert(mount.name.clone());
            }
            keep
        });
    }

    if !removed_volume_names.is_empty() {
        group
            .properties
            .volumes
            .retain(|volume| !removed_volume_names.contains(&volume.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{
        Container, ContainerGroupProperties, ContainerProperties, ResourceRequests,
        ResourceRequirements, Volume, VolumeMount,
    };
    use std::collections::BTreeMap;

    fn group_with_sa_mount() -> ContainerGroup {
        ContainerGroup {
            name: "ns-pod".to_owned(),
            location: "westus2".to_owned(),
            os_type: "Linux".to_owned(),
            tags: BTreeMap::new(),
            properties: ContainerGroupProperties {
                containers: vec![Container {
                    name: "app".to_owned(),
                    properties: Some(ContainerProperties {
                        image: "app:latest".to_owned(),
                        command: vec![],
                        ports: vec![],
                        environment_variables: vec![],
                        resources: ResourceRequirements {
                            requests: ResourceRequests {
                                cpu: 1.0,
                                memory_in_gb: 1.5,
                                gpu: None,
                            },
                            limits: None,
                        },
                        volume_mounts: vec![
                            VolumeMount {
                                name: "kube-api-access".to_owned(),
                                mount_path: SERVICE_ACCOUNT_MOUNT_PATH.to_owned(),
                                read_only: true,
                            },
                            VolumeMount {
                                name: "data".to_owned(),
                                mount_path: "/data".to_owned(),
                                read_only: false,
                            },
                        ],
                        liveness_probe: None,
                        readiness_probe: None,
                        instance_view: None,
                    }),
                }],
                init_containers: vec![],
                volumes: vec![
                    Volume {
                        name: "kube-api-access".to_owned(),
                        empty_dir: None,
                        secret: Some(BTreeMap::new()),
                        azure_file: None,
                        git_repo: None,
                    },
                    Volume {
                        name: "data".to_owned(),
                        empty_dir: Some(serde_json::json!({})),
                        secret: None,
                        azure_file: None,
                        git_repo: None,
                    },
                ],
                ..Default::default()
            },
        }
    }

    #[test]
    fn windows_strips_service_account_volume() {
        let mut group = group_with_sa_mount();
        apply("Windows", &mut group);
        let mounts = &group.properties.containers[0]
            .properties
            .as_ref()
            .unwrap()
            .volume_mounts;
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, "data");
        assert_eq!(group.properties.volumes.len(), 1);
        assert_eq!(group.properties.volumes[0].name, "data");
    }

    #[test]
    fn linux_is_a_no_op() {
        let mut group = group_with_sa_mount();
        apply("Linux", &mut group);
        assert_eq!(
            group.properties.containers[0]
                .properties
                .as_ref()
                .unwrap()
                .volume_mounts
                .len(),
            2
        );
        assert_eq!(group.properties.volumes.len(), 2);
    }
}
