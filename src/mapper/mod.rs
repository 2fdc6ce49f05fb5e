//! The Schema Mapper: pure translation between pod spec fragments and
//! container-group fragments.
//!
//! Each concern (env, resources, probes, ports, volumes, OS filtering, and
//! quantity parsing that underlies the resource mapping) lives in its own
//! submodule; this module composes them into the per-container and
//! per-volume-list mappings the [`crate::builder`] needs.
pub mod env;
pub mod os_filter;
pub mod ports;
pub mod probes;
pub mod quantity;
pub mod resources;
pub mod volumes;

use k8s_openapi::api::core::v1::{Container as PodContainer, Pod};

use crate::error::Error;
use crate::listers::{ConfigMapLister, SecretLister};
use crate::remote::{Container, ContainerProperties};

/// Map a single pod container (regular or init) onto the remote schema
///
/// # Arguments
///
/// * `pod` - The owning pod, used to resolve downward-API env refs
/// * `namespace` - The pod's namespace, used to resolve secret/config-map refs
/// * `container` - The pod container to map
/// * `gpu_sku` - The GPU SKU annotation value on the owning pod, if any
/// * `secrets` - The secret lister used to resolve secret-backed env vars
/// * `config_maps` - The config map lister used to resolve config-map-backed env vars
pub async fn map_container(
    pod: &Pod,
    namespace: &str,
    container: &PodContainer,
    gpu_sku: Option<&str>,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Container, Error> {
    let env = container.env.as_deref().unwrap_or_default();
    let environment_variables =
        env::map_env(pod, namespace, env, secrets, config_maps).await?;
    let container_ports = container.ports.as_deref().unwrap_or_default();
    let ports = ports::map_ports(container_ports);
    let resources = resources::map_resources(container.resources.as_ref(), gpu_sku)?;
    let liveness_probe = container
        .liveness_probe
        .as_ref()
        .map(|probe| probes::map_probe(probe, container_ports))
        .transpose()?;
    let readiness_probe = container
        .readiness_probe
        .as_ref()
        .map(|probe| probes::map_probe(probe, container_ports))
        .transpose()?;
    let volume_mounts = container
        .volume_mounts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|mount| crate::remote::VolumeMount {
            name: mount.name.clone(),
            mount_path: mount.mount_path.clone(),
            read_only: mount.read_only.unwrap_or(false),
        })
        .collect();

    Ok(Container {
        name: container.name.clone(),
        properties: Some(ContainerProperties {
            image: container.image.clone().unwrap_or_default(),
            command: map_command(container),
            ports,
            environment_variables,
            resources,
            volume_mounts,
            liveness_probe,
            readiness_probe,
            instance_view: None,
        }),
    })
}

/// Map every regular/init container in a pod
///
/// # Arguments
///
/// * `pod` - The owning pod
/// * `namespace` - The pod's namespace
/// * `containers` - The slice of pod containers to map, in order
/// * `gpu_sku` - The GPU SKU annotation value on the owning pod, if any
/// * `secrets` - The secret lister used to resolve secret-backed env vars
/// * `config_maps` - The config map lister used to resolve config-map-backed env vars
pub async fn map_containers(
    pod: &Pod,
    namespace: &str,
    containers: &[PodContainer],
    gpu_sku: Option<&str>,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Vec<Container>, Error> {
    let mut mapped = Vec::with_capacity(containers.len());
    for container in containers {
        mapped.push(map_container(pod, namespace, container, gpu_sku, secrets, config_maps).await?);
    }
    Ok(mapped)
}

/// Join a pod container's `command` and `args` into the remote schema's single command vector
///
/// The remote side has no separate entrypoint/args split; the source concatenates
/// `Command` followed by `Args` into one ordered vector.
fn map_command(container: &PodContainer) -> Vec<String> {
    let mut command = container.command.clone().unwrap_or_default();
    command.extend(container.args.clone().unwrap_or_default());
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Container as PodContainer;

    struct NoSecrets;
    #[async_trait::async_trait]
    impl SecretLister for NoSecrets {
        async fn get_secret(
            &self,
            _ns: &str,
            _name: &str,
        ) -> Result<Option<k8s_openapi::api::core::v1::Secret>, Error> {
            Ok(None)
        }
    }

    struct NoConfigMaps;
    #[async_trait::async_trait]
    impl ConfigMapLister for NoConfigMaps {
        async fn get_config_map(
            &self,
            _ns: &str,
            _name: &str,
        ) -> Result<Option<k8s_openapi::api::core::v1::ConfigMap>, Error> {
            Ok(None)
        }
    }

    fn pod() -> Pod {
        Pod::default()
    }

    #[tokio::test]
    async fn command_and_args_concatenate() {
        let container = PodContainer {
            name: "app".to_owned(),
            image: Some("app:latest".to_owned()),
            command: Some(vec!["/bin/sh".to_owned()]),
            args: Some(vec!["-c".to_owned(), "true".to_owned()]),
            ..Default::default()
        };
        let mapped = map_container(&pod(), "default", &container, None, &NoSecrets, &NoConfigMaps)
            .await
            .unwrap();
        let props = mapped.properties.unwrap();
        assert_eq!(props.command, vec!["/bin/sh", "-c", "true"]);
    }

    #[tokio::test]
    async fn requests_are_always_set() {
        let container = PodContainer {
            name: "app".to_owned(),
            image: Some("app:latest".to_owned()),
            ..Default::default()
        };
        let mapped = map_container(&pod(), "default", &container, None, &NoSecrets, &NoConfigMaps)
            .await
            .unwrap();
        let props = mapped.properties.unwrap();
        assert_eq!(props.resources.requests.cpu, 1.0);
        assert!(props.resources.limits.is_none());
    }
}
