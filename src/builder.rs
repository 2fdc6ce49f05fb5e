//! The Container Group Builder
//!
//! Composes a full container-group submission from a pod, the provider's
//! configuration, and the mapped fragments the Schema Mapper and Credential
//! Resolver produce. Does not itself talk to the Cloud Container Service
//! except to validate GPU region capability; submission is the Provider
//! Facade's job so create/update share one code path.
use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;

use crate::client::ContainerGroupClient;
use crate::config::Conf;
use crate::credentials;
use crate::error::Error;
use crate::listers::{ConfigMapLister, SecretLister};
use crate::mapper::{self, os_filter, resources::GPU_SKU_ANNOTATION, volumes};
use crate::remote::{tag_keys, format_creation_timestamp, ContainerGroup, ContainerGroupProperties, NetworkProfile};

/// Derive the deterministic container-group name for a pod
///
/// # Arguments
///
/// * `namespace` - The pod's namespace
/// * `pod_name` - The pod's name
pub fn container_group_name(namespace: &str, pod_name: &str) -> String {
    format!("{namespace}-{pod_name}")
}

/// Build the identity tags stamped on every container group this provider creates
///
/// # Arguments
///
/// * `pod` - The pod whose identity is being carried onto the remote group
/// * `node_name` - The name this provider is registered as with the orchestrator
pub fn identity_tags(pod: &Pod, node_name: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert(
        tag_keys::POD_NAME.to_owned(),
        pod.metadata.name.clone().unwrap_or_default(),
    );
    tags.insert(
        tag_keys::NAMESPACE.to_owned(),
        pod.metadata.namespace.clone().unwrap_or_default(),
    );
    tags.insert(tag_keys::NODE_NAME.to_owned(), node_name.to_owned());
    tags.insert(
        tag_keys::UID.to_owned(),
        pod.metadata.uid.clone().unwrap_or_default(),
    );
    let created = pod
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|time| time.0)
        .unwrap_or_else(Utc::now);
    tags.insert(
        tag_keys::CREATION_TIMESTAMP.to_owned(),
        format_creation_timestamp(&created),
    );
    tags
}

/// Resolve the effective OS a pod should be scheduled under
///
/// Prefers `pod.spec.os.name` (Kubernetes' own OS field) over the provider's
/// configured default, so a mixed-OS cluster can still schedule pods of
/// either OS onto this one virtual node.
fn effective_os(pod: &Pod, conf: &Conf) -> String {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.os.as_ref())
        .map(|os| os.name.clone())
        .unwrap_or_else(|| conf.provider_operating_system.clone())
}

/// Build a full container-group submission for a pod
///
/// # Arguments
///
/// * `pod` - The pod to translate
/// * `conf` - The provider's configuration (resource group, region, network, default OS)
/// * `node_name` - The name this provider is registered as with the orchestrator
/// * `secrets` - The secret lister used to resolve env/volume/credential secrets
/// * `config_maps` - The config map lister used to resolve env/volume config maps
/// * `client` - The Cloud Container Service client, used only to validate GPU region capability
pub async fn build(
    pod: &Pod,
    conf: &Conf,
    node_name: &str,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
    client: &dyn ContainerGroupClient,
) -> Result<ContainerGroup, Error> {
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .ok_or_else(|| Error::validation("pod has no namespace"))?;
    let pod_name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("pod has no name"))?;
    let spec = pod
        .spec
        .as_ref()
        .ok_or_else(|| Error::validation("pod has no spec"))?;

    let os_type = effective_os(pod, conf);
    let gpu_sku = pod
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(GPU_SKU_ANNOTATION))
        .map(String::as_str);

    let containers = mapper::map_containers(
        pod,
        &namespace,
        &spec.containers,
        gpu_sku,
        secrets,
        config_maps,
    )
    .await?;
    let init_containers = mapper::map_containers(
        pod,
        &namespace,
        spec.init_containers.as_deref().unwrap_or_default(),
        gpu_sku,
        secrets,
        config_maps,
    )
    .await?;
    let mapped_volumes = volumes::map_volumes(
        &namespace,
        spec.volumes.as_deref().unwrap_or_default(),
        secrets,
        config_maps,
    )
    .await?;
    let image_registry_credentials =
        credentials::resolve_image_pull_secrets(pod, &namespace, secrets).await?;

    let network_profile = conf
        .network
        .vnet_name
        .as_ref()
        .map(|vnet_name| NetworkProfile {
            id: vnet_name.clone(),
        });

    let mut group = ContainerGroup {
        name: container_group_name(&namespace, &pod_name),
        location: conf.aci_region.clone(),
        os_type: os_type.clone(),
        tags: identity_tags(pod, node_name),
        properties: ContainerGroupProperties {
            containers,
            init_containers,
            volumes: mapped_volumes,
            image_registry_credentials,
            restart_policy: None,
            ip_address: None,
            network_profile,
            diagnostics: None,
            dns_config: None,
            provisioning_state: None,
            instance_view: None,
        },
    };

    os_filter::apply(&os_type, &mut group);
    validate_gpu_capability(&group, conf, client).await?;

    Ok(group)
}

/// Confirm the configured region reports GPU capability if any container requested one
async fn validate_gpu_capability(
    group: &ContainerGroup,
    conf: &Conf,
    client: &dyn ContainerGroupClient,
) -> Result<(), Error> {
    let requests_gpu = group
        .properties
        .containers
        .iter()
        .chain(group.properties.init_containers.iter())
        .filter_map(|c| c.properties.as_ref())
        .any(|props| props.resources.requests.gpu.is_some());
    if !requests_gpu {
        return Ok(());
    }

    let capabilities = client.list_capabilities(&conf.aci_region).await?;
    let available = capabilities
        .iter()
        .any(|cap| cap.location.eq_ignore_ascii_case(&conf.aci_region) && cap.gpu.is_some());
    if !available {
        return Err(Error::validation(format!(
            "GPU capability is not available in region {}",
            conf.aci_region
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container as PodContainer, PodSpec, Secret};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use crate::remote::RegionCapability;

    struct NoSecrets;
    #[async_trait::async_trait]
    impl SecretLister for NoSecrets {
        async fn get_secret(&self, _ns: &str, _name: &str) -> Result<Option<Secret>, Error> {
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

    struct NoCapabilities;
    #[async_trait::async_trait]
    impl ContainerGroupClient for NoCapabilities {
        async fn create_container_group(
            &self,
            _rg: &str,
            _group: &ContainerGroup,
        ) -> Result<ContainerGroup, Error> {
            unimplemented!()
        }
        async fn get_container_group_info(
            &self,
            _rg: &str,
            _ns: &str,
            _name: &str,
            _node_name: &str,
        ) -> Result<ContainerGroup, Error> {
            unimplemented!()
        }
        async fn get_container_group_list(&self, _rg: &str) -> Result<Vec<ContainerGroup>, Error> {
            unimplemented!()
        }
        async fn delete_container_group(&self, _rg: &str, _name: &str) -> Result<(), Error> {
            unimplemented!()
        }
        async fn list_logs(
            &self,
            _rg: &str,
            _cg: &str,
            _container: &str,
            _opts: &crate::client::LogOptions,
        ) -> Result<Option<String>, Error> {
            unimplemented!()
        }
        async fn list_capabilities(&self, _region: &str) -> Result<Vec<RegionCapability>, Error> {
            Ok(vec![])
        }
    }

    fn conf() -> Conf {
        Conf {
            aci_resource_group: "rg".to_owned(),
            aci_region: "westus2".to_owned(),
            location: "westus2".to_owned(),
            provider_operating_system: "Linux".to_owned(),
            network: Default::default(),
            resync_seconds: 5,
            tracing: Default::default(),
            capacity: Default::default(),
            ccs_endpoint: "https://ccs.test".to_owned(),
            ccs_bearer_token: None,
        }
    }

    fn pod() -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("demo".to_owned()),
                namespace: Some("default".to_owned()),
                uid: Some("uid-1".to_owned()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![PodContainer {
                    name: "app".to_owned(),
                    image: Some("app:latest".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn group_name_is_namespace_dash_pod_name() {
        let group = build(&pod(), &conf(), "node-1", &NoSecrets, &NoConfigMaps, &NoCapabilities)
            .await
            .unwrap();
        assert_eq!(group.name, "default-demo");
    }

    #[tokio::test]
    async fn identity_tags_are_all_present() {
        let group = build(&pod(), &conf(), "node-1", &NoSecrets, &NoConfigMaps, &NoCapabilities)
            .await
            .unwrap();
        for key in [
            tag_keys::POD_NAME,
            tag_keys::NAMESPACE,
            tag_keys::NODE_NAME,
            tag_keys::UID,
            tag_keys::CREATION_TIMESTAMP,
        ] {
            assert!(group.tags.contains_key(key), "missing tag {key}");
        }
        assert_eq!(group.tags[tag_keys::NODE_NAME], "node-1");
    }

    #[tokio::test]
    async fn containers_map_one_to_one_in_order() {
        let group = build(&pod(), &conf(), "node-1", &NoSecrets, &NoConfigMaps, &NoCapabilities)
            .await
            .unwrap();
        assert_eq!(group.properties.containers.len(), 1);
        assert_eq!(group.properties.containers[0].name, "app");
    }
}
