//! Maps pod container environment variables onto the remote schema
use k8s_openapi::api::core::v1::{EnvVar as PodEnvVar, Pod};

use crate::error::Error;
use crate::listers::{ConfigMapLister, SecretLister};
use crate::remote::EnvironmentVariable;

/// Map a container's environment variables for one pod's containers
///
/// Plain values pass straight through. Values sourced from a secret key are
/// resolved eagerly and emitted as `secure_value` so they never appear in a
/// plaintext read of the submitted container group. Config-map-sourced and
/// downward-API values resolve the same way but stay in `value`.
pub async fn map_env(
    pod: &Pod,
    namespace: &str,
    env: &[PodEnvVar],
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Vec<EnvironmentVariable>, Error> {
    let mut mapped = Vec::with_capacity(env.len());
    for entry in env {
        mapped.push(map_one(pod, namespace, entry, secrets, config_maps).await?);
    }
    Ok(mapped)
}

async fn map_one(
    pod: &Pod,
    namespace: &str,
    entry: &PodEnvVar,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<EnvironmentVariable, Error> {
    let Some(value_from) = &entry.value_from else {
        return Ok(EnvironmentVariable {
            name: entry.name.clone(),
            value: entry.value.clone(),
            secure_value: None,
        });
    };

    if let Some(selector) = &value_from.secret_key_ref {
        let secret_name = selector.name.as_deref().ok_or_else(|| {
            Error::validation(format!(
                "secretKeyRef for env var {} has no secret name",
                entry.name
            ))
        })?;
        let secret = secrets
            .get_secret(namespace, secret_name)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {secret_name} referenced by env var {} not found",
                    entry.name
                ))
            })?;
        let value = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&selector.key))
            .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {secret_name} has no key {} for env var {}",
                    selector.key, entry.name
                ))
            })?;
        return Ok(EnvironmentVariable {
            name: entry.name.clone(),
            value: None,
            secure_value: Some(value),
        });
    }

    if let Some(selector) = &value_from.config_map_key_ref {
        let config_map_name = selector.name.as_deref().ok_or_else(|| {
            Error::validation(format!(
                "configMapKeyRef for env var {} has no config map name",
                entry.name
            ))
        })?;
        let config_map = config_maps
            .get_config_map(namespace, config_map_name)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "config map {config_map_name} referenced by env var {} not found",
                    entry.name
                ))
            })?;
        let value = config_map
            .data
            .as_ref()
            .and_then(|data| data.get(&selector.key))
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!(
                    "config map {config_map_name} has no key {} for env var {}",
                    selector.key, entry.name
                ))
            })?;
        return Ok(EnvironmentVariable {
            name: entry.name.clone(),
            value: Some(value),
            secure_value: None,
        });
    }

    if let Some(field_ref) = &value_from.field_ref {
        let value = match field_ref.field_path.as_str() {
            "metadata.name" => pod.metadata.name.clone(),
            "metadata.namespace" => pod.metadata.namespace.clone(),
            "status.podIP" => pod.status.as_ref().and_then(|s| s.pod_ip.clone()),
            "status.hostIP" => pod.status.as_ref().and_then(|s| s.host_ip.clone()),
            other => {
                return Err(Error::validation(format!(
                    "unsupported downward API field path: {other}"
                )))
            }
        };
        return Ok(EnvironmentVariable {
            name: entry.name.clone(),
            value,
            secure_value: None,
        });
    }

    Err(Error::validation(format!(
        "env var {} has an empty valueFrom",
        entry.name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EnvVarSource, ObjectFieldSelector, SecretKeySelector};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    struct NoSecrets;
    #[async_trait::async_trait]
    impl SecretLister for NoSecrets {
        async fn get_secret(&self, _ns: &str, _name: &str) -> Result<Option<k8s_openapi::api::core::v1::Secret>, Error> {
            Ok(None)
        }
    }

    struct NoConfigMaps;
    #[async_trait::async_trait]
    impl ConfigMapLister for NoConfigMaps {
        async fn get_config_map(&self, _ns: &str, _name: &str) -> Result<Option<k8s_openapi::api::core::v1::ConfigMap>, Error> {
            Ok(None)
        }
    }

    fn pod() -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("demo".to_owned()),
                namespace: Some("default".to_owned()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn plain_value_passes_through() {
        let entry = PodEnvVar {
            name: "FOO".to_owned(),
            value: Some("bar".to_owned()),
            value_from: None,
        };
        let mapped = map_one(&pod(), "default", &entry, &NoSecrets, &NoConfigMaps)
            .await
            .unwrap();
        assert_eq!(mapped.value.as_deref(), Some("bar"));
        assert!(mapped.secure_value.is_none());
    }

    #[tokio::test]
    async fn downward_api_name_resolves() {
        let entry = PodEnvVar {
            name: "POD_NAME".to_owned(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.name".to_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };
        let mapped = map_one(&pod(), "default", &entry, &NoSecrets, &NoConfigMaps)
            .await
            .unwrap();
        assert_eq!(mapped.value.as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn missing_secret_is_an_error() {
        let entry = PodEnvVar {
            name: "SECRET_VAL".to_owned(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: Some("missing".to_owned()),
                    key: "token".to_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };
        let result = map_one(&pod(), "default", &entry, &NoSecrets, &NoConfigMaps).await;
        assert!(result.is_err());
    }
}
