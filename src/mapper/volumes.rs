//! Maps pod volumes onto the remote schema
//!
//! The Cloud Container Service has no first-class config-map volume type, so
//! config maps are folded into the same key/value `secret` volume shape used
//! for actual secrets — matching how this family of providers has always
//! represented both on the remote side.
use std::collections::BTreeMap;

use base64::Engine;
use k8s_openapi::api::core::v1::Volume as PodVolume;
use k8s_openapi::ByteString;

use crate::error::Error;
use crate::listers::{ConfigMapLister, SecretLister};
use crate::remote::{AzureFileVolume, GitRepoVolume, Volume};

/// Map every volume a pod declares onto the remote schema
pub async fn map_volumes(
    namespace: &str,
    volumes: &[PodVolume],
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Vec<Volume>, Error> {
    let mut mapped = Vec::with_capacity(volumes.len());
    for volume in volumes {
        mapped.push(map_one(namespace, volume, secrets, config_maps).await?);
    }
    Ok(mapped)
}

async fn map_one(
    namespace: &str,
    volume: &PodVolume,
    secrets: &dyn SecretLister,
    config_maps: &dyn ConfigMapLister,
) -> Result<Volume, Error> {
    if volume.empty_dir.is_some() {
        return Ok(bare(volume.name.clone(), VolumeKind::EmptyDir));
    }

    if let Some(source) = &volume.secret {
        let secret_name = source.secret_name.clone().ok_or_else(|| {
            Error::validation(format!("volume {} has no secretName", volume.name))
        })?;
        let secret = secrets
            .get_secret(namespace, &secret_name)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {secret_name} referenced by volume {} not found",
                    volume.name
                ))
            })?;
        return Ok(bare(
            volume.name.clone(),
            VolumeKind::Secret(byte_map_to_strings(secret.data)),
        ));
    }

    if let Some(source) = &volume.config_map {
        let config_map_name = source.name.clone().ok_or_else(|| {
            Error::validation(format!("volume {} has no configMap name", volume.name))
        })?;
        let config_map = config_maps
            .get_config_map(namespace, &config_map_name)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "config map {config_map_name} referenced by volume {} not found",
                    volume.name
                ))
            })?;
        let mut data = config_map.data.unwrap_or_default();
        for (key, bytes) in config_map.binary_data.unwrap_or_default() {
            data.insert(
                key,
                base64::engine::general_purpose::STANDARD.encode(bytes.0),
            );
        }
        return Ok(bare(volume.name.clone(), VolumeKind::Secret(data)));
    }

    if let Some(source) = &volume.azure_file {
        let secret = secrets
            .get_secret(namespace, &source.secret_name)
            .await?
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {} referenced by azureFile volume {} not found",
                    source.secret_name, volume.name
                ))
            })?;
        let data = secret.data.unwrap_or_default();
        let account_name = data
            .get("azurestorageaccountname")
            .map(|v| String::from_utf8_lossy(&v.0).into_owned())
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {} has no azurestorageaccountname key",
                    source.secret_name
                ))
            })?;
        let account_key = data
            .get("azurestorageaccountkey")
            .map(|v| String::from_utf8_lossy(&v.0).into_owned())
            .ok_or_else(|| {
                Error::validation(format!(
                    "secret {} has no azurestorageaccountkey key",
                    source.secret_name
                ))
            })?;
        return Ok(Volume {
            name: volume.name.clone(),
            empty_dir: None,
            secret: None,
            azure_file: Some(AzureFileVolume {
                share_name: source.share_name.clone(),
                storage_account_name: account_name,
                storage_account_key: account_key,
                read_only: source.read_only.unwrap_or(false),
            }),
            git_repo: None,
        });
    }

    if let Some(source) = &volume.git_repo {
        return Ok(Volume {
            name: volume.name.clone(),
            empty_dir: None,
            secret: None,
            azure_file: None,
            git_repo: Some(GitRepoVolume {
                repository: source.repository.clone(),
                directory: source.directory.clone(),
                revision: source.revision.clone(),
            }),
        });
    }

    if let Some(source) = &volume.projected {
        let mut merged = BTreeMap::new();
        for projection in source.sources.clone().unwrap_or_default() {
            if let Some(cm) = projection.config_map {
                let name = cm.name.ok_or_else(|| {
                    Error::validation(format!(
                        "projected volume {} has a configMap source with no name",
                        volume.name
                    ))
                })?;
                let config_map = config_maps
                    .get_config_map(namespace, &name)
                    .await?
                    .ok_or_else(|| {
                        Error::validation(format!(
                            "config map {name} projected by volume {} not found",
                            volume.name
                        ))
                    })?;
                merged.extend(config_map.data.unwrap_or_default());
            }
            if let Some(sec) = projection.secret {
                let name = sec.name.ok_or_else(|| {
                    Error::validation(format!(
                        "projected volume {} has a secret source with no name",
                        volume.name
                    ))
                })?;
                let secret = secrets
                    .get_secret(namespace, &name)
                    .await?
                    .ok_or_else(|| {
                        Error::validation(format!(
                            "secret {name} projected by volume {} not found",
                            volume.name
                        ))
                    })?;
                merged.extend(byte_map_to_strings(secret.data));
            }
            if projection.service_account_token.is_some() {
                // minting a fresh service-account token is the node-agent
                // framework's job (out of scope here); record the slot so the
                // volume still round-trips, the token itself is populated by
                // whatever acquires it before submission.
                merged.entry("token".to_owned()).or_insert_with(String::new);
            }
        }
        return Ok(bare(volume.name.clone(), VolumeKind::Secret(merged)));
    }

    Err(Error::validation(format!(
        "unsupported volume type for volume {}",
        volume.name
    )))
}

enum VolumeKind {
    EmptyDir,
    Secret(BTreeMap<String, String>),
}

fn bare(name: String, kind: VolumeKind) -> Volume {
    match kind {
        VolumeKind::EmptyDir => Volume {
            name,
            empty_dir: Some(serde_json::json!({})),
            secret: None,
            azure_file: None,
            git_repo: None,
        },
        VolumeKind::Secret(data) => Volume {
            name,
            empty_dir: None,
            secret: Some(data),
            azure_file: None,
            git_repo: None,
        },
    }
}

fn byte_map_to_strings(data: Option<BTreeMap<String, ByteString>>) -> BTreeMap<String, String> {
    data.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, String::from_utf8_lossy(&v.0).into_owned()))
        .collect()
}
