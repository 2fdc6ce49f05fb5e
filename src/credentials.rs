//! The Credential Resolver
//!
//! Decodes registry credentials from the two secret encodings Kubernetes
//! image pull secrets come in (`kubernetes.io/dockercfg` and
//! `kubernetes.io/dockerconfigjson`), plus the shared `AuthConfig`-shaped
//! decoding algorithm both ultimately bottom out in.
use base64::Engine;
use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::Error;
use crate::listers::SecretLister;
use crate::remote::RegistryCredential;

const DOCKERCFG_KEY: &str = ".dockercfg";
const DOCKERCONFIGJSON_KEY: &str = ".dockerconfigjson";
const DOCKERCFG_TYPE: &str = "kubernetes.io/dockercfg";
const DOCKERCONFIGJSON_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// A single server's entry in a `.dockercfg`/`.dockerconfigjson` document
#[derive(Deserialize, Debug, Clone, Default)]
struct AuthConfig {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    identitytoken: Option<String>,
}

/// The `.dockerconfigjson` document shape: a map of server to [`AuthConfig`] under `auths`
#[derive(Deserialize, Debug, Clone)]
struct DockerConfigJson {
    auths: BTreeMap<String, AuthConfig>,
}

/// Resolve a single server's credential from an [`AuthConfig`]-shaped record
///
/// # Arguments
///
/// * `server` - The registry server this credential is for
/// * `auth` - The parsed auth config entry
/// * `decode_err_prefix` - The message prefix to use if base64 decoding fails,
///   which differs depending on whether the caller came through the plain
///   `.dockercfg` path or the `.dockerconfigjson` path
fn resolve_auth_config(
    server: &str,
    auth: &AuthConfig,
    decode_err_prefix: &str,
) -> Result<RegistryCredential, Error> {
    if let Some(username) = auth.username.clone().filter(|u| !u.is_empty()) {
        return Ok(RegistryCredential {
            server: server.to_owned(),
            username,
            password: auth.password.clone().unwrap_or_default(),
            identity: auth.identitytoken.clone(),
        });
    }

    let raw = auth.auth.clone().unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::auth(format!(
            "no username present in auth config for server: {server}"
        )));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(raw.as_bytes())
        .map_err(|_| Error::auth(format!("{decode_err_prefix} for server {server}")))?;
    let decoded = String::from_utf8(decoded)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| Error::auth("malformed auth for server".to_owned()))?;

    Ok(RegistryCredential {
        server: server.to_owned(),
        username: username.to_owned(),
        password: password.to_owned(),
        identity: auth.identitytoken.clone(),
    })
}

/// Parse a `.dockercfg` document (a bare server-to-[`AuthConfig`] map) into credentials
fn resolve_dockercfg(raw: &str) -> Result<Vec<RegistryCredential>, Error> {
    let parsed: BTreeMap<String, AuthConfig> = serde_json::from_str(raw)?;
    parsed
        .iter()
        .map(|(server, auth)| resolve_auth_config(server, auth, "error decoding the auth"))
        .collect()
}

/// Parse a `.dockerconfigjson` document (an `auths`-wrapped map) into credentials
fn resolve_dockerconfigjson(raw: &str) -> Result<Vec<RegistryCredential>, Error> {
    let parsed: DockerConfigJson = serde_json::from_str(raw)
        .map_err(|_| Error::auth("malformed dockerconfigjson in secret".to_owned()))?;
    parsed
        .auths
        .iter()
        .map(|(server, auth)| resolve_auth_config(server, auth, "error decoding docker auth"))
        .collect()
}

/// Resolve every registry credential referenced by a pod's `imagePullSecrets`
///
/// # Arguments
///
/// * `pod` - The pod whose `imagePullSecrets` references should be resolved
/// * `namespace` - The namespace to look up secrets in
/// * `secrets` - The secret lister used to fetch the backing secrets
pub async fn resolve_image_pull_secrets(
    pod: &Pod,
    namespace: &str,
    secrets: &dyn SecretLister,
) -> Result<Vec<RegistryCredential>, Error> {
    let refs = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.image_pull_secrets.as_ref())
        .cloned()
        .unwrap_or_default();

    let mut credentials = Vec::new();
    for reference in refs {
        let Some(name) = reference.name else {
            continue;
        };
        let secret = secrets
            .get_secret(namespace, &name)
            .await?
            .ok_or_else(|| Error::validation("error getting image pull secret"))?;

        match secret.type_.as_deref() {
            Some(DOCKERCFG_TYPE) => {
                let raw = secret
                    .data
                    .as_ref()
                    .and_then(|data| data.get(DOCKERCFG_KEY))
                    .filter(|bytes| !bytes.0.is_empty())
                    .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
                    .ok_or_else(|| Error::validation("no dockercfg present in secret"))?;
                credentials.extend(resolve_dockercfg(&raw)?);
            }
            Some(DOCKERCONFIGJSON_TYPE) => {
                let raw = secret
                    .data
                    .as_ref()
                    .and_then(|data| data.get(DOCKERCONFIGJSON_KEY))
                    .filter(|bytes| !bytes.0.is_empty())
                    .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
                    .ok_or_else(|| Error::validation("no dockerconfigjson present in secret"))?;
                credentials.extend(resolve_dockerconfigjson(&raw)?);
            }
            _ => {
                return Err(Error::validation(
                    "image pull secret type is not one of kubernetes.io/dockercfg or kubernetes.io/dockerconfigjson",
                ))
            }
        }
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use k8s_openapi::api::core::v1::{LocalObjectReference, PodSpec, Secret};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;

    fn b64(raw: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(raw)
    }

    #[test]
    fn explicit_username_and_password() {
        let auth = AuthConfig {
            username: Some("u".to_owned()),
            password: Some("p".to_owned()),
            ..Default::default()
        };
        let cred = resolve_auth_config("server", &auth, "error decoding the auth").unwrap();
        assert_eq!(cred.username, "u");
        assert_eq!(cred.password, "p");
    }

    #[test]
    fn base64_user_colon_pass_decodes() {
        let auth = AuthConfig {
            auth: Some(b64("u:p")),
            ..Default::default()
        };
        let cred = resolve_auth_config("server", &auth, "error decoding the auth").unwrap();
        assert_eq!(cred.username, "u");
        assert_eq!(cred.password, "p");
    }

    #[test]
    fn empty_auth_is_no_username_present() {
        let auth = AuthConfig::default();
        let err = resolve_auth_config("myserver", &auth, "error decoding the auth").unwrap_err();
        assert_eq!(
            err.msg().unwrap(),
            "no username present in auth config for server: myserver"
        );
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let auth = AuthConfig {
            auth: Some("123".to_owned()),
            ..Default::default()
        };
        let err = resolve_auth_config("myserver", &auth, "error decoding the auth").unwrap_err();
        assert_eq!(
            err.msg().unwrap(),
            "error decoding the auth for server myserver"
        );
    }

    #[test]
    fn valid_base64_without_colon_is_malformed() {
        let auth = AuthConfig {
            auth: Some(b64("123")),
            ..Default::default()
        };
        let err = resolve_auth_config("myserver", &auth, "error decoding the auth").unwrap_err();
        assert_eq!(err.msg().unwrap(), "malformed auth for server");
    }

    #[test]
    fn dockerconfigjson_with_explicit_fields_succeeds() {
        let raw = r#"{"auths":{"repoData":{"username":"u","password":"p"}}}"#;
        let creds = resolve_dockerconfigjson(raw).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].server, "repoData");
        assert_eq!(creds[0].username, "u");
    }

    #[test]
    fn dockerconfigjson_missing_auths_is_malformed() {
        let raw = r#"{"repoData":{}}"#;
        let err = resolve_dockerconfigjson(raw).unwrap_err();
        assert_eq!(err.msg().unwrap(), "malformed dockerconfigjson in secret");
    }

    struct SecretOf(Secret);
    #[async_trait::async_trait]
    impl SecretLister for SecretOf {
        async fn get_secret(&self, _ns: &str, _name: &str) -> Result<Option<Secret>, Error> {
            Ok(Some(self.0.clone()))
        }
    }

    fn pod_with_pull_secret(name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta::default(),
            spec: Some(PodSpec {
                image_pull_secrets: Some(vec![LocalObjectReference {
                    name: Some(name.to_owned()),
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn missing_dockerconfigjson_key_is_an_error() {
        let mut secret = Secret::default();
        secret.type_ = Some(DOCKERCONFIGJSON_TYPE.to_owned());
        let pod = pod_with_pull_secret("regcred");
        let err = resolve_image_pull_secrets(&pod, "default", &SecretOf(secret))
            .await
            .unwrap_err();
        assert_eq!(err.msg().unwrap(), "no dockerconfigjson present in secret");
    }

    #[tokio::test]
    async fn unknown_secret_type_is_an_error() {
        let mut secret = Secret::default();
        secret.type_ = Some("Opaque".to_owned());
        let pod = pod_with_pull_secret("regcred");
        let err = resolve_image_pull_secrets(&pod, "default", &SecretOf(secret))
            .await
            .unwrap_err();
        assert_eq!(
            err.msg().unwrap(),
            "image pull secret type is not one of kubernetes.io/dockercfg or kubernetes.io/dockerconfigjson"
        );
    }

    #[tokio::test]
    async fn dockerconfigjson_secret_resolves() {
        let mut secret = Secret::default();
        secret.type_ = Some(DOCKERCONFIGJSON_TYPE.to_owned());
        let raw = r#"{"auths":{"repoData":{"username":"u","password":"p"}}}"#;
        secret.data = Some(BTreeMap::from([(
            DOCKERCONFIGJSON_KEY.to_owned(),
            ByteString(raw.as_bytes().to_vec()),
        )]));
        let pod = pod_with_pull_secret("regcred");
        let creds = resolve_image_pull_secrets(&pod, "default", &SecretOf(secret))
            .await
            .unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].server, "repoData");
    }
}
