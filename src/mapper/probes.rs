//! Maps pod container probes onto the remote schema
use k8s_openapi::api::core::v1::{ContainerPort as PodContainerPort, Probe as PodProbe};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::error::Error;
use crate::remote::{ExecAction, HttpGetAction, Probe};

/// Map a single pod probe (liveness or readiness) onto the remote schema
///
/// # Arguments
///
/// * `probe` - The pod's probe definition
/// * `container_ports` - The enclosing container's ports, to resolve named ports against
pub fn map_probe(probe: &PodProbe, container_ports: &[PodContainerPort]) -> Result<Probe, Error> {
    match (&probe.exec, &probe.http_get) {
        (Some(_), Some(_)) => Err(Error::validation(
            "probe may not specify more than one of \"exec\" and \"httpGet\"",
        )),
        (None, None) => Err(Error::validation(
            "probe must specify one of \"exec\" and \"httpGet\"",
        )),
        (Some(exec), None) => Ok(Probe {
            exec: Some(ExecAction {
                command: exec.command.clone().unwrap_or_default(),
            }),
            http_get: None,
            initial_delay_seconds: probe.initial_delay_seconds.unwrap_or(0),
            period_seconds: probe.period_seconds.unwrap_or(10),
            timeout_seconds: probe.timeout_seconds.unwrap_or(1),
            success_threshold: probe.success_threshold.unwrap_or(1),
            failure_threshold: probe.failure_threshold.unwrap_or(3),
        }),
        (None, Some(http_get)) => {
            let port = resolve_port(&http_get.port, container_ports)?;
            Ok(Probe {
                exec: None,
                http_get: Some(HttpGetAction {
                    path: http_get.path.clone(),
                    port,
                    scheme: http_get.scheme.clone(),
                }),
                initial_delay_seconds: probe.initial_delay_seconds.unwrap_or(0),
                period_seconds: probe.period_seconds.unwrap_or(10),
                timeout_seconds: probe.timeout_seconds.unwrap_or(1),
                success_threshold: probe.success_threshold.unwrap_or(1),
                failure_threshold: probe.failure_threshold.unwrap_or(3),
            })
        }
    }
}

/// Resolve an `IntOrString` probe port against a container's named ports
fn resolve_port(port: &IntOrString, container_ports: &[PodContainerPort]) -> Result<i32, Error> {
    match port {
        IntOrString::Int(value) => Ok(*value),
        IntOrString::String(name) => container_ports
            .iter()
            .find(|p| p.name.as_deref() == Some(name.as_str()))
            .map(|p| p.container_port)
            .ok_or_else(|| Error::validation(format!("unable to find named port: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ExecAction as PodExecAction, HTTPGetAction};

    fn ports() -> Vec<PodContainerPort> {
        vec![PodContainerPort {
            name: Some("http".to_owned()),
            container_port: 8080,
            ..Default::default()
        }]
    }

    #[test]
    fn exec_only_succeeds() {
        let probe = PodProbe {
            exec: Some(PodExecAction {
                command: Some(vec!["true".to_owned()]),
            }),
            ..Default::default()
        };
        let mapped = map_probe(&probe, &[]).unwrap();
        assert!(mapped.exec.is_some());
        assert!(mapped.http_get.is_none());
    }

    #[test]
    fn both_exec_and_http_get_is_an_error() {
        let probe = PodProbe {
            exec: Some(PodExecAction { command: None }),
            http_get: Some(HTTPGetAction {
                port: IntOrString::Int(80),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = map_probe(&probe, &[]).unwrap_err();
        assert_eq!(
            err.msg().unwrap(),
            "probe may not specify more than one of \"exec\" and \"httpGet\""
        );
    }

    #[test]
    fn neither_exec_nor_http_get_is_an_error() {
        let probe = PodProbe::default();
        let err = map_probe(&probe, &[]).unwrap_err();
        assert_eq!(
            err.msg().unwrap(),
            "probe must specify one of \"exec\" and \"httpGet\""
        );
    }

    #[test]
    fn named_port_resolves() {
        let probe = PodProbe {
            http_get: Some(HTTPGetAction {
                port: IntOrString::String("http".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mapped = map_probe(&probe, &ports()).unwrap();
        assert_eq!(mapped.http_get.unwrap().port, 8080);
    }

    #[test]
    fn unresolvable_named_port_is_an_error() {
        let probe = PodProbe {
            http_get: Some(HTTPGetAction {
                port: IntOrString::String("https".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = map_probe(&probe, &ports()).unwrap_err();
        assert_eq!(err.msg().unwrap(), "unable to find named port: https");
    }
}
