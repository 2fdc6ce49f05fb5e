//! The Status Projector
//!
//! Pure translation from an observed container group back into pod status:
//! phase, conditions, per-container state, restart counts, and IPs. Holds no
//! state and performs no I/O, so it is safe to call concurrently.
use k8s_openapi::api::core::v1::{
    ContainerState as PodContainerState, ContainerStateRunning, ContainerStateTerminated,
    ContainerStateWaiting, ContainerStatus as PodContainerStatus, PodCondition, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::error::Error;
use crate::remote::{parse_creation_timestamp, tag_keys, Container, ContainerGroup};

/// Project an observed container group into a pod status
///
/// # Arguments
///
/// * `group` - The container group the Cloud Container Service reported
/// * `host_ip` - This provider's internal IP, stamped onto every projected pod as `HostIP`
pub fn project_pod_status(group: &ContainerGroup, host_ip: &str) -> Result<PodStatus, Error> {
    if group.properties.containers.is_empty() {
        return Err(Error::validation(format!(
            "containers list cannot be nil for container group {}",
            group.name
        )));
    }

    let mut statuses = Vec::with_capacity(group.properties.containers.len());
    for container in &group.properties.containers {
        statuses.push(project_container_status(group, container)?);
    }
    let all_ready = statuses.iter().all(|status| status.ready);

    let phase = project_phase(group, all_ready);
    let created = group
        .tags
        .get(tag_keys::CREATION_TIMESTAMP)
        .map(|raw| parse_creation_timestamp(raw))
        .unwrap_or_else(chrono::Utc::now);
    let last_transition = Time(created);

    let conditions = vec![
        condition("Initialized", "True", &last_transition),
        condition(
            "Ready",
            bool_str(phase == "Running" && all_ready),
            &last_transition,
        ),
        condition("ContainersReady", bool_str(all_ready), &last_transition),
    ];

    Ok(PodStatus {
        phase: Some(phase.to_owned()),
        conditions: Some(conditions),
        container_statuses: Some(statuses),
        host_ip: Some(host_ip.to_owned()),
        pod_ip: group.properties.ip_address.as_ref().map(|ip| ip.ip.clone()),
        start_time: Some(last_transition),
        ..Default::default()
    })
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn condition(kind: &str, status: &str, last_transition: &Time) -> PodCondition {
    PodCondition {
        type_: kind.to_owned(),
        status: status.to_owned(),
        last_transition_time: Some(last_transition.clone()),
        ..Default::default()
    }
}

/// Derive the pod phase from the group's provisioning state and instance view
fn project_phase(group: &ContainerGroup, all_ready: bool) -> &'static str {
    match group.properties.provisioning_state.as_deref() {
        Some("Succeeded") => "Succeeded",
        Some("Failed") => "Failed",
        _ => {
            let group_running = group
                .properties
                .instance_view
                .as_ref()
                .and_then(|view| view.state.as_deref())
                .map(|state| state.eq_ignore_ascii_case("running"))
                .unwrap_or(false);
            if group_running && all_ready {
                "Running"
            } else {
                "Pending"
            }
        }
    }
}

/// Project a single remote container's state onto a pod container status
fn project_container_status(
    group: &ContainerGroup,
    container: &Container,
) -> Result<PodContainerStatus, Error> {
    let props = container.properties.as_ref().ok_or_else(|| {
        Error::validation(format!(
            "container {} properties cannot be nil",
            container.name
        ))
    })?;
    let view = props.instance_view.as_ref();
    let current = view.and_then(|v| v.current_state.as_ref());
    let previous = view.and_then(|v| v.previous_state.as_ref());

    let ready = current
        .map(|state| state.state.eq_ignore_ascii_case("running"))
        .unwrap_or(false);
    let restart_count = view.map(|v| v.restart_count).unwrap_or(0);
    let container_id = format!("{}-{}", group.name, container.name);

    Ok(PodContainerStatus {
        name: container.name.clone(),
        image: props.image.clone(),
        image_id: String::new(),
        container_id: Some(container_id),
        ready,
        restart_count,
        state: current.map(project_container_state),
        last_state: previous.map(project_container_state),
        started: Some(ready),
        ..Default::default()
    })
}

/// Map a single remote container state onto exactly one of waiting/running/terminated
fn project_container_state(state: &crate::remote::ContainerState) -> PodContainerState {
    match state.state.to_ascii_lowercase().as_str() {
        "running" => PodContainerState {
            running: Some(ContainerStateRunning {
                started_at: state.start_time.map(Time),
            }),
            ..Default::default()
        },
        "terminated" => PodContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code: state.exit_code.unwrap_or(0),
                reason: state.detail_status.clone(),
                message: state.detail_status.clone(),
                started_at: state.start_time.map(Time),
                finished_at: state.finish_time.map(Time),
                ..Default::default()
            }),
            ..Default::default()
        },
        _ => PodContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: state.detail_status.clone(),
                message: None,
            }),
            ..Default::default()
        },
    }
}
