//! Maps a pod container's resource requests/limits onto the remote schema
use k8s_openapi::api::core::v1::ResourceRequirements as PodResourceRequirements;

use crate::error::Error;
use crate::mapper::quantity::{to_base_units, truncate};
use crate::remote::{GpuResource, ResourceLimits, ResourceRequests, ResourceRequirements};

/// The resource name a pod uses to request GPUs, matching the upstream
/// Kubernetes device-plugin convention
pub const GPU_RESOURCE_NAME: &str = "nvidia.com/gpu";

/// The annotation a pod carries to pick a GPU SKU
pub const GPU_SKU_ANNOTATION: &str = "virtual-kubelet.io/container-gpu-type";

/// The CPU cores requested when a pod specifies none
const DEFAULT_CPU_CORES: f64 = 1.0;

/// The memory, in the remote units, requested when a pod specifies none
const DEFAULT_MEMORY_GB: f64 = 1.5;

/// Map a pod container's resources onto the remote `ResourceRequirements`
///
/// # Arguments
///
/// * `resources` - The pod container's resource block, if any
/// * `gpu_sku` - The GPU SKU annotation value on the owning pod, if any
pub fn map_resources(
    resources: Option<&PodResourceRequirements>,
    gpu_sku: Option<&str>,
) -> Result<ResourceRequirements, Error> {
    let requests = resources.and_then(|r| r.requests.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());

    let cpu_cores = match requests.and_then(|r| r.get("cpu")) {
        Some(q) => truncate(to_base_units(q)?, 2),
        None => DEFAULT_CPU_CORES,
    };
    let memory_gb = match requests.and_then(|r| r.get("memory")) {
        Some(q) => truncate(to_base_units(q)? / 1_000_000_000.0, 1),
        None => DEFAULT_MEMORY_GB,
    };
    let gpu_count = limits
        .and_then(|l| l.get(GPU_RESOURCE_NAME))
        .map(|q| to_base_units(q))
        .transpose()?
        .map(|count| count as i64);
    let request_gpu = gpu_count.map(|count| GpuResource {
        count,
        sku: gpu_sku.map(ToOwned::to_owned),
    });

    let mapped_limits = if let Some(limits) = limits {
        let cpu = limits
            .get("cpu")
            .map(|q| to_base_units(q))
            .transpose()?
            .map(|v| truncate(v, 2));
        let memory = limits
            .get("memory")
            .map(|q| to_base_units(q))
            .transpose()?
            .map(|v| truncate(v / 1_000_000_000.0, 1));
        if cpu.is_some() || memory.is_some() {
            Some(ResourceLimits {
                cpu,
                memory_in_gb: memory,
                gpu: request_gpu.clone(),
            })
        } else {
            None
        }
    } else {
        None
    };

    Ok(ResourceRequirements {
        requests: ResourceRequests {
            cpu: cpu_cores,
            memory_in_gb: memory_gb,
            gpu: request_gpu,
        },
        limits: mapped_limits,
    })
}
