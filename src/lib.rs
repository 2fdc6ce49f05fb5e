//! A virtual Kubernetes node provider bridging a pod control plane with a
//! managed Cloud Container Service
//!
//! For each pod scheduled to this node, the [`builder`] translates the pod
//! spec into a container group and submits it through a [`client`], while
//! the [`tracker`] continuously reconciles the remote container group's
//! observed state back into pod status via the [`status`] projector. The
//! [`provider`] module ties these together behind the operations a
//! node-agent framework drives.
pub mod args;
pub mod builder;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http_client;
pub mod listers;
pub mod mapper;
pub mod provider;
pub mod remote;
pub mod status;
pub mod tracker;
pub mod utils;

#[cfg(any(test, feature = "test-utilities"))]
pub mod test_support;

pub use config::Conf;
pub use error::Error;
pub use provider::Provider;
