//! Resource graph construction and the provisioning backend client.
//!
//! [`Provisioner`] turns a resolved [`App`](skylift_core::App) into a
//! [`ResourceGraph`] entirely in memory; [`BackendClient`] is the only piece
//! that spawns the backend and submits a graph.

pub mod backend;
pub mod client;
pub mod executor;
pub mod graph;
pub mod provision;
pub mod resource;

pub use backend::BackendError;
pub use client::{AppCheck, BackendClient, CheckResult, DoctorReport, SubmitError, SubmitReport};
pub use executor::{BackendExecutor, RealExecutor};
pub use graph::{Edge, GraphError, ResourceGraph};
pub use provision::{ProvisionError, Provisioner};
pub use resource::{Attr, Expr, Resource, ResourceKind};
