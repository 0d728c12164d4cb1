//! Tool handler registry and the Proxmox tool implementations.
//!
//! This module provides a simple way to register and invoke tool handlers,
//! making it easy to add new tools without modifying the core `ServerHandler`
//! implementation.

mod registry;
mod schema;

pub use registry::{
    DispatchError, RegistryError, ToolContext, ToolHandler, ToolRegistry, error_result,
    text_result,
};
pub use schema::{ParamKind, ParamSpec, ValidationError};

// Tool handler implementations
mod cluster;
mod container;
mod diagnostics;
mod node;
mod storage;
mod vm;

pub use cluster::GetClusterStatusHandler;
pub use container::GetContainersHandler;
pub use diagnostics::{
    AnalyzeClusterHealthHandler, AnalyzeSecurityPostureHandler, DiagnoseVmIssuesHandler,
    SuggestResourceOptimizationHandler,
};
pub use node::{GetNodeStatusHandler, GetNodesHandler};
pub use storage::GetStorageHandler;
pub use vm::{ExecuteVmCommandHandler, GetVmsHandler};
