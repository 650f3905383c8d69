//! Application services for tool registration, discovery and invocation.

mod deadline;
mod error;
mod registry;
mod runtime;

pub use error::{DiscoveryError, InvocationError, RegistrationError, UnavailableServer};
pub use registry::{
    DiscoveredTools, InvokeOptions, RegisterServerRequest, RegistryOptions, ToolRegistry,
};
