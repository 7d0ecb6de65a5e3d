// Wire models shared by the sampler, the live stream and the one-shot endpoints.

mod container;
mod service;
mod system;

pub use container::{ContainerSnapshot, ContainerStatus, HealthStatus, PortMapping};
pub use service::ServiceSnapshot;
pub use system::{ProcessInfo, SystemSnapshot};
