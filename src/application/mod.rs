//! Application layer: runs configured jobs side by side until shutdown.

pub mod shutdown;
pub mod supervisor;

pub use shutdown::shutdown_signal;
pub use supervisor::{JobSupervisor, SupervisorError};
