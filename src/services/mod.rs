//! Services for mirroring ConfigMaps onto the filesystem.
//!
//! - `CommandRunner`: runs verify and post-deploy commands with a timeout
//! - `FileRegistrar`: maps ConfigMap keys to files and writes/removes them
//! - `VerificationPipeline`: all-or-nothing content validation
//! - `PostDeployRunner`: best-effort follow-up actions
//! - `WatchSession`: reconnecting ConfigMap watch
//! - `Reconciler`: per-event decisions for one job

pub mod command_runner;
pub mod file_registrar;
pub mod post_deploy;
pub mod reconciler;
pub mod verification;
pub mod watch_session;

pub use command_runner::{substitute, CommandOutput, CommandRunner};
pub use file_registrar::{paths_for, FileRegistrar};
pub use post_deploy::{ActionReport, PostDeployRunner};
pub use reconciler::{EventOutcome, Reconciler, SkipReason};
pub use verification::VerificationPipeline;
pub use watch_session::{ReconnectPolicy, WatchSession};
