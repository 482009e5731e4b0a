//! pv-orchestrator: Local preview environment orchestration
//!
//! Starts the project's application server and a public tunnel in front of
//! it, waits for both to become ready, and records the public URL. Both
//! processes run detached; PID markers in the project root are how later
//! runs and `stop` find them again.

pub mod health;
pub mod identity;
pub mod logscan;
pub mod orchestrator;
pub mod poll;
pub mod port;
pub mod supervisor;
pub mod tunnel;

pub use health::HealthChecker;
pub use identity::{verify_project, ProjectIdentity};
pub use orchestrator::{
    Orchestrator, ProcessStatus, StartSummary, StatusReport, StopOptions, StopReport,
};
pub use port::PortResolver;
pub use supervisor::{StopOutcome, Supervisor};
