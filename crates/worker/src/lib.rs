pub mod collaborators;
pub mod executors;
pub mod pipeline;
pub mod service;
pub mod storage;

pub mod components;

pub use collaborators::Collaborators;
pub use executors::{CommandOutput, CommandRunner, CommandSpec, ProcessCommandRunner};
pub use pipeline::{JobOutcome, JobPipeline};
pub use service::WorkerService;
pub use storage::{AwsCliStore, ObjectStore};
