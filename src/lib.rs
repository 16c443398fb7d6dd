pub mod batch;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod interactive;
pub mod network;
pub mod output;
pub mod tools;

pub use batch::{classify, ClassifiedBatch, TargetKind};
pub use dispatch::{Actions, Dispatcher, Mode, RunReport, RunRequest, RunState};
pub use error::{ClassificationError, EdgeError, ToolError};
pub use network::is_valid_address;
pub use output::{Aggregator, OutputArtifact};
pub use tools::{Invoker, SystemInvoker};
