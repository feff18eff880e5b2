pub mod domain;
pub mod service;

pub use domain::{Clock, ManualClock, StepEngine, SystemClock, Transition};
pub use service::{DispatchOutcome, Dispatcher, ReplySender, WorkflowStore};
