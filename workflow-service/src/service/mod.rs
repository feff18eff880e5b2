mod dispatcher;
mod workflow_store;

pub use dispatcher::{DispatchOutcome, Dispatcher, ReplySender};
pub use workflow_store::WorkflowStore;
