pub mod config;
pub mod errors;
pub mod telemetry;
pub mod types;

pub use config::{CatalogConfig, ExpenseCategory, PaymentConfig, Person, WorkflowConfig};
pub use errors::{Result, ServiceError};
pub use telemetry::{init_metrics, init_tracing, record_counter, record_gauge, record_timing};
pub use types::{
    Action, ActionKind, FieldValue, FormData, InboundEvent, SelectOption, Step, UserId,
};
