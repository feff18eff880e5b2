mod clock;
mod step_engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use step_engine::{StepEngine, Transition};
