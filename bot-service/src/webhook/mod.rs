mod handler;

pub use handler::{router, AppState};
