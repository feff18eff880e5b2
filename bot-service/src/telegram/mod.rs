pub mod handlers;
mod keyboards;
mod messages;

pub use keyboards::{make_options_keyboard, resolve_option};
pub use messages::format_action;
