mod refresh_coordinator;
mod request_dispatcher;
mod session_manager;
mod session_state;

pub use refresh_coordinator::*;
pub use request_dispatcher::*;
pub use session_manager::*;
pub use session_state::*;
