mod credential;
mod phase;
mod request;

pub use credential::*;
pub use phase::*;
pub use request::*;
