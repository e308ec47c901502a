mod refresh_client_api;
mod transport_fake;
mod transport_reqwest;

pub use refresh_client_api::*;
pub use transport_fake::*;
pub use transport_reqwest::*;
