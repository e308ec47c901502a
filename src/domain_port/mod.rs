// store

mod token_store;

pub use token_store::*;

// remote

mod refresh_client;
mod transport;

pub use refresh_client::*;
pub use transport::*;
