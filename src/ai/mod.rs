pub mod client;
pub mod credentials;
pub mod http_client;
pub mod types;

pub use client::*;
pub use credentials::*;
pub use types::*;
