pub mod api_types;
pub mod client;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::ApiClient;
pub use transport::{HttpTransport, Transport};
