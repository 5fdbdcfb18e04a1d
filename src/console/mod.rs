pub mod cache;
pub mod cached_client;
pub mod types;

pub use cached_client::ConsoleClient;
