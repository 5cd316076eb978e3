pub mod client;
pub mod integrity;

pub use client::{Fetched, HttpTransport, Transport};
