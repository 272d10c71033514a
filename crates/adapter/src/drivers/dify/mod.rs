mod client;
mod stream;

pub use client::DifyClient;
