#![forbid(unsafe_code)]

mod client;
mod memory;
mod resp;

pub use client::{StoreClient, StoreStats};
pub use memory::MemoryStore;
pub use resp::RespStore;
