#![forbid(unsafe_code)]

pub mod handler;

pub use handler::handle_connection;
