#![forbid(unsafe_code)]

mod connection;
mod frame;
mod parse;
mod request;

pub use connection::Connection;
pub use frame::Frame;
pub use parse::Parse;
pub use request::Request;
