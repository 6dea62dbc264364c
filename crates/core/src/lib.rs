#![forbid(unsafe_code)]

mod controller;
mod registry;
mod sweeper;
mod writer;

pub use controller::Controller;
