pub mod app;
pub mod client;
pub mod error;
pub mod gateway;
pub mod models;
pub mod platform;

pub use error::{Error, Result};
