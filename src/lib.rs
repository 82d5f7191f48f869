#![forbid(unsafe_code)]

//! `line-client` — send one request line over a Unix domain socket and read
//! one response line back.

pub mod client;
pub mod config;
pub mod errors;
pub mod framing;
pub mod request;

pub use client::{Connection, ConnectionState, LineClient, ResponseLine};
pub use config::{ClientConfig, ConfigOverrides};
pub use errors::{AppError, Result};
pub use request::Request;
