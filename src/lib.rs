#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod config;
pub mod connection;
pub mod error;
pub mod events;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub use config::{Config, Origin};
pub use connection::{Client, ConnectionState};
pub use events::{EventKind, MessageHandler};
