pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod link;
pub mod record;
pub mod runtime;
pub mod store;

pub use error::{Error, Result};
