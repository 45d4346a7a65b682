pub mod addresses;
pub mod admin;
pub mod artifact;
pub mod chain;
pub mod compiler;
pub mod config;
pub mod contracts;
pub mod deploy;
pub mod error;
pub mod io;
pub mod neighborhood;
pub mod network;
pub mod nonce;
pub mod orchestrator;
pub mod paths;
pub mod receipt;
pub mod rpc;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, RealfiError, Result};
