//! Core types shared by the scanvault crates: scan records, the error
//! taxonomy and the storage gateway contract.

mod error;
mod models;
pub mod store;

pub use error::{Result, VaultError};
pub use models::*;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
