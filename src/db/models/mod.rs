//! Records persisted in the key-value store.

pub mod account;
pub mod site;

pub use account::*;
pub use site::*;
