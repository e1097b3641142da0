// Thin re-export module: the implementation lives in `blockchain/core.rs`,
// split into block/ledger, guarded state and chain validation.

pub mod core;
pub use core::*;
