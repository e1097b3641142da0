//! linkledger - an in-memory, hash-linked ledger with proof-of-work mining
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, balance replay and chain validation
//! - [`transaction`] - Transaction types and authenticity checks
//!
//! ## Mining
//! - [`miner`] - Proof-of-work search, cancellation and the background miner
//!
//! ## Cryptography
//! - [`crypto`] - Signing capability and secp256k1 signatures
//! - [`wallet`] - Key pairs that authorize transfers
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod wallet;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
