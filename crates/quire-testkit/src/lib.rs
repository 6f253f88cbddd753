//! # Quire Testkit
//!
//! Testing utilities for Quire.
//!
//! ## Golden Vectors
//!
//! The `vectors` module pins the byte form of state keys. Keys are the
//! ledger's on-disk ordering, so any change to their encoding is a
//! compatibility break that these vectors catch.
//!
//! ## Property Testing
//!
//! The `generators` module provides proptest strategies for key segments,
//! bucket permission maps and link chains.
//!
//! ## Test Fixtures
//!
//! The `fixtures` module provides a ready-initialized engine over in-memory
//! storage plus credential helpers for multi-party scenarios.

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{credential, multi_party_credentials, TestEngine, TestFixture, ISSUER};
pub use vectors::{all_vectors, verify_all_vectors, KeyVector};
