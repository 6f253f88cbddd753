//! # Quire Authz
//!
//! Permission inheritance over user and group hierarchies, and the ACL
//! access test built on it.
//!
//! ## Overview
//!
//! Users form ownership trees: a sub-user's parent holds rights over it,
//! scoped per bucket by the link between them. Groups form the same kind of
//! tree through subgroup links. Given a principal and a bucket, the
//! [`Aggregator`] computes who inherits what over that principal; an ACL
//! snapshot then grants access when one of its entries names a principal
//! holding the right bit.
//!
//! ## Key Types
//!
//! - [`Directory`] - Lookup seam for users and groups
//! - [`Aggregator`] - Chain and multi-path walks
//! - [`test_access`] - The entry-matching predicate
//!
//! ## Design Notes
//!
//! - **No storage**: the walks only see what the [`Directory`] returns
//! - **No deny**: access is an existential OR over entries

pub mod access;
pub mod aggregate;
pub mod directory;
pub mod error;

pub use access::test_access;
pub use aggregate::Aggregator;
pub use directory::{Directory, MapDirectory};
pub use error::{AuthzError, Result};
