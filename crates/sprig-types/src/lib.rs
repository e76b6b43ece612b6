//! Foundation types for sprig.
//!
//! This crate provides the identity and addressing types shared by every
//! other sprig crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] - Content-addressed identifier (SHA-1, 20 bytes / 40 hex chars)
//! - [`Identity`] - Name and email of an author or committer
//! - [`Signature`] - An identity stamped with a [`Timestamp`]
//! - [`Timestamp`] - Seconds since the epoch plus a zone offset

pub mod error;
pub mod identity;
pub mod object;
pub mod temporal;

pub use error::TypeError;
pub use identity::{Identity, Signature};
pub use object::{ObjectId, OID_HEX_LEN, OID_RAW_LEN};
pub use temporal::Timestamp;
