//! Hashing primitives for sprig.
//!
//! Object identifiers are SHA-1 digests over an object's canonical bytes,
//! i.e. the `"<kind> <len>\0"` header followed by the body. The header acts
//! as the domain tag, so a blob and a tree with identical bodies never share
//! an identifier.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
