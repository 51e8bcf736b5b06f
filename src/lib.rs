//! msgpgen — MessagePack codec generation across a package graph.
//!
//! Walks the type graph reachable from a set of root types, extracts struct
//! declarations into per-package synthetic units, shims named primitives,
//! routes interfaces through tagged interceptors, and drives an external
//! codec generator over the result.

pub mod cli;
pub mod core;
pub mod packages;
pub mod provenance;
pub mod tools;
