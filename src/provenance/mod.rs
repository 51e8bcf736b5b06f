//! Provenance — generation event log and content hashing.

pub mod eventlog;
pub mod hasher;
