//! Pure-Rust BPL container format.
//!
//! This crate provides the low-level binary layer of the BP library: the
//! container signature, metadata records, checksums, and the read/write
//! pipelines. It supports `no_std` environments with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod checksum;
pub mod dtype;
pub mod error;
pub mod reader;
pub mod record;
pub mod signature;
pub mod values;
pub mod writer;
