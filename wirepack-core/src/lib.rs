//! Core packet abstraction for wirepack
//!
//! This crate provides the pieces every other wirepack crate builds on:
//!
//! - [`Type`] - the protocol tag used both as a self-identifier and as the
//!   payload-type hint propagated along a layer chain
//! - [`Packet`] - the capability set every protocol layer implements
//! - [`Buffer`] - a cursor over packet bytes with a per-layer start marker,
//!   used by the codecs for encoding, decoding and checksum patching
//! - [`checksum`] - one's-complement folding and pseudo-header sums
//! - [`Error`] / [`Result`] - the error surface shared by all crates

pub mod buffer;
pub mod checksum;
pub mod error;
pub mod packet;
pub mod types;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use packet::Packet;
pub use types::{MacAddr, Type};
