//! Packet capturing and injection for wirepack
//!
//! The [`Source`] trait is the seam between the codec layers and whatever
//! produces or swallows raw frames. The [`file`] adapter implements it over
//! a standard packet-capture dump file without any capture library; live
//! interface backends implement the same trait externally.

pub mod file;
pub mod source;

pub use source::Source;
