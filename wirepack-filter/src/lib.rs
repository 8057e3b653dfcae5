//! Classic BPF filter programs
//!
//! A [`Filter`] is a sequence of fixed-format instructions in the classic
//! packet-filter bytecode layout, so programs assembled here interoperate
//! with externally compiled ones. Programs are usually assembled through the
//! [`Builder`], which resolves symbolic labels into the forward jump
//! offsets the bytecode requires:
//!
//! ```
//! use wirepack_filter::{Builder, Mode, Size, Src};
//!
//! // match ARP frames on top of Ethernet
//! let flt = Builder::new()
//!     .ld(Size::Half, Mode::Abs, 12)
//!     .jeq(Src::Const, "", "fail", 0x806)
//!     .ret(Src::Const, 0x40000)
//!     .label("fail")
//!     .ret(Src::Const, 0x0)
//!     .build()
//!     .unwrap();
//!
//! assert!(flt.validate());
//! ```
//!
//! Evaluation runs a small register machine (accumulator, index register,
//! sixteen scratch slots) over the packet bytes; all jumps are forward, so a
//! program of `n` instructions terminates in at most `n` steps.

mod builder;
mod insn;
mod program;
mod vm;

pub use builder::Builder;
pub use insn::{Insn, Mode, Size, Src};
pub use program::Filter;
