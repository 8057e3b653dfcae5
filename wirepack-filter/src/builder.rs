//! Fluent program assembly with symbolic labels
//!
//! Jump targets are written as label names and resolved into forward
//! relative offsets when the program is built, so branch distances do not
//! have to be counted by hand. An empty label means "fall through" (offset
//! zero).

use std::collections::HashMap;

use wirepack_core::{Error, Result};

use crate::insn::{Mode, Size, Src};
use crate::program::Filter;

/// Assembles a [`Filter`] from basic instructions and labels.
///
/// ```
/// use wirepack_filter::{Builder, Mode, Size, Src};
///
/// let flt = Builder::new()
///     .ld(Size::Half, Mode::Abs, 12)
///     .jeq(Src::Const, "", "fail", 0x806)
///     .ret(Src::Const, 0x40000)
///     .label("fail")
///     .ret(Src::Const, 0x0)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    filter: Filter,
    labels: HashMap<String, usize>,

    jumps_k: HashMap<usize, String>,
    jumps_jt: HashMap<usize, String>,
    jumps_jf: HashMap<usize, String>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    /// Declare a label at the current instruction index.
    pub fn label(mut self, name: &str) -> Self {
        self.labels.insert(name.to_string(), self.filter.len());
        self
    }

    /// Resolve all recorded label references and return the program.
    ///
    /// Fails when a non-empty label was never declared, when a reference
    /// does not point strictly forward, or when a branch distance overflows
    /// its 8-bit slot.
    pub fn build(self) -> Result<Filter> {
        let mut filter = self.filter;

        for (&idx, label) in &self.jumps_k {
            let off = resolve(&self.labels, label, idx, filter.len())?;
            filter.insns_mut()[idx].k = off;
        }

        for (&idx, label) in &self.jumps_jt {
            let off = resolve(&self.labels, label, idx, filter.len())?;
            filter.insns_mut()[idx].jt = branch(off, label)?;
        }

        for (&idx, label) in &self.jumps_jf {
            let off = resolve(&self.labels, label, idx, filter.len())?;
            filter.insns_mut()[idx].jf = branch(off, label)?;
        }

        Ok(filter)
    }

    /// Append a load into the accumulator.
    pub fn ld(mut self, size: Size, mode: Mode, k: u32) -> Self {
        self.filter.ld(size, mode, k);
        self
    }

    /// Append a load into the index register.
    pub fn ldx(mut self, size: Size, mode: Mode, k: u32) -> Self {
        self.filter.ldx(size, mode, k);
        self
    }

    /// Append a store of the accumulator into scratch slot `k`.
    pub fn st(mut self, k: u32) -> Self {
        self.filter.st(k);
        self
    }

    /// Append a store of the index register into scratch slot `k`.
    pub fn stx(mut self, k: u32) -> Self {
        self.filter.stx(k);
        self
    }

    pub fn add(mut self, src: Src, k: u32) -> Self {
        self.filter.add(src, k);
        self
    }

    pub fn sub(mut self, src: Src, k: u32) -> Self {
        self.filter.sub(src, k);
        self
    }

    pub fn mul(mut self, src: Src, k: u32) -> Self {
        self.filter.mul(src, k);
        self
    }

    pub fn div(mut self, src: Src, k: u32) -> Self {
        self.filter.div(src, k);
        self
    }

    pub fn or(mut self, src: Src, k: u32) -> Self {
        self.filter.or(src, k);
        self
    }

    pub fn and(mut self, src: Src, k: u32) -> Self {
        self.filter.and(src, k);
        self
    }

    pub fn lsh(mut self, src: Src, k: u32) -> Self {
        self.filter.lsh(src, k);
        self
    }

    pub fn rsh(mut self, src: Src, k: u32) -> Self {
        self.filter.rsh(src, k);
        self
    }

    pub fn rem(mut self, src: Src, k: u32) -> Self {
        self.filter.rem(src, k);
        self
    }

    pub fn xor(mut self, src: Src, k: u32) -> Self {
        self.filter.xor(src, k);
        self
    }

    pub fn neg(mut self) -> Self {
        self.filter.neg();
        self
    }

    /// Append an unconditional jump to a label. An empty label falls
    /// through to the next instruction.
    pub fn ja(mut self, target: &str) -> Self {
        if !target.is_empty() {
            self.jumps_k.insert(self.filter.len(), target.to_string());
        }
        self.filter.ja(0);
        self
    }

    /// Append a jump-if-equal branching to the `jt`/`jf` labels.
    pub fn jeq(mut self, src: Src, jt: &str, jf: &str, k: u32) -> Self {
        self.record_branches(jt, jf);
        self.filter.jeq(src, 0, 0, k);
        self
    }

    /// Append a jump-if-greater-than branching to the `jt`/`jf` labels.
    pub fn jgt(mut self, src: Src, jt: &str, jf: &str, k: u32) -> Self {
        self.record_branches(jt, jf);
        self.filter.jgt(src, 0, 0, k);
        self
    }

    /// Append a jump-if-greater-or-equal branching to the `jt`/`jf` labels.
    pub fn jge(mut self, src: Src, jt: &str, jf: &str, k: u32) -> Self {
        self.record_branches(jt, jf);
        self.filter.jge(src, 0, 0, k);
        self
    }

    /// Append a jump-if-bits-set branching to the `jt`/`jf` labels.
    pub fn jset(mut self, src: Src, jt: &str, jf: &str, k: u32) -> Self {
        self.record_branches(jt, jf);
        self.filter.jset(src, 0, 0, k);
        self
    }

    /// Append a return.
    pub fn ret(mut self, src: Src, k: u32) -> Self {
        self.filter.ret(src, k);
        self
    }

    /// Append a copy of the accumulator into the index register.
    pub fn tax(mut self) -> Self {
        self.filter.tax();
        self
    }

    /// Append a copy of the index register into the accumulator.
    pub fn txa(mut self) -> Self {
        self.filter.txa();
        self
    }

    fn record_branches(&mut self, jt: &str, jf: &str) {
        let idx = self.filter.len();

        if !jt.is_empty() {
            self.jumps_jt.insert(idx, jt.to_string());
        }
        if !jf.is_empty() {
            self.jumps_jf.insert(idx, jf.to_string());
        }
    }
}

fn resolve(labels: &HashMap<String, usize>, label: &str, idx: usize, len: usize) -> Result<u32> {
    let &target = labels
        .get(label)
        .ok_or_else(|| Error::InvalidFilter(format!("undeclared label \"{label}\"")))?;

    if target <= idx || target > len {
        return Err(Error::InvalidFilter(format!(
            "label \"{label}\" does not lie forward of its reference"
        )));
    }

    Ok((target - idx - 1) as u32)
}

fn branch(off: u32, label: &str) -> Result<u8> {
    u8::try_from(off)
        .map_err(|_| Error::InvalidFilter(format!("branch to label \"{label}\" is too far")))
}
