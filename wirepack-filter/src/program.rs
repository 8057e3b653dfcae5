//! Filter programs: instruction store, validation, disassembly

use std::fmt;

use crate::insn::*;
use crate::vm;

/// A compiled filter program.
///
/// Instructions can be appended directly (the methods below mirror the
/// classic mnemonics) or assembled with labels through
/// [`Builder`](crate::Builder). Once built, a filter is immutable in
/// practice: validate it, hand it to a packet source, and run it against
/// raw packet bytes with [`matches`](Filter::matches).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filter {
    insns: Vec<Insn>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// The instruction store.
    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    pub(crate) fn insns_mut(&mut self) -> &mut [Insn] {
        &mut self.insns
    }

    /// Append a raw instruction.
    pub fn append(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    /// Run the program over the given packet bytes. A non-zero verdict
    /// accepts the packet. Malformed programs cannot loop (jumps only move
    /// forward); out-of-range loads reject the packet.
    pub fn matches(&self, raw_pkt: &[u8]) -> bool {
        vm::execute(&self.insns, raw_pkt) > 0
    }

    /// Validate the program: it must be non-empty, every jump must land in
    /// bounds and strictly ahead of itself, scratch slots must exist,
    /// constant division by zero is rejected, and the last instruction must
    /// be a return.
    pub fn validate(&self) -> bool {
        if self.insns.is_empty() {
            return false;
        }

        let len = self.insns.len();

        for (i, insn) in self.insns.iter().enumerate() {
            match insn.class() {
                CLASS_LD | CLASS_LDX => {
                    let mode = insn.code & MODE_MASK;
                    if mode == Mode::Mem as u16 && insn.k >= vm::SCRATCH_SLOTS as u32 {
                        return false;
                    }
                }

                CLASS_ST | CLASS_STX => {
                    if insn.k >= vm::SCRATCH_SLOTS as u32 {
                        return false;
                    }
                }

                CLASS_ALU => {
                    let op = insn.code & OP_MASK;
                    if (op == ALU_DIV || op == ALU_MOD)
                        && insn.code & SRC_MASK == Src::Const as u16
                        && insn.k == 0
                    {
                        return false;
                    }
                }

                CLASS_JMP => {
                    // every jump target must lie strictly ahead, so the
                    // program cannot loop
                    let op = insn.code & OP_MASK;
                    if op == JMP_JA {
                        if insn.k as usize >= len - i {
                            return false;
                        }
                    } else {
                        if i + 1 + insn.jt as usize >= len {
                            return false;
                        }
                        if i + 1 + insn.jf as usize >= len {
                            return false;
                        }
                    }
                }

                CLASS_RET | CLASS_MISC => {}

                _ => return false,
            }
        }

        self.insns[len - 1].class() == CLASS_RET
    }

    /// Append a load into the accumulator.
    pub fn ld(&mut self, size: Size, mode: Mode, k: u32) {
        self.append(Insn::new(size as u16 | mode as u16 | CLASS_LD, 0, 0, k));
    }

    /// Append a load into the index register.
    pub fn ldx(&mut self, size: Size, mode: Mode, k: u32) {
        self.append(Insn::new(size as u16 | mode as u16 | CLASS_LDX, 0, 0, k));
    }

    /// Append a store of the accumulator into scratch slot `k`.
    pub fn st(&mut self, k: u32) {
        self.append(Insn::new(CLASS_ST, 0, 0, k));
    }

    /// Append a store of the index register into scratch slot `k`.
    pub fn stx(&mut self, k: u32) {
        self.append(Insn::new(CLASS_STX, 0, 0, k));
    }

    pub fn add(&mut self, src: Src, k: u32) {
        self.alu(ALU_ADD, src, k);
    }

    pub fn sub(&mut self, src: Src, k: u32) {
        self.alu(ALU_SUB, src, k);
    }

    pub fn mul(&mut self, src: Src, k: u32) {
        self.alu(ALU_MUL, src, k);
    }

    pub fn div(&mut self, src: Src, k: u32) {
        self.alu(ALU_DIV, src, k);
    }

    pub fn or(&mut self, src: Src, k: u32) {
        self.alu(ALU_OR, src, k);
    }

    pub fn and(&mut self, src: Src, k: u32) {
        self.alu(ALU_AND, src, k);
    }

    pub fn lsh(&mut self, src: Src, k: u32) {
        self.alu(ALU_LSH, src, k);
    }

    pub fn rsh(&mut self, src: Src, k: u32) {
        self.alu(ALU_RSH, src, k);
    }

    pub fn rem(&mut self, src: Src, k: u32) {
        self.alu(ALU_MOD, src, k);
    }

    pub fn xor(&mut self, src: Src, k: u32) {
        self.alu(ALU_XOR, src, k);
    }

    pub fn neg(&mut self) {
        self.append(Insn::new(ALU_NEG | CLASS_ALU, 0, 0, 0));
    }

    fn alu(&mut self, op: u16, src: Src, k: u32) {
        self.append(Insn::new(src as u16 | op | CLASS_ALU, 0, 0, k));
    }

    /// Append an unconditional forward jump by `k` instructions.
    pub fn ja(&mut self, k: u32) {
        self.append(Insn::new(JMP_JA | CLASS_JMP, 0, 0, k));
    }

    /// Append a jump-if-equal with explicit branch offsets.
    pub fn jeq(&mut self, src: Src, jt: u8, jf: u8, k: u32) {
        self.jmp(JMP_JEQ, src, jt, jf, k);
    }

    /// Append a jump-if-greater-than with explicit branch offsets.
    pub fn jgt(&mut self, src: Src, jt: u8, jf: u8, k: u32) {
        self.jmp(JMP_JGT, src, jt, jf, k);
    }

    /// Append a jump-if-greater-or-equal with explicit branch offsets.
    pub fn jge(&mut self, src: Src, jt: u8, jf: u8, k: u32) {
        self.jmp(JMP_JGE, src, jt, jf, k);
    }

    /// Append a jump-if-bits-set with explicit branch offsets.
    pub fn jset(&mut self, src: Src, jt: u8, jf: u8, k: u32) {
        self.jmp(JMP_JSET, src, jt, jf, k);
    }

    fn jmp(&mut self, op: u16, src: Src, jt: u8, jf: u8, k: u32) {
        self.append(Insn::new(src as u16 | op | CLASS_JMP, jt, jf, k));
    }

    /// Append a return. With `Src::Const` the verdict is `k` (zero rejects,
    /// anything else accepts up to `k` bytes); with `Src::Acc` the verdict
    /// is the accumulator.
    pub fn ret(&mut self, src: Src, k: u32) {
        self.append(Insn::new(src as u16 | CLASS_RET, 0, 0, k));
    }

    /// Append a copy of the accumulator into the index register.
    pub fn tax(&mut self) {
        self.append(Insn::new(MISC_TAX | CLASS_MISC, 0, 0, 0));
    }

    /// Append a copy of the index register into the accumulator.
    pub fn txa(&mut self) {
        self.append(Insn::new(MISC_TXA | CLASS_MISC, 0, 0, 0));
    }
}

impl fmt::Display for Filter {
    /// The debug listing: one `{ 0xCC, jt, jf, 0xKKKKKKKK },` line per
    /// instruction, no trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.insns.iter().map(|i| i.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}
