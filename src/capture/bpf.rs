//! Classic BPF evaluation with an explicit wire length.
//!
//! libpcap's matcher takes the captured bytes as the wire length, which is
//! wrong for packets cut short by the snap length. This evaluator runs the
//! instructions libpcap compiled, with `len` loads answered from the
//! original packet length.

use pcap::BpfProgram;

// Instruction classes
const LD: u16 = 0x00;
const LDX: u16 = 0x01;
const ST: u16 = 0x02;
const STX: u16 = 0x03;
const ALU: u16 = 0x04;
const JMP: u16 = 0x05;
const RET: u16 = 0x06;
const MISC: u16 = 0x07;

// Load sizes
const W: u16 = 0x00;
const H: u16 = 0x08;
const B: u16 = 0x10;

// Load modes
const IMM: u16 = 0x00;
const ABS: u16 = 0x20;
const IND: u16 = 0x40;
const MEM: u16 = 0x60;
const LEN: u16 = 0x80;
const MSH: u16 = 0xa0;

// ALU and jump operations
const ADD: u16 = 0x00;
const SUB: u16 = 0x10;
const MUL: u16 = 0x20;
const DIV: u16 = 0x30;
const OR: u16 = 0x40;
const AND: u16 = 0x50;
const LSH: u16 = 0x60;
const RSH: u16 = 0x70;
const NEG: u16 = 0x80;
const MOD: u16 = 0x90;
const XOR: u16 = 0xa0;

const JA: u16 = 0x00;
const JEQ: u16 = 0x10;
const JGT: u16 = 0x20;
const JGE: u16 = 0x30;
const JSET: u16 = 0x40;

/// Operand source: `k` or the X register.
const SRC_X: u16 = 0x08;

/// Return value source for `ret`: the accumulator.
const RET_A: u16 = 0x10;

/// Scratch memory slots.
const MEMWORDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Instruction {
    code: u16,
    jt: u8,
    jf: u8,
    k: u32,
}

impl Instruction {
    /// Parse libpcap's `code jt jf k` rendering of an instruction.
    fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split_whitespace();
        let instruction = Self {
            code: fields.next()?.parse().ok()?,
            jt: fields.next()?.parse().ok()?,
            jf: fields.next()?.parse().ok()?,
            k: fields.next()?.parse().ok()?,
        };
        fields.next().is_none().then_some(instruction)
    }
}

/// A compiled filter as a plain instruction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Instructions(Vec<Instruction>);

impl Instructions {
    pub fn from_program(program: &BpfProgram) -> Option<Self> {
        program
            .get_instructions()
            .iter()
            .map(|insn| Instruction::parse(&insn.to_string()))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    /// Run the program over the captured `data` of a packet that was
    /// `wire_len` bytes on the wire. Returns the filter's verdict, zero for
    /// a rejected packet.
    ///
    /// Loads past the captured bytes, division by zero and unknown opcodes
    /// reject the packet.
    pub fn run(&self, data: &[u8], wire_len: u32) -> u32 {
        let mut a: u32 = 0;
        let mut x: u32 = 0;
        let mut mem = [0u32; MEMWORDS];
        let mut pc = 0usize;

        while let Some(&Instruction { code, jt, jf, k }) = self.0.get(pc) {
            pc += 1;
            match code & 0x07 {
                RET => return if code & 0x18 == RET_A { a } else { k },
                LD => {
                    a = match code & 0xe0 {
                        IMM => k,
                        LEN => wire_len,
                        MEM => match mem.get(k as usize) {
                            Some(&value) => value,
                            None => return 0,
                        },
                        ABS => match load(data, code & 0x18, Some(k)) {
                            Some(value) => value,
                            None => return 0,
                        },
                        IND => match load(data, code & 0x18, x.checked_add(k)) {
                            Some(value) => value,
                            None => return 0,
                        },
                        _ => return 0,
                    }
                }
                LDX => {
                    x = match code & 0xe0 {
                        IMM => k,
                        LEN => wire_len,
                        MEM => match mem.get(k as usize) {
                            Some(&value) => value,
                            None => return 0,
                        },
                        MSH => match data.get(k as usize) {
                            Some(&byte) => u32::from(byte & 0x0f) << 2,
                            None => return 0,
                        },
                        _ => return 0,
                    }
                }
                ST | STX => {
                    let value = if code & 0x07 == ST { a } else { x };
                    match mem.get_mut(k as usize) {
                        Some(slot) => *slot = value,
                        None => return 0,
                    }
                }
                ALU => {
                    let operand = if code & SRC_X != 0 { x } else { k };
                    a = match code & 0xf0 {
                        ADD => a.wrapping_add(operand),
                        SUB => a.wrapping_sub(operand),
                        MUL => a.wrapping_mul(operand),
                        DIV => match a.checked_div(operand) {
                            Some(value) => value,
                            None => return 0,
                        },
                        MOD => match a.checked_rem(operand) {
                            Some(value) => value,
                            None => return 0,
                        },
                        AND => a & operand,
                        OR => a | operand,
                        XOR => a ^ operand,
                        LSH => a.checked_shl(operand).unwrap_or(0),
                        RSH => a.checked_shr(operand).unwrap_or(0),
                        NEG => a.wrapping_neg(),
                        _ => return 0,
                    }
                }
                JMP => {
                    let operand = if code & SRC_X != 0 { x } else { k };
                    let taken = match code & 0xf0 {
                        JA => {
                            pc += k as usize;
                            continue;
                        }
                        JEQ => a == operand,
                        JGT => a > operand,
                        JGE => a >= operand,
                        JSET => a & operand != 0,
                        _ => return 0,
                    };
                    pc += usize::from(if taken { jt } else { jf });
                }
                MISC => {
                    // TAX when the high bit is clear, TXA otherwise
                    if code & 0xf8 == 0 {
                        x = a;
                    } else {
                        a = x;
                    }
                }
                _ => return 0,
            }
        }
        0
    }
}

/// Big-endian load of `size` at `offset`, `None` past the captured bytes.
fn load(data: &[u8], size: u16, offset: Option<u32>) -> Option<u32> {
    let start = offset? as usize;
    let bytes = |len: usize| data.get(start..start.checked_add(len)?);
    match size {
        W => bytes(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        H => bytes(2).map(|b| u32::from(u16::from_be_bytes([b[0], b[1]]))),
        B => bytes(1).map(|b| u32::from(b[0])),
        _ => None,
    }
}
