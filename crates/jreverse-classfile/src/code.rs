//! Bytecode instruction decoding and structural control-flow analysis.
//!
//! The decoder walks a method's `Code` attribute once and produces an
//! immutable instruction stream; loop detection and complexity estimation
//! are separate reductions over that stream.

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeStyle {
    Virtual,
    Special,
    Static,
    Interface,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrKind {
    /// An invoke instruction; `target` is a constant-pool index
    /// (member reference, or invoke-dynamic entry for `Dynamic`).
    Invoke { target: u16, style: InvokeStyle },
    /// A get/put field instruction; `target` is a field-reference index.
    Field {
        target: u16,
        write: bool,
        is_static: bool,
    },
    Branch { target: u32, conditional: bool },
    Switch { targets: Vec<u32> },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub kind: InstrKind,
}

/// Operand byte count for fixed-length opcodes. `wide`, `tableswitch` and
/// `lookupswitch` are handled in the decode loop.
fn operand_len(opcode: u8) -> Option<usize> {
    Some(match opcode {
        0x00..=0x0f => 0,
        0x10 => 1, // bipush
        0x11 => 2, // sipush
        0x12 => 1, // ldc
        0x13 | 0x14 => 2, // ldc_w, ldc2_w
        0x15..=0x19 => 1, // iload..aload
        0x1a..=0x35 => 0,
        0x36..=0x3a => 1, // istore..astore
        0x3b..=0x83 => 0,
        0x84 => 2, // iinc
        0x85..=0x98 => 0,
        0x99..=0xa8 => 2, // if<cond>, if_icmp<cond>, if_acmp<cond>, goto, jsr
        0xa9 => 1,        // ret
        0xac..=0xb1 => 0, // returns
        0xb2..=0xb5 => 2, // getstatic..putfield
        0xb6..=0xb8 => 2, // invokevirtual, invokespecial, invokestatic
        0xb9 | 0xba => 4, // invokeinterface, invokedynamic
        0xbb => 2,        // new
        0xbc => 1,        // newarray
        0xbd => 2,        // anewarray
        0xbe | 0xbf => 0, // arraylength, athrow
        0xc0 | 0xc1 => 2, // checkcast, instanceof
        0xc2 | 0xc3 => 0, // monitorenter, monitorexit
        0xc5 => 3,        // multianewarray
        0xc6 | 0xc7 => 2, // ifnull, ifnonnull
        0xc8 | 0xc9 => 4, // goto_w, jsr_w
        _ => return None,
    })
}

fn is_conditional(opcode: u8) -> bool {
    matches!(opcode, 0x99..=0xa6 | 0xc6 | 0xc7)
}

fn be_u16(code: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([code[at], code[at + 1]])
}

fn be_i32(code: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
}

fn branch_target(offset: u32, delta: i64) -> u32 {
    (offset as i64 + delta) as u32
}

/// Decode a method's bytecode into an instruction stream.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, ParseError> {
    let mut out = Vec::new();
    let mut pos = 0usize;

    while pos < code.len() {
        let offset = pos as u32;
        let opcode = code[pos];
        let need = |n: usize| -> Result<(), ParseError> {
            if pos + 1 + n > code.len() {
                Err(ParseError::Truncated {
                    offset: pos,
                    needed: pos + 1 + n - code.len(),
                })
            } else {
                Ok(())
            }
        };

        match opcode {
            0xc4 => {
                // wide: modified opcode + 16-bit index, plus a 16-bit
                // constant when the modified opcode is iinc
                need(1)?;
                let modified = code[pos + 1];
                let extra = if modified == 0x84 { 5 } else { 3 };
                need(extra)?;
                out.push(Instruction {
                    offset,
                    opcode,
                    kind: InstrKind::Other,
                });
                pos += 1 + extra;
            }
            0xaa => {
                // tableswitch: 0-3 pad bytes, default, low, high, jump table
                let pad = (4 - (pos + 1) % 4) % 4;
                let base = pos + 1 + pad;
                if base + 12 > code.len() {
                    return Err(ParseError::Truncated {
                        offset: pos,
                        needed: base + 12 - code.len(),
                    });
                }
                let default = be_i32(code, base);
                let low = be_i32(code, base + 4);
                let high = be_i32(code, base + 8);
                if high < low {
                    return Err(ParseError::Attribute {
                        name: "Code",
                        detail: format!("tableswitch high {high} < low {low}"),
                    });
                }
                let count = (high - low + 1) as usize;
                if base + 12 + count * 4 > code.len() {
                    return Err(ParseError::Truncated {
                        offset: pos,
                        needed: base + 12 + count * 4 - code.len(),
                    });
                }
                let mut targets = vec![branch_target(offset, default as i64)];
                for i in 0..count {
                    targets.push(branch_target(offset, be_i32(code, base + 12 + i * 4) as i64));
                }
                out.push(Instruction {
                    offset,
                    opcode,
                    kind: InstrKind::Switch { targets },
                });
                pos = base + 12 + count * 4;
            }
            0xab => {
                // lookupswitch: 0-3 pad bytes, default, npairs, match/offset pairs
                let pad = (4 - (pos + 1) % 4) % 4;
                let base = pos + 1 + pad;
                if base + 8 > code.len() {
                    return Err(ParseError::Truncated {
                        offset: pos,
                        needed: base + 8 - code.len(),
                    });
                }
                let default = be_i32(code, base);
                let npairs = be_i32(code, base + 4);
                if npairs < 0 || base + 8 + npairs as usize * 8 > code.len() {
                    return Err(ParseError::Attribute {
                        name: "Code",
                        detail: format!("lookupswitch npairs {npairs} out of range"),
                    });
                }
                let mut targets = vec![branch_target(offset, default as i64)];
                for i in 0..npairs as usize {
                    targets.push(branch_target(
                        offset,
                        be_i32(code, base + 8 + i * 8 + 4) as i64,
                    ));
                }
                out.push(Instruction {
                    offset,
                    opcode,
                    kind: InstrKind::Switch { targets },
                });
                pos = base + 8 + npairs as usize * 8;
            }
            _ => {
                let len = operand_len(opcode).ok_or(ParseError::UnknownOpcode {
                    opcode,
                    offset,
                })?;
                need(len)?;

                let kind = match opcode {
                    0x99..=0xa8 | 0xc6 | 0xc7 => InstrKind::Branch {
                        target: branch_target(offset, be_u16(code, pos + 1) as i16 as i64),
                        conditional: is_conditional(opcode),
                    },
                    0xc8 | 0xc9 => InstrKind::Branch {
                        target: branch_target(offset, be_i32(code, pos + 1) as i64),
                        conditional: false,
                    },
                    0xb2..=0xb5 => InstrKind::Field {
                        target: be_u16(code, pos + 1),
                        write: opcode == 0xb3 || opcode == 0xb5,
                        is_static: opcode == 0xb2 || opcode == 0xb3,
                    },
                    0xb6 => InstrKind::Invoke {
                        target: be_u16(code, pos + 1),
                        style: InvokeStyle::Virtual,
                    },
                    0xb7 => InstrKind::Invoke {
                        target: be_u16(code, pos + 1),
                        style: InvokeStyle::Special,
                    },
                    0xb8 => InstrKind::Invoke {
                        target: be_u16(code, pos + 1),
                        style: InvokeStyle::Static,
                    },
                    0xb9 => InstrKind::Invoke {
                        target: be_u16(code, pos + 1),
                        style: InvokeStyle::Interface,
                    },
                    0xba => InstrKind::Invoke {
                        target: be_u16(code, pos + 1),
                        style: InvokeStyle::Dynamic,
                    },
                    _ => InstrKind::Other,
                };
                out.push(Instruction {
                    offset,
                    opcode,
                    kind,
                });
                pos += 1 + len;
            }
        }
    }

    Ok(out)
}

/// Loop bodies found by structural back-edge analysis: every branch whose
/// target does not lie after it closes the interval `[target, branch]`.
pub fn loop_spans(instructions: &[Instruction]) -> Vec<(u32, u32)> {
    let mut spans = Vec::new();
    for instr in instructions {
        let targets: &[u32] = match &instr.kind {
            InstrKind::Branch { target, .. } => std::slice::from_ref(target),
            InstrKind::Switch { targets } => targets,
            _ => continue,
        };
        for &target in targets {
            if target <= instr.offset {
                spans.push((target, instr.offset));
            }
        }
    }
    spans
}

pub fn offset_in_loop(spans: &[(u32, u32)], offset: u32) -> bool {
    spans.iter().any(|&(lo, hi)| lo <= offset && offset <= hi)
}

/// Cyclomatic-complexity estimate: one plus the number of conditional
/// branches plus switch arms (excluding the default target).
pub fn cyclomatic_complexity(instructions: &[Instruction]) -> u32 {
    let mut complexity = 1u32;
    for instr in instructions {
        match &instr.kind {
            InstrKind::Branch {
                conditional: true, ..
            } => complexity += 1,
            InstrKind::Switch { targets } => {
                complexity += targets.len().saturating_sub(1) as u32
            }
            _ => {}
        }
    }
    complexity
}
