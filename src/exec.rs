use serde::Serialize;
use tracing::trace;

use crate::cpu::Cpu;
use crate::decoder::{Decoded, Format, Op};
use crate::disasm::fmt_decoded;
use crate::isa::thumb::link_offset;

/// What executing one word means for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Must run on the device.
    NotBranchInstruction,
    /// Resolved locally with no effect.
    ConditionNotTaken,
    /// Flush and continue fetching at this address.
    BranchTaken(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub outcome: Outcome,
    pub text: String,
}

impl Execution {
    fn new(outcome: Outcome, text: impl Into<String>) -> Self {
        Self {
            outcome,
            text: text.into(),
        }
    }
}

pub trait Executor {
    fn exec(&self, cpu: &mut Cpu, d: &Decoded, pc: i32) -> Execution;
}

/// Resolves branches against the flags and registers last reported by the
/// device. Everything else is handed back as `NotBranchInstruction`.
pub struct BranchExecutor;

impl Executor for BranchExecutor {
    fn exec(&self, cpu: &mut Cpu, d: &Decoded, pc: i32) -> Execution {
        let res = match (d.format, d.op) {
            (Format::CondBranch, Op::Bcc(cond)) => {
                if cpu.state.psr.satisfies(cond) {
                    taken(pc.wrapping_add(2).wrapping_add(d.offset), d.offset)
                } else {
                    Execution::new(Outcome::ConditionNotTaken, "no branch")
                }
            }
            (Format::CondBranch, _) => Execution::new(Outcome::ConditionNotTaken, "invalid conditional branch"),
            (Format::Branch, _) => taken(pc.wrapping_add(2).wrapping_add(d.offset), d.offset),
            (Format::BranchLink, _) if !d.flag => {
                cpu.latch_link_high(d.offset);
                Execution::new(Outcome::ConditionNotTaken, fmt_decoded(d))
            }
            (Format::BranchLink, _) => {
                let offset = link_offset(cpu.link_high(), d.offset);
                cpu.lr = pc;
                taken(pc.wrapping_add(offset).wrapping_add(1), offset)
            }
            (Format::HiRegister, Op::Bx) => {
                // wraps; the fetch guard rejects the result
                let target = match d.rs {
                    14 => cpu.lr,
                    r @ 0..=7 => cpu.state.registers[r as usize],
                    _ => pc,
                }
                .wrapping_add(1);
                Execution::new(Outcome::BranchTaken(target), fmt_decoded(d))
            }
            _ => Execution::new(Outcome::NotBranchInstruction, fmt_decoded(d)),
        };
        trace!(pc, outcome = ?res.outcome, "{}", res.text);
        res
    }
}

fn taken(target: i32, offset: i32) -> Execution {
    Execution::new(Outcome::BranchTaken(target), format!("branch ({offset})"))
}
