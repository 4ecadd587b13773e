use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::decoder::{Cond, Decoder, Format};
use crate::disasm::fmt_decoded;
use crate::exec::{Execution, Executor, Outcome};
use crate::isa::thumb::link_offset;

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr: u32 {
const N = 1 << 31; // Negative
const Z = 1 << 30; // Zero
const C = 1 << 29; // Carry
const V = 1 << 28; // Overflow
}
}

impl Default for Psr {
    fn default() -> Self {
        Psr::empty()
    }
}

impl Psr {
    pub fn satisfies(self, cond: Cond) -> bool {
        let n = self.contains(Psr::N);
        let z = self.contains(Psr::Z);
        let c = self.contains(Psr::C);
        let v = self.contains(Psr::V);
        match cond {
            Cond::Eq => z,
            Cond::Ne => !z,
            Cond::Cs => c,
            Cond::Cc => !c,
            Cond::Mi => n,
            Cond::Pl => !n,
            Cond::Vs => v,
            Cond::Vc => !v,
            Cond::Hi => c && !z,
            Cond::Ls => !c || z,
            Cond::Ge => n == v,
            Cond::Lt => n != v,
            Cond::Gt => !z && n == v,
            Cond::Le => z || n != v,
        }
    }

    /// Parse a flag string such as `"nz"` or `"ZC"`; other characters are ignored.
    pub fn from_letters(s: &str) -> Self {
        s.chars().fold(Psr::empty(), |acc, ch| {
            acc | match ch.to_ascii_lowercase() {
                'n' => Psr::N,
                'z' => Psr::Z,
                'c' => Psr::C,
                'v' => Psr::V,
                _ => Psr::empty(),
            }
        })
    }
}

/// Register and memory values last reported by the execution device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuState {
    pub registers: [i32; 8],
    pub psr: Psr,
    pub sp: i32,
    pub memory: [i32; 4],
}

/// Local view of the processor used to resolve control flow.
///
/// The device owns the real register file; only the link register and the
/// latched upper half of a branch-with-link live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cpu {
    pub state: CpuState,
    pub lr: i32,
    link_high: i32,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.lr = 0;
        self.link_high = 0;
    }

    pub fn link_high(&self) -> i32 {
        self.link_high
    }

    pub(crate) fn latch_link_high(&mut self, high: i32) {
        self.link_high = high;
    }

    /// Text for `word` without touching any state.
    pub fn decode<D: Decoder>(&self, dec: &D, word: u16) -> String {
        self.decode_after(dec, word, None)
    }

    /// Text for `word` when `prev` is the word ahead of it. A link second
    /// half following its first half is shown with the full offset even
    /// though the first half has not executed yet.
    pub fn decode_after<D: Decoder>(&self, dec: &D, word: u16, prev: Option<u16>) -> String {
        let Some(d) = dec.decode(word) else {
            return "invalid format".to_string();
        };
        if d.format == Format::BranchLink && d.flag {
            let high = prev
                .and_then(|w| dec.decode(w))
                .filter(|p| p.format == Format::BranchLink && !p.flag)
                .map_or(self.link_high, |p| p.offset);
            return format!("bl (1) {}", link_offset(high, d.offset));
        }
        fmt_decoded(&d)
    }

    /// Resolve the control-flow effect of `word` sitting at address `pc`.
    pub fn execute<D: Decoder, X: Executor>(&mut self, dec: &D, exec: &X, word: u16, pc: i32) -> Execution {
        match dec.decode(word) {
            Some(d) => exec.exec(self, &d, pc),
            None => Execution {
                outcome: Outcome::NotBranchInstruction,
                text: "invalid format".to_string(),
            },
        }
    }
}
