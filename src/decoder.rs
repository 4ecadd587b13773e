use serde::{Deserialize, Serialize};

/// The 21 fixed 16-bit instruction formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    MoveShifted = 1,
    AddSubtract = 2,
    Immediate8 = 3,
    Alu = 4,
    HiRegister = 5,
    PcRelativeLoad = 6,
    RegisterOffset = 7,
    SignExtendedLoad = 8,
    ImmediateOffset = 9,
    Halfword = 10,
    SpRelative = 11,
    LoadAddress = 12,
    AdjustSp = 13,
    PushPop = 14,
    Multiple = 15,
    CondBranch = 16,
    SoftwareInterrupt = 17,
    Branch = 18,
    BranchLink = 19,
    Reverse = 20,
    Extend = 21,
}

impl Format {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        FORMAT_TABLE.iter().find(|e| e.format.id() == id).map(|e| e.format)
    }

    /// Formats that can redirect the program counter.
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            Format::HiRegister | Format::CondBranch | Format::Branch | Format::BranchLink
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FormatEntry {
    pub format: Format,
    pub mask: u16,
    pub pattern: u16,
}

const fn entry(format: Format, mask: u16, pattern: u16) -> FormatEntry {
    FormatEntry { format, mask, pattern }
}

/// Tried top to bottom. Narrow masks sit above the broad ones that would
/// otherwise shadow them, so the order is 21 down to 1.
pub const FORMAT_TABLE: [FormatEntry; 21] = [
    entry(Format::Extend, 0xff00, 0xb200),
    entry(Format::Reverse, 0xff00, 0xba00),
    entry(Format::BranchLink, 0xf000, 0xf000),
    entry(Format::Branch, 0xf800, 0xe000),
    entry(Format::SoftwareInterrupt, 0xff00, 0xdf00),
    entry(Format::CondBranch, 0xf000, 0xd000),
    entry(Format::Multiple, 0xf000, 0xc000),
    entry(Format::PushPop, 0xf600, 0xb400),
    entry(Format::AdjustSp, 0xff00, 0xb000),
    entry(Format::LoadAddress, 0xf000, 0xa000),
    entry(Format::SpRelative, 0xf000, 0x9000),
    entry(Format::Halfword, 0xf000, 0x8000),
    entry(Format::ImmediateOffset, 0xe000, 0x6000),
    entry(Format::SignExtendedLoad, 0xf200, 0x5200),
    entry(Format::RegisterOffset, 0xf200, 0x5000),
    entry(Format::PcRelativeLoad, 0xf800, 0x4800),
    entry(Format::HiRegister, 0xfc00, 0x4400),
    entry(Format::Alu, 0xfc00, 0x4000),
    entry(Format::Immediate8, 0xe000, 0x2000),
    entry(Format::AddSubtract, 0xf800, 0x1800),
    entry(Format::MoveShifted, 0xe000, 0x0000),
];

/// Format of a raw word; first matching table entry wins.
pub fn classify(word: u16) -> Option<Format> {
    FORMAT_TABLE
        .iter()
        .find(|e| word & e.mask == e.pattern)
        .map(|e| e.format)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cond {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
}

impl Cond {
    pub fn from_bits(cc: u8) -> Option<Self> {
        const ALL: [Cond; 14] = [
            Cond::Eq,
            Cond::Ne,
            Cond::Cs,
            Cond::Cc,
            Cond::Mi,
            Cond::Pl,
            Cond::Vs,
            Cond::Vc,
            Cond::Hi,
            Cond::Ls,
            Cond::Ge,
            Cond::Lt,
            Cond::Gt,
            Cond::Le,
        ];
        ALL.get(cc as usize).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Lsl,
    Lsr,
    Asr,
    Add,
    Sub,
    Mov,
    Cmp,
    And,
    Eor,
    Adc,
    Sbc,
    Ror,
    Tst,
    Neg,
    Cmn,
    Orr,
    Mul,
    Bic,
    Mvn,
    Bx,
    Str,
    Strb,
    Strh,
    Ldr,
    Ldrb,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Push,
    Pop,
    Stmia,
    Ldmia,
    B,
    Bcc(Cond),
    Bl,
    Swi,
    Rev,
    Rev16,
    Revsh,
    Sxth,
    Sxtb,
    Uxth,
    Uxtb,
    Undefined,
}

/// Base register of a memory operand, or the register a format implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Base {
    Reg(u8),
    Pc,
    Sp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Reg(u8),
    /// Already scaled back to the value written in source.
    Imm(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub format: Format,
    pub op: Op,
    pub rd: u8,
    pub rs: u8,
    pub base: Option<Base>,
    pub operand: Operand,
    /// Low register bitmask of list formats.
    pub rlist: u8,
    /// pc/lr bit of push/pop; second-half marker of branch-with-link.
    pub flag: bool,
    /// Signed branch offset in instruction units (halfwords).
    pub offset: i32,
}

impl Decoded {
    pub fn new(format: Format, op: Op) -> Self {
        Self {
            format,
            op,
            rd: 0,
            rs: 0,
            base: None,
            operand: Operand::None,
            rlist: 0,
            flag: false,
            offset: 0,
        }
    }
}

pub trait Decoder {
    fn decode(&self, raw16: u16) -> Option<Decoded>;
}
