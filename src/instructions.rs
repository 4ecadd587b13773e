use bitvec::prelude::*;
use serde::Serialize;

/// How one operand occupies bits of a 16-bit opcode.
///
/// `max` bounds the value stored in the field; the operand written in source
/// may be up to `max * scale` and must be a multiple of `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldRule {
    Register { mask: u16, max: u16 },
    Immediate { mask: u16, max: u16, scale: u16 },
    /// 8-bit signed offset of a conditional branch.
    ShortCondBranch,
    /// 11-bit signed offset of an unconditional branch.
    LongBranch,
    /// One 11-bit half of the 22-bit branch-with-link offset.
    LinkBranch,
    /// Low registers r0..r7 folded into one bitmask.
    RegisterList,
    /// Register bitmask plus the pc/lr bit above it.
    RegisterListWithFlag,
}

impl FieldRule {
    pub const fn mask(&self) -> u16 {
        match *self {
            FieldRule::Register { mask, .. } | FieldRule::Immediate { mask, .. } => mask,
            FieldRule::ShortCondBranch | FieldRule::RegisterList => 0x00ff,
            FieldRule::LongBranch | FieldRule::LinkBranch => 0x07ff,
            FieldRule::RegisterListWithFlag => 0x01ff,
        }
    }

    pub const fn max(&self) -> u16 {
        match *self {
            FieldRule::Register { max, .. } | FieldRule::Immediate { max, .. } => max,
            FieldRule::ShortCondBranch | FieldRule::RegisterList => 0xff,
            FieldRule::LongBranch | FieldRule::LinkBranch => 0x07ff,
            FieldRule::RegisterListWithFlag => 0x01ff,
        }
    }

    pub const fn scale(&self) -> u16 {
        match *self {
            FieldRule::Immediate { scale, .. } => scale,
            _ => 1,
        }
    }

    /// Largest operand accepted in source text.
    pub const fn limit(&self) -> u32 {
        self.max() as u32 * self.scale() as u32
    }

    pub const fn is_branch(&self) -> bool {
        matches!(
            self,
            FieldRule::ShortCondBranch | FieldRule::LongBranch | FieldRule::LinkBranch
        )
    }
}

// Register positions
pub const RD: FieldRule = FieldRule::Register { mask: 0x0007, max: 7 };
pub const RS: FieldRule = FieldRule::Register { mask: 0x0038, max: 7 };
pub const RD_HI: FieldRule = FieldRule::Register { mask: 0x0087, max: 15 };
pub const RS_HI: FieldRule = FieldRule::Register { mask: 0x0078, max: 14 };
pub const RO: FieldRule = FieldRule::Register { mask: 0x01c0, max: 7 };
pub const RN: FieldRule = FieldRule::Register { mask: 0x0700, max: 7 };

// Immediates
pub const IMM8: FieldRule = FieldRule::Immediate { mask: 0x00ff, max: 255, scale: 1 };
pub const WORD8: FieldRule = FieldRule::Immediate { mask: 0x00ff, max: 255, scale: 4 };
pub const SWORD7: FieldRule = FieldRule::Immediate { mask: 0x007f, max: 127, scale: 4 };
pub const IMM3: FieldRule = FieldRule::Immediate { mask: 0x01c0, max: 7, scale: 1 };
pub const IMM5: FieldRule = FieldRule::Immediate { mask: 0x07c0, max: 31, scale: 1 };
pub const WORD5: FieldRule = FieldRule::Immediate { mask: 0x07c0, max: 31, scale: 4 };
pub const HALF5: FieldRule = FieldRule::Immediate { mask: 0x07c0, max: 31, scale: 2 };

/// Marks the second word of a branch-with-link pair.
pub const LINK_LOW_HALF: u16 = 0x0800;

/// One catalog entry: a shape key, its base opcode and the operand fields in
/// the order operands appear in source.
///
/// A key ending in `,*` matches on the mnemonic alone; the operands are then
/// recovered from the statement (register lists, branch labels).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InstructionShape {
    pub key: &'static str,
    pub opcode: u16,
    pub fields: &'static [FieldRule],
}

impl InstructionShape {
    const fn new(key: &'static str, opcode: u16, fields: &'static [FieldRule]) -> Self {
        Self { key, opcode, fields }
    }

    pub fn is_wildcard(&self) -> bool {
        self.key.ends_with(",*")
    }

    pub fn mnemonic(&self) -> &'static str {
        self.key.split(',').next().unwrap_or(self.key)
    }

    pub fn matches(&self, key: &str) -> bool {
        if self.is_wildcard() {
            key.split(',').next() == Some(self.mnemonic())
        } else {
            key == self.key
        }
    }
}

const BRANCH: &[FieldRule] = &[FieldRule::ShortCondBranch];

/// Catalog order matters: the first matching shape wins.
pub const TABLE: &[InstructionShape] = &[
    InstructionShape::new("adc,r,r", 0x4140, &[RD, RS]),
    InstructionShape::new("add,r,r", 0x4400, &[RD_HI, RS_HI]),
    InstructionShape::new("add,r,pc,#", 0xa000, &[RN, WORD8]),
    InstructionShape::new("add,r,sp,#", 0xa800, &[RN, WORD8]),
    InstructionShape::new("add,sp,#", 0xb000, &[SWORD7]),
    InstructionShape::new("add,r,r,#", 0x1c00, &[RD, RS, IMM3]),
    InstructionShape::new("add,r,r,r", 0x1800, &[RD, RS, RO]),
    InstructionShape::new("add,r,#", 0x3000, &[RN, IMM8]),
    InstructionShape::new("adr,r,#", 0xa000, &[RN, WORD8]),
    InstructionShape::new("and,r,r", 0x4000, &[RD, RS]),
    InstructionShape::new("asr,r,r", 0x4100, &[RD, RS]),
    InstructionShape::new("asr,r,r,#", 0x1000, &[RD, RS, IMM5]),
    InstructionShape::new("b,*", 0xe000, &[FieldRule::LongBranch]),
    InstructionShape::new("bic,r,r", 0x4380, &[RD, RS]),
    InstructionShape::new("bl,*", 0xf000, &[FieldRule::LinkBranch]),
    InstructionShape::new("beq,*", 0xd000, BRANCH),
    InstructionShape::new("bne,*", 0xd100, BRANCH),
    InstructionShape::new("bcs,*", 0xd200, BRANCH),
    InstructionShape::new("bcc,*", 0xd300, BRANCH),
    InstructionShape::new("bmi,*", 0xd400, BRANCH),
    InstructionShape::new("bpl,*", 0xd500, BRANCH),
    InstructionShape::new("bvs,*", 0xd600, BRANCH),
    InstructionShape::new("bvc,*", 0xd700, BRANCH),
    InstructionShape::new("bhi,*", 0xd800, BRANCH),
    InstructionShape::new("bls,*", 0xd900, BRANCH),
    InstructionShape::new("bge,*", 0xda00, BRANCH),
    InstructionShape::new("blt,*", 0xdb00, BRANCH),
    InstructionShape::new("bgt,*", 0xdc00, BRANCH),
    InstructionShape::new("ble,*", 0xdd00, BRANCH),
    InstructionShape::new("bx,r", 0x4700, &[RS_HI]),
    InstructionShape::new("bx,lr", 0x4700, &[RS_HI]),
    InstructionShape::new("cmn,r,r", 0x42c0, &[RD, RS]),
    InstructionShape::new("cmp,r,r", 0x4280, &[RD, RS]),
    InstructionShape::new("cmp,r,#", 0x2800, &[RN, IMM8]),
    InstructionShape::new("eor,r,r", 0x4040, &[RD, RS]),
    InstructionShape::new("ldmia,*", 0xc800, &[FieldRule::RegisterList, RN]),
    InstructionShape::new("ldr,r,[r,#]", 0x6800, &[RD, RS, WORD5]),
    InstructionShape::new("ldr,r,[r,r]", 0x5800, &[RD, RS, RO]),
    InstructionShape::new("ldr,r,[pc,#]", 0x4800, &[RN, WORD8]),
    InstructionShape::new("ldr,r,[sp,#]", 0x9800, &[RN, WORD8]),
    InstructionShape::new("ldrb,r,[r,#]", 0x7800, &[RD, RS, IMM5]),
    InstructionShape::new("ldrb,r,[r,r]", 0x5c00, &[RD, RS, RO]),
    InstructionShape::new("ldrh,r,[r,#]", 0x8800, &[RD, RS, HALF5]),
    InstructionShape::new("ldrh,r,[r,r]", 0x5a00, &[RD, RS, RO]),
    InstructionShape::new("ldrsb,r,[r,r]", 0x5600, &[RD, RS, RO]),
    InstructionShape::new("ldrsh,r,[r,r]", 0x5e00, &[RD, RS, RO]),
    InstructionShape::new("lsl,r,r", 0x4080, &[RD, RS]),
    InstructionShape::new("lsl,r,r,#", 0x0000, &[RD, RS, IMM5]),
    InstructionShape::new("lsr,r,r", 0x40c0, &[RD, RS]),
    InstructionShape::new("lsr,r,r,#", 0x0800, &[RD, RS, IMM5]),
    InstructionShape::new("mov,r,r", 0x0000, &[RD, RS]),
    InstructionShape::new("mov,r,#", 0x2000, &[RN, IMM8]),
    InstructionShape::new("mul,r,r", 0x4340, &[RD, RS]),
    InstructionShape::new("mvn,r,r", 0x43c0, &[RD, RS]),
    InstructionShape::new("neg,r,r", 0x4240, &[RD, RS]),
    InstructionShape::new("orr,r,r", 0x4300, &[RD, RS]),
    InstructionShape::new("pop,*", 0xbc00, &[FieldRule::RegisterListWithFlag]),
    InstructionShape::new("push,*", 0xb400, &[FieldRule::RegisterListWithFlag]),
    InstructionShape::new("rev,r,r", 0xba00, &[RD, RS]),
    // rev16 is spelled revh
    InstructionShape::new("revh,r,r", 0xba40, &[RD, RS]),
    InstructionShape::new("revsh,r,r", 0xbac0, &[RD, RS]),
    InstructionShape::new("ror,r,r", 0x41c0, &[RD, RS]),
    InstructionShape::new("sbc,r,r", 0x4180, &[RD, RS]),
    InstructionShape::new("stmia,*", 0xc000, &[FieldRule::RegisterList, RN]),
    InstructionShape::new("str,r,[r,#]", 0x6000, &[RD, RS, WORD5]),
    InstructionShape::new("str,r,[r,r]", 0x5000, &[RD, RS, RO]),
    InstructionShape::new("str,r,[sp,#]", 0x9000, &[RN, WORD8]),
    InstructionShape::new("strb,r,[r,#]", 0x7000, &[RD, RS, IMM5]),
    InstructionShape::new("strb,r,[r,r]", 0x5400, &[RD, RS, RO]),
    InstructionShape::new("strh,r,[r,#]", 0x8000, &[RD, RS, HALF5]),
    InstructionShape::new("strh,r,[r,r]", 0x5200, &[RD, RS, RO]),
    InstructionShape::new("sub,sp,#", 0xb080, &[SWORD7]),
    InstructionShape::new("sub,r,r,#", 0x1e00, &[RD, RS, IMM3]),
    InstructionShape::new("sub,r,r,r", 0x1a00, &[RD, RS, RO]),
    InstructionShape::new("sub,r,#", 0x3800, &[RN, IMM8]),
    InstructionShape::new("swi,#", 0xdf00, &[IMM8]),
    InstructionShape::new("sxtb,r,r", 0xb240, &[RD, RS]),
    InstructionShape::new("sxth,r,r", 0xb200, &[RD, RS]),
    InstructionShape::new("tst,r,r", 0x4200, &[RD, RS]),
    InstructionShape::new("uxtb,r,r", 0xb2c0, &[RD, RS]),
    InstructionShape::new("uxth,r,r", 0xb280, &[RD, RS]),
];

/// First shape in catalog order matching a normalized shape key.
pub fn lookup(key: &str) -> Option<&'static InstructionShape> {
    TABLE.iter().find(|shape| shape.matches(key))
}

/// Distribute the low bits of `value` over the set bits of `mask`, lowest
/// mask bit first, into `word`.
pub fn scatter(word: u16, value: u16, mask: u16) -> u16 {
    let mut out = word;
    let dst = out.view_bits_mut::<Lsb0>();
    let positions = mask.view_bits::<Lsb0>().iter_ones();
    for (pos, bit) in positions.zip(value.view_bits::<Lsb0>().iter().by_vals()) {
        dst.set(pos, bit);
    }
    out
}
