use crate::decoder::{classify, Base, Cond, Decoded, Decoder, Format, Op, Operand};

/// Thumb 16-bit decoder covering the 21 formats of the classifier table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThumbDecoder;

impl ThumbDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn sign_ext(v: u32, bits: u32) -> i32 {
    let s = 32 - bits;
    ((v << s) as i32) >> s
}

#[inline]
fn field(raw16: u16, shift: u32, width: u32) -> u8 {
    ((raw16 >> shift) & ((1 << width) - 1)) as u8
}

impl Decoder for ThumbDecoder {
    fn decode(&self, raw16: u16) -> Option<Decoded> {
        let format = classify(raw16)?;
        let rd = field(raw16, 0, 3);
        let rs = field(raw16, 3, 3);
        let mut d = Decoded::new(format, Op::Undefined);

        match format {
            Format::MoveShifted => {
                // LSL/LSR/ASR Rd, Rs, #offset5
                d.op = match field(raw16, 11, 2) {
                    0 => Op::Lsl,
                    1 => Op::Lsr,
                    2 => Op::Asr,
                    _ => Op::Undefined,
                };
                d.rd = rd;
                d.rs = rs;
                d.operand = Operand::Imm(field(raw16, 6, 5) as i32);
            }
            Format::AddSubtract => {
                // ADD/SUB Rd, Rs, Rn|#offset3
                d.op = if raw16 & 0x0200 != 0 { Op::Sub } else { Op::Add };
                d.rd = rd;
                d.rs = rs;
                let rn = field(raw16, 6, 3);
                d.operand = if raw16 & 0x0400 != 0 {
                    Operand::Imm(rn as i32)
                } else {
                    Operand::Reg(rn)
                };
            }
            Format::Immediate8 => {
                // MOV/CMP/ADD/SUB Rd, #offset8
                d.op = [Op::Mov, Op::Cmp, Op::Add, Op::Sub][field(raw16, 11, 2) as usize];
                d.rd = field(raw16, 8, 3);
                d.operand = Operand::Imm((raw16 & 0xff) as i32);
            }
            Format::Alu => {
                const ALU: [Op; 16] = [
                    Op::And,
                    Op::Eor,
                    Op::Lsl,
                    Op::Lsr,
                    Op::Asr,
                    Op::Adc,
                    Op::Sbc,
                    Op::Ror,
                    Op::Tst,
                    Op::Neg,
                    Op::Cmp,
                    Op::Cmn,
                    Op::Orr,
                    Op::Mul,
                    Op::Bic,
                    Op::Mvn,
                ];
                d.op = ALU[field(raw16, 6, 4) as usize];
                d.rd = rd;
                d.rs = rs;
            }
            Format::HiRegister => {
                // ADD/CMP/MOV Rd, Hs or BX Hs; H1/H2 extend to r8..r15
                let h1 = raw16 & 0x0080 != 0;
                let h2 = raw16 & 0x0040 != 0;
                d.op = [Op::Add, Op::Cmp, Op::Mov, Op::Bx][field(raw16, 8, 2) as usize];
                d.rd = rd + if h1 { 8 } else { 0 };
                d.rs = rs + if h2 { 8 } else { 0 };
            }
            Format::PcRelativeLoad => {
                // LDR Rd, [PC, #word8]
                d.op = Op::Ldr;
                d.rd = field(raw16, 8, 3);
                d.base = Some(Base::Pc);
                d.operand = Operand::Imm((raw16 & 0xff) as i32 * 4);
            }
            Format::RegisterOffset => {
                // STR/STRB/LDR/LDRB Rd, [Rb, Ro]
                d.op = [Op::Str, Op::Strb, Op::Ldr, Op::Ldrb][field(raw16, 10, 2) as usize];
                d.rd = rd;
                d.base = Some(Base::Reg(rs));
                d.operand = Operand::Reg(field(raw16, 6, 3));
            }
            Format::SignExtendedLoad => {
                // STRH/LDSB/LDRH/LDSH Rd, [Rb, Ro]
                d.op = [Op::Strh, Op::Ldrsb, Op::Ldrh, Op::Ldrsh][field(raw16, 10, 2) as usize];
                d.rd = rd;
                d.base = Some(Base::Reg(rs));
                d.operand = Operand::Reg(field(raw16, 6, 3));
            }
            Format::ImmediateOffset => {
                // STR/LDR scale offset5 by 4, STRB/LDRB do not
                let op = field(raw16, 11, 2);
                d.op = [Op::Str, Op::Ldr, Op::Strb, Op::Ldrb][op as usize];
                d.rd = rd;
                d.base = Some(Base::Reg(rs));
                let offset5 = field(raw16, 6, 5) as i32;
                d.operand = Operand::Imm(if op > 1 { offset5 } else { offset5 * 4 });
            }
            Format::Halfword => {
                // STRH/LDRH Rd, [Rb, #offset5*2]
                d.op = if raw16 & 0x0800 != 0 { Op::Ldrh } else { Op::Strh };
                d.rd = rd;
                d.base = Some(Base::Reg(rs));
                d.operand = Operand::Imm(field(raw16, 6, 5) as i32 * 2);
            }
            Format::SpRelative => {
                // STR/LDR Rd, [SP, #word8]
                d.op = if raw16 & 0x0800 != 0 { Op::Ldr } else { Op::Str };
                d.rd = field(raw16, 8, 3);
                d.base = Some(Base::Sp);
                d.operand = Operand::Imm((raw16 & 0xff) as i32 * 4);
            }
            Format::LoadAddress => {
                // ADD Rd, PC|SP, #word8
                d.op = Op::Add;
                d.rd = field(raw16, 8, 3);
                d.base = Some(if raw16 & 0x0800 != 0 { Base::Sp } else { Base::Pc });
                d.operand = Operand::Imm((raw16 & 0xff) as i32 * 4);
            }
            Format::AdjustSp => {
                // ADD SP, #+/-sword7
                let magnitude = (raw16 & 0x7f) as i32 * 4;
                d.op = Op::Add;
                d.base = Some(Base::Sp);
                d.operand = Operand::Imm(if raw16 & 0x0080 != 0 { -magnitude } else { magnitude });
            }
            Format::PushPop => {
                d.op = if raw16 & 0x0800 != 0 { Op::Pop } else { Op::Push };
                d.rlist = (raw16 & 0xff) as u8;
                d.flag = raw16 & 0x0100 != 0;
            }
            Format::Multiple => {
                d.op = if raw16 & 0x0800 != 0 { Op::Ldmia } else { Op::Stmia };
                d.base = Some(Base::Reg(field(raw16, 8, 3)));
                d.rlist = (raw16 & 0xff) as u8;
            }
            Format::CondBranch => {
                // Bcc soffset8; cc 14 is undefined, 15 is taken by SWI above
                d.op = Cond::from_bits(field(raw16, 8, 4)).map_or(Op::Undefined, Op::Bcc);
                d.offset = sign_ext((raw16 & 0xff) as u32, 8);
            }
            Format::SoftwareInterrupt => {
                d.op = Op::Swi;
                d.operand = Operand::Imm((raw16 & 0xff) as i32);
            }
            Format::Branch => {
                // B offset11
                d.op = Op::B;
                d.offset = sign_ext((raw16 & 0x07ff) as u32, 11);
            }
            Format::BranchLink => {
                // BL: first half carries offset[21:11], second half offset[10:0]
                d.op = Op::Bl;
                d.flag = raw16 & 0x0800 != 0;
                let half = (raw16 & 0x07ff) as u32;
                d.offset = if d.flag {
                    half as i32
                } else {
                    sign_ext(half << 11, 22)
                };
            }
            Format::Reverse => {
                d.op = match field(raw16, 6, 2) {
                    0 => Op::Rev,
                    1 => Op::Rev16,
                    3 => Op::Revsh,
                    _ => Op::Undefined,
                };
                d.rd = rd;
                d.rs = rs;
            }
            Format::Extend => {
                d.op = [Op::Sxth, Op::Sxtb, Op::Uxth, Op::Uxtb][field(raw16, 6, 2) as usize];
                d.rd = rd;
                d.rs = rs;
            }
        }
        Some(d)
    }
}

/// Combine the latched high half of a branch-with-link with a second half's
/// low eleven bits into a signed 22-bit offset.
pub fn link_offset(high: i32, low: i32) -> i32 {
    sign_ext(((high as u32) & 0x003f_f800) | ((low as u32) & 0x7ff), 22)
}
