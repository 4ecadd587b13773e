use crate::decoder::{Base, Cond, Decoded, Format, Op, Operand};

/// Assembly text for a decoded word, in the syntax the assembler accepts.
pub fn fmt_decoded(d: &Decoded) -> String {
    match d.format {
        Format::MoveShifted | Format::AddSubtract => {
            format!("{} r{},r{},{}", mnemonic(d.op), d.rd, d.rs, operand(d.operand))
        }
        Format::Immediate8 => format!("{} r{},{}", mnemonic(d.op), d.rd, operand(d.operand)),
        Format::Alu | Format::Reverse | Format::Extend => {
            format!("{} r{},r{}", mnemonic(d.op), d.rd, d.rs)
        }
        Format::HiRegister => match d.op {
            Op::Bx if d.rs == 14 => "bx lr".to_string(),
            Op::Bx => format!("bx r{}", d.rs),
            op => format!("{} r{},r{}", mnemonic(op), d.rd, d.rs),
        },
        Format::PcRelativeLoad
        | Format::RegisterOffset
        | Format::SignExtendedLoad
        | Format::ImmediateOffset
        | Format::Halfword
        | Format::SpRelative => mem(d),
        Format::LoadAddress => format!(
            "add r{},{},{}",
            d.rd,
            base(d.base.unwrap_or(Base::Pc)),
            operand(d.operand)
        ),
        Format::AdjustSp => match d.operand {
            Operand::Imm(v) if v < 0 => format!("sub sp,#{}", -v),
            other => format!("add sp,{}", operand(other)),
        },
        Format::PushPop => {
            let extra = match (d.flag, d.op) {
                (true, Op::Pop) => Some("pc"),
                (true, _) => Some("lr"),
                _ => None,
            };
            format!("{} {{{}}}", mnemonic(d.op), reg_list(d.rlist, extra))
        }
        Format::Multiple => format!(
            "{} {}!,{{{}}}",
            mnemonic(d.op),
            base(d.base.unwrap_or(Base::Reg(0))),
            reg_list(d.rlist, None)
        ),
        Format::CondBranch => format!("{} {}", mnemonic(d.op), d.offset),
        Format::SoftwareInterrupt => format!("swi {}", operand(d.operand)),
        // byte offset, as a listing shows it
        Format::Branch => format!("b {}", d.offset * 2),
        Format::BranchLink => format!("bl ({}) {}", u8::from(d.flag), d.offset),
    }
}

fn mem(d: &Decoded) -> String {
    format!(
        "{} r{},[{},{}]",
        mnemonic(d.op),
        d.rd,
        base(d.base.unwrap_or(Base::Reg(0))),
        operand(d.operand)
    )
}

fn base(b: Base) -> String {
    match b {
        Base::Reg(r) => format!("r{r}"),
        Base::Pc => "pc".to_string(),
        Base::Sp => "sp".to_string(),
    }
}

fn operand(o: Operand) -> String {
    match o {
        Operand::None => String::new(),
        Operand::Reg(r) => format!("r{r}"),
        Operand::Imm(v) => format!("#{v}"),
    }
}

fn reg_list(rlist: u8, extra: Option<&str>) -> String {
    (0..8u8)
        .filter(|&r| rlist & (1 << r) != 0)
        .map(|r| format!("r{r}"))
        .chain(extra.map(str::to_string))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn cond_name(c: Cond) -> &'static str {
    match c {
        Cond::Eq => "beq",
        Cond::Ne => "bne",
        Cond::Cs => "bcs",
        Cond::Cc => "bcc",
        Cond::Mi => "bmi",
        Cond::Pl => "bpl",
        Cond::Vs => "bvs",
        Cond::Vc => "bvc",
        Cond::Hi => "bhi",
        Cond::Ls => "bls",
        Cond::Ge => "bge",
        Cond::Lt => "blt",
        Cond::Gt => "bgt",
        Cond::Le => "ble",
    }
}

pub fn mnemonic(op: Op) -> &'static str {
    match op {
        Op::Lsl => "lsl",
        Op::Lsr => "lsr",
        Op::Asr => "asr",
        Op::Add => "add",
        Op::Sub => "sub",
        Op::Mov => "mov",
        Op::Cmp => "cmp",
        Op::And => "and",
        Op::Eor => "eor",
        Op::Adc => "adc",
        Op::Sbc => "sbc",
        Op::Ror => "ror",
        Op::Tst => "tst",
        Op::Neg => "neg",
        Op::Cmn => "cmn",
        Op::Orr => "orr",
        Op::Mul => "mul",
        Op::Bic => "bic",
        Op::Mvn => "mvn",
        Op::Bx => "bx",
        Op::Str => "str",
        Op::Strb => "strb",
        Op::Strh => "strh",
        Op::Ldr => "ldr",
        Op::Ldrb => "ldrb",
        Op::Ldrh => "ldrh",
        Op::Ldrsb => "ldrsb",
        Op::Ldrsh => "ldrsh",
        Op::Push => "push",
        Op::Pop => "pop",
        Op::Stmia => "stmia",
        Op::Ldmia => "ldmia",
        Op::B => "b",
        Op::Bcc(c) => cond_name(c),
        Op::Bl => "bl",
        Op::Swi => "swi",
        Op::Rev => "rev",
        // assembler spelling of rev16
        Op::Rev16 => "revh",
        Op::Revsh => "revsh",
        Op::Sxth => "sxth",
        Op::Sxtb => "sxtb",
        Op::Uxth => "uxth",
        Op::Uxtb => "uxtb",
        Op::Undefined => "undefined",
    }
}
