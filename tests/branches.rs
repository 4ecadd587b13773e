use thumb_rs::exec::{BranchExecutor, Execution, Outcome};
use thumb_rs::isa::thumb::ThumbDecoder;
use thumb_rs::{Cpu, Psr};

fn run(cpu: &mut Cpu, word: u16, pc: i32) -> Execution {
    cpu.execute(&ThumbDecoder::new(), &BranchExecutor, word, pc)
}

fn cpu_with(psr: Psr) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.state.psr = psr;
    cpu
}

#[test]
fn conditional_branch_taken_lands_on_target() {
    // bne -3 at address 3 returns to 2
    let mut cpu = cpu_with(Psr::empty());
    let res = run(&mut cpu, 0xd1fd, 3);
    assert_eq!(res.outcome, Outcome::BranchTaken(2));
    assert_eq!(res.text, "branch (-3)");
}

#[test]
fn conditional_branch_not_taken() {
    let mut cpu = cpu_with(Psr::Z);
    let res = run(&mut cpu, 0xd1fd, 3);
    assert_eq!(res.outcome, Outcome::ConditionNotTaken);
    assert_eq!(res.text, "no branch");

    let res = run(&mut cpu, 0xd0fd, 3);
    assert_eq!(res.outcome, Outcome::BranchTaken(2));
}

#[test]
fn condition_table() {
    // (cc, flags, taken)
    let cases = [
        (0x2, Psr::C, true),
        (0x3, Psr::C, false),
        (0x4, Psr::N, true),
        (0x5, Psr::N, false),
        (0x6, Psr::V, true),
        (0x7, Psr::V, false),
        (0x8, Psr::C, true),
        (0x8, Psr::C | Psr::Z, false),
        (0x9, Psr::Z, true),
        (0xa, Psr::N | Psr::V, true),
        (0xb, Psr::V, true),
        (0xc, Psr::empty(), true),
        (0xc, Psr::Z, false),
        (0xd, Psr::N, true),
    ];
    for (cc, psr, taken) in cases {
        let word = 0xd000 | (cc << 8) | 0x04;
        let mut cpu = cpu_with(psr);
        let res = run(&mut cpu, word, 10);
        let expected = if taken { Outcome::BranchTaken(16) } else { Outcome::ConditionNotTaken };
        assert_eq!(res.outcome, expected, "cc {cc:#x} psr {psr:?}");
    }
}

#[test]
fn undefined_condition_is_never_taken() {
    let mut cpu = cpu_with(Psr::all());
    assert_eq!(run(&mut cpu, 0xde05, 0).outcome, Outcome::ConditionNotTaken);
}

#[test]
fn unconditional_branch() {
    let mut cpu = Cpu::new();
    // b to self
    assert_eq!(run(&mut cpu, 0xe7fe, 5).outcome, Outcome::BranchTaken(5));
    assert_eq!(run(&mut cpu, 0xe001, 5).outcome, Outcome::BranchTaken(8));
}

#[test]
fn link_branch_needs_both_halves() {
    let mut cpu = Cpu::new();
    // bl back to 0 from a pair at 1..=2
    let first = run(&mut cpu, 0xf7ff, 1);
    assert_eq!(first.outcome, Outcome::ConditionNotTaken);
    let second = run(&mut cpu, 0xfffd, 2);
    assert_eq!(second.outcome, Outcome::BranchTaken(0));
    assert_eq!(cpu.lr, 2);

    // return lands after the pair
    let ret = run(&mut cpu, 0x4770, 7);
    assert_eq!(ret.outcome, Outcome::BranchTaken(3));
}

#[test]
fn branch_exchange_through_registers() {
    let mut cpu = Cpu::new();
    cpu.state.registers[2] = 10;
    assert_eq!(run(&mut cpu, 0x4710, 4).outcome, Outcome::BranchTaken(11));
    // high registers other than lr fall through to the next word
    assert_eq!(run(&mut cpu, 0x4740, 4).outcome, Outcome::BranchTaken(5));
}

#[test]
fn branch_targets_wrap_at_the_register_limit() {
    let mut cpu = Cpu::new();
    cpu.state.registers[0] = i32::MAX;
    assert_eq!(run(&mut cpu, 0x4700, 0).outcome, Outcome::BranchTaken(i32::MIN));
    cpu.lr = i32::MAX;
    assert_eq!(run(&mut cpu, 0x4770, 0).outcome, Outcome::BranchTaken(i32::MIN));
    assert_eq!(run(&mut cpu, 0xe000, i32::MAX).outcome, Outcome::BranchTaken(i32::MIN + 1));
}

#[test]
fn data_processing_is_forwarded() {
    let mut cpu = Cpu::new();
    let res = run(&mut cpu, 0x21ff, 0);
    assert_eq!(res.outcome, Outcome::NotBranchInstruction);
    assert_eq!(res.text, "mov r1,#255");
    // hi-register add is not control flow
    assert_eq!(run(&mut cpu, 0x4498, 0).outcome, Outcome::NotBranchInstruction);
}

#[test]
fn unclassified_word_is_forwarded_as_invalid() {
    let mut cpu = Cpu::new();
    let res = run(&mut cpu, 0xb100, 0);
    assert_eq!(res.outcome, Outcome::NotBranchInstruction);
    assert_eq!(res.text, "invalid format");
}

#[test]
fn decode_is_pure() {
    let dec = ThumbDecoder::new();
    let mut cpu = Cpu::new();
    assert_eq!(cpu.decode(&dec, 0xd1fd), "bne -3");
    run(&mut cpu, 0xf7ff, 1);
    assert_eq!(cpu.decode(&dec, 0xfffd), "bl (1) -3");
    assert_eq!(cpu.lr, 0);
}

#[test]
fn second_link_half_decodes_against_the_word_ahead() {
    let dec = ThumbDecoder::new();
    let cpu = Cpu::new();
    // nothing latched yet
    assert_eq!(cpu.decode(&dec, 0xfffd), "bl (1) 2045");
    assert_eq!(cpu.decode_after(&dec, 0xfffd, Some(0xf7ff)), "bl (1) -3");
    // a word ahead that is not a first half leaves the latch in charge
    assert_eq!(cpu.decode_after(&dec, 0xfffd, Some(0x2000)), "bl (1) 2045");
}
