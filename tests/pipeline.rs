use pretty_assertions::assert_eq;

use thumb_rs::pipeline::Slot;
use thumb_rs::{
    assemble, CycleEvent, DeviceError, DryRunDevice, ExplorerConfig, Pipeline, PipelineError, Psr, StatusRecord,
};

const COUNTDOWN: &str = "mov r1,#255\nlsl r1,r1,#1\nloop:\nsub r1,#1\nbne loop";

/// Reply to the outstanding request with the current snapshot.
fn ack(pipe: &mut Pipeline<DryRunDevice>) {
    let state = pipe.cpu().state;
    let mut done = false;
    for record in StatusRecord::snapshot(&state) {
        done = pipe.receive(&record.to_bytes()).unwrap();
    }
    assert!(done);
}

fn connected(words: Vec<u16>, psr: Psr) -> Pipeline<DryRunDevice> {
    let mut pipe = Pipeline::new(DryRunDevice::new(), &ExplorerConfig::default());
    pipe.cpu_mut().state.psr = psr;
    pipe.connect().unwrap();
    ack(&mut pipe);
    pipe.load(words);
    pipe
}

#[test]
fn cycling_requires_a_device() {
    let mut pipe = Pipeline::new(DryRunDevice::new(), &ExplorerConfig::default());
    pipe.load(vec![0x21ff]);
    assert!(matches!(pipe.cycle(), Err(PipelineError::NotConnected)));
}

#[test]
fn countdown_loops_back_while_z_clear() {
    let mut pipe = connected(assemble(COUNTDOWN).unwrap(), Psr::empty());

    let r = pipe.cycle().unwrap();
    assert_eq!((r.fetch.as_str(), r.decode.as_str(), r.execute.as_str()), ("21FF", "", ""));
    let r = pipe.cycle().unwrap();
    assert_eq!(r.decode, "mov r1,#255");

    // mov, lsl and sub each go to the device
    for expected in [0x21ff, 0x0049, 0x3901] {
        let r = pipe.cycle().unwrap();
        assert_eq!(r.event, CycleEvent::Forwarded(expected));
        assert!(matches!(pipe.cycle(), Err(PipelineError::Busy)));
        ack(&mut pipe);
    }

    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(2));
    assert_eq!(r.execute, "Branch to instruction 2");
    assert_eq!(r.fetch, "");
    assert_eq!(r.decode, "");
    assert_eq!(pipe.pc(), 2);
    assert_eq!(pipe.slots(), [Slot::Invalid, Slot::Invalid, Slot::Armed]);

    // refills from the loop head
    let r = pipe.cycle().unwrap();
    assert_eq!(r.fetch, "3901");
    assert_eq!(r.decode, "");
    assert_eq!(r.pc, 3);
}

#[test]
fn countdown_drains_when_z_set() {
    let mut pipe = connected(assemble(COUNTDOWN).unwrap(), Psr::Z);
    pipe.set_auto_cycle(true);
    let mut events = Vec::new();
    loop {
        let r = pipe.tick().unwrap().expect("auto-cycle stays on until the end");
        if matches!(r.event, CycleEvent::Forwarded(_)) {
            ack(&mut pipe);
        }
        let end = r.event == CycleEvent::EndOfProgram;
        events.push(r.event);
        if end {
            assert_eq!(r.fetch, "End of program");
            break;
        }
    }
    assert_eq!(
        events,
        vec![
            CycleEvent::Advanced,
            CycleEvent::Advanced,
            CycleEvent::Forwarded(0x21ff),
            CycleEvent::Forwarded(0x0049),
            CycleEvent::Forwarded(0x3901),
            CycleEvent::ConditionNotTaken,
            CycleEvent::EndOfProgram,
        ]
    );
    assert!(!pipe.auto_cycle());
    assert_eq!(pipe.tick().unwrap(), None);
}

#[test]
fn forwarded_words_reach_the_device_as_execute_frames() {
    let mut pipe = connected(vec![0x21ff, 0x0049], Psr::empty());
    for _ in 0..3 {
        pipe.cycle().unwrap();
    }
    let last = pipe.device().sent.last().copied().unwrap();
    assert_eq!(&last.as_bytes()[..4], &[0xff, 0x21, 0x60, 0x47]);
    assert_eq!(last.command(), 0x00);
}

#[test]
fn branch_outside_program_is_an_invalid_fetch() {
    let mut pipe = Pipeline::new(DryRunDevice::new(), &ExplorerConfig::default());
    pipe.cpu_mut().state.registers[2] = 100;
    pipe.connect().unwrap();
    ack(&mut pipe);
    pipe.load(assemble("bx r2").unwrap());

    pipe.cycle().unwrap();
    pipe.cycle().unwrap();
    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(101));
    assert_eq!(pipe.slots()[2], Slot::Invalid);
    assert!(matches!(pipe.cycle(), Err(PipelineError::InvalidFetch { pc: 101 })));
}

#[test]
fn wrapped_register_target_is_an_invalid_fetch() {
    let mut pipe = Pipeline::new(DryRunDevice::new(), &ExplorerConfig::default());
    pipe.cpu_mut().state.registers[0] = i32::MAX;
    pipe.connect().unwrap();
    ack(&mut pipe);
    pipe.load(assemble("bx r0").unwrap());

    pipe.cycle().unwrap();
    pipe.cycle().unwrap();
    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(i32::MIN));
    assert_eq!(pipe.slots()[2], Slot::Invalid);
    assert!(matches!(pipe.cycle(), Err(PipelineError::InvalidFetch { pc: i32::MIN })));
}

#[test]
fn link_pair_shows_full_offset_while_first_half_executes() {
    let mut pipe = connected(assemble("back: mov r0,#0\nbl back").unwrap(), Psr::empty());

    assert_eq!(pipe.cycle().unwrap().fetch, "2000");
    let r = pipe.cycle().unwrap();
    assert_eq!(r.decode, "mov r0,#0");
    let r = pipe.cycle().unwrap();
    assert_eq!(r.decode, "bl (0) -2048");
    assert_eq!(r.event, CycleEvent::Forwarded(0x2000));
    ack(&mut pipe);

    let r = pipe.cycle().unwrap();
    assert_eq!(r.decode, "bl (1) -3");
    assert_eq!(r.execute, "bl (0) -2048");
    assert_eq!(r.event, CycleEvent::ConditionNotTaken);

    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(0));
    assert_eq!(pipe.cpu().lr, 2);
}

#[test]
fn call_and_return_through_link_register() {
    let words = assemble("bl sub\nmov r0,#1\nsub: bx lr").unwrap();
    assert_eq!(words, vec![0xf000, 0xf801, 0x2001, 0x4770]);
    let mut pipe = connected(words, Psr::empty());

    pipe.cycle().unwrap();
    let r = pipe.cycle().unwrap();
    assert_eq!(r.decode, "bl (0) 0");
    let r = pipe.cycle().unwrap();
    assert_eq!((r.decode.as_str(), r.event), ("bl (1) 1", CycleEvent::ConditionNotTaken));

    // second half at 1 calls sub at 3
    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(3));
    assert_eq!(pipe.cpu().lr, 1);

    assert_eq!(pipe.cycle().unwrap().fetch, "4770");
    assert_eq!(pipe.cycle().unwrap().decode, "bx lr");
    let r = pipe.cycle().unwrap();
    assert_eq!(r.event, CycleEvent::BranchTaken(2));
    assert_eq!(r.execute, "Branch to instruction 2");

    // resumes after the pair
    assert_eq!(pipe.cycle().unwrap().fetch, "2001");
}

#[test]
fn transport_failure_disconnects_and_stops_auto_cycle() {
    let mut pipe = connected(vec![0x21ff], Psr::empty());
    pipe.set_auto_cycle(true);
    pipe.cycle().unwrap();
    pipe.cycle().unwrap();
    pipe.device_mut().fail_next = true;
    let r = pipe.cycle().unwrap();
    assert!(matches!(r.event, CycleEvent::ForwardFailed { word: 0x21ff, .. }));
    assert!(!pipe.status().connected);
    assert!(!pipe.auto_cycle());
    assert!(matches!(pipe.cycle(), Err(PipelineError::NotConnected)));
}

#[test]
fn disconnect_abandons_outstanding_forward() {
    let mut pipe = connected(vec![0x21ff, 0x21ff], Psr::empty());
    for _ in 0..3 {
        pipe.cycle().unwrap();
    }
    assert!(pipe.status().in_progress);
    pipe.disconnect();
    assert!(!pipe.status().in_progress);
    assert_eq!(pipe.pc(), 3);
    pipe.connect().unwrap();
    ack(&mut pipe);
    // pipeline kept its contents
    assert_eq!(pipe.cycle().unwrap().event, CycleEvent::Forwarded(0x21ff));
}

#[test]
fn immediate_execute_and_memory_writes() {
    let mut pipe = connected(Vec::new(), Psr::empty());
    pipe.execute_immediate(&[0x2001, 0x2102]).unwrap();
    assert!(matches!(pipe.execute_immediate(&[0x2001]), Err(PipelineError::Busy)));
    ack(&mut pipe);

    let too_many = vec![0x2001; 9];
    assert!(matches!(
        pipe.execute_immediate(&too_many),
        Err(PipelineError::Device(DeviceError::TooManyInstructions { count: 9, limit: 8 }))
    ));

    pipe.write_memory(2, 0xdead_beef).unwrap();
    let frame = pipe.device().sent.last().copied().unwrap();
    assert_eq!(frame.command(), 0x06);
    assert_eq!(&frame.as_bytes()[..4], &[0xef, 0xbe, 0xad, 0xde]);
}

#[test]
fn status_records_update_the_snapshot() {
    let mut pipe = connected(Vec::new(), Psr::empty());
    pipe.execute_immediate(&[0x2105]).unwrap();
    let mut state = pipe.cpu().state;
    state.registers[1] = 5;
    state.psr = Psr::Z | Psr::C;
    state.sp = 0x2000_4000;
    for record in StatusRecord::snapshot(&state) {
        pipe.receive(&record.to_bytes()).unwrap();
    }
    assert_eq!(pipe.cpu().state, state);
    assert!(!pipe.status().in_progress);
}

#[test]
fn load_resets_pipeline() {
    let mut pipe = connected(vec![0x21ff, 0x0049], Psr::empty());
    pipe.set_auto_cycle(true);
    pipe.cycle().unwrap();
    pipe.load(vec![0x0049]);
    assert_eq!(pipe.pc(), 0);
    assert_eq!(pipe.slots(), [Slot::Invalid, Slot::Invalid, Slot::Armed]);
    assert!(!pipe.auto_cycle());
    pipe.load(Vec::new());
    assert_eq!(pipe.slots()[2], Slot::Invalid);
}

#[test]
fn load_hex_rejects_failed_assembly() {
    let mut pipe = connected(Vec::new(), Psr::empty());
    assert!(pipe.load_hex("Error").is_err());
    pipe.load_hex("21FF\n0049\n").unwrap();
    assert_eq!(pipe.program(), &[0x21ff, 0x0049]);
}
