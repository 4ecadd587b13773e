//! Three-stage fetch/decode/execute scheduler.
//!
//! Branches are resolved here. Every other instruction reaching the execute
//! stage is forwarded to the device, and cycling stops until the device
//! reports completion.

use num_traits::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::cpu::Cpu;
use crate::device::{Command, Device, DeviceError, Link, LinkStatus};
use crate::exec::{BranchExecutor, Outcome};
use crate::isa::thumb::ThumbDecoder;
use crate::program::{parse_hex_program, ProgramError};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("waiting for the device to finish")]
    Busy,
    #[error("device not connected")]
    NotConnected,
    #[error("invalid fetch at {pc}")]
    InvalidFetch { pc: i32 },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Contents of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Slot {
    Invalid,
    /// Will fetch from the program counter on the next cycle.
    Armed,
    Word(u16),
}

impl Slot {
    pub fn is_valid(self) -> bool {
        self != Slot::Invalid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CycleEvent {
    Advanced,
    ConditionNotTaken,
    Forwarded(u16),
    ForwardFailed { word: u16, reason: String },
    BranchTaken(i32),
    EndOfProgram,
}

/// Stage texts after one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub fetch: String,
    pub decode: String,
    pub execute: String,
    /// Program counter after the cycle.
    pub pc: i32,
    pub event: CycleEvent,
}

const EXECUTE: usize = 0;
const DECODE: usize = 1;
const FETCH: usize = 2;

pub struct Pipeline<D: Device> {
    slots: [Slot; 3],
    pc: i32,
    program: Vec<u16>,
    auto_cycle: bool,
    cpu: Cpu,
    link: Link<D>,
    decoder: ThumbDecoder,
    executor: BranchExecutor,
}

impl<D: Device> Pipeline<D> {
    pub fn new(device: D, config: &ExplorerConfig) -> Self {
        Self {
            slots: [Slot::Invalid; 3],
            pc: 0,
            program: Vec::new(),
            auto_cycle: config.auto_cycle,
            cpu: Cpu::new(),
            link: Link::new(device, config.max_execute_instructions),
            decoder: ThumbDecoder::new(),
            executor: BranchExecutor,
        }
    }

    pub fn connect(&mut self) -> Result<(), PipelineError> {
        Ok(self.link.connect()?)
    }

    /// Drop the device; any outstanding forward is abandoned and automatic
    /// cycling stops. The pipeline keeps its contents.
    pub fn disconnect(&mut self) {
        self.link.disconnect();
        self.auto_cycle = false;
    }

    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }

    pub fn device(&self) -> &D {
        self.link.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.link.device_mut()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }

    /// Execute, decode and fetch stages, oldest first.
    pub fn slots(&self) -> [Slot; 3] {
        self.slots
    }

    pub fn program(&self) -> &[u16] {
        &self.program
    }

    pub fn auto_cycle(&self) -> bool {
        self.auto_cycle
    }

    pub fn set_auto_cycle(&mut self, on: bool) {
        self.auto_cycle = on;
    }

    pub fn load(&mut self, words: Vec<u16>) {
        let fetch = if words.is_empty() { Slot::Invalid } else { Slot::Armed };
        self.slots = [Slot::Invalid, Slot::Invalid, fetch];
        self.pc = 0;
        self.program = words;
        self.auto_cycle = false;
        self.cpu.reset();
        info!(words = self.program.len(), "program loaded");
    }

    pub fn load_hex(&mut self, text: &str) -> Result<(), ProgramError> {
        let words = parse_hex_program(text)?;
        self.load(words);
        Ok(())
    }

    /// Cycle once if automatic cycling is on.
    pub fn tick(&mut self) -> Result<Option<CycleReport>, PipelineError> {
        if !self.auto_cycle {
            return Ok(None);
        }
        self.cycle().map(Some)
    }

    pub fn cycle(&mut self) -> Result<CycleReport, PipelineError> {
        let status = self.link.status();
        if !status.connected {
            return Err(PipelineError::NotConnected);
        }
        if status.in_progress {
            return Err(PipelineError::Busy);
        }
        let len = self.program.len() as i32;
        if self.pc < 0 || self.pc > len + 2 {
            return Err(PipelineError::InvalidFetch { pc: self.pc });
        }

        let mut fetch = String::new();
        let mut decode = String::new();
        let mut execute = String::new();
        let mut event = CycleEvent::Advanced;

        if self.slots[FETCH].is_valid() {
            match self.pc.to_usize().and_then(|i| self.program.get(i)) {
                Some(&word) => {
                    self.slots[FETCH] = Slot::Word(word);
                    fetch = format!("{word:04X}");
                }
                None => self.slots[FETCH] = Slot::Invalid,
            }
        }
        if let Slot::Word(word) = self.slots[DECODE] {
            let ahead = match self.slots[EXECUTE] {
                Slot::Word(w) => Some(w),
                _ => None,
            };
            decode = self.cpu.decode_after(&self.decoder, word, ahead);
        }
        if let Slot::Word(word) = self.slots[EXECUTE] {
            let res = self.cpu.execute(&self.decoder, &self.executor, word, self.pc.wrapping_sub(2));
            execute = res.text;
            match res.outcome {
                Outcome::BranchTaken(target) => {
                    info!(from = self.pc.wrapping_sub(2), target, "branch taken");
                    let fetch_slot = if (0..len).contains(&target) { Slot::Armed } else { Slot::Invalid };
                    self.slots = [Slot::Invalid, Slot::Invalid, fetch_slot];
                    self.pc = target;
                    return Ok(CycleReport {
                        fetch: String::new(),
                        decode: String::new(),
                        execute: format!("Branch to instruction {target}"),
                        pc: self.pc,
                        event: CycleEvent::BranchTaken(target),
                    });
                }
                Outcome::NotBranchInstruction => {
                    event = match self.link.send(&Command::Execute(vec![word])) {
                        Ok(()) => CycleEvent::Forwarded(word),
                        Err(e) => {
                            warn!(word, error = %e, "forward failed");
                            if !self.link.status().connected {
                                self.auto_cycle = false;
                            }
                            CycleEvent::ForwardFailed {
                                word,
                                reason: e.to_string(),
                            }
                        }
                    };
                }
                Outcome::ConditionNotTaken => event = CycleEvent::ConditionNotTaken,
            }
        }

        self.slots[EXECUTE] = self.slots[DECODE];
        self.slots[DECODE] = self.slots[FETCH];
        self.pc = self.pc.wrapping_add(1);
        self.slots[FETCH] = if self.pc >= len { Slot::Invalid } else { Slot::Armed };

        if fetch.is_empty() && decode.is_empty() && execute.is_empty() {
            info!(pc = self.pc, "end of program");
            fetch = "End of program".to_string();
            self.auto_cycle = false;
            event = CycleEvent::EndOfProgram;
        }
        debug!(pc = self.pc, %fetch, %decode, %execute, "cycle");
        Ok(CycleReport {
            fetch,
            decode,
            execute,
            pc: self.pc,
            event,
        })
    }

    /// Send words straight to the device for execution.
    pub fn execute_immediate(&mut self, words: &[u16]) -> Result<(), PipelineError> {
        Ok(self.link.send(&Command::Execute(words.to_vec()))?)
    }

    pub fn write_memory(&mut self, location: usize, value: u32) -> Result<(), PipelineError> {
        Ok(self.link.send(&Command::Store { location, value })?)
    }

    /// Pass any other command to the device through the busy guard.
    pub fn command(&mut self, cmd: &Command) -> Result<(), PipelineError> {
        Ok(self.link.send(cmd)?)
    }

    /// Consume a status message from the device. True when it completed the
    /// outstanding request.
    pub fn receive(&mut self, message: &[u8]) -> Result<bool, PipelineError> {
        Ok(self.link.receive(message, &mut self.cpu.state)?)
    }
}
