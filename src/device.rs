//! Frame protocol spoken with the remote execution device.
//!
//! The core never owns a transport. A [`Device`] moves 20-byte frames, and
//! [`Link`] keeps the connected/busy bookkeeping around it.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cpu::{CpuState, Psr};

pub const FRAME_LEN: usize = 20;
/// Appended after the instruction words of an execute frame.
pub const RETURN_BYTES: [u8; 2] = [0x60, 0x47];
pub const MEMORY_CELLS: usize = 4;

const CMD_EXECUTE: u8 = 0x00;
const CMD_DISCONNECT: u8 = 0x01;
const CMD_RESET: u8 = 0x02;
const CMD_CLEAR: u8 = 0x03;
const CMD_STORE: u8 = 0x04;
const CMD_SYNC: u8 = 0x08;

#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,
    #[error("device busy")]
    Busy,
    #[error("too many instructions ({count}, limit {limit})")]
    TooManyInstructions { count: usize, limit: usize },
    #[error("invalid memory location {0}")]
    InvalidLocation(usize),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("status record too short ({0} bytes)")]
    ShortRecord(usize),
    #[error("unknown status record type {0}")]
    UnknownRecord(u8),
    #[error("transport failure: {source}")]
    Transport {
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(pub [u8; FRAME_LEN]);

impl Frame {
    pub fn command(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Execute(Vec<u16>),
    Disconnect,
    Reset,
    Clear,
    Store { location: usize, value: u32 },
    Sync,
}

impl Command {
    /// Store command from 1 to 8 hex digits.
    pub fn store_hex(location: usize, text: &str) -> Result<Self, DeviceError> {
        let t = text.trim();
        if t.is_empty() || t.len() > 8 {
            return Err(DeviceError::InvalidValue(t.to_string()));
        }
        let value = u32::from_str_radix(t, 16).map_err(|_| DeviceError::InvalidValue(t.to_string()))?;
        Ok(Command::Store { location, value })
    }

    pub fn encode(&self, max_instructions: usize) -> Result<Frame, DeviceError> {
        let mut buf = [0u8; FRAME_LEN];
        let code = match self {
            Command::Execute(words) => {
                if words.len() > max_instructions || words.len() * 2 + RETURN_BYTES.len() >= FRAME_LEN {
                    return Err(DeviceError::TooManyInstructions {
                        count: words.len(),
                        limit: max_instructions,
                    });
                }
                let mut at = 0;
                for w in words {
                    buf[at..at + 2].copy_from_slice(&w.to_le_bytes());
                    at += 2;
                }
                buf[at..at + 2].copy_from_slice(&RETURN_BYTES);
                CMD_EXECUTE
            }
            Command::Disconnect => CMD_DISCONNECT,
            Command::Reset => CMD_RESET,
            Command::Clear => CMD_CLEAR,
            Command::Store { location, value } => {
                if *location >= MEMORY_CELLS {
                    return Err(DeviceError::InvalidLocation(*location));
                }
                buf[..4].copy_from_slice(&value.to_le_bytes());
                CMD_STORE + *location as u8
            }
            Command::Sync => CMD_SYNC,
        };
        buf[FRAME_LEN - 1] = code;
        Ok(Frame(buf))
    }
}

/// Transport to the execution device.
pub trait Device {
    fn send(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    LowRegisters = 1,
    HighRegisters = 2,
    Status = 3,
    Memory = 4,
}

/// One fixed-layout status message from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub kind: RecordKind,
    pub values: [i32; 4],
}

impl StatusRecord {
    pub fn parse(bytes: &[u8]) -> Result<Self, DeviceError> {
        if bytes.len() < FRAME_LEN {
            return Err(DeviceError::ShortRecord(bytes.len()));
        }
        let kind = match bytes[0] {
            1 => RecordKind::LowRegisters,
            2 => RecordKind::HighRegisters,
            3 => RecordKind::Status,
            4 => RecordKind::Memory,
            other => return Err(DeviceError::UnknownRecord(other)),
        };
        let mut values = [0i32; 4];
        for (i, v) in values.iter_mut().enumerate() {
            let at = 4 + i * 4;
            *v = i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }
        Ok(Self { kind, values })
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = self.kind as u8;
        for (i, v) in self.values.iter().enumerate() {
            let at = 4 + i * 4;
            buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        buf
    }

    /// Copy the record into `state`. True when it completes a request.
    pub fn apply(&self, state: &mut CpuState) -> bool {
        match self.kind {
            RecordKind::LowRegisters => state.registers[..4].copy_from_slice(&self.values),
            RecordKind::HighRegisters => state.registers[4..].copy_from_slice(&self.values),
            RecordKind::Status => {
                state.psr = Psr::from_bits_retain(self.values[0] as u32);
                state.sp = self.values[1];
            }
            RecordKind::Memory => state.memory.copy_from_slice(&self.values),
        }
        self.kind == RecordKind::Memory
    }

    /// The four records that describe `state`, completion last.
    pub fn snapshot(state: &CpuState) -> [StatusRecord; 4] {
        let r = &state.registers;
        [
            StatusRecord {
                kind: RecordKind::LowRegisters,
                values: [r[0], r[1], r[2], r[3]],
            },
            StatusRecord {
                kind: RecordKind::HighRegisters,
                values: [r[4], r[5], r[6], r[7]],
            },
            StatusRecord {
                kind: RecordKind::Status,
                values: [state.psr.bits() as i32, state.sp, 0, 0],
            },
            StatusRecord {
                kind: RecordKind::Memory,
                values: state.memory,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    pub in_progress: bool,
}

/// Connection state around a [`Device`]: one outstanding request at a time.
pub struct Link<D: Device> {
    device: D,
    status: LinkStatus,
    max_instructions: usize,
}

impl<D: Device> Link<D> {
    pub fn new(device: D, max_instructions: usize) -> Self {
        Self {
            device,
            status: LinkStatus::default(),
            max_instructions,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn connect(&mut self) -> Result<(), DeviceError> {
        info!("device connected");
        self.status = LinkStatus {
            connected: true,
            in_progress: false,
        };
        self.send(&Command::Sync)
    }

    pub fn disconnect(&mut self) {
        if self.status.connected {
            if let Ok(frame) = Command::Disconnect.encode(self.max_instructions) {
                if let Err(e) = self.device.send(&frame) {
                    warn!(error = %e, "disconnect notice not delivered");
                }
            }
            info!("device disconnected");
        }
        self.status = LinkStatus::default();
    }

    pub fn send(&mut self, cmd: &Command) -> Result<(), DeviceError> {
        if !self.status.connected {
            warn!(?cmd, "send while disconnected");
            return Err(DeviceError::NotConnected);
        }
        if self.status.in_progress {
            warn!(?cmd, "send while busy");
            return Err(DeviceError::Busy);
        }
        let frame = cmd.encode(self.max_instructions)?;
        if let Err(source) = self.device.send(&frame) {
            warn!(error = %source, "transport failed, dropping link");
            self.status = LinkStatus::default();
            return Err(DeviceError::Transport { source });
        }
        debug!(command = frame.command(), "frame sent");
        self.status.in_progress = true;
        Ok(())
    }

    /// Consume one status message into `state`. True once the outstanding
    /// request has completed.
    pub fn receive(&mut self, bytes: &[u8], state: &mut CpuState) -> Result<bool, DeviceError> {
        let record = StatusRecord::parse(bytes)?;
        let done = record.apply(state);
        if done {
            self.status.in_progress = false;
        }
        Ok(done)
    }
}

/// Device that records frames and never talks to hardware.
#[derive(Debug, Default, Clone)]
pub struct DryRunDevice {
    pub sent: Vec<Frame>,
    /// Fail the next send with a transport error.
    pub fail_next: bool,
}

impl DryRunDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Device for DryRunDevice {
    fn send(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if std::mem::take(&mut self.fail_next) {
            anyhow::bail!("link lost");
        }
        self.sent.push(*frame);
        Ok(())
    }
}
