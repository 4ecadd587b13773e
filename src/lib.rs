pub mod assembler;
pub mod config;
pub mod cpu;
pub mod decoder;
pub mod device;
pub mod disasm;
pub mod exec;
pub mod instructions;
pub mod pipeline;
pub mod program;
pub mod report;
pub mod symbols;

pub mod isa {
    pub mod thumb; // 16-bit Thumb, Cortex-M0 subset
}

pub use assembler::{assemble, assemble_program, AssembledProgram};
pub use config::ExplorerConfig;
pub use cpu::{Cpu, CpuState, Psr};
pub use device::{Command, Device, DeviceError, DryRunDevice, Link, LinkStatus, StatusRecord};
pub use pipeline::{CycleEvent, CycleReport, Pipeline, PipelineError};
pub use report::{AsmError, ErrorReport};
