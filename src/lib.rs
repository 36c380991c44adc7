//! ABI support for MOS 6502 targets.
//!
//! This crate tells a debugger what it may assume about a 6502 core once it
//! is attached: the canonical register set and its numbering, how to walk
//! the stack past the current frame, which addresses are structurally valid
//! as code or frame addresses, and that debugger-driven function calls are
//! not possible on this target.
//!
//! The 6502 has no compiler-level calling convention a debugger could read
//! out of the binary. The only guarantee the instruction set makes is that
//! `JSR` pushes a 2-byte return address before transferring control, so the
//! unwind plans produced here are synthesized from that single fact rather
//! than from compiler-emitted frame information.
//!
//! ```
//! use mos_abi::{Abi, MosAbi};
//!
//! let abi = MosAbi::new();
//!
//! // The register catalog, in GDB remote protocol order.
//! assert_eq!(abi.registers().len(), 6);
//!
//! // A heuristic unwind plan, usable at any instruction address.
//! let plan = abi.default_unwind_plan()?;
//! assert!(!plan.is_sourced_from_compiler());
//! # Ok::<(), mos_abi::AbiError>(())
//! ```
#![warn(missing_docs)]

pub mod abi;
pub mod registers;
pub mod registry;
pub mod unwind;

pub use self::{
    abi::{Abi, MosAbi, ThreadContext, ADDRESS_BITS, RED_ZONE_SIZE, STACK_FRAME_SIZE},
    registers::{
        CoreRegister, RegisterDataType, RegisterId, RegisterRole, RegisterValue, MOS_REGISTERS,
    },
    registry::{mos_abi_entry, AbiEntry, AbiRegistry},
    unwind::{RegisterUnwind, UnwindPlan, UnwindRow, UnwindRule},
};

/// An error occurred while answering an ABI query.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    /// The target's calling convention does not support the requested
    /// operation. This is an expected outcome on the 6502, not a bug; the
    /// host should fall back to read-only inspection.
    #[error("not supported on MOS targets: {0}")]
    NotSupported(&'static str),
    /// A register lookup failed.
    #[error("{0}")]
    Register(String),
}
