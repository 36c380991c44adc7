//! Synthetic unwind plans for the 6502's `JSR`/`RTS` call discipline.
//!
//! Nothing on this target emits compiler frame information, so both plans
//! here are derived from the one fact the instruction set guarantees: `JSR`
//! pushes a 2-byte return address onto the stack before transferring
//! control. That gives a single unwind row, valid from the first instruction
//! of a function: the CFA is the stack pointer plus two, the caller's
//! program counter is the two bytes below the CFA, and the caller's stack
//! pointer is the CFA itself.

use serde::Serialize;

use crate::registers::{register_by_role, RegisterId, RegisterRole};
use crate::AbiError;

/// Size, in bytes, of the return address `JSR` pushes.
const RETURN_ADDRESS_SIZE: i64 = 2;

/// How a register's caller-frame value is recovered relative to the CFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnwindRule {
    /// The value is stored in target memory at `CFA + offset` and must be
    /// read from there.
    AtCfaOffset(i64),
    /// The value is `CFA + offset` itself; no memory access is required.
    IsCfaOffset(i64),
}

/// The recovery rule for a single register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterUnwind {
    /// The register this rule recovers.
    pub register: RegisterId,
    /// How to recover the caller-frame value.
    pub rule: UnwindRule,
    /// A definite rule is never displaced by later, more speculative
    /// information.
    pub definite: bool,
}

/// One unwind row: a CFA rule of the form "base register + constant offset",
/// plus the register recovery rules that apply from the row's starting
/// address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnwindRow {
    cfa_register: RegisterId,
    cfa_offset: i64,
    registers: Vec<RegisterUnwind>,
}

impl UnwindRow {
    /// A row whose CFA is `cfa_register + cfa_offset`, with no register
    /// rules yet.
    pub fn new(cfa_register: RegisterId, cfa_offset: i64) -> Self {
        UnwindRow {
            cfa_register,
            cfa_offset,
            registers: Vec::new(),
        }
    }

    /// The register the CFA is computed from.
    pub fn cfa_register(&self) -> RegisterId {
        self.cfa_register
    }

    /// The constant offset added to the CFA base register.
    pub fn cfa_offset(&self) -> i64 {
        self.cfa_offset
    }

    /// Set the recovery rule for a register. An existing definite rule is
    /// only displaced by another definite rule.
    pub fn set_register_rule(&mut self, register: RegisterId, rule: UnwindRule, definite: bool) {
        if let Some(existing) = self
            .registers
            .iter_mut()
            .find(|unwind| unwind.register == register)
        {
            if existing.definite && !definite {
                return;
            }
            existing.rule = rule;
            existing.definite = definite;
        } else {
            self.registers.push(RegisterUnwind {
                register,
                rule,
                definite,
            });
        }
    }

    /// The recovery rule for `register`, if one was set.
    pub fn register_rule(&self, register: RegisterId) -> Option<&RegisterUnwind> {
        self.registers
            .iter()
            .find(|unwind| unwind.register == register)
    }

    /// All register recovery rules of this row.
    pub fn register_rules(&self) -> impl Iterator<Item = &RegisterUnwind> {
        self.registers.iter()
    }
}

/// A provenance-labelled sequence of unwind rows.
///
/// Plans are pure functions of the register catalog; they carry no external
/// state and are constructed fresh on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnwindPlan {
    rows: Vec<UnwindRow>,
    source_name: &'static str,
    sourced_from_compiler: bool,
    valid_at_all_instructions: Option<bool>,
}

impl UnwindPlan {
    /// The rows of this plan, in order of their starting addresses. Both
    /// plans of this crate hold a single row that applies unconditionally.
    pub fn rows(&self) -> &[UnwindRow] {
        &self.rows
    }

    /// The row in effect at the first instruction of the covered range.
    pub fn first_row(&self) -> Option<&UnwindRow> {
        self.rows.first()
    }

    /// A human-readable label identifying where this plan came from.
    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// Whether the plan was derived from compiler-emitted metadata.
    pub fn is_sourced_from_compiler(&self) -> bool {
        self.sourced_from_compiler
    }

    /// Whether the plan holds at every instruction address of a function,
    /// or `None` when that has not been established.
    pub fn is_valid_at_all_instructions(&self) -> Option<bool> {
        self.valid_at_all_instructions
    }
}

/// The single unwind row both plans share: CFA = SP + 2 after `JSR` has
/// pushed the 2-byte return address, the caller's PC readable at CFA - 2,
/// and the caller's SP equal to the CFA.
///
/// The register identifiers are taken from the catalog roles rather than
/// hardcoded, so the row stays correct under relabeling of the register
/// table. Note the 6502 SP register is 8-bit and indexes into page one; the
/// host biases it into a full address before CFA arithmetic.
fn jsr_frame_row() -> Result<UnwindRow, AbiError> {
    let sp = register_by_role(RegisterRole::StackPointer)?;
    let pc = register_by_role(RegisterRole::ProgramCounter)?;

    let mut row = UnwindRow::new(sp.id, RETURN_ADDRESS_SIZE);
    row.set_register_rule(pc.id, UnwindRule::AtCfaOffset(-RETURN_ADDRESS_SIZE), true);
    row.set_register_rule(sp.id, UnwindRule::IsCfaOffset(0), true);
    Ok(row)
}

/// The unwind plan for the first instruction of a newly entered function,
/// immediately after `JSR` transferred control.
pub fn function_entry_unwind_plan() -> Result<UnwindPlan, AbiError> {
    let plan = UnwindPlan {
        rows: vec![jsr_frame_row()?],
        source_name: "mos 6502 at-func-entry default",
        sourced_from_compiler: false,
        valid_at_all_instructions: None,
    };
    tracing::trace!("Synthesized {}", plan.source_name);
    Ok(plan)
}

/// The fallback unwind plan for any instruction address without better
/// information.
///
/// The 6502 has no stack-frame-adjusting instructions beyond the `JSR`/`RTS`
/// pair, so the function-entry row holds through a function body as well.
/// The plan is still marked not valid at all instructions: code that pushes
/// through the stack page between call and return falls outside this
/// single-row model, and the host must treat the plan as best-effort.
pub fn default_unwind_plan() -> Result<UnwindPlan, AbiError> {
    let plan = UnwindPlan {
        rows: vec![jsr_frame_row()?],
        source_name: "mos 6502 default unwind plan",
        sourced_from_compiler: false,
        valid_at_all_instructions: Some(false),
    };
    tracing::trace!("Synthesized {}", plan.source_name);
    Ok(plan)
}
