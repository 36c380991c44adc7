//! The MOS 6502 ABI descriptor: what a debugger may assume about registers,
//! frames and calls on this target.

use crate::registers::{CoreRegister, RegisterDataType, RegisterId, RegisterValue, MOS_REGISTERS};
use crate::registry::is_mos_target;
use crate::unwind::{self, UnwindPlan};
use crate::AbiError;

/// Number of address bits the 6502 drives.
pub const ADDRESS_BITS: u32 = 16;

/// Total size, in bytes, of a stack frame: the entire hardware stack page
/// `$0100..=$01FF`.
pub const STACK_FRAME_SIZE: u64 = 256;

/// The architecture reserves no stack space below the stack pointer.
pub const RED_ZONE_SIZE: u64 = 0;

/// The slice of a debugged thread's state the calling-convention operations
/// are handed by the host.
pub trait ThreadContext {
    /// Read a core register of this thread.
    fn read_core_reg(&mut self, id: RegisterId) -> Result<RegisterValue, AbiError>;

    /// Write a core register of this thread.
    fn write_core_reg(&mut self, id: RegisterId, value: RegisterValue) -> Result<(), AbiError>;
}

/// The ABI capability surface a target architecture supplies to the host
/// debugger.
///
/// The host owns one implementation per supported architecture and selects
/// among them by target triple through [`crate::AbiRegistry`].
pub trait Abi {
    /// The ordered register catalog of this target, as a read-only view.
    fn registers(&self) -> &'static [CoreRegister];

    /// The unwind plan in effect at the first instruction of a newly
    /// entered function.
    fn function_entry_unwind_plan(&self) -> Result<UnwindPlan, AbiError>;

    /// The fallback unwind plan for instruction addresses without better
    /// information.
    fn default_unwind_plan(&self) -> Result<UnwindPlan, AbiError>;

    /// Whether `address` is structurally valid as a code address.
    fn code_address_is_valid(&self, address: u64) -> bool;

    /// Whether `cfa` is structurally valid as a canonical frame address.
    fn frame_address_is_valid(&self, cfa: u64) -> bool;

    /// Whether the register's value survives a call to another function.
    fn register_is_callee_saved(&self, register: &CoreRegister) -> bool;

    /// Whether the caller must save this register itself if it needs the
    /// value after a call.
    fn register_is_volatile(&self, register: &CoreRegister) -> bool {
        !self.register_is_callee_saved(register)
    }

    /// Total size, in bytes, of a stack frame on this target.
    fn stack_frame_size(&self) -> u64;

    /// Size, in bytes, of the red zone below the stack pointer.
    fn red_zone_size(&self) -> u64;

    /// Set up a function call frame the target can resume from, so the
    /// debugger can inject a call to `function_address`.
    fn prepare_trivial_call(
        &self,
        thread: &mut dyn ThreadContext,
        stack_pointer: u64,
        function_address: u64,
        return_address: u64,
        args: &[u64],
    ) -> Result<(), AbiError>;

    /// Extract the argument values of the function the thread is stopped
    /// in, appending them to `values`.
    fn argument_values(
        &self,
        thread: &mut dyn ThreadContext,
        values: &mut Vec<RegisterValue>,
    ) -> Result<(), AbiError>;

    /// Write `value` into the location the selected frame returns its
    /// result through.
    fn set_return_value(
        &self,
        frame: &mut dyn ThreadContext,
        value: RegisterValue,
    ) -> Result<(), AbiError>;

    /// Materialize the return value of the function the thread just
    /// returned from, as a value of the requested type.
    fn return_value(
        &self,
        thread: &mut dyn ThreadContext,
        data_type: &RegisterDataType,
    ) -> Option<RegisterValue>;
}

/// ABI descriptor for MOS 6502 targets.
///
/// All queries are pure reads over static data; a single instance may be
/// shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MosAbi;

impl MosAbi {
    /// A new descriptor instance.
    pub fn new() -> Self {
        MosAbi
    }

    /// Create a descriptor for the given target triple.
    ///
    /// Returns `None` unless the triple names a MOS architecture.
    pub fn create_instance(triple: &str) -> Option<Self> {
        is_mos_target(triple).then(MosAbi::new)
    }
}

impl Abi for MosAbi {
    fn registers(&self) -> &'static [CoreRegister] {
        MOS_REGISTERS
    }

    fn function_entry_unwind_plan(&self) -> Result<UnwindPlan, AbiError> {
        unwind::function_entry_unwind_plan()
    }

    fn default_unwind_plan(&self) -> Result<UnwindPlan, AbiError> {
        unwind::default_unwind_plan()
    }

    fn code_address_is_valid(&self, address: u64) -> bool {
        address < 1 << ADDRESS_BITS
    }

    /// The hardware stack is the fixed page `$0100..=$01FF`, but this
    /// predicate does not enforce that bound: unwinding works with computed,
    /// sometimes speculative CFA values, and only the unset sentinel zero is
    /// rejected.
    fn frame_address_is_valid(&self, cfa: u64) -> bool {
        cfa != 0
    }

    // JSR preserves nothing, and any register preservation is a software
    // convention the debugger cannot assume.
    fn register_is_callee_saved(&self, _register: &CoreRegister) -> bool {
        false
    }

    fn stack_frame_size(&self) -> u64 {
        STACK_FRAME_SIZE
    }

    fn red_zone_size(&self) -> u64 {
        RED_ZONE_SIZE
    }

    // The 6502's call mechanism reserves no argument registers or stack
    // slots, so there is no debugger-safe way to set up a frame the target
    // can resume from without corrupting live state.
    fn prepare_trivial_call(
        &self,
        _thread: &mut dyn ThreadContext,
        _stack_pointer: u64,
        _function_address: u64,
        _return_address: u64,
        _args: &[u64],
    ) -> Result<(), AbiError> {
        Err(AbiError::NotSupported("function call injection"))
    }

    // No calling convention exists that would locate arguments in a
    // register or stack-frame position.
    fn argument_values(
        &self,
        _thread: &mut dyn ThreadContext,
        _values: &mut Vec<RegisterValue>,
    ) -> Result<(), AbiError> {
        Err(AbiError::NotSupported("argument extraction"))
    }

    // There is no return-value location to write into. Succeeding without
    // effect keeps call sites that expect a status working.
    fn set_return_value(
        &self,
        _frame: &mut dyn ThreadContext,
        _value: RegisterValue,
    ) -> Result<(), AbiError> {
        Ok(())
    }

    fn return_value(
        &self,
        _thread: &mut dyn ThreadContext,
        _data_type: &RegisterDataType,
    ) -> Option<RegisterValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    /// Fails the test on any register access, proving the stubs leave
    /// thread state alone.
    struct UntouchableThread;

    impl ThreadContext for UntouchableThread {
        fn read_core_reg(&mut self, id: RegisterId) -> Result<RegisterValue, AbiError> {
            panic!("the calling-convention stub read register {id:?}");
        }

        fn write_core_reg(
            &mut self,
            id: RegisterId,
            _value: RegisterValue,
        ) -> Result<(), AbiError> {
            panic!("the calling-convention stub wrote register {id:?}");
        }
    }

    #[test_case(0x0000, true; "bottom of the address space")]
    #[test_case(0xfffc, true; "reset vector")]
    #[test_case(0xffff, true; "top of the address space")]
    #[test_case(0x1_0000, false; "one past the address space")]
    #[test_case(u64::MAX, false; "far outside the address space")]
    fn code_address_validity(address: u64, valid: bool) {
        assert_eq!(MosAbi::new().code_address_is_valid(address), valid);
    }

    // 0x200 lies outside the hardware stack page but is still accepted; the
    // predicate only rejects the unset sentinel.
    #[test_case(0x0000, false; "unset sentinel")]
    #[test_case(0x0001, true; "nonzero below the stack page")]
    #[test_case(0x01ff, true; "inside the stack page")]
    #[test_case(0x0200, true; "above the stack page")]
    fn frame_address_validity(cfa: u64, valid: bool) {
        assert_eq!(MosAbi::new().frame_address_is_valid(cfa), valid);
    }

    #[test]
    fn every_register_is_volatile() {
        let abi = MosAbi::new();
        for register in abi.registers() {
            assert!(abi.register_is_volatile(register), "{register}");
            assert!(!abi.register_is_callee_saved(register), "{register}");
        }
    }

    #[test]
    fn stack_geometry() {
        let abi = MosAbi::new();
        assert_eq!(abi.stack_frame_size(), 256);
        assert_eq!(abi.red_zone_size(), 0);
    }

    #[test]
    fn call_preparation_is_refused_without_touching_the_thread() {
        let abi = MosAbi::new();
        let result = abi.prepare_trivial_call(
            &mut UntouchableThread,
            0x01fd,
            0x8000,
            0xc003,
            &[1, 2, 3],
        );
        assert!(matches!(result, Err(AbiError::NotSupported(_))));
    }

    #[test]
    fn argument_extraction_is_refused_and_leaves_the_output_empty() {
        let abi = MosAbi::new();
        let mut values = Vec::new();
        let result = abi.argument_values(&mut UntouchableThread, &mut values);
        assert!(matches!(result, Err(AbiError::NotSupported(_))));
        assert!(values.is_empty());
    }

    #[test]
    fn setting_a_return_value_succeeds_without_effect() {
        let abi = MosAbi::new();
        let result = abi.set_return_value(&mut UntouchableThread, RegisterValue::U8(0x2a));
        assert!(result.is_ok());
    }

    #[test]
    fn no_return_value_can_be_materialized() {
        let abi = MosAbi::new();
        for data_type in [
            RegisterDataType::UnsignedInteger(8),
            RegisterDataType::UnsignedInteger(16),
        ] {
            assert_eq!(abi.return_value(&mut UntouchableThread, &data_type), None);
        }
    }

    #[test]
    fn instances_are_only_created_for_mos_triples() {
        assert!(MosAbi::create_instance("mos-unknown-none").is_some());
        assert!(MosAbi::create_instance("mos").is_some());
        assert!(MosAbi::create_instance("thumbv7em-none-eabihf").is_none());
    }
}
