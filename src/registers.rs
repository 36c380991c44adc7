//! Core registers of the MOS 6502, collected in the static [`MOS_REGISTERS`]
//! catalog.
//!
//! The catalog order matches MAME's `gdb_register_map_m6502`, which is the
//! numbering GDB remote stubs and DWARF producers agree on for this target.
//! Reordering entries breaks cross-tool register-index agreement.

use std::fmt;

use serde::Serialize;

use crate::AbiError;

/// The type of data stored in a register, along with its width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegisterDataType {
    /// Unsigned integer data.
    UnsignedInteger(usize),
}

/// The location of a core register in the target's native (GDB remote
/// protocol) numbering. This is not a memory address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RegisterId(pub u16);

impl From<u16> for RegisterId {
    fn from(value: u16) -> Self {
        RegisterId(value)
    }
}

impl From<RegisterId> for u32 {
    fn from(value: RegisterId) -> Self {
        u32::from(value.0)
    }
}

/// The architectural role a register plays, independent of its native name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegisterRole {
    /// The program counter.
    ProgramCounter,
    /// The stack pointer. On the 6502 this is an 8-bit index into the fixed
    /// stack page `$0100..=$01FF`.
    StackPointer,
    /// The processor status flags.
    ProcessorStatus,
}

/// Describes a single core register and the numbering schemes it is known by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreRegister {
    /// The primary name of the register.
    pub name: &'static str,
    /// An alternate name some tools use for the same register.
    pub alt_name: Option<&'static str>,
    /// Register number in the target's native numbering.
    pub id: RegisterId,
    /// Register number in the DWARF numbering, where one is assigned.
    pub dwarf_id: Option<u16>,
    /// Architectural roles this register fulfills. Empty for plain data
    /// registers.
    pub roles: &'static [RegisterRole],
    /// The type and width of the data stored in this register.
    pub data_type: RegisterDataType,
    /// Byte offset of this register within the virtual register file.
    pub offset: usize,
}

impl CoreRegister {
    /// The native register number.
    pub fn id(&self) -> RegisterId {
        self.id
    }

    /// The type of data stored in this register.
    pub fn data_type(&self) -> RegisterDataType {
        self.data_type
    }

    /// The size, in bits, of this register.
    pub fn size_in_bits(&self) -> usize {
        let RegisterDataType::UnsignedInteger(size_in_bits) = self.data_type;
        size_in_bits
    }

    /// The size, in bytes, of this register.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bits().div_ceil(8)
    }

    /// The width to format this register as a hex string, assuming a format
    /// string like `{:#0width$x}`.
    pub fn format_hex_width(&self) -> usize {
        self.size_in_bytes() * 2 + 2
    }

    /// Whether this register fulfills the given role.
    pub fn register_has_role(&self, role: RegisterRole) -> bool {
        self.roles.contains(&role)
    }
}

impl fmt::Display for CoreRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl From<&CoreRegister> for RegisterId {
    fn from(register: &CoreRegister) -> RegisterId {
        register.id
    }
}

pub(crate) const P: CoreRegister = CoreRegister {
    name: "p",
    alt_name: Some("flags"),
    id: RegisterId(3),
    dwarf_id: Some(3),
    roles: &[RegisterRole::ProcessorStatus],
    data_type: RegisterDataType::UnsignedInteger(8),
    offset: 3,
};

pub(crate) const SP: CoreRegister = CoreRegister {
    name: "sp",
    alt_name: None,
    id: RegisterId(4),
    dwarf_id: Some(4),
    roles: &[RegisterRole::StackPointer],
    data_type: RegisterDataType::UnsignedInteger(8),
    offset: 4,
};

pub(crate) const PC: CoreRegister = CoreRegister {
    name: "pc",
    alt_name: None,
    id: RegisterId(5),
    dwarf_id: Some(5),
    roles: &[RegisterRole::ProgramCounter],
    data_type: RegisterDataType::UnsignedInteger(16),
    offset: 5,
};

/// All core registers of the MOS 6502, ordered to match MAME's
/// `gdb_register_map_m6502`: a, x, y, p, sp, pc. The native and DWARF
/// numbers are the table indices.
pub static MOS_REGISTERS: &[CoreRegister] = &[
    CoreRegister {
        name: "a",
        alt_name: None,
        id: RegisterId(0),
        dwarf_id: Some(0),
        roles: &[],
        data_type: RegisterDataType::UnsignedInteger(8),
        offset: 0,
    },
    CoreRegister {
        name: "x",
        alt_name: None,
        id: RegisterId(1),
        dwarf_id: Some(1),
        roles: &[],
        data_type: RegisterDataType::UnsignedInteger(8),
        offset: 1,
    },
    CoreRegister {
        name: "y",
        alt_name: None,
        id: RegisterId(2),
        dwarf_id: Some(2),
        roles: &[],
        data_type: RegisterDataType::UnsignedInteger(8),
        offset: 2,
    },
    P,
    SP,
    PC,
];

/// Retrieve the catalog register that fulfills the given role.
///
/// Fails if no register, or more than one register, carries the role.
pub fn register_by_role(role: RegisterRole) -> Result<&'static CoreRegister, AbiError> {
    let mut matches = MOS_REGISTERS
        .iter()
        .filter(|register| register.register_has_role(role));
    match (matches.next(), matches.next()) {
        (Some(register), None) => Ok(register),
        (None, _) => Err(AbiError::Register(format!(
            "No {role:?} register. Please report this as a bug."
        ))),
        (Some(_), Some(_)) => Err(AbiError::Register(format!(
            "Multiple {role:?} registers. Please report this as a bug."
        ))),
    }
}

/// A value read from or destined for a core register.
///
/// Creating a `RegisterValue` should be done using From or Into; converting
/// back to a primitive can be done with a match arm or TryFrom.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum RegisterValue {
    /// The 8-bit registers: a, x, y, p and sp.
    U8(u8),
    /// The 16-bit program counter.
    U16(u16),
}

impl RegisterValue {
    /// Whether the contained value is zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, RegisterValue::U8(0) | RegisterValue::U16(0))
    }

    /// Whether the contained value is the maximum its width can store.
    pub fn is_max_value(&self) -> bool {
        match self {
            RegisterValue::U8(value) => *value == u8::MAX,
            RegisterValue::U16(value) => *value == u16::MAX,
        }
    }
}

impl Default for RegisterValue {
    fn default() -> Self {
        // Smallest data storage as default.
        RegisterValue::U8(0)
    }
}

impl PartialEq for RegisterValue {
    fn eq(&self, other: &Self) -> bool {
        u16::from(*self) == u16::from(*other)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::U8(value) => write!(f, "{value:#04x}"),
            RegisterValue::U16(value) => write!(f, "{value:#06x}"),
        }
    }
}

impl From<u8> for RegisterValue {
    fn from(value: u8) -> Self {
        RegisterValue::U8(value)
    }
}

impl From<u16> for RegisterValue {
    fn from(value: u16) -> Self {
        RegisterValue::U16(value)
    }
}

impl From<RegisterValue> for u16 {
    fn from(value: RegisterValue) -> Self {
        match value {
            RegisterValue::U8(value) => u16::from(value),
            RegisterValue::U16(value) => value,
        }
    }
}

impl TryFrom<RegisterValue> for u8 {
    type Error = AbiError;

    fn try_from(value: RegisterValue) -> Result<Self, Self::Error> {
        match value {
            RegisterValue::U8(value) => Ok(value),
            RegisterValue::U16(value) => u8::try_from(value).map_err(|_| {
                AbiError::Register(format!("Value {value:#06x} too large for an 8-bit register"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn catalog_matches_the_m6502_register_map() {
        let names: Vec<_> = MOS_REGISTERS.iter().map(|register| register.name).collect();
        assert_eq!(names, vec!["a", "x", "y", "p", "sp", "pc"]);

        for (index, register) in MOS_REGISTERS.iter().enumerate() {
            assert_eq!(register.id, RegisterId(index as u16));
            assert_eq!(register.dwarf_id, Some(index as u16));
        }
    }

    #[test]
    fn exactly_one_register_per_role() {
        for role in [
            RegisterRole::ProgramCounter,
            RegisterRole::StackPointer,
            RegisterRole::ProcessorStatus,
        ] {
            let count = MOS_REGISTERS
                .iter()
                .filter(|register| register.register_has_role(role))
                .count();
            assert_eq!(count, 1, "expected exactly one {role:?} register");
        }

        let unassigned = MOS_REGISTERS
            .iter()
            .filter(|register| register.roles.is_empty())
            .count();
        assert_eq!(unassigned, 3);
    }

    #[test]
    fn only_the_program_counter_is_wider_than_a_byte() {
        for register in MOS_REGISTERS {
            let expected = if register.register_has_role(RegisterRole::ProgramCounter) {
                2
            } else {
                1
            };
            assert_eq!(register.size_in_bytes(), expected, "{register}");
        }
    }

    #[test]
    fn register_file_offsets_are_contiguous() {
        let mut offset = 0;
        for register in MOS_REGISTERS {
            assert_eq!(register.offset, offset, "{register}");
            offset += register.size_in_bytes();
        }
    }

    #[test]
    fn status_register_has_an_alternate_name() {
        let p = register_by_role(RegisterRole::ProcessorStatus).unwrap();
        assert_eq!(p.name, "p");
        assert_eq!(p.alt_name, Some("flags"));
    }

    #[test]
    fn role_lookups_resolve_to_the_expected_registers() {
        assert_eq!(
            register_by_role(RegisterRole::ProgramCounter).unwrap().name,
            "pc"
        );
        assert_eq!(
            register_by_role(RegisterRole::StackPointer).unwrap().name,
            "sp"
        );
    }

    #[test]
    fn register_values_format_as_hex() {
        assert_eq!(RegisterValue::U8(0x2a).to_string(), "0x2a");
        assert_eq!(RegisterValue::U16(0xfffc).to_string(), "0xfffc");
    }

    #[test]
    fn register_value_conversions() {
        assert_eq!(u16::from(RegisterValue::U8(0xff)), 0x00ff);
        assert_eq!(u8::try_from(RegisterValue::U16(0x12)).unwrap(), 0x12);
        assert!(u8::try_from(RegisterValue::U16(0x1234)).is_err());
        assert!(RegisterValue::default().is_zero());
        assert!(RegisterValue::U16(0xffff).is_max_value());
    }
}
