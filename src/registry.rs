//! Host-side selection of ABI descriptors by target triple.
//!
//! There is no global plugin registry here: the host owns an
//! [`AbiRegistry`], fills it at startup with one [`AbiEntry`] per supported
//! architecture and drops it at teardown. This crate contributes exactly one
//! entry, [`mos_abi_entry`].

use std::fmt;

use crate::abi::{Abi, MosAbi};

/// True when the triple's architecture component names a MOS target.
pub(crate) fn is_mos_target(triple: &str) -> bool {
    triple.split('-').next() == Some("mos")
}

/// A named ABI descriptor factory, guarded by a target-triple predicate.
pub struct AbiEntry {
    name: &'static str,
    matches: fn(&str) -> bool,
    create: fn() -> Box<dyn Abi>,
}

impl fmt::Debug for AbiEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbiEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AbiEntry {
    /// A new entry with the given match predicate and factory.
    pub fn new(
        name: &'static str,
        matches: fn(&str) -> bool,
        create: fn() -> Box<dyn Abi>,
    ) -> Self {
        AbiEntry {
            name,
            matches,
            create,
        }
    }

    /// The human-readable identifier of this entry.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this entry's ABI applies to the given target triple.
    pub fn matches(&self, triple: &str) -> bool {
        (self.matches)(triple)
    }

    /// Construct the descriptor this entry is a factory for.
    pub fn create(&self) -> Box<dyn Abi> {
        (self.create)()
    }
}

/// The registry of ABI descriptor factories a debugger host selects from.
#[derive(Debug, Default)]
pub struct AbiRegistry {
    entries: Vec<AbiEntry>,
}

impl AbiRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        AbiRegistry::default()
    }

    /// Register an entry. Entries are consulted in registration order; the
    /// first match wins.
    pub fn register(&mut self, entry: AbiEntry) {
        tracing::debug!("Registered ABI entry '{}'", entry.name());
        self.entries.push(entry);
    }

    /// Remove every entry registered under `name`.
    pub fn unregister(&mut self, name: &str) {
        self.entries.retain(|entry| entry.name() != name);
    }

    /// The registered entries, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &AbiEntry> {
        self.entries.iter()
    }

    /// Construct the ABI descriptor for the given target triple, if any
    /// registered entry claims it.
    pub fn abi_for_target(&self, triple: &str) -> Option<Box<dyn Abi>> {
        for entry in &self.entries {
            if entry.matches(triple) {
                tracing::debug!("Selected ABI '{}' for target {triple}", entry.name());
                return Some(entry.create());
            }
        }
        tracing::debug!("No registered ABI matches target {triple}");
        None
    }
}

/// The entry this crate contributes to a host registry.
pub fn mos_abi_entry() -> AbiEntry {
    fn create() -> Box<dyn Abi> {
        Box::new(MosAbi::new())
    }

    AbiEntry::new("System V ABI for MOS 6502 targets", is_mos_target, create)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case("mos", true; "bare architecture tag")]
    #[test_case("mos-unknown-none", true; "full triple")]
    #[test_case("mosquito-unknown-none", false; "prefix of another architecture")]
    #[test_case("riscv32imac-unknown-none-elf", false; "different architecture")]
    #[test_case("", false; "empty triple")]
    fn triple_matching(triple: &str, matches: bool) {
        assert_eq!(mos_abi_entry().matches(triple), matches);
    }

    #[test]
    fn registry_selects_by_triple() {
        let mut registry = AbiRegistry::new();
        registry.register(mos_abi_entry());

        let abi = registry
            .abi_for_target("mos-unknown-none")
            .expect("the MOS entry must claim a mos triple");
        assert_eq!(abi.registers().len(), 6);

        assert!(registry.abi_for_target("thumbv7em-none-eabihf").is_none());
    }

    #[test]
    fn unregistering_removes_the_entry() {
        let mut registry = AbiRegistry::new();
        registry.register(mos_abi_entry());
        assert_eq!(registry.entries().count(), 1);

        registry.unregister("System V ABI for MOS 6502 targets");
        assert_eq!(registry.entries().count(), 0);
        assert!(registry.abi_for_target("mos-unknown-none").is_none());
    }
}
