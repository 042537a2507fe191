//! Symbol resolution for the two-pass assembler.
//!
//! Predefined platform symbols live in a compile-time perfect hash map;
//! labels and variables go into an ordinary `HashMap`. Variables are
//! allocated RAM cells sequentially from 16 upward on first reference,
//! so repeated references stay stable.

use phf::phf_map;
use std::collections::HashMap;

/// RAM address handed to the first variable symbol.
const FIRST_VARIABLE_ADDRESS: u16 = 16;

/// Symbols built into the Hack platform.
static PREDEFINED: phf::Map<&'static str, u16> = phf_map! {
    // Virtual registers
    "R0" => 0,
    "R1" => 1,
    "R2" => 2,
    "R3" => 3,
    "R4" => 4,
    "R5" => 5,
    "R6" => 6,
    "R7" => 7,
    "R8" => 8,
    "R9" => 9,
    "R10" => 10,
    "R11" => 11,
    "R12" => 12,
    "R13" => 13,
    "R14" => 14,
    "R15" => 15,

    // VM runtime pointers
    "SP" => 0,
    "LCL" => 1,
    "ARG" => 2,
    "THIS" => 3,
    "THAT" => 4,

    // Memory-mapped I/O
    "SCREEN" => 16384,
    "KBD" => 24576,
};

/// Maps identifiers to 16-bit addresses.
///
/// Pass 1 binds labels with [`bind`](Self::bind); pass 2 resolves every
/// symbolic A-instruction with [`resolve`](Self::resolve), which
/// allocates a fresh variable cell the first time it sees an unbound
/// name.
///
/// # Example
/// ```
/// use hack_assembler::SymbolTable;
///
/// let mut table = SymbolTable::new();
/// table.bind("LOOP", 10);
///
/// assert_eq!(table.resolve("LOOP"), 10);
/// assert_eq!(table.resolve("SCREEN"), 16384); // predefined
/// assert_eq!(table.resolve("counter"), 16);   // first variable
/// assert_eq!(table.resolve("counter"), 16);   // stable on re-reference
/// ```
#[derive(Debug)]
pub struct SymbolTable {
    bound: HashMap<String, u16>,
    next_variable: u16,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bound: HashMap::with_capacity(32),
            next_variable: FIRST_VARIABLE_ADDRESS,
        }
    }

    /// Binds a label to an instruction address (pass 1).
    pub fn bind(&mut self, symbol: &str, address: u16) {
        self.bound.insert(symbol.to_string(), address);
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        PREDEFINED.contains_key(symbol) || self.bound.contains_key(symbol)
    }

    /// Looks a symbol up without allocating anything.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<u16> {
        PREDEFINED
            .get(symbol)
            .or_else(|| self.bound.get(symbol))
            .copied()
    }

    /// Resolves a symbol to its address, allocating the next variable
    /// cell when the name is unbound. This is the pass-2 hot path.
    pub fn resolve(&mut self, symbol: &str) -> u16 {
        use std::collections::hash_map::Entry;

        if let Some(&address) = PREDEFINED.get(symbol) {
            return address;
        }
        match self.bound.entry(symbol.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let address = self.next_variable;
                self.next_variable += 1;
                *entry.insert(address)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_symbols() {
        let table = SymbolTable::new();

        assert_eq!(table.get("SP"), Some(0));
        assert_eq!(table.get("LCL"), Some(1));
        assert_eq!(table.get("ARG"), Some(2));
        assert_eq!(table.get("THIS"), Some(3));
        assert_eq!(table.get("THAT"), Some(4));
        assert_eq!(table.get("SCREEN"), Some(16384));
        assert_eq!(table.get("KBD"), Some(24576));

        for i in 0..=15 {
            assert_eq!(table.get(&format!("R{i}")), Some(i));
        }
    }

    #[test]
    fn bind_and_get_labels() {
        let mut table = SymbolTable::new();

        table.bind("LOOP", 100);
        table.bind("END", 200);

        assert!(table.contains("LOOP"));
        assert_eq!(table.get("LOOP"), Some(100));
        assert_eq!(table.get("END"), Some(200));
        assert_eq!(table.get("ELSEWHERE"), None);
    }

    #[test]
    fn variables_allocate_sequentially_from_16() {
        let mut table = SymbolTable::new();

        assert_eq!(table.resolve("sum"), 16);
        assert_eq!(table.resolve("i"), 17);
        assert_eq!(table.resolve("sum"), 16); // stable under re-reference
        assert_eq!(table.resolve("j"), 18);
    }

    #[test]
    fn labels_take_precedence_over_allocation() {
        let mut table = SymbolTable::new();
        table.bind("LOOP", 7);

        assert_eq!(table.resolve("LOOP"), 7);
        assert_eq!(table.resolve("var"), 16); // label did not consume a cell
    }

    #[test]
    fn predefined_symbols_never_allocate() {
        let mut table = SymbolTable::new();

        assert_eq!(table.resolve("SP"), 0);
        assert_eq!(table.resolve("R13"), 13);
        assert_eq!(table.resolve("first"), 16);
    }
}
