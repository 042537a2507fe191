//! Binary encoding of Hack instructions.
//!
//! Every legal mnemonic lives in a compile-time perfect hash map, so a
//! lookup is a single probe with no runtime table construction. Ordinary
//! C-instructions carry the `111` opcode prefix; the extended shift
//! mnemonics (`D<<`, `M>>` and friends) use the `101` prefix with their
//! own comp table. An unknown mnemonic is a fatal input error, surfaced
//! as [`AssembleError`](crate::AssembleError).

use crate::AssembleError;
use phf::phf_map;

/// Largest value an A-instruction literal may carry (15 address bits).
pub const MAX_ADDRESS: u16 = 32767;

/// Destination mnemonic to its 3-bit field. The empty mnemonic is a
/// legal null destination.
static DEST_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "" => "000",
    "M" => "001",
    "D" => "010",
    "MD" => "011",
    "A" => "100",
    "AM" => "101",
    "AD" => "110",
    "AMD" => "111",
};

/// Computation mnemonic to its 7-bit field (1 `a` bit + 6 `c` bits).
/// The `a` bit selects the M operand over A.
static COMP_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    // a=0, A-register operand
    "0" => "0101010",
    "1" => "0111111",
    "-1" => "0111010",
    "D" => "0001100",
    "A" => "0110000",
    "!D" => "0001101",
    "!A" => "0110001",
    "-D" => "0001111",
    "-A" => "0110011",
    "D+1" => "0011111",
    "A+1" => "0110111",
    "D-1" => "0001110",
    "A-1" => "0110010",
    "D+A" => "0000010",
    "D-A" => "0010011",
    "A-D" => "0000111",
    "D&A" => "0000000",
    "D|A" => "0010101",

    // a=1, M operand
    "M" => "1110000",
    "!M" => "1110001",
    "-M" => "1110011",
    "M+1" => "1110111",
    "M-1" => "1110010",
    "D+M" => "1000010",
    "D-M" => "1010011",
    "M-D" => "1000111",
    "D&M" => "1000000",
    "D|M" => "1010101",
};

/// Extended shift mnemonics, encoded under the `101` opcode prefix.
static SHIFT_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "A<<" => "0100000",
    "D<<" => "0110000",
    "M<<" => "1100000",
    "A>>" => "0000000",
    "D>>" => "0010000",
    "M>>" => "1000000",
};

/// Jump mnemonic to its 3-bit field. The empty mnemonic is no jump.
static JUMP_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "" => "000",
    "JGT" => "001",
    "JEQ" => "010",
    "JGE" => "011",
    "JLT" => "100",
    "JNE" => "101",
    "JLE" => "110",
    "JMP" => "111",
};

/// Translates a destination mnemonic to its 3-bit field.
#[inline]
#[must_use]
pub fn dest(mnemonic: &str) -> Option<&'static str> {
    DEST_MAP.get(mnemonic).copied()
}

/// Translates a computation mnemonic to its 7-bit field.
#[inline]
#[must_use]
pub fn comp(mnemonic: &str) -> Option<&'static str> {
    COMP_MAP.get(mnemonic).copied()
}

/// Translates a shift mnemonic to its 7-bit field.
#[inline]
#[must_use]
pub fn shift(mnemonic: &str) -> Option<&'static str> {
    SHIFT_MAP.get(mnemonic).copied()
}

/// Translates a jump mnemonic to its 3-bit field.
#[inline]
#[must_use]
pub fn jump(mnemonic: &str) -> Option<&'static str> {
    JUMP_MAP.get(mnemonic).copied()
}

/// Encodes a complete C-instruction.
///
/// Ordinary form: `111` + comp(7) + dest(3) + jump(3).
/// Shift form: `101` + shift(7) + dest(3) + jump(3).
///
/// # Example
/// ```
/// use hack_assembler::code::encode_c_instruction;
/// assert_eq!(encode_c_instruction("D", "D+1", "").unwrap(), "1110011111010000");
/// assert_eq!(encode_c_instruction("D", "D<<", "").unwrap(), "1010110000010000");
/// ```
pub fn encode_c_instruction(
    dest_mnemonic: &str,
    comp_mnemonic: &str,
    jump_mnemonic: &str,
) -> Result<String, AssembleError> {
    let dest_bits = dest(dest_mnemonic)
        .ok_or_else(|| AssembleError::UnknownDest(dest_mnemonic.to_string()))?;
    let jump_bits = jump(jump_mnemonic)
        .ok_or_else(|| AssembleError::UnknownJump(jump_mnemonic.to_string()))?;
    let (prefix, comp_bits) = match comp(comp_mnemonic) {
        Some(bits) => ("111", bits),
        None => match shift(comp_mnemonic) {
            Some(bits) => ("101", bits),
            None => return Err(AssembleError::UnknownComp(comp_mnemonic.to_string())),
        },
    };
    Ok(format!("{prefix}{comp_bits}{dest_bits}{jump_bits}"))
}

/// Encodes an A-instruction: a leading `0` and a 15-bit value.
///
/// # Example
/// ```
/// use hack_assembler::code::encode_a_instruction;
/// assert_eq!(encode_a_instruction(100), "0000000001100100");
/// ```
#[inline]
#[must_use]
pub fn encode_a_instruction(address: u16) -> String {
    debug_assert!(address <= MAX_ADDRESS);
    format!("{address:016b}")
}
