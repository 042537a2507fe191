//! End-to-end assembly through the library API.

use hack_assembler::{assemble, AssembleError};

#[test]
fn predefined_symbols_resolve() {
    let binary = assemble("@R1\nD=M\n@SCREEN\nM=D\n").unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert_eq!(words[0], "0000000000000001"); // R1 -> 1
    assert_eq!(words[1], "1111110000010000"); // D=M
    assert_eq!(words[2], "0100000000000000"); // SCREEN -> 16384
    assert_eq!(words[3], "1110001100001000"); // M=D
}

#[test]
fn variables_allocate_from_16_and_stay_stable() {
    let binary = assemble("@sum\n@i\n@sum\n").unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert_eq!(words[0], "0000000000010000"); // sum -> 16
    assert_eq!(words[1], "0000000000010001"); // i -> 17
    assert_eq!(words[2], "0000000000010000"); // sum -> 16 again
}

#[test]
fn labels_do_not_occupy_instruction_slots() {
    let source = "\
@0
D=M
(POSITIVE)
@1
D=D+M
(NEGATIVE)
@POSITIVE
0;JMP
@NEGATIVE
0;JMP
";
    let binary = assemble(source).unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert_eq!(words.len(), 8);
    assert_eq!(words[4], "0000000000000010"); // POSITIVE -> instruction 2
    assert_eq!(words[6], "0000000000000100"); // NEGATIVE -> instruction 4
}

#[test]
fn forward_references_resolve_through_pass_one() {
    // @END appears before (END) is declared.
    let binary = assemble("@END\n0;JMP\n(END)\n@END\n0;JMP\n").unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert_eq!(words[0], "0000000000000010"); // END -> 2, not a variable
    assert_eq!(words[2], "0000000000000010");
}

#[test]
fn mixed_labels_and_variables() {
    // A loop decrementing a variable: labels bind to code, variables to RAM.
    let source = "\
@100
D=A
@i
M=D
(LOOP)
@i
D=M
@END
D;JEQ
@i
M=M-1
@LOOP
0;JMP
(END)
@END
0;JMP
";
    let binary = assemble(source).unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert_eq!(words.len(), 14);
    assert_eq!(words[2], "0000000000010000"); // i -> 16
    assert_eq!(words[6], "0000000000001100"); // END -> 12
    assert_eq!(words[10], "0000000000000100"); // LOOP -> 4
}

#[test]
fn shift_comps_assemble_under_their_own_prefix() {
    let binary = assemble("M=M<<\nD=D>>\n").unwrap();
    let words: Vec<&str> = binary.lines().collect();

    assert!(words[0].starts_with("101"));
    assert_eq!(words[0], "1011100000001000");
    assert_eq!(words[1], "1010010000010000");
}

#[test]
fn lexical_violations_are_surfaced() {
    assert!(matches!(
        assemble("@40000\n"),
        Err(AssembleError::LiteralOutOfRange(_))
    ));
    assert!(matches!(
        assemble("Q=D\n"),
        Err(AssembleError::UnknownDest(_))
    ));
    assert!(matches!(
        assemble("0;JJJ\n"),
        Err(AssembleError::UnknownJump(_))
    ));
}
