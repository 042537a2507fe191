//! Executes translated programs on a Hack machine model.
//!
//! Each test translates VM source, assembles the result with the sibling
//! assembler crate, and runs the binary on a small simulator, asserting
//! on RAM afterwards. Checking by execution instead of by emitted shape
//! is what catches stack-delta and frame-layout mistakes.

use hack_assembler::assemble;
use vm_translator::translate_program;

/// Minimal Hack machine: 32K RAM, A/D registers, A- and C-instructions
/// plus the extended shift opcodes. Arithmetic wraps at 16 bits the way
/// the hardware does.
struct Machine {
    rom: Vec<u16>,
    ram: Vec<i16>,
    a: u16,
    d: i16,
    pc: usize,
}

impl Machine {
    fn load(binary: &str) -> Self {
        let rom = binary
            .lines()
            .map(|line| {
                assert_eq!(line.len(), 16, "malformed word: {line}");
                u16::from_str_radix(line, 2).expect("binary word")
            })
            .collect();
        Self {
            rom,
            ram: vec![0; 32768],
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    /// Runs until the program spins on an unconditional self-loop (the
    /// conventional halt) or the step limit runs out. Returns whether
    /// the program halted.
    fn run(&mut self, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return false;
            }
            let word = self.rom[self.pc];

            if word & 0x8000 == 0 {
                self.a = word;
                self.pc += 1;
                continue;
            }

            let result = if (word >> 13) & 0b111 == 0b101 {
                self.compute_shift(word)
            } else {
                self.compute_alu(word)
            };

            let dest = (word >> 3) & 0b111;
            let old_a = self.a;
            if dest & 0b001 != 0 {
                self.ram[old_a as usize] = result;
            }
            if dest & 0b100 != 0 {
                self.a = (result as u16) & 0x7FFF;
            }
            if dest & 0b010 != 0 {
                self.d = result;
            }

            let jumped = match word & 0b111 {
                0b000 => false,
                0b001 => result > 0,
                0b010 => result == 0,
                0b011 => result >= 0,
                0b100 => result < 0,
                0b101 => result != 0,
                0b110 => result <= 0,
                _ => true,
            };
            if jumped {
                let next = self.a as usize;
                // (HALT) @HALT 0;JMP spins over these two words forever.
                if word & 0b111 == 0b111 && (next == self.pc || next + 1 == self.pc) {
                    self.pc = next;
                    return true;
                }
                self.pc = next;
            } else {
                self.pc += 1;
            }
        }
        false
    }

    fn compute_alu(&self, word: u16) -> i16 {
        let y = if (word >> 12) & 1 == 1 {
            self.ram[self.a as usize]
        } else {
            self.a as i16
        };
        let d = self.d;
        match (word >> 6) & 0b11_1111 {
            0b101010 => 0,
            0b111111 => 1,
            0b111010 => -1,
            0b001100 => d,
            0b110000 => y,
            0b001101 => !d,
            0b110001 => !y,
            0b001111 => d.wrapping_neg(),
            0b110011 => y.wrapping_neg(),
            0b011111 => d.wrapping_add(1),
            0b110111 => y.wrapping_add(1),
            0b001110 => d.wrapping_sub(1),
            0b110010 => y.wrapping_sub(1),
            0b000010 => d.wrapping_add(y),
            0b010011 => d.wrapping_sub(y),
            0b000111 => y.wrapping_sub(d),
            0b000000 => d & y,
            0b010101 => d | y,
            comp => panic!("unknown comp bits {comp:06b}"),
        }
    }

    fn compute_shift(&self, word: u16) -> i16 {
        let value = if (word >> 12) & 1 == 1 {
            self.ram[self.a as usize]
        } else if (word >> 10) & 1 == 1 {
            self.d
        } else {
            self.a as i16
        };
        if (word >> 11) & 1 == 1 {
            value.wrapping_shl(1)
        } else {
            value >> 1
        }
    }
}

fn translate_and_assemble(files: &[(&str, &str)], bootstrap: bool) -> String {
    let mut asm = Vec::new();
    translate_program(files, bootstrap, &mut asm).expect("translation");
    assemble(&String::from_utf8(asm).expect("utf8 asm")).expect("assembly")
}

/// Runs one bootstrap-less file with the VM runtime pointers preseeded:
/// SP=256, LCL=300, ARG=400, THIS=3000, THAT=3010.
fn run_single(source: &str) -> Machine {
    let binary = translate_and_assemble(&[("Test", source)], false);
    let mut machine = Machine::load(&binary);
    machine.ram[0] = 256;
    machine.ram[1] = 300;
    machine.ram[2] = 400;
    machine.ram[3] = 3000;
    machine.ram[4] = 3010;
    assert!(machine.run(200_000), "program did not halt");
    machine
}

/// Runs a full program bundle with bootstrap.
fn run_program(files: &[(&str, &str)]) -> Machine {
    let binary = translate_and_assemble(files, true);
    let mut machine = Machine::load(&binary);
    assert!(machine.run(500_000), "program did not halt");
    machine
}

const HALT: &str = "label HALT\ngoto HALT\n";

#[test]
fn stack_arithmetic_preserves_deltas() {
    let source = format!(
        "push constant 7\n\
         push constant 8\n\
         add\n\
         push constant 3\n\
         sub\n\
         push constant 10\n\
         and\n\
         push constant 5\n\
         or\n\
         not\n\
         neg\n\
         {HALT}"
    );
    let machine = run_single(&source);

    // ((((7+8)-3)&10)|5) = 13, then !13 = -14, then -(-14) = 14
    assert_eq!(machine.ram[256], 14);
    assert_eq!(machine.ram[0], 257); // five pushes net one cell
}

#[test]
fn shifts_double_and_halve() {
    let source = format!(
        "push constant 3\n\
         shiftleft\n\
         shiftleft\n\
         shiftright\n\
         {HALT}"
    );
    let machine = run_single(&source);

    assert_eq!(machine.ram[256], 6);
    assert_eq!(machine.ram[0], 257);
}

#[test]
fn shift_left_on_negative_values() {
    let source = format!("push constant 1\nneg\nshiftleft\n{HALT}");
    let machine = run_single(&source);

    assert_eq!(machine.ram[256], -2);
}

fn compare(op: &str, x: i32, y: i32) -> (i16, i16) {
    let mut source = String::new();
    for operand in [x, y] {
        if operand < 0 {
            source.push_str(&format!("push constant {}\nneg\n", -operand));
        } else {
            source.push_str(&format!("push constant {operand}\n"));
        }
    }
    source.push_str(op);
    source.push('\n');
    source.push_str(HALT);

    let machine = run_single(&source);
    (machine.ram[256], machine.ram[0])
}

#[test]
fn comparisons_with_same_signs() {
    assert_eq!(compare("lt", 3, 5), (-1, 257));
    assert_eq!(compare("lt", 5, 3), (0, 257));
    assert_eq!(compare("lt", 3, 3), (0, 257));
    assert_eq!(compare("gt", 5, 3), (-1, 257));
    assert_eq!(compare("eq", 4, 4), (-1, 257));
    assert_eq!(compare("eq", 0, 0), (-1, 257));
    assert_eq!(compare("lt", -5, -3), (-1, 257));
    assert_eq!(compare("gt", -5, -3), (0, 257));
    assert_eq!(compare("eq", -4, -4), (-1, 257));
}

#[test]
fn comparisons_with_opposite_signs_survive_overflow() {
    // 32767 - (-1) wraps in 16 bits; a sign-blind lowering answers wrong.
    assert_eq!(compare("lt", 32767, -1), (0, 257));
    assert_eq!(compare("gt", 32767, -1), (-1, 257));
    assert_eq!(compare("lt", -32767, 1), (-1, 257));
    assert_eq!(compare("gt", -32767, 1), (0, 257));
    assert_eq!(compare("eq", 5, -5), (0, 257));
    // Zero counts as nonnegative in the sign split.
    assert_eq!(compare("gt", 0, -1), (-1, 257));
    assert_eq!(compare("lt", -1, 0), (-1, 257));
}

#[test]
fn segment_traffic() {
    let source = format!(
        "push constant 10\n\
         pop local 2\n\
         push constant 21\n\
         pop argument 1\n\
         push constant 5\n\
         pop temp 3\n\
         push constant 99\n\
         pop static 4\n\
         push constant 77\n\
         pop pointer 0\n\
         push constant 88\n\
         pop pointer 1\n\
         push local 2\n\
         push argument 1\n\
         add\n\
         pop this 2\n\
         push static 4\n\
         pop that 0\n\
         {HALT}"
    );
    let machine = run_single(&source);

    assert_eq!(machine.ram[302], 10); // local 2 at LCL+2
    assert_eq!(machine.ram[401], 21); // argument 1 at ARG+1
    assert_eq!(machine.ram[8], 5); // temp 3 at 5+3
    assert_eq!(machine.ram[3], 77); // pop pointer 0 rebinds THIS
    assert_eq!(machine.ram[4], 88); // pop pointer 1 rebinds THAT
    assert_eq!(machine.ram[79], 31); // this 2 through the rebound base
    assert_eq!(machine.ram[88], 99); // that 0, value from static Test.4
    assert_eq!(machine.ram[0], 256); // every push was popped
}

#[test]
fn branching_sums_a_countdown() {
    let source = format!(
        "push constant 0\n\
         pop local 0\n\
         push constant 5\n\
         pop local 1\n\
         label LOOP\n\
         push local 1\n\
         if-goto BODY\n\
         goto DONE\n\
         label BODY\n\
         push local 0\n\
         push local 1\n\
         add\n\
         pop local 0\n\
         push local 1\n\
         push constant 1\n\
         sub\n\
         pop local 1\n\
         goto LOOP\n\
         label DONE\n\
         {HALT}"
    );
    let machine = run_single(&source);

    assert_eq!(machine.ram[300], 15); // 5+4+3+2+1
    assert_eq!(machine.ram[301], 0);
    assert_eq!(machine.ram[0], 256);
}

#[test]
fn zero_argument_call_keeps_the_return_address() {
    // With zero arguments ARG points at the return-address slot, so the
    // teardown must read it before the return value lands there.
    let sys = format!(
        "function Sys.init 0\n\
         call Sys.main 0\n\
         {HALT}\
         function Sys.main 0\n\
         push constant 42\n\
         return\n"
    );
    let machine = run_program(&[("Sys", &sys)]);

    // Bootstrap frame ends at 261; the return value replaces the inner
    // frame's return address there.
    assert_eq!(machine.ram[261], 42);
    assert_eq!(machine.ram[0], 262);
}

#[test]
fn call_passes_arguments_and_restores_the_caller() {
    let main = "\
function Main.double 1
push argument 0
push argument 0
add
pop local 0
push local 0
return
";
    let sys = format!(
        "function Sys.init 0\n\
         push constant 21\n\
         call Main.double 1\n\
         {HALT}"
    );
    let machine = run_program(&[("Main", main), ("Sys", &sys)]);

    assert_eq!(machine.ram[261], 42);
    assert_eq!(machine.ram[0], 262);
}

#[test]
fn static_segments_are_private_per_file() {
    let a = "\
function A.set 0
push constant 11
pop static 0
push static 0
return
function A.get 0
push static 0
return
";
    let b = "\
function B.set 0
push constant 22
pop static 0
push static 0
return
";
    let sys = format!(
        "function Sys.init 0\n\
         call A.set 0\n\
         pop temp 0\n\
         call B.set 0\n\
         pop temp 1\n\
         call A.get 0\n\
         pop temp 2\n\
         {HALT}"
    );
    let machine = run_program(&[("A", a), ("B", b), ("Sys", &sys)]);

    assert_eq!(machine.ram[5], 11);
    assert_eq!(machine.ram[6], 22);
    assert_eq!(machine.ram[7], 11); // B.set did not touch A's static 0
}

#[test]
fn recursive_fibonacci() {
    let main = "\
function Main.fib 0
push argument 0
push constant 2
lt
if-goto BASE
push argument 0
push constant 1
sub
call Main.fib 1
push argument 0
push constant 2
sub
call Main.fib 1
add
return
label BASE
push argument 0
return
";
    let sys = format!(
        "function Sys.init 0\n\
         push constant 7\n\
         call Main.fib 1\n\
         pop temp 0\n\
         {HALT}"
    );
    let machine = run_program(&[("Main", main), ("Sys", &sys)]);

    assert_eq!(machine.ram[5], 13); // fib(7)
}
