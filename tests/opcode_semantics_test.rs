//! One unit test per opcode, against the architecture's instruction table.

use synacor::interpreter::{ExecutionResult, Interpreter};
use synacor::vm::VM;

fn interpreter_for(words: &[u16]) -> Interpreter {
    Interpreter::new(VM::from_words(words).unwrap())
}

#[test]
fn halt_sets_the_flag() {
    let mut interp = interpreter_for(&[0]);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Halted);
    assert!(interp.vm.halted);
    assert_eq!(interp.vm.ip, 0);
}

#[test]
fn set_assigns_register() {
    let mut interp = interpreter_for(&[1, 32768, 49]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 49);
    assert_eq!(interp.vm.ip, 3);
}

#[test]
fn push_grows_the_stack() {
    let mut interp = interpreter_for(&[2, 1234]);
    interp.step().unwrap();
    assert_eq!(interp.vm.stack, vec![1234]);
    assert_eq!(interp.vm.ip, 2);
}

#[test]
fn pop_moves_the_top_into_a_register() {
    let mut interp = interpreter_for(&[3, 32768]);
    interp.vm.push(55);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 55);
    assert!(interp.vm.stack.is_empty());
}

#[test]
fn pop_on_empty_stack_errors() {
    let mut interp = interpreter_for(&[3, 32768]);
    assert!(interp.step().is_err());
}

#[test]
fn eq_yields_zero_or_one() {
    let mut interp = interpreter_for(&[4, 32768, 5, 5]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 1);

    let mut interp = interpreter_for(&[4, 32768, 5, 6]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 0);
}

#[test]
fn gt_yields_zero_or_one() {
    let mut interp = interpreter_for(&[5, 32768, 7, 5]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 1);

    let mut interp = interpreter_for(&[5, 32768, 5, 7]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 0);
}

#[test]
fn jmp_assigns_ip() {
    let mut interp = interpreter_for(&[6, 10]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 10);
}

#[test]
fn jt_jumps_on_nonzero() {
    let mut interp = interpreter_for(&[7, 1, 20]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 20);

    let mut interp = interpreter_for(&[7, 0, 20]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 3);
}

#[test]
fn jf_jumps_on_zero() {
    let mut interp = interpreter_for(&[8, 0, 20]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 20);

    let mut interp = interpreter_for(&[8, 1, 20]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 3);
}

#[test]
fn add_wraps_at_the_fifteen_bit_boundary() {
    let mut interp = interpreter_for(&[9, 32768, 32758, 15]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 5);
}

#[test]
fn mult_wraps_at_the_fifteen_bit_boundary() {
    let mut interp = interpreter_for(&[10, 32768, 4096, 9]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], (4096 * 9) % 32768);
}

#[test]
fn mod_takes_the_remainder() {
    let mut interp = interpreter_for(&[11, 32768, 17, 5]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 2);
}

#[test]
fn and_is_bitwise() {
    let mut interp = interpreter_for(&[12, 32768, 12, 10]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 8);
}

#[test]
fn or_is_bitwise() {
    let mut interp = interpreter_for(&[13, 32768, 12, 10]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 14);
}

#[test]
fn not_is_a_fifteen_bit_complement() {
    let mut interp = interpreter_for(&[14, 32768, 5]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 32762);
}

#[test]
fn rmem_reads_a_cell() {
    let mut interp = interpreter_for(&[15, 32768, 3, 99]);
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 99);
}

#[test]
fn wmem_writes_a_cell() {
    let mut interp = interpreter_for(&[16, 3, 77, 0]);
    interp.step().unwrap();
    assert_eq!(interp.vm.memory[3], 77);
}

#[test]
fn call_pushes_the_return_address_and_jumps() {
    let mut interp = interpreter_for(&[17, 40]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 40);
    assert_eq!(interp.vm.stack, vec![2]);
}

#[test]
fn ret_pops_into_ip() {
    let mut interp = interpreter_for(&[18]);
    interp.vm.push(5);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
    assert_eq!(interp.vm.ip, 5);
}

#[test]
fn ret_on_empty_stack_halts() {
    let mut interp = interpreter_for(&[18]);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Halted);
    assert!(interp.vm.halted);
}

#[test]
fn out_emits_the_value() {
    let mut interp = interpreter_for(&[19, 65]);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Output(65));
    assert_eq!(interp.vm.ip, 2);
}

#[test]
fn in_consumes_one_byte() {
    let mut interp = interpreter_for(&[20, 32768]);
    interp.vm.input.push_back(b'A');
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 65);
    assert!(interp.vm.input.is_empty());
}

#[test]
fn in_suspends_when_the_buffer_is_empty() {
    let mut interp = interpreter_for(&[20, 32768]);
    assert_eq!(interp.step().unwrap(), ExecutionResult::NeedsInput);
    assert_eq!(interp.vm.ip, 0);
}

#[test]
fn noop_only_advances_ip() {
    let mut interp = interpreter_for(&[21, 0]);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip, 1);
    assert_eq!(interp.vm.registers, [0; 8]);
    assert!(interp.vm.stack.is_empty());
}

#[test]
fn operands_resolve_through_registers() {
    // add r0 r1 r2 with presets, mirroring the architecture's own example
    let mut interp = interpreter_for(&[9, 32768, 32769, 32770, 19, 32768, 0]);
    interp.vm.registers[1] = 7;
    interp.vm.registers[2] = 5;
    interp.step().unwrap();
    assert_eq!(interp.vm.registers[0], 12);
    assert_eq!(interp.step().unwrap(), ExecutionResult::Output(12));
}
