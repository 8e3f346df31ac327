//! Driving the debugger's command loop the way the REPL does.

use std::io::Cursor;
use synacor::debugger::{Debugger, PauseReason};
use synacor::interpreter::Interpreter;
use synacor::vm::VM;

fn debugger_for(words: &[u16]) -> Debugger {
    Debugger::new(Interpreter::new(VM::from_words(words).unwrap()))
}

#[test]
fn session_mutates_state_then_resumes() {
    // add r0 r1 r2; out r0; halt
    let mut debugger = debugger_for(&[9, 32768, 32769, 32770, 19, 32768, 0]);
    debugger.add_breakpoint(0);

    let (_, reason) = debugger.run_until_pause().unwrap();
    assert_eq!(reason, PauseReason::Breakpoint(0));

    // seed the registers from inside the session, then resume
    let mut script = Cursor::new(b"r1 7\nr2 5\ngo\n".to_vec());
    debugger.debug_session(&mut script).unwrap();

    let (output, reason) = debugger.run_until_pause().unwrap();
    assert_eq!(reason, PauseReason::Halted);
    assert_eq!(output, vec![12]);
}

#[test]
fn session_ends_at_eof() {
    let mut debugger = debugger_for(&[0]);
    let mut script = Cursor::new(Vec::new());
    debugger.debug_session(&mut script).unwrap();
}

#[test]
fn session_survives_malformed_commands() {
    let mut debugger = debugger_for(&[0]);
    let mut script = Cursor::new(b"b nowhere\nr9 1\n40000\ngo\n".to_vec());
    debugger.debug_session(&mut script).unwrap();
    assert!(debugger.breakpoints().is_empty());
}

#[test]
fn session_toggles_tracers() {
    let mut debugger = debugger_for(&[0]);
    let mut script = Cursor::new(b"trace on\nstack on 123\ngo\n".to_vec());
    debugger.debug_session(&mut script).unwrap();
    assert!(debugger.trace.enabled);
    assert!(debugger.stack_trace.enabled);
    assert_eq!(debugger.stack_trace.limit, 123);
}

#[test]
fn tracers_capture_a_run() {
    // push 3; pop r0; out r0; halt
    let mut debugger = debugger_for(&[2, 3, 3, 32768, 19, 32768, 0]);
    debugger.trace.enabled = true;
    debugger.stack_trace.enabled = true;

    let (output, reason) = debugger.run_until_pause().unwrap();
    assert_eq!(reason, PauseReason::Halted);
    assert_eq!(output, vec![3]);

    // halt is traced too: push, pop, out, halt
    assert_eq!(debugger.trace.len(), 4);
    assert!(debugger.trace.lines()[0].starts_with("0000: push 3"));

    let rows = debugger.stack_trace.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].pushed, Some(3));
    assert_eq!(rows[1].popped, Some(3));
    assert_eq!(rows[0].linked_row, Some(2));
    assert_eq!(rows[1].linked_row, Some(1));
}
