//! Solver for the teleporter's confirmation routine.
//!
//! The binary confirms a teleporter destination by evaluating an
//! Ackermann-like recurrence over r7 ("the mystery register") with every
//! return value masked to 15 bits:
//!
//! ```text
//! A(0, n) = n + 1
//! A(m, 0) = A(m - 1, k)           where k is r7
//! A(m, n) = A(m - 1, A(m, n - 1))
//! ```
//!
//! Run natively and recursively this blows the stack; the evaluator here
//! is iterative with an explicit frame stack and a memo table, which makes
//! scanning every candidate k a matter of seconds.

use crate::instruction::OP_NOOP;
use crate::vm::{MEMORY_SIZE, VALUE_MASK, VM};
use log::{debug, info};

/// The shipped binary stages the confirmation like this:
///
/// ```text
/// 5483: set r0 4
/// 5486: set r1 1
/// 5489: call 6027
/// 5491: eq r1 r0 6
/// ```
///
/// so the literal arguments and the expected result sit at fixed cells.
const ARG_M_ADDR: usize = 5485;
const ARG_N_ADDR: usize = 5488;
const CONFIRMATION_CALL_ADDR: usize = 5489;
const EQ_OPERAND_ADDR: usize = 5493;
const TARGET_ADDR: usize = 5494;

/// r7, which the rest of the program never touches
const MYSTERY_REGISTER: usize = 7;

/// The binary never calls the routine with m above 4
const MEMO_ROWS: usize = 5;

/// Memo sentinel; real results are 15-bit
const NO_VALUE: u16 = u16::MAX;

/// Continuation phase of a suspended evaluation frame
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Compute A(m, n) from scratch
    Entry,
    /// The inner A(m, n-1) is in `result`; evaluate A(m-1, result)
    AfterInner,
    /// `result` is final for (m, n); memoise it
    Store,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    m: u16,
    n: u16,
    phase: Phase,
}

/// Evaluate the confirmation routine for a given k. `m` must be at
/// most 4, as in the shipped binary.
pub fn confirmation_value(m: u16, n: u16, k: u16) -> u16 {
    let mut memo = vec![NO_VALUE; MEMO_ROWS * MEMORY_SIZE];
    confirmation_value_memo(m, n, k, &mut memo)
}

fn confirmation_value_memo(m: u16, n: u16, k: u16, memo: &mut [u16]) -> u16 {
    let mut frames = vec![Frame {
        m,
        n,
        phase: Phase::Entry,
    }];
    let mut result = 0u16;

    while let Some(frame) = frames.pop() {
        let slot = frame.m as usize * MEMORY_SIZE + frame.n as usize;
        match frame.phase {
            Phase::Entry => {
                if memo[slot] != NO_VALUE {
                    result = memo[slot];
                    continue;
                }
                if frame.m == 0 {
                    result = frame.n.wrapping_add(1) & VALUE_MASK;
                    memo[slot] = result;
                    continue;
                }
                if frame.n == 0 {
                    frames.push(Frame {
                        phase: Phase::Store,
                        ..frame
                    });
                    frames.push(Frame {
                        m: frame.m - 1,
                        n: k,
                        phase: Phase::Entry,
                    });
                } else {
                    frames.push(Frame {
                        phase: Phase::AfterInner,
                        ..frame
                    });
                    frames.push(Frame {
                        m: frame.m,
                        n: frame.n - 1,
                        phase: Phase::Entry,
                    });
                }
            }
            Phase::AfterInner => {
                frames.push(Frame {
                    phase: Phase::Store,
                    ..frame
                });
                frames.push(Frame {
                    m: frame.m - 1,
                    n: result,
                    phase: Phase::Entry,
                });
            }
            Phase::Store => {
                memo[slot] = result;
            }
        }
    }
    result
}

/// Scan for the k that makes the confirmation routine yield `target`.
///
/// The routine's result for the shipped arguments has k's parity, so only
/// every other candidate needs evaluating. The memo depends on k and is
/// wiped between candidates.
pub fn search(m: u16, n: u16, target: u16) -> Result<u16, String> {
    if (m as usize) >= MEMO_ROWS {
        return Err(format!(
            "confirmation argument m={m} is outside the routine's range"
        ));
    }
    let mut memo = vec![NO_VALUE; MEMO_ROWS * MEMORY_SIZE];
    let mut k = if target % 2 == 0 { 2 } else { 1 };

    while k <= VALUE_MASK {
        memo.fill(NO_VALUE);
        let value = confirmation_value_memo(m, n, k, &mut memo);
        if value == target {
            info!("confirmation value found: k={k}");
            return Ok(k);
        }
        debug!("k={k} yields {value}, want {target}");
        k += 2;
    }
    Err(format!(
        "no register value makes the confirmation routine yield {target}"
    ))
}

/// Find the confirmation value for the machine's staged arguments, then
/// patch the live machine: k into r7, the confirmation call turned into
/// noops, and the equality's register operand replaced with the expected
/// literal so the check passes without the call.
pub fn solve(vm: &mut VM) -> Result<u16, String> {
    let m = vm.memory[ARG_M_ADDR];
    let n = vm.memory[ARG_N_ADDR];
    let target = vm.memory[TARGET_ADDR];
    debug!("confirmation arguments: m={m}, n={n}, target={target}");

    let k = search(m, n, target)?;

    vm.registers[MYSTERY_REGISTER] = k;
    vm.memory[CONFIRMATION_CALL_ADDR] = OP_NOOP;
    vm.memory[CONFIRMATION_CALL_ADDR + 1] = OP_NOOP;
    vm.memory[EQ_OPERAND_ADDR] = target;
    info!(
        "teleporter patched: r7={k}, call at {CONFIRMATION_CALL_ADDR} disabled, \
         equality forced at {EQ_OPERAND_ADDR}"
    );
    Ok(k)
}
