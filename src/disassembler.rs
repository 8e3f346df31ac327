use crate::instruction::{Instruction, Op, Operand};
use log::debug;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Marker emitted between disassembly entries that are not contiguous
const GAP_MARKER: &str = "...";

/// A disassembler over a loaded memory image
pub struct Disassembler<'a> {
    memory: &'a [u16],
}

impl<'a> Disassembler<'a> {
    pub fn new(memory: &'a [u16]) -> Self {
        Disassembler { memory }
    }

    /// Render the single instruction at the given address as
    /// `NNNN: mnemonic a, b, c` (registers as `rN`, literals in decimal)
    pub fn disassemble_at(&self, addr: u16) -> Result<(Instruction, String), String> {
        let instruction = Instruction::decode(self.memory, addr)?;
        Ok((instruction, format!("{addr:04}: {instruction}")))
    }

    /// Disassemble everything reachable from `start` by following control
    /// flow, rather than scanning linearly through data.
    ///
    /// Keeps a pending stack and a completed map (address → successor
    /// address and rendered line); branch targets in register form are not
    /// followed, since their destination is only known dynamically. Output
    /// is sorted by address with a `...` marker between entries whose
    /// successor relation is not contiguous.
    pub fn disassemble_reachable(&self, start: u16) -> String {
        let mut pending = vec![start];
        let mut completed: BTreeMap<u16, (u16, String)> = BTreeMap::new();

        while let Some(addr) = pending.pop() {
            if completed.contains_key(&addr) {
                continue;
            }
            match self.disassemble_at(addr) {
                Ok((instruction, line)) => {
                    let sequential = addr + instruction.length;
                    let mut successors: Vec<u16> = Vec::new();
                    match instruction.op {
                        Op::Halt | Op::Ret => {}
                        Op::Jmp(target) => {
                            if let Operand::Literal(dest) = target {
                                successors.push(dest);
                            }
                        }
                        Op::Jt(_, target) | Op::Jf(_, target) => {
                            successors.push(sequential);
                            if let Operand::Literal(dest) = target {
                                successors.push(dest);
                            }
                        }
                        Op::Call(target) => {
                            successors.push(sequential);
                            if let Operand::Literal(dest) = target {
                                successors.push(dest);
                            }
                        }
                        _ => successors.push(sequential),
                    }
                    completed.insert(addr, (sequential, line));
                    for successor in successors {
                        if (successor as usize) < self.memory.len()
                            && !completed.contains_key(&successor)
                        {
                            pending.push(successor);
                        }
                    }
                }
                Err(e) => {
                    // reached a cell that is not code; record it and keep
                    // walking the rest of the pending set
                    debug!("reachability walk stopped at {addr}: {e}");
                    completed.insert(addr, (addr + 1, format!("{addr:04}: <error: {e}>")));
                }
            }
        }

        let mut output = String::new();
        let mut previous_successor: Option<u16> = None;
        for (addr, (successor, line)) in &completed {
            if let Some(prev) = previous_successor {
                if prev != *addr {
                    let _ = writeln!(output, "{GAP_MARKER}");
                }
            }
            let _ = writeln!(output, "{line}");
            previous_successor = Some(*successor);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_address_render() {
        let memory = vec![9, 32768, 32769, 4];
        let disasm = Disassembler::new(&memory);
        let (instruction, line) = disasm.disassemble_at(0).unwrap();
        assert_eq!(line, "0000: add r0, r1, 4");
        assert_eq!(instruction.length, 4);
    }

    #[test]
    fn test_walk_skips_unreachable_cells() {
        // jmp 4; (data); noop; jmp 0
        let memory = vec![6, 4, 0, 0, 21, 6, 0];
        let disasm = Disassembler::new(&memory);
        let output = disasm.disassemble_reachable(0);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec!["0000: jmp 4", "...", "0004: noop", "0005: jmp 0"]
        );
    }

    #[test]
    fn test_walk_is_idempotent() {
        let memory = vec![6, 4, 0, 0, 21, 6, 0];
        let disasm = Disassembler::new(&memory);
        assert_eq!(disasm.disassemble_reachable(0), disasm.disassemble_reachable(0));
    }

    #[test]
    fn test_walk_follows_both_branch_arms() {
        // jt r0 5; halt; (data); noop; halt
        let memory = vec![7, 32768, 5, 0, 99, 21, 0];
        let disasm = Disassembler::new(&memory);
        let output = disasm.disassemble_reachable(0);
        assert!(output.contains("0000: jt r0, 5"));
        assert!(output.contains("0003: halt"));
        assert!(output.contains("0005: noop"));
        assert!(output.contains("0006: halt"));
        // the data word at 4 is never rendered
        assert!(!output.contains("0004"));
    }

    #[test]
    fn test_walk_does_not_follow_register_targets() {
        // jmp r0; noop
        let memory = vec![6, 32768, 21];
        let disasm = Disassembler::new(&memory);
        let output = disasm.disassemble_reachable(0);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec!["0000: jmp r0"]);
    }

    #[test]
    fn test_walk_handles_cycles() {
        // call 3; halt; noop; ret -- the callee returns into the walk's
        // completed set, and the call's sequential successor is covered
        let memory = vec![17, 3, 0, 21, 18];
        let disasm = Disassembler::new(&memory);
        let output = disasm.disassemble_reachable(0);
        assert!(output.contains("0000: call 3"));
        assert!(output.contains("0002: halt"));
        assert!(output.contains("0003: noop"));
        assert!(output.contains("0004: ret"));
    }
}
