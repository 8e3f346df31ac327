use crate::instruction::{Instruction, Op};
use crate::vm::{VM, VALUE_MASK};
use log::debug;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column where the interpretation half of a trace line starts
const INTERPRET_COLUMN: usize = 35;

/// Rows the stack tracer accumulates before handing control to the debugger
pub const DEFAULT_STACK_TRACE_LIMIT: usize = 10_000;

/// Records one human-readable line per executed instruction.
///
/// Both tracers observe the machine *before* the step runs: every value a
/// line needs (old value, new value, branch condition, pushed or popped
/// word) is computable from the pre-step state, so tracing never perturbs
/// execution. In particular `in` peeks the pending byte without consuming
/// it.
pub struct ExecutionTracer {
    pub enabled: bool,
    lines: Vec<String>,
}

impl ExecutionTracer {
    pub fn new() -> Self {
        ExecutionTracer {
            enabled: false,
            lines: Vec::new(),
        }
    }

    pub fn record(&mut self, vm: &VM, instruction: &Instruction) {
        if !self.enabled {
            return;
        }
        let mut line = format!("{:04}: {}", instruction.addr, instruction);
        let interpretation = interpret(vm, instruction);
        if !interpretation.is_empty() {
            while line.len() < INTERPRET_COLUMN {
                line.push(' ');
            }
            line.push_str(&interpretation);
        }
        self.lines.push(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        let mut file = File::create(path)
            .map_err(|e| format!("failed to create trace file {path:?}: {e}"))?;
        for line in &self.lines {
            writeln!(file, "{line}").map_err(|e| format!("failed to write {path:?}: {e}"))?;
        }
        debug!("wrote {} trace lines to {:?}", self.lines.len(), path);
        Ok(())
    }
}

impl Default for ExecutionTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// The right-hand half of a trace line: what the instruction is about to do
fn interpret(vm: &VM, instruction: &Instruction) -> String {
    let mut s = String::new();
    match instruction.op {
        Op::Halt => s.push_str("halting"),
        Op::Set(a, b) => {
            let value = vm.resolve(b);
            let _ = write!(s, "{a} = {value} replacing {}", vm.register(a));
        }
        Op::Push(b) => {
            let _ = write!(s, "push {}", vm.resolve(b));
        }
        Op::Pop(a) => match vm.stack.last() {
            Some(top) => {
                let _ = write!(s, "pop {top} into {a} replacing {}", vm.register(a));
            }
            None => s.push_str("pop from empty stack"),
        },
        Op::Eq(a, b, c) => {
            let (bv, cv) = (vm.resolve(b), vm.resolve(c));
            let new = (bv == cv) as u16;
            let _ = write!(
                s,
                "{a} = ({bv} == {cv}) replacing {} with {new}",
                vm.register(a)
            );
        }
        Op::Gt(a, b, c) => {
            let (bv, cv) = (vm.resolve(b), vm.resolve(c));
            let new = (bv > cv) as u16;
            let _ = write!(
                s,
                "{a} = ({bv} > {cv}) replacing {} with {new}",
                vm.register(a)
            );
        }
        Op::Jmp(b) => {
            let _ = write!(s, "jump to {}", vm.resolve(b));
        }
        Op::Jt(b, c) => {
            let condition = vm.resolve(b);
            if condition != 0 {
                let _ = write!(s, "condition {condition} is nonzero, jumping to {}", vm.resolve(c));
            } else {
                s.push_str("condition 0 is zero, falling through");
            }
        }
        Op::Jf(b, c) => {
            let condition = vm.resolve(b);
            if condition == 0 {
                let _ = write!(s, "condition 0 is zero, jumping to {}", vm.resolve(c));
            } else {
                let _ = write!(s, "condition {condition} is nonzero, falling through");
            }
        }
        Op::Add(..) => arithmetic(&mut s, vm, instruction, '+'),
        Op::Mult(..) => arithmetic(&mut s, vm, instruction, '*'),
        Op::Mod(..) => arithmetic(&mut s, vm, instruction, '%'),
        Op::And(..) => arithmetic(&mut s, vm, instruction, '&'),
        Op::Or(..) => arithmetic(&mut s, vm, instruction, '|'),
        Op::Not(a, b) => {
            let bv = vm.resolve(b);
            let new = !bv & VALUE_MASK;
            let _ = write!(s, "{a} = ~{bv} replacing {} with {new}", vm.register(a));
        }
        Op::Rmem(a, b) => {
            let addr = vm.resolve(b);
            let _ = write!(
                s,
                "{a} = mem[{addr}] replacing {} with {}",
                vm.register(a),
                vm.read_memory(addr)
            );
        }
        Op::Wmem(a, b) => {
            let addr = vm.resolve(a);
            let _ = write!(
                s,
                "mem[{addr}] = {} replacing {}",
                vm.resolve(b),
                vm.read_memory(addr)
            );
        }
        Op::Call(b) => {
            let _ = write!(
                s,
                "call {}, pushing return address {}",
                vm.resolve(b),
                instruction.addr + 2
            );
        }
        Op::Ret => match vm.stack.last() {
            Some(dest) => {
                let _ = write!(s, "return to {dest}");
            }
            None => s.push_str("return on empty stack, halting"),
        },
        Op::Out(b) => {
            let value = vm.resolve(b);
            let _ = write!(s, "out {value} {}", printable(value));
        }
        // peek only: consuming here would make traced runs diverge
        Op::In(a) => match vm.input.front() {
            Some(&byte) => {
                let _ = write!(
                    s,
                    "{a} = input {byte} {} replacing {}",
                    printable(byte as u16),
                    vm.register(a)
                );
            }
            None => s.push_str("waiting for input"),
        },
        Op::Noop => {}
    }
    s
}

fn arithmetic(s: &mut String, vm: &VM, instruction: &Instruction, symbol: char) {
    let (a, b, c) = match instruction.op {
        Op::Add(a, b, c)
        | Op::Mult(a, b, c)
        | Op::Mod(a, b, c)
        | Op::And(a, b, c)
        | Op::Or(a, b, c) => (a, b, c),
        _ => return,
    };
    let (bv, cv) = (vm.resolve(b), vm.resolve(c));
    let new = match symbol {
        '+' => bv.wrapping_add(cv) & VALUE_MASK,
        '*' => bv.wrapping_mul(cv) & VALUE_MASK,
        '%' if cv != 0 => bv % cv,
        '%' => {
            let _ = write!(s, "{a} = {bv} % 0 (division by zero)");
            return;
        }
        '&' => bv & cv,
        '|' => bv | cv,
        _ => return,
    };
    let _ = write!(
        s,
        "{a} = {bv} {symbol} {cv} replacing {} with {new}",
        vm.register(a)
    );
}

fn printable(value: u16) -> String {
    match value {
        10 => "'\\n'".to_string(),
        9 => "'\\t'".to_string(),
        13 => "'\\r'".to_string(),
        32..=126 => format!("'{}'", value as u8 as char),
        _ => "'\u{FFFD}'".to_string(),
    }
}

/// One row of the stack trace
#[derive(Debug, Clone)]
pub struct StackRow {
    pub ip: u16,
    pub op: &'static str,
    pub pushed: Option<u16>,
    pub r0: u16,
    pub r1: u16,
    pub popped: Option<u16>,
    /// 1-relative index of the row consuming (or producing) this value
    pub linked_row: Option<usize>,
}

/// Records a row for every push/pop/call/ret, cross-linking each producing
/// row with the row that consumes its value.
pub struct StackTracer {
    pub enabled: bool,
    pub limit: usize,
    rows: Vec<StackRow>,
    /// 0-based indices of push/call rows not yet consumed
    pending: Vec<usize>,
    tripped: bool,
}

impl StackTracer {
    pub fn new() -> Self {
        StackTracer {
            enabled: false,
            limit: DEFAULT_STACK_TRACE_LIMIT,
            rows: Vec::new(),
            pending: Vec::new(),
            tripped: false,
        }
    }

    pub fn record(&mut self, vm: &VM, instruction: &Instruction) {
        if !self.enabled {
            return;
        }
        let op = instruction.op.mnemonic();
        let (r0, r1) = (vm.registers[0], vm.registers[1]);
        match instruction.op {
            Op::Push(b) => self.record_producer(instruction.addr, op, vm.resolve(b), r0, r1),
            Op::Call(_) => {
                // the value a call leaves behind is its return address
                self.record_producer(instruction.addr, op, instruction.addr + 2, r0, r1)
            }
            Op::Pop(_) | Op::Ret => self.record_consumer(instruction.addr, op, vm, r0, r1),
            _ => return,
        }
        if self.rows.len() >= self.limit {
            debug!("stack trace reached its {}-row limit", self.limit);
            self.enabled = false;
            self.tripped = true;
        }
    }

    fn record_producer(&mut self, ip: u16, op: &'static str, value: u16, r0: u16, r1: u16) {
        self.pending.push(self.rows.len());
        self.rows.push(StackRow {
            ip,
            op,
            pushed: Some(value),
            r0,
            r1,
            popped: None,
            linked_row: None,
        });
    }

    fn record_consumer(&mut self, ip: u16, op: &'static str, vm: &VM, r0: u16, r1: u16) {
        let popped = vm.stack.last().copied();
        let mut linked_row = None;
        if popped.is_some() {
            if let Some(producer) = self.pending.pop() {
                // both rows point at each other, 1-relative
                self.rows[producer].linked_row = Some(self.rows.len() + 1);
                linked_row = Some(producer + 1);
            }
        }
        self.rows.push(StackRow {
            ip,
            op,
            pushed: None,
            r0,
            r1,
            popped,
            linked_row,
        });
    }

    /// True once the row limit has been hit; reading the flag clears it
    pub fn take_trip(&mut self) -> bool {
        std::mem::take(&mut self.tripped)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.pending.clear();
        self.tripped = false;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[StackRow] {
        &self.rows
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        let mut file = File::create(path)
            .map_err(|e| format!("failed to create stack trace file {path:?}: {e}"))?;
        writeln!(file, "row,ip,op,pushed,r0,r1,popped,link")
            .map_err(|e| format!("failed to write {path:?}: {e}"))?;
        for (i, row) in self.rows.iter().enumerate() {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{}",
                i + 1,
                row.ip,
                row.op,
                optional(row.pushed),
                row.r0,
                row.r1,
                optional(row.popped),
                row.linked_row.map(|l| l.to_string()).unwrap_or_default()
            )
            .map_err(|e| format!("failed to write {path:?}: {e}"))?;
        }
        debug!("wrote {} stack trace rows to {:?}", self.rows.len(), path);
        Ok(())
    }
}

impl Default for StackTracer {
    fn default() -> Self {
        Self::new()
    }
}

fn optional(value: Option<u16>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
