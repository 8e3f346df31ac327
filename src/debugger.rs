use crate::disassembler::Disassembler;
use crate::instruction::{Instruction, Op, Register};
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::tracer::{ExecutionTracer, StackTracer};
use crate::vm::{MEMORY_SIZE, NUM_REGISTERS, VALUE_MASK};
use indexmap::IndexSet;
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Why the pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The next instruction is an `in` and the input buffer is empty
    NeedsInput,
    /// The machine halted
    Halted,
    /// Execution reached a breakpoint (checked before the instruction runs)
    Breakpoint(u16),
    /// The stack tracer filled its buffer and handed control over
    TraceLimit,
}

/// Owns the interpreter plus everything introspective: breakpoints,
/// tracers, and the interactive debug-mode command loop.
pub struct Debugger {
    pub interpreter: Interpreter,
    /// Breakpoint addresses; constant-time membership, stable listing order
    breakpoints: IndexSet<u16>,
    pub trace: ExecutionTracer,
    pub stack_trace: StackTracer,
    /// Skip the first breakpoint check after resuming, so a pause can be
    /// continued without immediately re-triggering
    resume_skip: bool,
}

impl Debugger {
    pub fn new(interpreter: Interpreter) -> Self {
        Debugger {
            interpreter,
            breakpoints: IndexSet::new(),
            trace: ExecutionTracer::new(),
            stack_trace: StackTracer::new(),
            resume_skip: false,
        }
    }

    /// Pump the machine until it halts, blocks on input, hits a
    /// breakpoint, or the stack tracer trips. Returns the output values
    /// accumulated before the pause.
    pub fn run_until_pause(&mut self) -> Result<(Vec<u16>, PauseReason), String> {
        let mut output = Vec::new();
        let mut skip_breakpoint = std::mem::take(&mut self.resume_skip);

        loop {
            if self.interpreter.vm.halted {
                return Ok((output, PauseReason::Halted));
            }
            let ip = self.interpreter.vm.ip;

            if !skip_breakpoint && self.breakpoints.contains(&ip) {
                info!("breakpoint hit at {ip}");
                self.resume_skip = true;
                return Ok((output, PauseReason::Breakpoint(ip)));
            }

            let instruction = Instruction::decode(&self.interpreter.vm.memory, ip)?;

            if matches!(instruction.op, Op::In(_)) && self.interpreter.vm.input.is_empty() {
                // no progress was made; keep any pending breakpoint skip
                self.resume_skip = skip_breakpoint;
                return Ok((output, PauseReason::NeedsInput));
            }

            // stack tracer first: when it trips, the instruction has not
            // executed yet and the execution tracer has not logged it, so
            // resuming records and runs it exactly once
            self.stack_trace.record(&self.interpreter.vm, &instruction);
            if self.stack_trace.take_trip() {
                self.resume_skip = skip_breakpoint;
                return Ok((output, PauseReason::TraceLimit));
            }
            self.trace.record(&self.interpreter.vm, &instruction);

            match self.interpreter.execute(&instruction)? {
                ExecutionResult::Continue => {}
                ExecutionResult::Output(value) => output.push(value),
                ExecutionResult::NeedsInput => {
                    self.resume_skip = skip_breakpoint;
                    return Ok((output, PauseReason::NeedsInput));
                }
                ExecutionResult::Halted => return Ok((output, PauseReason::Halted)),
            }
            skip_breakpoint = false;
        }
    }

    pub fn add_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.insert(addr)
    }

    pub fn remove_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.shift_remove(&addr)
    }

    pub fn breakpoints(&self) -> &IndexSet<u16> {
        &self.breakpoints
    }

    /// Interactive debug mode: read command lines until `go` (or EOF)
    pub fn debug_session(&mut self, input: &mut dyn BufRead) -> Result<(), String> {
        let ip = self.interpreter.vm.ip;
        let next = Disassembler::new(&self.interpreter.vm.memory)
            .disassemble_at(ip)
            .map(|(_, line)| line)
            .unwrap_or_else(|e| format!("{ip:04}: <undecodable: {e}>"));
        println!("next instruction is");
        println!("  {next}");
        println!("type 'go' to resume");

        loop {
            print!("(debug) ");
            io::stdout().flush().ok();

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => return Err(format!("failed to read debugger command: {e}")),
            }
            match self.handle_command(line.trim()) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => println!("{e}"),
            }
        }
        Ok(())
    }

    /// Execute one debug-mode command. Returns true when execution should
    /// resume. Malformed commands return an error string and change
    /// nothing.
    pub fn handle_command(&mut self, line: &str) -> Result<bool, String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            return Ok(false);
        };

        match command {
            "go" => return Ok(true),
            "b" => match tokens.get(1) {
                Some(token) => {
                    let addr = parse_address(token)?;
                    if self.add_breakpoint(addr) {
                        println!("breakpoint set at {addr:04}");
                    } else {
                        println!("breakpoint already set at {addr:04}");
                    }
                }
                None => {
                    if self.breakpoints.is_empty() {
                        println!("no breakpoints set");
                    } else {
                        println!("breakpoints:");
                        for addr in &self.breakpoints {
                            println!("  {addr:04}");
                        }
                    }
                }
            },
            "B" => match tokens.get(1) {
                Some(token) => {
                    let addr = parse_address(token)?;
                    if self.remove_breakpoint(addr) {
                        println!("breakpoint cleared at {addr:04}");
                    } else {
                        println!("no breakpoint at {addr:04}");
                    }
                }
                None => {
                    let list: Vec<String> =
                        self.breakpoints.iter().map(|a| format!("{a:04}")).collect();
                    println!("{}", if list.is_empty() { "-".to_string() } else { list.join(" ") });
                }
            },
            "ip" => match tokens.get(1) {
                Some(token) => {
                    let addr = parse_address(token)?;
                    self.interpreter.vm.ip = addr;
                    println!("ip = {addr}");
                }
                None => println!("ip = {}", self.interpreter.vm.ip),
            },
            "trace" => self.handle_trace_command(&tokens)?,
            "stack" => self.handle_stack_command(&tokens)?,
            "disassemble" => self.handle_disassemble_command(&tokens)?,
            _ => {
                if let Some(register) = parse_register(command) {
                    match tokens.get(1) {
                        Some(token) => {
                            let value = parse_register_value(token)?;
                            self.interpreter.vm.set_register(register, value);
                            println!("{register} = {value}");
                        }
                        None => {
                            println!("{register} = {}", self.interpreter.vm.register(register))
                        }
                    }
                } else if let Ok(addr) = parse_address(command) {
                    match tokens.get(1) {
                        Some(token) => {
                            let value: u16 = token
                                .parse()
                                .map_err(|_| format!("'{token}' is not a 16-bit value"))?;
                            self.interpreter.vm.write_memory(addr, value);
                            println!("mem[{addr}] = {value}");
                        }
                        None => {
                            println!("mem[{addr}] = {}", self.interpreter.vm.read_memory(addr))
                        }
                    }
                } else {
                    return Err(format!(
                        "unrecognised command '{command}' (b, B, ip, rN, <addr>, trace, stack, disassemble, go)"
                    ));
                }
            }
        }
        Ok(false)
    }

    fn handle_trace_command(&mut self, tokens: &[&str]) -> Result<(), String> {
        match tokens.get(1) {
            None => println!(
                "execution trace is {} ({} lines buffered)",
                if self.trace.enabled { "on" } else { "off" },
                self.trace.len()
            ),
            Some(&"on") => {
                self.trace.enabled = true;
                println!("execution trace on");
            }
            Some(&"off") => {
                self.trace.enabled = false;
                println!("execution trace off");
            }
            Some(&"clear") => {
                self.trace.clear();
                println!("execution trace cleared");
            }
            Some(name) => {
                let filename = format!("{name}.trace");
                self.trace.write_to_file(Path::new(&filename))?;
                println!("wrote {} lines to {filename}", self.trace.len());
            }
        }
        Ok(())
    }

    fn handle_stack_command(&mut self, tokens: &[&str]) -> Result<(), String> {
        match tokens.get(1) {
            None => println!(
                "stack trace is {} ({} rows buffered, limit {})",
                if self.stack_trace.enabled { "on" } else { "off" },
                self.stack_trace.len(),
                self.stack_trace.limit
            ),
            Some(&"on") => {
                if let Some(token) = tokens.get(2) {
                    self.stack_trace.limit = token
                        .parse()
                        .map_err(|_| format!("'{token}' is not a row limit"))?;
                }
                self.stack_trace.enabled = true;
                println!(
                    "stack trace on (limit {} rows)",
                    self.stack_trace.limit
                );
            }
            Some(&"off") => {
                self.stack_trace.enabled = false;
                println!("stack trace off");
            }
            Some(&"clear") => {
                self.stack_trace.clear();
                println!("stack trace cleared");
            }
            Some(name) => {
                let filename = format!("{name}.csv");
                self.stack_trace.write_to_file(Path::new(&filename))?;
                println!("wrote {} rows to {filename}", self.stack_trace.len());
            }
        }
        Ok(())
    }

    fn handle_disassemble_command(&mut self, tokens: &[&str]) -> Result<(), String> {
        let start = match tokens.get(1) {
            Some(token) => parse_address(token)?,
            None => 0,
        };
        let name = tokens.get(2).copied().unwrap_or("challenge");
        let filename = format!("{name}.asm");

        let listing = Disassembler::new(&self.interpreter.vm.memory).disassemble_reachable(start);
        let line_count = listing.lines().count();
        std::fs::write(&filename, listing)
            .map_err(|e| format!("failed to write {filename}: {e}"))?;
        debug!("disassembled from {start} into {filename}");
        println!("wrote {line_count} lines to {filename}");
        Ok(())
    }
}

fn parse_address(token: &str) -> Result<u16, String> {
    let value: u32 = token
        .parse()
        .map_err(|_| format!("'{token}' is not a number"))?;
    if (value as usize) < MEMORY_SIZE {
        Ok(value as u16)
    } else {
        Err(format!("address {value} out of range (0..{})", MEMORY_SIZE - 1))
    }
}

fn parse_register_value(token: &str) -> Result<u16, String> {
    let value: u32 = token
        .parse()
        .map_err(|_| format!("'{token}' is not a number"))?;
    if value <= VALUE_MASK as u32 {
        Ok(value as u16)
    } else {
        Err(format!("register values must be 0..=32767, got {value}"))
    }
}

fn parse_register(token: &str) -> Option<Register> {
    let index: u8 = token.strip_prefix('r')?.parse().ok()?;
    if (index as usize) < NUM_REGISTERS {
        Some(Register(index))
    } else {
        None
    }
}
