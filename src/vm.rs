use crate::instruction::{Operand, Register};
use log::{debug, error};
use std::collections::VecDeque;
use std::fmt;

/// Number of 16-bit cells in the address space
pub const MEMORY_SIZE: usize = 32768;

/// Number of cells in the register file
pub const NUM_REGISTERS: usize = 8;

/// All register and arithmetic values live in 0..=VALUE_MASK
pub const VALUE_MASK: u16 = 32767;

/// The architecture's virtual machine state
pub struct VM {
    /// 32,768 cells; operand encodings may legally sit in cells
    pub memory: Vec<u16>,
    /// Register file, every cell in 0..=32767
    pub registers: [u16; NUM_REGISTERS],
    /// Unbounded value stack
    pub stack: Vec<u16>,
    /// Instruction pointer
    pub ip: u16,
    /// Once set, stepping is a no-op
    pub halted: bool,
    /// Bytes waiting to be consumed by `in`
    pub input: VecDeque<u8>,
    /// The loaded binary image, kept pristine for `restart`
    original_image: Vec<u16>,
}

impl VM {
    /// Build a VM from the challenge binary: a stream of little-endian
    /// 16-bit words loaded at address 0, trailing cells zero.
    pub fn from_binary(bytes: &[u8]) -> Result<VM, String> {
        if bytes.len() % 2 != 0 {
            return Err(format!(
                "binary has an odd byte count ({}), expected little-endian 16-bit words",
                bytes.len()
            ));
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        if words.len() > MEMORY_SIZE {
            return Err(format!(
                "binary is {} words, larger than the {MEMORY_SIZE}-cell address space",
                words.len()
            ));
        }
        let mut memory = vec![0u16; MEMORY_SIZE];
        memory[..words.len()].copy_from_slice(&words);
        debug!("loaded {} words into memory", words.len());

        Ok(VM {
            original_image: memory.clone(),
            memory,
            registers: [0; NUM_REGISTERS],
            stack: Vec::new(),
            ip: 0,
            halted: false,
            input: VecDeque::new(),
        })
    }

    /// Build a VM directly from words, mostly for tests and tools
    pub fn from_words(words: &[u16]) -> Result<VM, String> {
        let mut bytes = Vec::with_capacity(words.len() * 2);
        for w in words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        VM::from_binary(&bytes)
    }

    /// Return the VM to its just-loaded state
    pub fn reset(&mut self) {
        self.memory.copy_from_slice(&self.original_image);
        self.registers = [0; NUM_REGISTERS];
        self.stack.clear();
        self.ip = 0;
        self.halted = false;
        self.input.clear();
        debug!("machine reset to the loaded image");
    }

    pub fn register(&self, r: Register) -> u16 {
        self.registers[r.0 as usize]
    }

    /// Store into a register, keeping the 15-bit invariant
    pub fn set_register(&mut self, r: Register, value: u16) {
        self.registers[r.0 as usize] = value & VALUE_MASK;
    }

    /// Resolve a value operand: literals stand for themselves,
    /// register operands for the register's content
    pub fn resolve(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Literal(v) => v,
            Operand::Register(r) => self.register(r),
        }
    }

    pub fn read_memory(&self, addr: u16) -> u16 {
        self.memory[addr as usize]
    }

    pub fn write_memory(&mut self, addr: u16, value: u16) {
        self.memory[addr as usize] = value;
    }

    pub fn push(&mut self, value: u16) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<u16, String> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => {
                error!(
                    "stack underflow at ip {} (stack depth 0, {} input bytes pending)",
                    self.ip,
                    self.input.len()
                );
                Err(format!("pop from empty stack at address {}", self.ip))
            }
        }
    }

    /// Queue a line of user input, with the trailing newline the
    /// running program expects
    pub fn queue_line(&mut self, line: &str) {
        self.input.extend(line.bytes());
        self.input.push_back(b'\n');
    }
}

impl fmt::Display for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VM state:")?;
        writeln!(f, "  ip: {}", self.ip)?;
        writeln!(f, "  halted: {}", self.halted)?;
        for (i, value) in self.registers.iter().enumerate() {
            writeln!(f, "  r{i}: {value}")?;
        }
        writeln!(f, "  stack depth: {}", self.stack.len())?;
        if let Some(top) = self.stack.last() {
            writeln!(f, "  stack top: {top}")?;
        }
        writeln!(f, "  pending input: {} bytes", self.input.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_vm(words: &[u16]) -> VM {
        VM::from_words(words).unwrap()
    }

    #[test]
    fn test_load_little_endian() {
        let vm = VM::from_binary(&[0x01, 0x00, 0x00, 0x80]).unwrap();
        assert_eq!(vm.memory.len(), MEMORY_SIZE);
        assert_eq!(vm.memory[0], 1);
        assert_eq!(vm.memory[1], 32768);
        assert_eq!(vm.memory[2], 0);
    }

    #[test]
    fn test_load_rejects_odd_length() {
        assert!(VM::from_binary(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_load_rejects_oversized_binary() {
        let bytes = vec![0u8; (MEMORY_SIZE + 1) * 2];
        assert!(VM::from_binary(&bytes).is_err());
    }

    #[test]
    fn test_stack_operations() {
        let mut vm = create_test_vm(&[]);
        vm.push(0x1234);
        assert_eq!(vm.pop().unwrap(), 0x1234);
        assert!(vm.pop().is_err());
    }

    #[test]
    fn test_register_masking() {
        let mut vm = create_test_vm(&[]);
        vm.set_register(Register(3), 40000);
        assert!(vm.register(Register(3)) <= VALUE_MASK);
    }

    #[test]
    fn test_resolve_operands() {
        let mut vm = create_test_vm(&[]);
        vm.set_register(Register(2), 99);
        assert_eq!(vm.resolve(Operand::Literal(5)), 5);
        assert_eq!(vm.resolve(Operand::Register(Register(2))), 99);
    }

    #[test]
    fn test_reset_restores_loaded_image() {
        let mut vm = create_test_vm(&[21, 0]);
        vm.write_memory(0, 9);
        vm.set_register(Register(0), 7);
        vm.push(1);
        vm.queue_line("look");
        vm.ip = 100;
        vm.halted = true;

        vm.reset();
        assert_eq!(vm.memory[0], 21);
        assert_eq!(vm.registers, [0; NUM_REGISTERS]);
        assert!(vm.stack.is_empty());
        assert!(vm.input.is_empty());
        assert_eq!(vm.ip, 0);
        assert!(!vm.halted);
    }

    #[test]
    fn test_queue_line_appends_newline() {
        let mut vm = create_test_vm(&[]);
        vm.queue_line("go");
        assert_eq!(vm.input, VecDeque::from(vec![b'g', b'o', b'\n']));
    }
}
