use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

pub const OP_HALT: u16 = 0;
pub const OP_SET: u16 = 1;
pub const OP_PUSH: u16 = 2;
pub const OP_POP: u16 = 3;
pub const OP_EQ: u16 = 4;
pub const OP_GT: u16 = 5;
pub const OP_JMP: u16 = 6;
pub const OP_JT: u16 = 7;
pub const OP_JF: u16 = 8;
pub const OP_ADD: u16 = 9;
pub const OP_MULT: u16 = 10;
pub const OP_MOD: u16 = 11;
pub const OP_AND: u16 = 12;
pub const OP_OR: u16 = 13;
pub const OP_NOT: u16 = 14;
pub const OP_RMEM: u16 = 15;
pub const OP_WMEM: u16 = 16;
pub const OP_CALL: u16 = 17;
pub const OP_RET: u16 = 18;
pub const OP_OUT: u16 = 19;
pub const OP_IN: u16 = 20;
pub const OP_NOOP: u16 = 21;

/// First instruction word that names a register instead of a literal
pub const REGISTER_BASE: u16 = 32768;
/// Last instruction word that is valid as an operand
pub const OPERAND_LIMIT: u16 = 32775;

/// Index into the register file, 0..=7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(pub u8);

impl Register {
    /// Decode a store operand. Only the register range is valid here;
    /// a literal store target is an encoding error.
    pub fn decode_store(word: u16, addr: u16, index: usize) -> Result<Register, String> {
        match Operand::decode(word, addr, index)? {
            Operand::Register(r) => Ok(r),
            Operand::Literal(v) => Err(format!(
                "store target must be a register, found literal {v} (operand {index} of instruction at {addr})"
            )),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A value operand: a 15-bit literal or a register reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(u16),
    Register(Register),
}

impl Operand {
    pub fn decode(word: u16, addr: u16, index: usize) -> Result<Operand, String> {
        match word {
            0..=32767 => Ok(Operand::Literal(word)),
            REGISTER_BASE..=OPERAND_LIMIT => {
                Ok(Operand::Register(Register((word - REGISTER_BASE) as u8)))
            }
            _ => Err(format!(
                "invalid operand {word} (operand {index} of instruction at {addr})"
            )),
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Register(r) => write!(f, "{r}"),
        }
    }
}

/// The architecture's 22 opcodes, decoded with their operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Halt,
    Set(Register, Operand),
    Push(Operand),
    Pop(Register),
    Eq(Register, Operand, Operand),
    Gt(Register, Operand, Operand),
    Jmp(Operand),
    Jt(Operand, Operand),
    Jf(Operand, Operand),
    Add(Register, Operand, Operand),
    Mult(Register, Operand, Operand),
    Mod(Register, Operand, Operand),
    And(Register, Operand, Operand),
    Or(Register, Operand, Operand),
    Not(Register, Operand),
    Rmem(Register, Operand),
    Wmem(Operand, Operand),
    Call(Operand),
    Ret,
    Out(Operand),
    In(Register),
    Noop,
}

impl Op {
    /// Number of operand words following the opcode word
    pub fn arity(&self) -> u16 {
        match self {
            Op::Halt | Op::Ret | Op::Noop => 0,
            Op::Push(_) | Op::Pop(_) | Op::Jmp(_) | Op::Call(_) | Op::Out(_) | Op::In(_) => 1,
            Op::Set(..) | Op::Jt(..) | Op::Jf(..) | Op::Not(..) | Op::Rmem(..) | Op::Wmem(..) => 2,
            Op::Eq(..)
            | Op::Gt(..)
            | Op::Add(..)
            | Op::Mult(..)
            | Op::Mod(..)
            | Op::And(..)
            | Op::Or(..) => 3,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Halt => "halt",
            Op::Set(..) => "set",
            Op::Push(_) => "push",
            Op::Pop(_) => "pop",
            Op::Eq(..) => "eq",
            Op::Gt(..) => "gt",
            Op::Jmp(_) => "jmp",
            Op::Jt(..) => "jt",
            Op::Jf(..) => "jf",
            Op::Add(..) => "add",
            Op::Mult(..) => "mult",
            Op::Mod(..) => "mod",
            Op::And(..) => "and",
            Op::Or(..) => "or",
            Op::Not(..) => "not",
            Op::Rmem(..) => "rmem",
            Op::Wmem(..) => "wmem",
            Op::Call(_) => "call",
            Op::Ret => "ret",
            Op::Out(_) => "out",
            Op::In(_) => "in",
            Op::Noop => "noop",
        }
    }
}

/// A decoded instruction together with its address and total word length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub addr: u16,
    pub length: u16,
}

impl Instruction {
    pub fn decode(memory: &[u16], addr: u16) -> Result<Instruction, String> {
        let opcode = fetch(memory, addr, 0)?;

        let value = |index: usize| -> Result<Operand, String> {
            Operand::decode(fetch(memory, addr, index)?, addr, index)
        };
        let store = |index: usize| -> Result<Register, String> {
            Register::decode_store(fetch(memory, addr, index)?, addr, index)
        };

        let op = match opcode {
            OP_HALT => Op::Halt,
            OP_SET => Op::Set(store(1)?, value(2)?),
            OP_PUSH => Op::Push(value(1)?),
            OP_POP => Op::Pop(store(1)?),
            OP_EQ => Op::Eq(store(1)?, value(2)?, value(3)?),
            OP_GT => Op::Gt(store(1)?, value(2)?, value(3)?),
            OP_JMP => Op::Jmp(value(1)?),
            OP_JT => Op::Jt(value(1)?, value(2)?),
            OP_JF => Op::Jf(value(1)?, value(2)?),
            OP_ADD => Op::Add(store(1)?, value(2)?, value(3)?),
            OP_MULT => Op::Mult(store(1)?, value(2)?, value(3)?),
            OP_MOD => Op::Mod(store(1)?, value(2)?, value(3)?),
            OP_AND => Op::And(store(1)?, value(2)?, value(3)?),
            OP_OR => Op::Or(store(1)?, value(2)?, value(3)?),
            OP_NOT => Op::Not(store(1)?, value(2)?),
            OP_RMEM => Op::Rmem(store(1)?, value(2)?),
            OP_WMEM => Op::Wmem(value(1)?, value(2)?),
            OP_CALL => Op::Call(value(1)?),
            OP_RET => Op::Ret,
            OP_OUT => Op::Out(value(1)?),
            OP_IN => Op::In(store(1)?),
            OP_NOOP => Op::Noop,
            other => return Err(format!("invalid opcode {other} at address {addr}")),
        };

        Ok(Instruction {
            op,
            addr,
            length: 1 + op.arity(),
        })
    }
}

fn fetch(memory: &[u16], addr: u16, offset: usize) -> Result<u16, String> {
    memory
        .get(addr as usize + offset)
        .copied()
        .ok_or_else(|| format!("instruction at {addr} runs past the end of memory"))
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.op {
            Op::Halt => write!(f, "halt"),
            Op::Set(a, b) => write!(f, "set {a}, {b}"),
            Op::Push(b) => write!(f, "push {b}"),
            Op::Pop(a) => write!(f, "pop {a}"),
            Op::Eq(a, b, c) => write!(f, "eq {a}, {b}, {c}"),
            Op::Gt(a, b, c) => write!(f, "gt {a}, {b}, {c}"),
            Op::Jmp(b) => write!(f, "jmp {b}"),
            Op::Jt(b, c) => write!(f, "jt {b}, {c}"),
            Op::Jf(b, c) => write!(f, "jf {b}, {c}"),
            Op::Add(a, b, c) => write!(f, "add {a}, {b}, {c}"),
            Op::Mult(a, b, c) => write!(f, "mult {a}, {b}, {c}"),
            Op::Mod(a, b, c) => write!(f, "mod {a}, {b}, {c}"),
            Op::And(a, b, c) => write!(f, "and {a}, {b}, {c}"),
            Op::Or(a, b, c) => write!(f, "or {a}, {b}, {c}"),
            Op::Not(a, b) => write!(f, "not {a}, {b}"),
            Op::Rmem(a, b) => write!(f, "rmem {a}, {b}"),
            Op::Wmem(a, b) => write!(f, "wmem {a}, {b}"),
            Op::Call(b) => write!(f, "call {b}"),
            Op::Ret => write!(f, "ret"),
            Op::Out(b) => write!(f, "out {b}"),
            Op::In(a) => write!(f, "in {a}"),
            Op::Noop => write!(f, "noop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_arithmetic() {
        let memory = vec![OP_ADD, 32768, 32769, 4];
        let instruction = Instruction::decode(&memory, 0).unwrap();
        assert_eq!(
            instruction.op,
            Op::Add(
                Register(0),
                Operand::Register(Register(1)),
                Operand::Literal(4)
            )
        );
        assert_eq!(instruction.length, 4);
        assert_eq!(instruction.to_string(), "add r0, r1, 4");
    }

    #[test]
    fn test_decode_zero_operand() {
        let memory = vec![OP_RET];
        let instruction = Instruction::decode(&memory, 0).unwrap();
        assert_eq!(instruction.op, Op::Ret);
        assert_eq!(instruction.length, 1);
    }

    #[test]
    fn test_invalid_opcode_reports_address() {
        let memory = vec![OP_NOOP, 99];
        let err = Instruction::decode(&memory, 1).unwrap_err();
        assert!(err.contains("invalid opcode 99"));
        assert!(err.contains("address 1"));
    }

    #[test]
    fn test_invalid_operand_reports_index() {
        // operand 2 of a set is out of the encodable range
        let memory = vec![OP_SET, 32768, 40000];
        let err = Instruction::decode(&memory, 0).unwrap_err();
        assert!(err.contains("invalid operand 40000"));
        assert!(err.contains("operand 2"));
    }

    #[test]
    fn test_literal_store_target_rejected() {
        let memory = vec![OP_SET, 5, 10];
        let err = Instruction::decode(&memory, 0).unwrap_err();
        assert!(err.contains("store target must be a register"));
    }

    #[test]
    fn test_truncated_instruction() {
        let memory = vec![OP_ADD, 32768];
        let err = Instruction::decode(&memory, 0).unwrap_err();
        assert!(err.contains("runs past the end of memory"));
    }

    #[test]
    fn test_operand_classification() {
        assert_eq!(
            Operand::decode(32767, 0, 1).unwrap(),
            Operand::Literal(32767)
        );
        assert_eq!(
            Operand::decode(32775, 0, 1).unwrap(),
            Operand::Register(Register(7))
        );
        assert!(Operand::decode(32776, 0, 1).is_err());
    }
}
