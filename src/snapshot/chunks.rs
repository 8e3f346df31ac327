//! Snapshot chunk definitions
//!
//! Five chunks together carry the complete observable machine state:
//! `Exec` (ip and halted flag), `Regs`, `Stks`, `Mem `, and `Inpt`. All
//! multi-byte payloads are big-endian, independent of the little-endian
//! challenge binary on disk.

use crate::vm::{MEMORY_SIZE, NUM_REGISTERS, VM};

/// Exec chunk - instruction pointer and halted flag
pub struct ExecChunk {
    pub ip: u16,
    pub halted: bool,
}

impl ExecChunk {
    pub fn from_vm(vm: &VM) -> Self {
        ExecChunk {
            ip: vm.ip,
            halted: vm.halted,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        bytes.extend_from_slice(&self.ip.to_be_bytes());
        bytes.push(self.halted as u8);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() != 3 {
            return Err(format!("Exec chunk is {} bytes, expected 3", data.len()));
        }
        Ok(ExecChunk {
            ip: u16::from_be_bytes([data[0], data[1]]),
            halted: data[2] != 0,
        })
    }
}

/// Regs chunk - the eight-cell register file
pub struct RegsChunk {
    pub registers: [u16; NUM_REGISTERS],
}

impl RegsChunk {
    pub fn from_vm(vm: &VM) -> Self {
        RegsChunk {
            registers: vm.registers,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NUM_REGISTERS * 2);
        for r in &self.registers {
            bytes.extend_from_slice(&r.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() != NUM_REGISTERS * 2 {
            return Err(format!(
                "Regs chunk is {} bytes, expected {}",
                data.len(),
                NUM_REGISTERS * 2
            ));
        }
        let mut registers = [0u16; NUM_REGISTERS];
        for (i, pair) in data.chunks_exact(2).enumerate() {
            registers[i] = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Ok(RegsChunk { registers })
    }
}

/// Stks chunk - stack values, bottom to top
pub struct StksChunk {
    pub values: Vec<u16>,
}

impl StksChunk {
    pub fn from_vm(vm: &VM) -> Self {
        StksChunk {
            values: vm.stack.clone(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * 2);
        for v in &self.values {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() % 2 != 0 {
            return Err(format!("Stks chunk has an odd byte count ({})", data.len()));
        }
        let values = data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(StksChunk { values })
    }
}

/// Mem chunk - the full 32,768-cell memory image
pub struct MemChunk {
    pub words: Vec<u16>,
}

impl MemChunk {
    pub fn from_vm(vm: &VM) -> Self {
        MemChunk {
            words: vm.memory.clone(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 2);
        for w in &self.words {
            bytes.extend_from_slice(&w.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() != MEMORY_SIZE * 2 {
            return Err(format!(
                "Mem chunk is {} bytes, expected {}",
                data.len(),
                MEMORY_SIZE * 2
            ));
        }
        let words = data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(MemChunk { words })
    }
}

/// Inpt chunk - pending input bytes in FIFO order
///
/// Included so a snapshot taken mid-command replays exactly; dropping it
/// would make restore observably diverge.
pub struct InptChunk {
    pub bytes: Vec<u8>,
}

impl InptChunk {
    pub fn from_vm(vm: &VM) -> Self {
        InptChunk {
            bytes: vm.input.iter().copied().collect(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        InptChunk {
            bytes: data.to_vec(),
        }
    }
}
