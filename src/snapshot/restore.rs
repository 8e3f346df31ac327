//! Snapshot loading

use crate::snapshot::chunks::{ExecChunk, InptChunk, MemChunk, RegsChunk, StksChunk};
use crate::snapshot::iff::{IffFile, FORM_TYPE};
use crate::vm::VM;
use log::info;
use std::path::Path;

const REQUIRED_CHUNKS: [&[u8; 4]; 5] = [b"Exec", b"Regs", b"Stks", b"Mem ", b"Inpt"];

/// Loads and validates a snapshot file before applying it to a VM
#[derive(Debug)]
pub struct RestoreState {
    iff: IffFile,
}

impl RestoreState {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let iff = IffFile::read_from_file(path)?;

        if iff.form_type != FORM_TYPE {
            return Err(format!(
                "not a machine snapshot (found form type {:?})",
                std::str::from_utf8(&iff.form_type).unwrap_or("<invalid>")
            ));
        }

        for required in REQUIRED_CHUNKS {
            if iff.find_chunk(required).is_none() {
                return Err(format!(
                    "snapshot is missing its {} chunk",
                    String::from_utf8_lossy(required).trim_end()
                ));
            }
        }

        Ok(RestoreState { iff })
    }

    /// Replace the VM's observable state with the snapshot's.
    ///
    /// The chunks are all parsed before anything is assigned, so a corrupt
    /// snapshot leaves the machine untouched.
    pub fn restore_to_vm(&self, vm: &mut VM) -> Result<(), String> {
        let exec = ExecChunk::from_bytes(&self.chunk_data(b"Exec"))?;
        let regs = RegsChunk::from_bytes(&self.chunk_data(b"Regs"))?;
        let stks = StksChunk::from_bytes(&self.chunk_data(b"Stks"))?;
        let mem = MemChunk::from_bytes(&self.chunk_data(b"Mem "))?;
        let inpt = InptChunk::from_bytes(&self.chunk_data(b"Inpt"));

        vm.ip = exec.ip;
        vm.halted = exec.halted;
        vm.registers = regs.registers;
        vm.stack = stks.values;
        vm.memory = mem.words;
        vm.input = inpt.bytes.into_iter().collect();

        info!("snapshot restored, ip {} with {} stacked values", vm.ip, vm.stack.len());
        Ok(())
    }

    fn chunk_data(&self, chunk_type: &[u8; 4]) -> Vec<u8> {
        // presence was validated in from_file
        self.iff
            .find_chunk(chunk_type)
            .map(|c| c.data.clone())
            .unwrap_or_default()
    }
}
