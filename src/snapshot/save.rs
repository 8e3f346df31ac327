//! Snapshot writing

use crate::snapshot::chunks::{ExecChunk, InptChunk, MemChunk, RegsChunk, StksChunk};
use crate::snapshot::iff::IffFile;
use crate::vm::VM;
use log::info;
use std::path::Path;

/// Captures the complete machine state for writing to disk
pub struct SaveState {
    iff: IffFile,
}

impl SaveState {
    /// Snapshot the machine. The copy is deep: nothing in the snapshot
    /// aliases the live VM.
    pub fn from_vm(vm: &VM) -> Self {
        let mut iff = IffFile::new();
        iff.add_chunk(*b"Exec", ExecChunk::from_vm(vm).to_bytes());
        iff.add_chunk(*b"Regs", RegsChunk::from_vm(vm).to_bytes());
        iff.add_chunk(*b"Stks", StksChunk::from_vm(vm).to_bytes());
        iff.add_chunk(*b"Mem ", MemChunk::from_vm(vm).to_bytes());
        iff.add_chunk(*b"Inpt", InptChunk::from_vm(vm).to_bytes());
        SaveState { iff }
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        self.iff.write_to_file(path)?;
        info!("snapshot written to {:?}", path);
        Ok(())
    }
}
