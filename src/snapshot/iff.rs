//! IFF-style chunked container for machine snapshots

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Form type identifying our snapshot files
pub const FORM_TYPE: [u8; 4] = *b"SYVM";

/// Chunked snapshot file
#[derive(Debug)]
pub struct IffFile {
    pub form_type: [u8; 4],
    /// List of chunks in the file
    pub chunks: Vec<IffChunk>,
}

/// Individual chunk in a snapshot file
#[derive(Debug)]
pub struct IffChunk {
    /// 4-character chunk type identifier
    pub chunk_type: [u8; 4],
    /// Chunk data
    pub data: Vec<u8>,
}

impl IffFile {
    pub fn new() -> Self {
        IffFile {
            form_type: FORM_TYPE,
            chunks: Vec::new(),
        }
    }

    /// Add a chunk to the file
    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.push(IffChunk { chunk_type, data });
    }

    /// Write the file to disk
    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        let mut file =
            File::create(path).map_err(|e| format!("failed to create snapshot file: {e}"))?;

        // total size: form type plus every chunk's header and padded data
        let total_size = 4 + self
            .chunks
            .iter()
            .map(|c| 8 + c.data.len() + c.data.len() % 2)
            .sum::<usize>();

        file.write_all(b"FORM")
            .map_err(|e| format!("failed to write FORM header: {e}"))?;
        file.write_all(&(total_size as u32).to_be_bytes())
            .map_err(|e| format!("failed to write size: {e}"))?;
        file.write_all(&self.form_type)
            .map_err(|e| format!("failed to write form type: {e}"))?;

        for chunk in &self.chunks {
            file.write_all(&chunk.chunk_type)
                .map_err(|e| format!("failed to write chunk type: {e}"))?;
            file.write_all(&(chunk.data.len() as u32).to_be_bytes())
                .map_err(|e| format!("failed to write chunk size: {e}"))?;
            file.write_all(&chunk.data)
                .map_err(|e| format!("failed to write chunk data: {e}"))?;

            // pad to even length
            if chunk.data.len() % 2 == 1 {
                file.write_all(&[0])
                    .map_err(|e| format!("failed to write padding: {e}"))?;
            }
        }

        Ok(())
    }

    /// Read a snapshot file from disk
    pub fn read_from_file(path: &Path) -> Result<Self, String> {
        let mut file =
            File::open(path).map_err(|e| format!("failed to open snapshot file: {e}"))?;

        let mut header = [0u8; 4];
        file.read_exact(&mut header)
            .map_err(|e| format!("failed to read FORM header: {e}"))?;
        if &header != b"FORM" {
            return Err("not a snapshot file (missing FORM header)".to_string());
        }

        let mut size_bytes = [0u8; 4];
        file.read_exact(&mut size_bytes)
            .map_err(|e| format!("failed to read size: {e}"))?;
        let _total_size = u32::from_be_bytes(size_bytes);

        let mut form_type = [0u8; 4];
        file.read_exact(&mut form_type)
            .map_err(|e| format!("failed to read form type: {e}"))?;

        let mut iff = IffFile {
            form_type,
            chunks: Vec::new(),
        };

        loop {
            let mut chunk_type = [0u8; 4];
            if file.read_exact(&mut chunk_type).is_err() {
                break; // end of file
            }

            let mut size_bytes = [0u8; 4];
            file.read_exact(&mut size_bytes)
                .map_err(|e| format!("failed to read chunk size: {e}"))?;
            let chunk_size = u32::from_be_bytes(size_bytes) as usize;

            let mut data = vec![0u8; chunk_size];
            file.read_exact(&mut data)
                .map_err(|e| format!("failed to read chunk data: {e}"))?;

            iff.chunks.push(IffChunk { chunk_type, data });

            // skip padding byte if chunk size is odd
            if chunk_size % 2 == 1 {
                let mut padding = [0u8; 1];
                file.read_exact(&mut padding).ok();
            }
        }

        Ok(iff)
    }

    /// Find a chunk by type
    pub fn find_chunk(&self, chunk_type: &[u8; 4]) -> Option<&IffChunk> {
        self.chunks.iter().find(|c| &c.chunk_type == chunk_type)
    }
}

impl Default for IffFile {
    fn default() -> Self {
        Self::new()
    }
}
