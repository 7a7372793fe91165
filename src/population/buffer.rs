use crate::error::{KfResult, KnapForgeError};
use crate::storage::MappedArray;

/// A `rows x cols` genome matrix of 0/1 bytes, stored row-major.
///
/// Callers go through the shared read/write/flush contract and never need to
/// know which variant they hold.
#[derive(Debug)]
pub enum GenomeBuffer {
    InMemory {
        data: Vec<u8>,
        rows: usize,
        cols: usize,
    },
    Mapped(MappedArray),
}

impl GenomeBuffer {
    pub fn in_memory(rows: usize, cols: usize) -> Self {
        GenomeBuffer::InMemory {
            data: vec![0u8; rows * cols],
            rows,
            cols,
        }
    }

    pub fn mapped(array: MappedArray) -> Self {
        GenomeBuffer::Mapped(array)
    }

    pub fn rows(&self) -> usize {
        match self {
            GenomeBuffer::InMemory { rows, .. } => *rows,
            GenomeBuffer::Mapped(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            GenomeBuffer::InMemory { cols, .. } => *cols,
            GenomeBuffer::Mapped(m) => m.cols(),
        }
    }

    pub fn is_disk_backed(&self) -> bool {
        matches!(self, GenomeBuffer::Mapped(_))
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            GenomeBuffer::InMemory { data, .. } => data,
            GenomeBuffer::Mapped(m) => m.as_bytes(),
        }
    }

    pub fn as_mut_slice(&mut self) -> KfResult<&mut [u8]> {
        match self {
            GenomeBuffer::InMemory { data, .. } => Ok(data),
            GenomeBuffer::Mapped(m) => m.as_bytes_mut(),
        }
    }

    pub fn row(&self, idx: usize) -> &[u8] {
        let cols = self.cols();
        &self.as_slice()[idx * cols..(idx + 1) * cols]
    }

    /// Copies whole rows into the buffer starting at `start_row`.
    pub fn write_rows(&mut self, start_row: usize, data: &[u8]) -> KfResult<()> {
        let cols = self.cols();
        let rows = self.rows();
        if cols == 0 || data.len() % cols != 0 {
            return Err(KnapForgeError::Validation(format!(
                "Row data of {} bytes is not a multiple of genome length {}",
                data.len(),
                cols
            )));
        }
        let count = data.len() / cols;
        if start_row + count > rows {
            return Err(KnapForgeError::Validation(format!(
                "Writing rows {}..{} exceeds buffer of {} rows",
                start_row,
                start_row + count,
                rows
            )));
        }
        let offset = start_row * cols;
        self.as_mut_slice()?[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn flush(&self) -> KfResult<()> {
        match self {
            GenomeBuffer::InMemory { .. } => Ok(()),
            GenomeBuffer::Mapped(m) => m.flush(),
        }
    }

    /// Releases the buffer. Mapped files are flushed and unmapped.
    pub fn close(self) -> KfResult<()> {
        match self {
            GenomeBuffer::InMemory { .. } => Ok(()),
            GenomeBuffer::Mapped(m) => m.close(),
        }
    }

    pub fn count_non_binary(&self) -> usize {
        self.as_slice().iter().filter(|&&b| b > 1).count()
    }
}
