//! Raw 2D arrays persisted as a fixed-size `.dat` file plus a JSON sidecar.
//!
//! The sidecar's `filesize` must always equal the data file's length; any
//! disagreement is reported as [`KnapForgeError::Corrupted`] and never repaired.

use crate::error::{KfResult, KnapForgeError};
use memmap2::{Mmap, MmapMut, MmapOptions};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Uint8,
    Int32,
    Int64,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::Uint8 => 1,
            ElementType::Int32 => 4,
            ElementType::Int64 => 8,
        }
    }
}

/// Sidecar contents. Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    pub filename: PathBuf,
    pub data_type: ElementType,
    pub population_size: usize,
    pub genome_length: usize,
    pub filesize: u64,
}

impl ArrayDescriptor {
    pub fn new(filename: PathBuf, data_type: ElementType, rows: usize, cols: usize) -> Self {
        Self {
            filename,
            data_type,
            population_size: rows,
            genome_length: cols,
            filesize: byte_size(rows, cols, data_type),
        }
    }

    pub fn rows(&self) -> usize {
        self.population_size
    }

    pub fn cols(&self) -> usize {
        self.genome_length
    }
}

pub fn byte_size(rows: usize, cols: usize, elem: ElementType) -> u64 {
    (rows as u64)
        .saturating_mul(cols as u64)
        .saturating_mul(elem.size() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    /// Truncates the data file and zero-fills it to the declared size.
    CreateOverwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

enum Mapping {
    ReadOnly(Mmap),
    Writable(MmapMut),
}

/// A memory-mapped array file. The mapping is flushed when dropped.
pub struct MappedArray {
    descriptor: ArrayDescriptor,
    map: Mapping,
}

impl std::fmt::Debug for MappedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedArray")
            .field("descriptor", &self.descriptor)
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl MappedArray {
    pub fn descriptor(&self) -> &ArrayDescriptor {
        &self.descriptor
    }

    pub fn path(&self) -> &Path {
        &self.descriptor.filename
    }

    pub fn rows(&self) -> usize {
        self.descriptor.rows()
    }

    pub fn cols(&self) -> usize {
        self.descriptor.cols()
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.map, Mapping::Writable(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.map {
            Mapping::ReadOnly(m) => &m[..],
            Mapping::Writable(m) => &m[..],
        }
    }

    pub fn as_bytes_mut(&mut self) -> KfResult<&mut [u8]> {
        match &mut self.map {
            Mapping::Writable(m) => Ok(&mut m[..]),
            Mapping::ReadOnly(_) => Err(KnapForgeError::Validation(format!(
                "{} is mapped read-only",
                self.descriptor.filename.display()
            ))),
        }
    }

    pub fn flush(&self) -> KfResult<()> {
        if let Mapping::Writable(m) = &self.map {
            m.flush()?;
        }
        Ok(())
    }

    /// Flushes and unmaps. After this returns the file may be renamed or replaced.
    pub fn close(self) -> KfResult<()> {
        self.flush()
    }
}

impl Drop for MappedArray {
    fn drop(&mut self) {
        if let Mapping::Writable(m) = &self.map {
            if let Err(e) = m.flush() {
                warn!(
                    "Failed to flush {} on release: {}",
                    self.descriptor.filename.display(),
                    e
                );
            }
        }
    }
}

/// Creates, loads and atomically swaps named arrays inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayStore {
    dir: PathBuf,
}

impl ArrayStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.dat", name))
    }

    pub fn sidecar_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Allocates a zero-initialised data file of exactly `rows * cols * size`
    /// bytes and writes its sidecar.
    pub fn create_empty(
        &self,
        name: &str,
        rows: usize,
        cols: usize,
        elem: ElementType,
    ) -> KfResult<ArrayDescriptor> {
        if rows == 0 || cols == 0 {
            return Err(KnapForgeError::Validation(format!(
                "Cannot create empty array '{}' with shape ({}, {})",
                name, rows, cols
            )));
        }
        let descriptor = ArrayDescriptor::new(self.data_path(name), elem, rows, cols);
        let file = File::create(&descriptor.filename)?;
        file.set_len(descriptor.filesize)?;
        file.sync_all()?;
        self.write_descriptor(name, &descriptor)?;
        debug!(
            "Created array {} ({} x {}, {} bytes)",
            descriptor.filename.display(),
            rows,
            cols,
            descriptor.filesize
        );
        Ok(descriptor)
    }

    pub fn write_descriptor(&self, name: &str, descriptor: &ArrayDescriptor) -> KfResult<()> {
        let json = serde_json::to_string_pretty(descriptor)?;
        fs::write(self.sidecar_path(name), json)?;
        Ok(())
    }

    /// Reads and validates the sidecar and the data file it points at.
    pub fn read_descriptor(&self, name: &str) -> KfResult<ArrayDescriptor> {
        let sidecar = self.sidecar_path(name);
        let meta = match fs::metadata(&sidecar) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KnapForgeError::not_found(sidecar));
            }
            Err(e) => return Err(e.into()),
        };
        if meta.len() == 0 {
            return Err(KnapForgeError::corrupted(sidecar, "sidecar is empty"));
        }

        let content = fs::read_to_string(&sidecar)?;
        let descriptor: ArrayDescriptor = serde_json::from_str(&content).map_err(|e| {
            KnapForgeError::corrupted(&sidecar, format!("unparsable sidecar: {}", e))
        })?;

        let declared = byte_size(descriptor.rows(), descriptor.cols(), descriptor.data_type);
        if declared != descriptor.filesize {
            return Err(KnapForgeError::corrupted(
                &sidecar,
                format!(
                    "declared filesize {} does not match shape ({}, {}) of {} ({} bytes)",
                    descriptor.filesize,
                    descriptor.rows(),
                    descriptor.cols(),
                    descriptor.data_type,
                    declared
                ),
            ));
        }

        let actual = match fs::metadata(&descriptor.filename) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KnapForgeError::not_found(&descriptor.filename));
            }
            Err(e) => return Err(e.into()),
        };
        if actual != descriptor.filesize {
            return Err(KnapForgeError::corrupted(
                &descriptor.filename,
                format!("expected {} bytes, found {}", descriptor.filesize, actual),
            ));
        }
        Ok(descriptor)
    }

    pub fn load(&self, name: &str, mode: OpenMode) -> KfResult<(MappedArray, ArrayDescriptor)> {
        let descriptor = self.read_descriptor(name)?;
        if descriptor.filesize == 0 {
            return Err(KnapForgeError::corrupted(
                &descriptor.filename,
                "cannot map a zero-length array",
            ));
        }
        let path = &descriptor.filename;

        // SAFETY: the mapped files live in the experiment's private temp
        // directory and are only touched through the owning MappedArray.
        // Every mapping is dropped before its path is renamed or replaced.
        let map = match mode {
            OpenMode::ReadOnly => {
                let file = File::open(path)?;
                Mapping::ReadOnly(unsafe { MmapOptions::new().map(&file)? })
            }
            OpenMode::ReadWrite => {
                let file = OpenOptions::new().read(true).write(true).open(path)?;
                Mapping::Writable(unsafe { MmapOptions::new().map_mut(&file)? })
            }
            OpenMode::CreateOverwrite => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                file.set_len(descriptor.filesize)?;
                Mapping::Writable(unsafe { MmapOptions::new().map_mut(&file)? })
            }
        };

        let mapped = MappedArray {
            descriptor: descriptor.clone(),
            map,
        };
        Ok((mapped, descriptor))
    }

    /// Replaces array `dest` with array `source` (data files only).
    pub fn commit_atomic(
        &self,
        source: &str,
        dest: &str,
        expected_size: u64,
        retry: RetryPolicy,
    ) -> KfResult<()> {
        commit_atomic(
            &self.data_path(source),
            &self.data_path(dest),
            expected_size,
            retry,
        )
    }
}

/// Validates `src` is exactly `expected_size` bytes, then renames it over `dst`.
///
/// Only transient "file in use" failures are retried; everything else is
/// returned immediately. `dst` is untouched if validation fails.
pub fn commit_atomic(src: &Path, dst: &Path, expected_size: u64, retry: RetryPolicy) -> KfResult<()> {
    commit_atomic_with(src, dst, expected_size, retry, |s, d| fs::rename(s, d))
}

pub(crate) fn commit_atomic_with<F>(
    src: &Path,
    dst: &Path,
    expected_size: u64,
    retry: RetryPolicy,
    mut replace: F,
) -> KfResult<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let actual = match fs::metadata(src) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(KnapForgeError::not_found(src));
        }
        Err(e) => return Err(e.into()),
    };
    if actual != expected_size {
        return Err(KnapForgeError::corrupted(
            src,
            format!("children size mismatch: {} != {}", actual, expected_size),
        ));
    }

    let attempts = retry.attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match try_replace(src, dst, &mut replace) {
            Ok(()) => {
                debug!("Committed {} -> {}", src.display(), dst.display());
                return Ok(());
            }
            Err(KnapForgeError::CommitConflict { source, .. }) => {
                warn!(
                    "File in use while committing {} -> {}, retrying ({}/{})",
                    src.display(),
                    dst.display(),
                    attempt,
                    attempts
                );
                last_error = Some(source);
                if attempt < attempts {
                    thread::sleep(retry.backoff);
                }
            }
            Err(KnapForgeError::Io(source)) => {
                return Err(KnapForgeError::CommitFailed {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                    attempts: attempt,
                    source,
                });
            }
            Err(other) => return Err(other),
        }
    }

    Err(KnapForgeError::CommitFailed {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        attempts,
        source: last_error.unwrap_or_else(|| io::Error::other("commit did not run")),
    })
}

fn try_replace<F>(src: &Path, dst: &Path, replace: &mut F) -> KfResult<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    replace(src, dst).map_err(|e| {
        if is_transient(&e) {
            KnapForgeError::CommitConflict {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                source: e,
            }
        } else {
            KnapForgeError::Io(e)
        }
    })
}

#[cfg(windows)]
const TRANSIENT_OS_ERRORS: &[i32] = &[32, 33]; // sharing / lock violation
#[cfg(not(windows))]
const TRANSIENT_OS_ERRORS: &[i32] = &[16, 26]; // EBUSY, ETXTBSY

fn is_transient(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .is_some_and(|code| TRANSIENT_OS_ERRORS.contains(&code))
}
