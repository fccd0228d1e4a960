use crate::error::Result;
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Random-access, read-only byte storage backing an open file.
///
/// Reads are range-scoped, so index building, line access and search can
/// share one source without coordination.
pub trait ByteSource: Send + Sync {
    /// Size in bytes at the time the source was opened
    fn len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Positional reads on an open file handle
pub struct FileSource {
    file: File,
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        read_exact_at(&self.file, offset, buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} changed or was removed since it was opened", self.path.display()),
                )
            } else {
                e
            }
        })
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Memory-mapped file.
///
/// Each read first checks the file's current length and fails with an
/// `UnexpectedEof` error if it shrank below the mapping. A truncation racing
/// with the copy itself can still fault, so positional reads stay the default.
pub struct MmapSource {
    file: File,
    path: PathBuf,
    /// None for an empty file, which cannot be mapped on every platform
    mmap: Option<Mmap>,
}

impl MmapSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // The file is treated as immutable for the lifetime of the session
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mmap,
        })
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl ByteSource for MmapSource {
    fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let end = offset.saturating_add(buf.len() as u64);
        if !buf.is_empty() && self.file.metadata()?.len() < end {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} changed or was removed since it was opened", self.path.display()),
            ));
        }
        copy_range(self.bytes(), offset, buf)
    }
}

/// In-memory bytes, used for tests and benchmarks
pub struct MemorySource(Vec<u8>);

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        copy_range(&self.0, offset, buf)
    }
}

fn copy_range(data: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<()> {
    let start = usize::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
    let end = start
        .checked_add(buf.len())
        .filter(|&end| end <= data.len())
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of source"))?;
    buf.copy_from_slice(&data[start..end]);
    Ok(())
}

/// Reads byte ranges of a [`ByteSource`] as raw bytes or decoded text.
///
/// Callers slice only at line starts (right after a terminator) or at the end
/// of the file. Terminators are ASCII, so such a range never splits a UTF-8
/// sequence and decoding sees whole characters.
pub struct ChunkReader {
    source: Box<dyn ByteSource>,
}

impl ChunkReader {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self { source }
    }

    /// Open a file with positional reads, or memory-mapped when `use_mmap` is set
    pub fn open(path: &Path, use_mmap: bool) -> Result<Self> {
        let source: Box<dyn ByteSource> = if use_mmap {
            Box::new(MmapSource::open(path)?)
        } else {
            Box::new(FileSource::open(path)?)
        };
        Ok(Self::new(source))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Box::new(MemorySource::new(bytes)))
    }

    pub fn len(&self) -> u64 {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Raw bytes of `[start, end)`, clamped to the source length
    pub fn read_bytes(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let end = end.min(self.len());
        if start >= end {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; (end - start) as usize];
        self.source.read_at(start, &mut buf)?;
        Ok(buf)
    }

    /// Decoded text of `[start, end)`; invalid UTF-8 becomes U+FFFD
    pub fn read_text(&self, start: u64, end: u64) -> Result<String> {
        let bytes = self.read_bytes(start, end)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}
