use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;

use crate::{ByteRange, TransferError};

/// A named, sized, range-readable byte source for one upload.
///
/// Engines read ranges in ascending order, but the source does not require
/// it; every disk read seeks to the range start first.
#[derive(Debug)]
pub struct UploadFile {
    name: String,
    size: u64,
    source: Source,
}

#[derive(Debug)]
enum Source {
    Disk(File),
    Memory(Bytes),
}

impl UploadFile {
    /// Opens an on-disk file for upload. The upload name is the final path
    /// component.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size,
            source: Source::Disk(file),
        })
    }

    /// Wraps in-memory bytes as an upload source.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: Source::Memory(data),
        }
    }

    /// Name the file is uploaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads the bytes of `range` from the source.
    pub fn read_range(&mut self, range: &ByteRange) -> Result<Bytes, TransferError> {
        if range.end > self.size || range.start > range.end {
            return Err(TransferError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                size: self.size,
            });
        }
        match &mut self.source {
            Source::Disk(file) => {
                file.seek(SeekFrom::Start(range.start))?;
                let mut buf = vec![0u8; range.len() as usize];
                file.read_exact(&mut buf)?;
                Ok(Bytes::from(buf))
            }
            Source::Memory(data) => Ok(data.slice(range.start as usize..range.end as usize)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn open_reads_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(dir.path(), "report.pdf", b"0123456789");

        let file = UploadFile::open(&path).unwrap();
        assert_eq!(file.name(), "report.pdf");
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn disk_source_reads_ranges_at_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(dir.path(), "data.bin", b"AABBCCDDEE");

        let mut file = UploadFile::open(&path).unwrap();
        let mid = file.read_range(&ByteRange { start: 4, end: 8 }).unwrap();
        assert_eq!(&mid[..], b"CCDD");

        // Reads need not be in order.
        let head = file.read_range(&ByteRange { start: 0, end: 2 }).unwrap();
        assert_eq!(&head[..], b"AA");
    }

    #[test]
    fn memory_source_slices() {
        let mut file = UploadFile::from_bytes("mem.bin", &b"hello world"[..]);
        assert_eq!(file.size(), 11);

        let range = file.read_range(&ByteRange { start: 6, end: 11 }).unwrap();
        assert_eq!(&range[..], b"world");
    }

    #[test]
    fn full_range_reads_everything() {
        let mut file = UploadFile::from_bytes("mem.bin", &b"hello"[..]);
        let all = file.read_range(&ByteRange::full(file.size())).unwrap();
        assert_eq!(&all[..], b"hello");
    }

    #[test]
    fn empty_source_full_range_is_empty() {
        let mut file = UploadFile::from_bytes("empty.bin", Bytes::new());
        assert_eq!(file.size(), 0);
        let all = file.read_range(&ByteRange::full(0)).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn out_of_bounds_range_rejected() {
        let mut file = UploadFile::from_bytes("mem.bin", &b"hello"[..]);
        let result = file.read_range(&ByteRange { start: 3, end: 6 });
        assert!(matches!(
            result.unwrap_err(),
            TransferError::RangeOutOfBounds { end: 6, size: 5, .. }
        ));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadFile::open(&dir.path().join("nope.bin"));
        assert!(matches!(result.unwrap_err(), TransferError::Io(_)));
    }
}
