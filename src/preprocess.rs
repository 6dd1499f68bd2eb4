//! Working copies of possibly-compressed inputs.

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_LOCAL_HEADER: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const ZIP_EMPTY_ARCHIVE: [u8; 4] = [b'P', b'K', 0x05, 0x06];

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("zip archive {0} has no members")]
    EmptyArchive(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zip,
    Gzip,
    Plain,
}

impl Compression {
    /// Classify by leading magic bytes
    pub fn sniff(magic: &[u8]) -> Self {
        if magic.starts_with(&ZIP_LOCAL_HEADER) || magic.starts_with(&ZIP_EMPTY_ARCHIVE) {
            Compression::Zip
        } else if magic.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::Plain
        }
    }
}

/// Decompressed private copy of an input file, deleted on drop
#[derive(Debug)]
pub struct WorkingCopy {
    file: NamedTempFile,
    compression: Compression,
}

impl WorkingCopy {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Compression of the original input
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// A fresh reader positioned at the start of the plain text
    pub fn open(&self) -> io::Result<BufReader<File>> {
        Ok(BufReader::new(self.file.reopen()?))
    }
}

/// Produce a plain-text working copy of `path`.
///
/// Zip archives contribute their first member, gzip streams are decoded, and
/// anything else is copied verbatim.
pub fn preprocess(path: &Path) -> Result<WorkingCopy, PreprocessError> {
    let compression = sniff_file(path)?;
    let mut working = NamedTempFile::new()?;

    match compression {
        Compression::Zip => {
            let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
            if archive.len() == 0 {
                return Err(PreprocessError::EmptyArchive(path.display().to_string()));
            }
            let mut member = archive.by_index(0)?;
            debug!("zip input {}: extracting {}", path.display(), member.name());
            io::copy(&mut member, working.as_file_mut())?;
        }
        Compression::Gzip => {
            debug!("gzip input {}", path.display());
            let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
            io::copy(&mut decoder, working.as_file_mut())?;
        }
        Compression::Plain => {
            debug!("plain input {}", path.display());
            io::copy(&mut File::open(path)?, working.as_file_mut())?;
        }
    }

    working.as_file_mut().flush()?;
    Ok(WorkingCopy {
        file: working,
        compression,
    })
}

fn sniff_file(path: &Path) -> io::Result<Compression> {
    let mut magic = Vec::with_capacity(4);
    File::open(path)?.take(4).read_to_end(&mut magic)?;
    Ok(Compression::sniff(&magic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::BufRead;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const CONTENTS: &str = "# 23andMe\nrs1\t1\t100\tAG\n";

    fn read_all(copy: &WorkingCopy) -> Vec<String> {
        copy.open().unwrap().lines().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Compression::sniff(&[0x1f, 0x8b, 0x08, 0x00]), Compression::Gzip);
        assert_eq!(Compression::sniff(b"PK\x03\x04"), Compression::Zip);
        assert_eq!(Compression::sniff(b"PK\x05\x06"), Compression::Zip);
        assert_eq!(Compression::sniff(b"# 23"), Compression::Plain);
        assert_eq!(Compression::sniff(b""), Compression::Plain);
    }

    #[test]
    fn test_plain_copy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genome.txt");
        std::fs::write(&path, CONTENTS).unwrap();

        let copy = preprocess(&path).unwrap();
        assert_eq!(copy.compression(), Compression::Plain);
        assert_ne!(copy.path(), path.as_path());
        assert_eq!(read_all(&copy), vec!["# 23andMe", "rs1\t1\t100\tAG"]);
    }

    #[test]
    fn test_gzip_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genome.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), flate2::Compression::default());
        encoder.write_all(CONTENTS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let copy = preprocess(&path).unwrap();
        assert_eq!(copy.compression(), Compression::Gzip);
        assert_eq!(read_all(&copy), vec!["# 23andMe", "rs1\t1\t100\tAG"]);
    }

    #[test]
    fn test_zip_first_member() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genome.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("genome.txt", FileOptions::default()).unwrap();
        writer.write_all(CONTENTS.as_bytes()).unwrap();
        writer.start_file("README.txt", FileOptions::default()).unwrap();
        writer.write_all(b"not genotype data\n").unwrap();
        writer.finish().unwrap();

        let copy = preprocess(&path).unwrap();
        assert_eq!(copy.compression(), Compression::Zip);
        assert_eq!(read_all(&copy), vec!["# 23andMe", "rs1\t1\t100\tAG"]);
    }

    #[test]
    fn test_empty_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.zip");
        ZipWriter::new(File::create(&path).unwrap()).finish().unwrap();

        assert!(matches!(
            preprocess(&path),
            Err(PreprocessError::EmptyArchive(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            preprocess(&dir.path().join("absent.txt")),
            Err(PreprocessError::Io(_))
        ));
    }

    #[test]
    fn test_working_copies_are_independent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genome.txt");
        std::fs::write(&path, CONTENTS).unwrap();

        let first = preprocess(&path).unwrap();
        let second = preprocess(&path).unwrap();
        assert_ne!(first.path(), second.path());
    }
}
