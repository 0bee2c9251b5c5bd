//! Binary storage for the index artifact.
//!
//! File format: index.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of the embedding model name)
//! - dims: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - meta_len: u32 (little-endian)
//! - metadata: meta_len bytes of JSON-encoded BookRecord
//! - embedding: [f32; dims] (little-endian)
//!
//! Metadata rides along as JSON so the cover tri-state and free-form
//! strings round-trip exactly; embeddings are stored as raw f32 LE.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::index::record::BookRecord;
use crate::index::VibeIndex;

const FORMAT_VERSION: u8 = 1;

/// version(1) + model_id(32) + dims(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// Cap on a single metadata blob; anything larger means corruption.
const MAX_META_LEN: u32 = 1 << 20;

/// Cap on load-time preallocation. The header's entry count is untrusted
/// until the entries actually read back.
const MAX_PREALLOC_ENTRIES: u64 = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("index artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid artifact: {0}")]
    InvalidFormat(String),

    #[error("artifact version {0} is newer than supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("artifact was built with a different embedding model")]
    ModelMismatch,

    #[error("checksum mismatch: artifact may be corrupted")]
    ChecksumMismatch,
}

/// What a successful load yields: the index plus the identity of the model
/// that produced its embeddings.
pub struct LoadedIndex {
    pub index: VibeIndex,
    pub model_id: [u8; 32],
}

pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save the index atomically: temp file -> flush/sync -> rename. Either
    /// the whole artifact lands or nothing does.
    pub fn save(&self, index: &VibeIndex, model_id: &[u8; 32]) -> Result<(), IndexStorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = self.write_to_file(&temp_path, index, model_id);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Load the artifact. When `expected_model_id` is given, a mismatch is
    /// fatal -- query embeddings from a different model are not comparable.
    pub fn load(
        &self,
        expected_model_id: Option<&[u8; 32]>,
    ) -> Result<LoadedIndex, IndexStorageError> {
        if !self.path.exists() {
            return Err(IndexStorageError::NotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        if let Some(expected) = expected_model_id {
            if header.model_id != *expected {
                return Err(IndexStorageError::ModelMismatch);
            }
        }

        let prealloc = header.entry_count.min(MAX_PREALLOC_ENTRIES) as usize;
        let mut records = Vec::with_capacity(prealloc);
        let mut embeddings = Vec::with_capacity(prealloc);
        for _ in 0..header.entry_count {
            let (record, embedding) = read_entry(&mut reader, header.dims as usize)?;
            records.push(record);
            embeddings.push(embedding);
        }

        let index = VibeIndex::new(records, embeddings)
            .map_err(|e| IndexStorageError::InvalidFormat(e.to_string()))?;

        Ok(LoadedIndex {
            index,
            model_id: header.model_id,
        })
    }

    fn write_to_file(
        &self,
        path: &Path,
        index: &VibeIndex,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write_header(
            &mut writer,
            &Header {
                version: FORMAT_VERSION,
                model_id: *model_id,
                dims: index.dims() as u16,
                entry_count: index.len() as u64,
            },
        )?;

        for (record, embedding) in index.records().iter().zip(index.embeddings()) {
            write_entry(&mut writer, record, embedding)?;
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        file.sync_all()?;

        Ok(())
    }
}

struct Header {
    version: u8,
    model_id: [u8; 32],
    dims: u16,
    entry_count: u64,
}

fn write_header(writer: &mut BufWriter<File>, header: &Header) -> Result<(), IndexStorageError> {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0] = header.version;
    bytes[1..33].copy_from_slice(&header.model_id);
    bytes[33..35].copy_from_slice(&header.dims.to_le_bytes());
    bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

    let checksum = crc32fast::hash(&bytes[0..43]);
    bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&bytes)?;
    Ok(())
}

fn read_header(reader: &mut BufReader<File>) -> Result<Header, IndexStorageError> {
    let mut bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut bytes)?;

    let version = bytes[0];
    if version > FORMAT_VERSION {
        return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&bytes[1..33]);

    let dims = u16::from_le_bytes([bytes[33], bytes[34]]);
    let entry_count = u64::from_le_bytes(bytes[35..43].try_into().unwrap());
    let stored_checksum = u32::from_le_bytes(bytes[43..47].try_into().unwrap());

    if stored_checksum != crc32fast::hash(&bytes[0..43]) {
        return Err(IndexStorageError::ChecksumMismatch);
    }

    Ok(Header {
        version,
        model_id,
        dims,
        entry_count,
    })
}

fn write_entry(
    writer: &mut BufWriter<File>,
    record: &BookRecord,
    embedding: &[f32],
) -> Result<(), IndexStorageError> {
    let meta = serde_json::to_vec(record)
        .map_err(|e| IndexStorageError::InvalidFormat(e.to_string()))?;

    writer.write_all(&(meta.len() as u32).to_le_bytes())?;
    writer.write_all(&meta)?;
    for &value in embedding {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_entry(
    reader: &mut BufReader<File>,
    dims: usize,
) -> Result<(BookRecord, Vec<f32>), IndexStorageError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let meta_len = u32::from_le_bytes(len_bytes);
    if meta_len == 0 || meta_len > MAX_META_LEN {
        return Err(IndexStorageError::InvalidFormat(format!(
            "implausible metadata length {meta_len}"
        )));
    }

    let mut meta = vec![0u8; meta_len as usize];
    reader.read_exact(&mut meta)?;
    let record: BookRecord = serde_json::from_slice(&meta)
        .map_err(|e| IndexStorageError::InvalidFormat(e.to_string()))?;

    let mut embedding = Vec::with_capacity(dims);
    let mut float_bytes = [0u8; 4];
    for _ in 0..dims {
        reader.read_exact(&mut float_bytes)?;
        embedding.push(f32::from_le_bytes(float_bytes));
    }

    Ok((record, embedding))
}
