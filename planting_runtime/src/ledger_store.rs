//! Append-only ledger store — binary protobuf log of daily records.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - Strict append only: records are never rewritten or reordered
//!   - fsync after every write
//!   - Days strictly consecutive from 0 (validated on append and on open)

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;

use planting_engine::events::DailyState;

use crate::error::RuntimeError;
use crate::proto_bridge::{daily_to_proto, proto_to_daily};
use crate::proto_types::ProtoDailyState;

/// Frames above this size are treated as corruption.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Append-only daily ledger backed by a binary file.
pub struct LedgerStore {
    path: PathBuf,
    next_day: u32,
}

impl LedgerStore {
    /// Open or create a ledger at the given path.
    /// Reads existing records to find the next expected day.
    pub fn open(path: &Path) -> Result<Self, RuntimeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let next_day = if path.exists() {
            let records = Self::read_all_from_file(path)?;
            check_consecutive(&records)?;
            records.len() as u32
        } else {
            0
        };
        Ok(Self {
            path: path.to_path_buf(),
            next_day,
        })
    }

    /// Append one record. Its day must be exactly the next expected day.
    pub fn append(&mut self, record: &DailyState) -> Result<(), RuntimeError> {
        if record.day != self.next_day {
            return Err(RuntimeError::SequenceViolation {
                expected: self.next_day,
                got: record.day,
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let buf = daily_to_proto(record).encode_to_vec();
        let len = buf.len() as u32;
        {
            let mut writer = BufWriter::new(&mut file);
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(&buf)?;
            writer.flush()?;
        }
        file.sync_all()?;

        self.next_day += 1;
        Ok(())
    }

    /// Load every record in day order.
    pub fn load_all(&self) -> Result<Vec<DailyState>, RuntimeError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let records = Self::read_all_from_file(&self.path)?;
        check_consecutive(&records)?;
        Ok(records)
    }

    /// Day the next appended record must carry.
    pub fn next_day(&self) -> u32 {
        self.next_day
    }

    pub fn len(&self) -> usize {
        self.next_day as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_day == 0
    }

    /// Read all records from a file, validating frame integrity.
    fn read_all_from_file(path: &Path) -> Result<Vec<DailyState>, RuntimeError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 || len > MAX_FRAME_BYTES {
                return Err(RuntimeError::Corrupt(format!(
                    "invalid frame length {} after {} records",
                    len,
                    records.len()
                )));
            }

            let mut frame = vec![0u8; len];
            reader.read_exact(&mut frame).map_err(|e| {
                RuntimeError::Corrupt(format!(
                    "truncated frame after {} records: {}",
                    records.len(),
                    e
                ))
            })?;

            let proto = ProtoDailyState::decode(frame.as_slice())?;
            records.push(proto_to_daily(&proto)?);
        }

        Ok(records)
    }
}

fn check_consecutive(records: &[DailyState]) -> Result<(), RuntimeError> {
    for (expected, record) in records.iter().enumerate() {
        if record.day != expected as u32 {
            return Err(RuntimeError::SequenceViolation {
                expected: expected as u32,
                got: record.day,
            });
        }
    }
    Ok(())
}
