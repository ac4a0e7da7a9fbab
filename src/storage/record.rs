//! Document record format for `documents.dat`
//!
//! The file starts with an 8-byte magic header, then an append-only
//! sequence of records:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes itself and the checksum)
//! +------------------+
//! | Document ID      | (length-prefixed UTF-8)
//! +------------------+
//! | Generation       | (u64 LE)
//! +------------------+
//! | Digest           | (u32 LE)
//! +------------------+
//! | Tombstone Flag   | (u8: 0 = live, 1 = deleted)
//! +------------------+
//! | Document Body    | (length-prefixed JSON bytes, empty for tombstones)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Read};

use super::checksum::{compute_checksum, verify_checksum};

/// Magic bytes at offset 0 of every `documents.dat`.
pub const FILE_MAGIC: &[u8; 8] = b"SEEDDB01";

/// Length of the file header in bytes.
pub const HEADER_LEN: u64 = FILE_MAGIC.len() as u64;

/// len + id len + generation + digest + tombstone + body len + checksum
pub const MIN_RECORD_SIZE: usize = 4 + 4 + 8 + 4 + 1 + 4 + 4;

/// One stored revision (or deletion) of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Document identifier
    pub document_id: String,
    /// Revision generation, starting at 1
    pub generation: u64,
    /// CRC32 of the document body
    pub digest: u32,
    /// Whether this record deletes the document
    pub is_tombstone: bool,
    /// Serialized JSON body (empty for tombstones)
    pub body: Vec<u8>,
}

impl DocumentRecord {
    /// Record for a live document revision
    pub fn live(document_id: impl Into<String>, generation: u64, body: Vec<u8>) -> Self {
        let digest = compute_checksum(&body);
        Self {
            document_id: document_id.into(),
            generation,
            digest,
            is_tombstone: false,
            body,
        }
    }

    /// Record deleting a document
    pub fn tombstone(document_id: impl Into<String>, generation: u64) -> Self {
        Self {
            document_id: document_id.into(),
            generation,
            digest: 0,
            is_tombstone: true,
            body: Vec::new(),
        }
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.document_id.len() + self.body.len() + 21);

        buf.extend_from_slice(&(self.document_id.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.document_id.as_bytes());
        buf.extend_from_slice(&self.generation.to_le_bytes());
        buf.extend_from_slice(&self.digest.to_le_bytes());
        buf.push(u8::from(self.is_tombstone));
        buf.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.body);

        buf
    }

    /// Serialize the complete record, length prefix and checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);

        if !verify_checksum(&data[..checksum_offset], stored_checksum) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    compute_checksum(&data[..checksum_offset]),
                    stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        let document_id = String::from_utf8(read_bytes(&mut cursor)?).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8 id: {}", e))
        })?;

        let mut u64_buf = [0u8; 8];
        cursor.read_exact(&mut u64_buf)?;
        let generation = u64::from_le_bytes(u64_buf);

        let mut u32_buf = [0u8; 4];
        cursor.read_exact(&mut u32_buf)?;
        let digest = u32::from_le_bytes(u32_buf);

        let mut flag = [0u8; 1];
        cursor.read_exact(&mut flag)?;
        let is_tombstone = match flag[0] {
            0 => false,
            1 => true,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid tombstone flag: {}", other),
                ))
            }
        };

        let body = read_bytes(&mut cursor)?;

        if cursor.position() as usize != checksum_offset - 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Trailing bytes inside record",
            ));
        }

        Ok((
            Self {
                document_id,
                generation,
                digest,
                is_tombstone,
                body,
            },
            record_length,
        ))
    }
}

fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentRecord {
        DocumentRecord::live("hotel1", 1, br#"{"description":"Ocean view suite"}"#.to_vec())
    }

    #[test]
    fn test_record_roundtrip() {
        let record = sample();
        let serialized = record.serialize();
        let (decoded, consumed) = DocumentRecord::deserialize(&serialized).unwrap();

        assert_eq!(record, decoded);
        assert_eq!(consumed, serialized.len());
    }

    #[test]
    fn test_live_digest_tracks_body() {
        let a = DocumentRecord::live("a", 1, b"{}".to_vec());
        let b = DocumentRecord::live("a", 1, br#"{"x":1}"#.to_vec());
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn test_tombstone_has_empty_body() {
        let record = DocumentRecord::tombstone("hotel1", 4);
        let (decoded, _) = DocumentRecord::deserialize(&record.serialize()).unwrap();
        assert!(decoded.is_tombstone);
        assert!(decoded.body.is_empty());
        assert_eq!(decoded.generation, 4);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut serialized = sample().serialize();
        let mid = serialized.len() / 2;
        serialized[mid] ^= 0xFF;

        let err = DocumentRecord::deserialize(&serialized).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let serialized = sample().serialize();
        let result = DocumentRecord::deserialize(&serialized[..serialized.len() - 3]);
        assert!(result.is_err());
    }
}
