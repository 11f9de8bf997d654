//! Binary layout of the MPK header and file records
//!
//! ```text
//! header (0x40):  magic "MPK\0" | minor u16 | major u16 | count u32 (v1) / u64 (v2) | zero pad
//! record v1 (0x100): id u32 | offset u32 | size u32 | actual u32 | 16 reserved | name[0xE0]
//! record v2 (0x100): compressed u32 | id u32 | offset u64 | size u64 | actual u64 | name[0xE0]
//! ```

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use super::{
    ArchiveHeader, Field, FieldWidth, FileRecord, FormatVersion, HEADER_SIZE, MAGIC, NAME_LENGTH,
    RECORD_SIZE, RecordFields, V1_RESERVED,
};
use crate::error::{Error, Result};

/// Little-endian field writer over a fixed buffer
struct FieldWriter<'a> {
    bytes: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    fn at(bytes: &'a mut [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    // Values were range-checked against `width` on construction
    fn put(&mut self, width: FieldWidth, value: u64) {
        let end = self.pos + width.bytes();
        let slot = &mut self.bytes[self.pos..end];
        match width {
            FieldWidth::U32 => LittleEndian::write_u32(slot, value as u32),
            FieldWidth::U64 => LittleEndian::write_u64(slot, value),
        }
        self.pos = end;
    }

    fn skip(&mut self, len: usize) {
        self.pos += len;
    }
}

impl ArchiveHeader {
    /// Decode a header from exactly [`HEADER_SIZE`] bytes
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on a length mismatch, bad magic or
    /// unsupported major version.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "MPK header must be {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidFormat(format!(
                "invalid MPK magic: expected {MAGIC:02X?}, found {magic:02X?}"
            )));
        }

        let version_minor = cursor.read_u16::<LittleEndian>()?;
        let version = FormatVersion::from_major(cursor.read_u16::<LittleEndian>()?)?;
        let file_count = match version {
            FormatVersion::V1 => u64::from(cursor.read_u32::<LittleEndian>()?),
            FormatVersion::V2 => cursor.read_u64::<LittleEndian>()?,
        };

        Self::new(version, version_minor, file_count)
    }

    /// Encode the header, zero-padded to [`HEADER_SIZE`] bytes
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&MAGIC);
        LittleEndian::write_u16(&mut bytes[4..6], self.version_minor());
        LittleEndian::write_u16(&mut bytes[6..8], self.version_major());

        let width = self.version().width(Field::FileCount);
        FieldWriter::at(&mut bytes, 8).put(width, self.file_count());
        bytes
    }
}

impl FileRecord {
    /// Decode a record from exactly [`RECORD_SIZE`] bytes
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on a length mismatch.
    pub fn decode(version: FormatVersion, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(Error::InvalidFormat(format!(
                "MPK file record must be {RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let fields = match version {
            FormatVersion::V1 => {
                let id = cursor.read_u32::<LittleEndian>()?;
                let offset = cursor.read_u32::<LittleEndian>()?;
                let stored_size = cursor.read_u32::<LittleEndian>()?;
                let actual_size = cursor.read_u32::<LittleEndian>()?;
                cursor.set_position(cursor.position() + V1_RESERVED as u64);
                RecordFields {
                    id: u64::from(id),
                    compressed: false,
                    offset: u64::from(offset),
                    stored_size: u64::from(stored_size),
                    actual_size: u64::from(actual_size),
                    name: Vec::new(),
                }
            }
            FormatVersion::V2 => RecordFields {
                compressed: cursor.read_u32::<LittleEndian>()? != 0,
                id: u64::from(cursor.read_u32::<LittleEndian>()?),
                offset: cursor.read_u64::<LittleEndian>()?,
                stored_size: cursor.read_u64::<LittleEndian>()?,
                actual_size: cursor.read_u64::<LittleEndian>()?,
                name: Vec::new(),
            },
        };

        let name_start = RECORD_SIZE - NAME_LENGTH;
        debug_assert_eq!(cursor.position() as usize, name_start);

        Self::new(
            version,
            RecordFields {
                name: bytes[name_start..].to_vec(),
                ..fields
            },
        )
    }

    /// Encode the record to [`RECORD_SIZE`] bytes in its version's layout
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        let name_start = RECORD_SIZE - NAME_LENGTH;
        let version = self.version();

        let mut out = FieldWriter::at(&mut bytes, 0);
        if version == FormatVersion::V2 {
            out.put(FieldWidth::U32, u64::from(self.is_compressed()));
        }
        out.put(version.width(Field::Id), u64::from(self.id()));
        out.put(version.width(Field::Offset), self.offset());
        out.put(version.width(Field::StoredSize), self.stored_size());
        out.put(version.width(Field::ActualSize), self.actual_size());
        if version == FormatVersion::V1 {
            // reserved, left zero
            out.skip(V1_RESERVED);
        }
        debug_assert_eq!(out.pos, name_start);

        let name = self.name_bytes();
        bytes[name_start..name_start + name.len()].copy_from_slice(name);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(version: FormatVersion, compressed: bool) -> FileRecord {
        FileRecord::new(
            version,
            RecordFields {
                id: 7,
                compressed,
                offset: 0x240,
                stored_size: 12,
                actual_size: 30,
                name: b"system/font.fnt".to_vec(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_header_layout_v2() {
        let header = ArchiveHeader::new(FormatVersion::V2, 0, 2).unwrap();
        let bytes = header.encode();

        assert_eq!(&bytes[..4], b"MPK\0");
        assert_eq!(&bytes[4..8], &[0, 0, 2, 0]);
        assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
        assert!(bytes[16..].iter().all(|&b| b == 0));
        assert_eq!(ArchiveHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_layout_v1() {
        let header = ArchiveHeader::new(FormatVersion::V1, 3, 0x0102_0304).unwrap();
        let bytes = header.encode();

        assert_eq!(&bytes[4..8], &[3, 0, 1, 0]);
        assert_eq!(&bytes[8..12], &[4, 3, 2, 1]);
        assert!(bytes[12..].iter().all(|&b| b == 0));

        let decoded = ArchiveHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.version(), FormatVersion::V1);
        assert_eq!(decoded.version_minor(), 3);
        assert_eq!(decoded.file_count(), 0x0102_0304);
    }

    #[test]
    fn test_v1_count_ignores_high_bytes() {
        // Bytes past the 32-bit count are padding in v1
        let mut bytes = ArchiveHeader::new(FormatVersion::V1, 0, 5).unwrap().encode();
        bytes[12] = 0xFF;
        assert_eq!(ArchiveHeader::decode(&bytes).unwrap().file_count(), 5);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut bytes = ArchiveHeader::new(FormatVersion::V2, 0, 0).unwrap().encode();
        bytes[0] = b'L';
        assert!(matches!(ArchiveHeader::decode(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_header_bad_major() {
        let mut bytes = ArchiveHeader::new(FormatVersion::V2, 0, 0).unwrap().encode();
        bytes[6] = 3;
        assert!(matches!(ArchiveHeader::decode(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_header_wrong_length() {
        let bytes = ArchiveHeader::new(FormatVersion::V2, 0, 0).unwrap().encode();
        assert!(matches!(ArchiveHeader::decode(&bytes[..63]), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_record_layout_v1() {
        let bytes = record(FormatVersion::V1, true).encode();

        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x240u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &12u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &30u32.to_le_bytes());
        assert!(bytes[16..32].iter().all(|&b| b == 0));
        assert_eq!(&bytes[32..47], b"system/font.fnt");
        assert!(bytes[47..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_record_layout_v2() {
        let bytes = record(FormatVersion::V2, true).encode();

        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &0x240u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &12u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &30u64.to_le_bytes());
        assert_eq!(&bytes[32..47], b"system/font.fnt");
    }

    #[test]
    fn test_record_layout_v2_wide_fields() {
        let record = FileRecord::new(
            FormatVersion::V2,
            RecordFields {
                id: u64::from(u32::MAX),
                compressed: false,
                offset: u64::MAX,
                stored_size: 0x0102_0304_0506_0708,
                actual_size: 1 << 32,
                name: b"a".to_vec(),
            },
        )
        .unwrap();
        let bytes = record.encode();

        assert_eq!(&bytes[0..4], &[0; 4]);
        assert_eq!(&bytes[4..8], &[0xFF; 4]);
        assert_eq!(&bytes[8..16], &[0xFF; 8]);
        assert_eq!(&bytes[16..24], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[24..32], &[0, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(bytes[32], b'a');
        assert_eq!(FileRecord::decode(FormatVersion::V2, &bytes).unwrap(), record);
    }

    #[test]
    fn test_header_layout_v1_max_count() {
        let header = ArchiveHeader::new(FormatVersion::V1, 0, u64::from(u32::MAX)).unwrap();
        let bytes = header.encode();

        assert_eq!(&bytes[8..12], &[0xFF; 4]);
        assert!(bytes[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_record_decode_matches_encode() {
        for version in [FormatVersion::V1, FormatVersion::V2] {
            let original = record(version, true);
            let decoded = FileRecord::decode(version, &original.encode()).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_v1_flag_bits_are_not_read() {
        // Garbage in the v1 reserved area never turns into a compression flag
        let mut bytes = FileRecord::new(
            FormatVersion::V1,
            RecordFields {
                id: 1,
                stored_size: 4,
                actual_size: 4,
                name: b"a.txt".to_vec(),
                ..RecordFields::default()
            },
        )
        .unwrap()
        .encode();
        bytes[16..32].fill(0xFF);

        let decoded = FileRecord::decode(FormatVersion::V1, &bytes).unwrap();
        assert!(!decoded.is_compressed());
    }

    #[test]
    fn test_full_length_name() {
        let name = vec![b'n'; NAME_LENGTH];
        let original = FileRecord::new(
            FormatVersion::V2,
            RecordFields {
                name: name.clone(),
                ..RecordFields::default()
            },
        )
        .unwrap();
        let decoded = FileRecord::decode(FormatVersion::V2, &original.encode()).unwrap();
        assert_eq!(decoded.name_bytes(), name.as_slice());
    }

    #[test]
    fn test_record_wrong_length() {
        assert!(matches!(
            FileRecord::decode(FormatVersion::V2, &[0u8; RECORD_SIZE + 1]),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_null_record_decodes() {
        let decoded = FileRecord::decode(FormatVersion::V2, &[0u8; RECORD_SIZE]).unwrap();
        assert!(decoded.is_null());
    }
}
