use std::fmt;

use crate::common::{Lsn, Result, Rid, StratumError, TrxId, INVALID_LSN};

/// Size of the fixed on-disk entry header in bytes
pub const LOG_ENTRY_HEADER_SIZE: usize = 18;

/// Fixed part of a record-mutation payload (table id, rid, offset, length)
const RECORD_PAYLOAD_FIXED_SIZE: usize = 20;

/// Kind tag of a log entry, stored as a little-endian u16 on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LogEntryType {
    /// Reserved sentinel, ignored by recovery
    Error = 0,
    MtrBegin = 1,
    MtrCommit = 2,
    MtrRollback = 3,
    Insert = 4,
    Delete = 5,
    Update = 6,
}

impl LogEntryType {
    pub fn from_u16(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(Self::Error),
            1 => Ok(Self::MtrBegin),
            2 => Ok(Self::MtrCommit),
            3 => Ok(Self::MtrRollback),
            4 => Ok(Self::Insert),
            5 => Ok(Self::Delete),
            6 => Ok(Self::Update),
            _ => Err(StratumError::InvalidArgument("unknown log entry type")),
        }
    }

    /// True for the record-mutation kinds (insert/delete/update).
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Insert | Self::Delete | Self::Update)
    }
}

impl fmt::Display for LogEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "ERROR",
            Self::MtrBegin => "MTR_BEGIN",
            Self::MtrCommit => "MTR_COMMIT",
            Self::MtrRollback => "MTR_ROLLBACK",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
        };
        f.write_str(name)
    }
}

/// On-disk entry framing: `log_type u16 | trx_id i32 | log_entry_len i32 |
/// lsn i64`, all little-endian, no padding. `log_entry_len` is the size of
/// the payload that follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntryHeader {
    pub log_type: LogEntryType,
    pub trx_id: TrxId,
    pub log_entry_len: i32,
    pub lsn: Lsn,
}

impl LogEntryHeader {
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.log_type as u16).to_le_bytes());
        buf.extend_from_slice(&self.trx_id.to_le_bytes());
        buf.extend_from_slice(&self.log_entry_len.to_le_bytes());
        buf.extend_from_slice(&self.lsn.to_le_bytes());
    }

    pub fn decode(buf: &[u8; LOG_ENTRY_HEADER_SIZE]) -> Result<Self> {
        let log_type = LogEntryType::from_u16(u16::from_le_bytes([buf[0], buf[1]]))?;
        let trx_id = i32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let log_entry_len = i32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
        let lsn = i64::from_le_bytes([
            buf[10], buf[11], buf[12], buf[13], buf[14], buf[15], buf[16], buf[17],
        ]);
        if log_entry_len < 0 {
            return Err(StratumError::InvalidArgument("negative log entry length"));
        }
        Ok(Self {
            log_type,
            trx_id,
            log_entry_len,
            lsn,
        })
    }
}

/// Payload of a record-mutation entry: which row changed and the bytes that
/// reproduce the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPayload {
    pub table_id: i32,
    pub rid: Rid,
    pub data_offset: i32,
    pub data: Vec<u8>,
}

/// Entry payload, one variant per on-disk shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogPayload {
    /// Begin/rollback markers (and the ERROR sentinel) carry no payload
    Mtr,
    Commit { commit_xid: i32 },
    Record(RecordPayload),
}

/// A single redo-log record: framing header plus a typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    header: LogEntryHeader,
    payload: LogPayload,
}

impl LogEntry {
    /// Builds a begin or rollback marker.
    pub fn mtr(log_type: LogEntryType, trx_id: TrxId) -> Result<Self> {
        if !matches!(log_type, LogEntryType::MtrBegin | LogEntryType::MtrRollback) {
            return Err(StratumError::InvalidArgument(
                "mtr entries are begin or rollback",
            ));
        }
        Ok(Self {
            header: LogEntryHeader {
                log_type,
                trx_id,
                log_entry_len: 0,
                lsn: INVALID_LSN,
            },
            payload: LogPayload::Mtr,
        })
    }

    /// Builds a commit marker carrying the commit xid.
    pub fn commit(trx_id: TrxId, commit_xid: i32) -> Self {
        Self {
            header: LogEntryHeader {
                log_type: LogEntryType::MtrCommit,
                trx_id,
                log_entry_len: 4,
                lsn: INVALID_LSN,
            },
            payload: LogPayload::Commit { commit_xid },
        }
    }

    /// Builds a record-mutation entry, copying `data`. Surfaces `NoMem`
    /// when the copy cannot be allocated.
    pub fn record(
        log_type: LogEntryType,
        trx_id: TrxId,
        table_id: i32,
        rid: Rid,
        data_offset: i32,
        data: &[u8],
    ) -> Result<Self> {
        if !log_type.is_record() {
            return Err(StratumError::InvalidArgument(
                "record entries are insert, delete or update",
            ));
        }
        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len())
            .map_err(|_| StratumError::NoMem("log entry payload allocation failed"))?;
        copy.extend_from_slice(data);

        Ok(Self {
            header: LogEntryHeader {
                log_type,
                trx_id,
                log_entry_len: (RECORD_PAYLOAD_FIXED_SIZE + data.len()) as i32,
                lsn: INVALID_LSN,
            },
            payload: LogPayload::Record(RecordPayload {
                table_id,
                rid,
                data_offset,
                data: copy,
            }),
        })
    }

    pub fn header(&self) -> &LogEntryHeader {
        &self.header
    }

    pub fn payload(&self) -> &LogPayload {
        &self.payload
    }

    pub fn log_type(&self) -> LogEntryType {
        self.header.log_type
    }

    pub fn trx_id(&self) -> TrxId {
        self.header.trx_id
    }

    pub fn lsn(&self) -> Lsn {
        self.header.lsn
    }

    /// Stamped by the log manager when the entry enters the buffer.
    pub(crate) fn set_lsn(&mut self, lsn: Lsn) {
        self.header.lsn = lsn;
    }

    /// Total serialized size, header included.
    pub fn serialized_len(&self) -> usize {
        LOG_ENTRY_HEADER_SIZE + self.header.log_entry_len as usize
    }

    /// Serializes header and payload contiguously in the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_len());
        self.header.encode_into(&mut buf);
        match &self.payload {
            LogPayload::Mtr => {}
            LogPayload::Commit { commit_xid } => {
                buf.extend_from_slice(&commit_xid.to_le_bytes());
            }
            LogPayload::Record(record) => {
                buf.extend_from_slice(&record.table_id.to_le_bytes());
                buf.extend_from_slice(&record.rid.page_num.to_le_bytes());
                buf.extend_from_slice(&record.rid.slot_num.to_le_bytes());
                buf.extend_from_slice(&record.data_offset.to_le_bytes());
                buf.extend_from_slice(&(record.data.len() as i32).to_le_bytes());
                buf.extend_from_slice(&record.data);
            }
        }
        debug_assert_eq!(buf.len(), self.serialized_len());
        buf
    }

    /// Reconstructs an entry from a decoded header and its payload bytes.
    pub fn decode(header: LogEntryHeader, payload: &[u8]) -> Result<Self> {
        if payload.len() != header.log_entry_len as usize {
            return Err(StratumError::InvalidArgument(
                "payload length does not match header",
            ));
        }

        let payload = match header.log_type {
            LogEntryType::Error | LogEntryType::MtrBegin | LogEntryType::MtrRollback => {
                if !payload.is_empty() {
                    return Err(StratumError::InvalidArgument(
                        "unexpected payload on mtr entry",
                    ));
                }
                LogPayload::Mtr
            }
            LogEntryType::MtrCommit => {
                let bytes: [u8; 4] = payload
                    .try_into()
                    .map_err(|_| StratumError::InvalidArgument("malformed commit payload"))?;
                LogPayload::Commit {
                    commit_xid: i32::from_le_bytes(bytes),
                }
            }
            LogEntryType::Insert | LogEntryType::Delete | LogEntryType::Update => {
                if payload.len() < RECORD_PAYLOAD_FIXED_SIZE {
                    return Err(StratumError::InvalidArgument("malformed record payload"));
                }
                let table_id = i32::from_le_bytes(payload[0..4].try_into().unwrap());
                let page_num = u32::from_le_bytes(payload[4..8].try_into().unwrap());
                let slot_num = u32::from_le_bytes(payload[8..12].try_into().unwrap());
                let data_offset = i32::from_le_bytes(payload[12..16].try_into().unwrap());
                let data_len = i32::from_le_bytes(payload[16..20].try_into().unwrap());
                if data_len < 0
                    || payload.len() - RECORD_PAYLOAD_FIXED_SIZE != data_len as usize
                {
                    return Err(StratumError::InvalidArgument(
                        "record data length does not match payload",
                    ));
                }
                LogPayload::Record(RecordPayload {
                    table_id,
                    rid: Rid::new(page_num, slot_num),
                    data_offset,
                    data: payload[RECORD_PAYLOAD_FIXED_SIZE..].to_vec(),
                })
            }
        };

        Ok(Self { header, payload })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogEntry({}, trx={}, lsn={}, len={})",
            self.header.log_type, self.header.trx_id, self.header.lsn, self.header.log_entry_len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(entry: &LogEntry) -> LogEntry {
        let bytes = entry.encode();
        let header_bytes: [u8; LOG_ENTRY_HEADER_SIZE] =
            bytes[..LOG_ENTRY_HEADER_SIZE].try_into().unwrap();
        let header = LogEntryHeader::decode(&header_bytes).unwrap();
        LogEntry::decode(header, &bytes[LOG_ENTRY_HEADER_SIZE..]).unwrap()
    }

    #[test]
    fn test_mtr_entry_round_trip() {
        let entry = LogEntry::mtr(LogEntryType::MtrBegin, 12).unwrap();
        assert_eq!(entry.serialized_len(), LOG_ENTRY_HEADER_SIZE);
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_commit_entry_round_trip() {
        let mut entry = LogEntry::commit(12, 99);
        entry.set_lsn(41);
        let decoded = round_trip(&entry);
        assert_eq!(decoded.lsn(), 41);
        assert_eq!(
            decoded.payload(),
            &LogPayload::Commit { commit_xid: 99 }
        );
    }

    #[test]
    fn test_record_entry_round_trip() {
        let entry = LogEntry::record(
            LogEntryType::Insert,
            3,
            17,
            Rid::new(5, 2),
            8,
            b"row bytes",
        )
        .unwrap();
        let decoded = round_trip(&entry);
        assert_eq!(decoded, entry);
        match decoded.payload() {
            LogPayload::Record(record) => {
                assert_eq!(record.table_id, 17);
                assert_eq!(record.rid, Rid::new(5, 2));
                assert_eq!(record.data_offset, 8);
                assert_eq!(record.data, b"row bytes");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let mut entry = LogEntry::commit(0x0102_0304, 0x0A0B_0C0D);
        entry.set_lsn(7);
        let bytes = entry.encode();

        assert_eq!(&bytes[0..2], &2u16.to_le_bytes()); // MTR_COMMIT
        assert_eq!(&bytes[2..6], &0x0102_0304i32.to_le_bytes());
        assert_eq!(&bytes[6..10], &4i32.to_le_bytes());
        assert_eq!(&bytes[10..18], &7i64.to_le_bytes());
        assert_eq!(&bytes[18..22], &0x0A0B_0C0Di32.to_le_bytes());
    }

    #[test]
    fn test_mtr_builder_rejects_other_types() {
        assert!(LogEntry::mtr(LogEntryType::Insert, 1).is_err());
        assert!(LogEntry::mtr(LogEntryType::MtrCommit, 1).is_err());
    }

    #[test]
    fn test_record_builder_rejects_marker_types() {
        let result = LogEntry::record(
            LogEntryType::MtrBegin,
            1,
            1,
            Rid::new(0, 0),
            0,
            b"",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let entry = LogEntry::commit(1, 2);
        let bytes = entry.encode();
        let header_bytes: [u8; LOG_ENTRY_HEADER_SIZE] =
            bytes[..LOG_ENTRY_HEADER_SIZE].try_into().unwrap();
        let header = LogEntryHeader::decode(&header_bytes).unwrap();

        // Truncated payload must not decode.
        assert!(LogEntry::decode(header, &bytes[LOG_ENTRY_HEADER_SIZE..20]).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut buf = [0u8; LOG_ENTRY_HEADER_SIZE];
        buf[0..2].copy_from_slice(&999u16.to_le_bytes());
        assert!(LogEntryHeader::decode(&buf).is_err());
    }
}
