use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use formforge_core::{ids::DocumentId, tree::FieldTree};

use crate::error::StorageError;
use crate::traits::{checksum, decode_tree, encode_tree, DocumentRecord, DocumentStore};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

const RECORD_COLUMNS: &str = "document_id, revision, checksum, node_count, saved_at";

fn read_record(row: &rusqlite::Row) -> Result<DocumentRecord, StorageError> {
    let document_id_bytes: Vec<u8> = row.get(0)?;
    let revision: i64 = row.get(1)?;
    let checksum_bytes: Vec<u8> = row.get(2)?;
    let node_count: i64 = row.get(3)?;
    let saved_at: i64 = row.get(4)?;

    Ok(DocumentRecord {
        document_id: DocumentId::from_bytes(to_array::<16>(document_id_bytes, "document_id")?),
        revision: revision as u64,
        checksum: to_array::<32>(checksum_bytes, "checksum")?,
        node_count: node_count as u64,
        saved_at,
    })
}

impl DocumentStore for SqliteStorage {
    fn save(
        &mut self,
        document_id: DocumentId,
        tree: &FieldTree,
    ) -> Result<DocumentRecord, StorageError> {
        let bytes = encode_tree(tree)?;
        let sum = checksum(&bytes);

        // revision only moves when the stored content actually changes
        self.conn.execute(
            "INSERT INTO documents (document_id, tree, checksum, node_count) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (document_id) DO UPDATE SET
                tree = excluded.tree,
                revision = documents.revision + (documents.checksum != excluded.checksum),
                checksum = excluded.checksum,
                node_count = excluded.node_count,
                saved_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            rusqlite::params![
                document_id.as_bytes().as_slice(),
                bytes,
                &sum[..],
                tree.len() as i64,
            ],
        )?;

        let record = self.record(document_id)?.ok_or_else(|| StorageError::Corrupt {
            document_id: document_id.to_string(),
            reason: "row missing after save".into(),
        })?;
        tracing::debug!(
            document_id = %document_id,
            revision = record.revision,
            nodes = record.node_count,
            bytes = bytes.len(),
            "saved document"
        );
        Ok(record)
    }

    fn load(&self, document_id: DocumentId) -> Result<Option<FieldTree>, StorageError> {
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT tree, checksum FROM documents WHERE document_id = ?1",
                rusqlite::params![document_id.as_bytes().as_slice()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((bytes, stored_sum)) = row else {
            return Ok(None);
        };
        if checksum(&bytes)[..] != stored_sum[..] {
            return Err(StorageError::Corrupt {
                document_id: document_id.to_string(),
                reason: "checksum mismatch".into(),
            });
        }
        Ok(Some(decode_tree(&bytes)?))
    }

    fn record(&self, document_id: DocumentId) -> Result<Option<DocumentRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM documents WHERE document_id = ?1"
        ))?;
        let mut rows = stmt.query(rusqlite::params![document_id.as_bytes().as_slice()])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_record(row)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, document_id: DocumentId) -> Result<bool, StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE document_id = ?1",
            rusqlite::params![document_id.as_bytes().as_slice()],
        )?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<DocumentRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM documents ORDER BY saved_at, document_id"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_record(row)?);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}
