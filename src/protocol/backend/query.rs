//! Query-related backend messages.

use std::mem::size_of;

use bytes::Bytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::{expect_consumed, read_bytes, read_cstr, read_i32, read_u16};
use crate::protocol::types::{Format, Oid};

/// Fixed-size tail of a field description (18 bytes).
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct FieldDescriptionTail {
    table_oid: U32BE,
    column_id: I16BE,
    type_oid: U32BE,
    type_size: I16BE,
    type_modifier: I32BE,
    format: U16BE,
}

/// Field description within a RowDescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// Field name
    pub name: String,
    /// Table OID (0 if not a table column)
    pub table_oid: Oid,
    /// Column attribute number (0 if not a table column)
    pub column_id: i16,
    /// Data type OID
    pub type_oid: Oid,
    /// Type size (-1 for variable, -2 for null-terminated)
    pub type_size: i16,
    /// Type modifier (type-specific)
    pub type_modifier: i32,
    /// Wire format of this column's values
    pub format: Format,
}

/// RowDescription message - describes the columns in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDescription {
    fields: Vec<FieldDescription>,
}

impl RowDescription {
    /// Create a description from field descriptions.
    pub fn new(fields: Vec<FieldDescription>) -> Self {
        Self { fields }
    }

    /// Parse a RowDescription message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        const TAIL_SIZE: usize = size_of::<FieldDescriptionTail>();

        let (num_fields, mut data) = read_u16(payload)?;
        let mut fields = Vec::with_capacity(num_fields as usize);

        for _ in 0..num_fields {
            let (name, rest) = read_cstr(data)?;
            let (tail, rest) = FieldDescriptionTail::read_from_prefix(rest).map_err(|_| {
                Error::ProtocolDecode(format!(
                    "FieldDescription: need {} bytes, got {}",
                    TAIL_SIZE,
                    rest.len()
                ))
            })?;

            fields.push(FieldDescription {
                name: name.to_owned(),
                table_oid: tail.table_oid.get(),
                column_id: tail.column_id.get(),
                type_oid: tail.type_oid.get(),
                type_size: tail.type_size.get(),
                type_modifier: tail.type_modifier.get(),
                format: Format::from_u16(tail.format.get())?,
            });
            data = rest;
        }
        expect_consumed("RowDescription", data)?;

        Ok(Self { fields })
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get field descriptions.
    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }

    /// Position of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// DataRow message - contains a single row of data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
    columns: Vec<Option<Bytes>>,
}

impl DataRow {
    /// Create a row from column values. `None` is NULL.
    pub fn new(columns: Vec<Option<Bytes>>) -> Self {
        Self { columns }
    }

    /// Parse a DataRow message from payload bytes.
    pub fn parse(payload: &Bytes) -> Result<Self> {
        let (num_columns, mut data) = read_u16(payload)?;
        let mut columns = Vec::with_capacity(num_columns as usize);

        for _ in 0..num_columns {
            let (len, rest) = read_i32(data)?;
            match len {
                -1 => {
                    columns.push(None);
                    data = rest;
                }
                len if len < -1 => {
                    return Err(Error::ProtocolDecode(format!(
                        "DataRow: invalid column length {}",
                        len
                    )));
                }
                len => {
                    let (value, rest) = read_bytes(rest, len as usize)?;
                    columns.push(Some(payload.slice_ref(value)));
                    data = rest;
                }
            }
        }
        expect_consumed("DataRow", data)?;

        Ok(Self { columns })
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column value by index.
    ///
    /// Returns `None` if the index is out of range, `Some(None)` for NULL.
    pub fn get(&self, index: usize) -> Option<Option<&[u8]>> {
        self.columns.get(index).map(Option::as_deref)
    }

    /// Iterate over column values.
    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> {
        self.columns.iter().map(Option::as_deref)
    }
}

/// CommandComplete message - indicates successful completion of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// Command tag (e.g., "SELECT 5", "INSERT 0 1", "UPDATE 10")
    pub tag: String,
}

impl CommandComplete {
    /// Create a CommandComplete with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Parse a CommandComplete message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (tag, rest) = read_cstr(payload)?;
        expect_consumed("CommandComplete", rest)?;
        Ok(Self {
            tag: tag.to_owned(),
        })
    }

    /// Parse the number of rows affected from the command tag.
    ///
    /// Returns `Some(count)` for commands like SELECT, INSERT, UPDATE, DELETE.
    /// Returns `None` for other commands or parse failures.
    pub fn rows_affected(&self) -> Option<u64> {
        let parts: Vec<&str> = self.tag.split_whitespace().collect();

        match parts.as_slice() {
            ["INSERT", _oid, count] => count.parse().ok(),
            ["SELECT" | "UPDATE" | "DELETE" | "COPY" | "MOVE" | "FETCH" | "MERGE", count] => {
                count.parse().ok()
            }
            _ => None,
        }
    }

    /// Get the command name from the tag.
    pub fn command(&self) -> Option<&str> {
        self.tag.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, type_oid: Oid, format: u16) -> Vec<u8> {
        let mut buf = name.as_bytes().to_vec();
        buf.push(0);
        buf.extend_from_slice(&0_u32.to_be_bytes());
        buf.extend_from_slice(&0_i16.to_be_bytes());
        buf.extend_from_slice(&type_oid.to_be_bytes());
        buf.extend_from_slice(&(-1_i16).to_be_bytes());
        buf.extend_from_slice(&(-1_i32).to_be_bytes());
        buf.extend_from_slice(&format.to_be_bytes());
        buf
    }

    #[test]
    fn row_description() {
        let mut payload = 2_u16.to_be_bytes().to_vec();
        payload.extend(field("id", 23, 1));
        payload.extend(field("name", 25, 0));

        let description = RowDescription::parse(&payload).unwrap();
        assert_eq!(description.len(), 2);
        assert_eq!(description.fields()[0].type_oid, 23);
        assert_eq!(description.fields()[0].format, Format::Binary);
        assert_eq!(description.index_of("name"), Some(1));
        assert_eq!(description.index_of("missing"), None);

        payload.push(0);
        assert!(RowDescription::parse(&payload).is_err());
    }

    #[test]
    fn data_row_with_null() {
        let mut payload = 3_u16.to_be_bytes().to_vec();
        payload.extend_from_slice(&1_i32.to_be_bytes());
        payload.push(b'7');
        payload.extend_from_slice(&(-1_i32).to_be_bytes());
        payload.extend_from_slice(&0_i32.to_be_bytes());

        let row = DataRow::parse(&Bytes::from(payload)).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(0), Some(Some(&b"7"[..])));
        assert_eq!(row.get(1), Some(None));
        assert_eq!(row.get(2), Some(Some(&b""[..])));
        assert_eq!(row.get(3), None);
    }

    #[test]
    fn data_row_truncated_value() {
        let mut payload = 1_u16.to_be_bytes().to_vec();
        payload.extend_from_slice(&4_i32.to_be_bytes());
        payload.extend_from_slice(b"ab");
        assert!(matches!(
            DataRow::parse(&Bytes::from(payload)),
            Err(Error::ProtocolDecode(_))
        ));
    }

    #[test]
    fn command_tags() {
        assert_eq!(CommandComplete::new("INSERT 0 3").rows_affected(), Some(3));
        assert_eq!(CommandComplete::new("SELECT 5").rows_affected(), Some(5));
        assert_eq!(CommandComplete::new("BEGIN").rows_affected(), None);
        assert_eq!(CommandComplete::new("COPY 2").command(), Some("COPY"));
    }
}
