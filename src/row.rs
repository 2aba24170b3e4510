//! Decoded result rows.

use std::fmt;
use std::sync::Arc;

use crate::conversion::{Codecs, FromValue, Value};
use crate::error::{Error, Result};
use crate::protocol::backend::query::{DataRow, FieldDescription, RowDescription};

/// One row of a result set.
///
/// Column bytes stay in the received frame until a column is requested; each
/// access decodes through the connection's [`Codecs`].
#[derive(Clone)]
pub struct Row {
    columns: Arc<RowDescription>,
    data: DataRow,
    codecs: Arc<Codecs>,
}

impl Row {
    /// Pair a data row with the description that preceded it.
    ///
    /// Fails if the column counts disagree.
    pub fn new(columns: Arc<RowDescription>, data: DataRow, codecs: Arc<Codecs>) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(Error::ProtocolDecode(format!(
                "row has {} values but description has {} columns",
                data.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            data,
            codecs,
        })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column metadata.
    pub fn columns(&self) -> &[FieldDescription] {
        self.columns.fields()
    }

    /// Decode column `index` into a [`Value`].
    pub fn value(&self, index: usize) -> Result<Value> {
        let field = self.columns.fields().get(index).ok_or_else(|| {
            Error::invalid_argument(format!(
                "column index {} out of range for {} columns",
                index,
                self.len()
            ))
        })?;
        let bytes = self.data.get(index).flatten();
        self.codecs.decode(bytes, field.type_oid, field.format)
    }

    /// Decode column `index` into `T`.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        T::from_value(self.value(index)?)
    }

    /// Decode the first column named `name` into `T`.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .columns
            .index_of(name)
            .ok_or_else(|| Error::invalid_argument(format!("no column named {:?}", name)))?;
        self.get(index)
    }

    /// Raw column bytes; `None` for SQL NULL or an out-of-range index.
    pub fn raw(&self, index: usize) -> Option<&[u8]> {
        self.data.get(index).flatten()
    }

    /// Decode the whole row into `T`.
    pub fn decode<T: FromRow>(&self) -> Result<T> {
        T::from_row(self)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (index, field) in self.columns().iter().enumerate() {
            match self.value(index) {
                Ok(value) => list.entry(&field.name, &value),
                Err(_) => list.entry(&field.name, &self.raw(index)),
            };
        }
        list.finish()
    }
}

/// Conversion of a whole [`Row`] into a Rust type.
pub trait FromRow: Sized {
    /// Decode a row.
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Vec<Value> {
    fn from_row(row: &Row) -> Result<Self> {
        (0..row.len()).map(|index| row.value(index)).collect()
    }
}

macro_rules! impl_from_row_tuple {
    ($count:literal; $($t:ident => $idx:tt),+) => {
        impl<$($t: FromValue),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> Result<Self> {
                if row.len() != $count {
                    return Err(Error::Decode(format!(
                        "expected {} columns, row has {}",
                        $count,
                        row.len()
                    )));
                }
                Ok(($(row.get::<$t>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(1; T0 => 0);
impl_from_row_tuple!(2; T0 => 0, T1 => 1);
impl_from_row_tuple!(3; T0 => 0, T1 => 1, T2 => 2);
impl_from_row_tuple!(4; T0 => 0, T1 => 1, T2 => 2, T3 => 3);
impl_from_row_tuple!(5; T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4);
impl_from_row_tuple!(6; T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5);
impl_from_row_tuple!(7; T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6);
impl_from_row_tuple!(8; T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6, T7 => 7);

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::types::{Format, oid};

    fn field(name: &str, type_oid: u32, format: Format) -> FieldDescription {
        FieldDescription {
            name: name.into(),
            table_oid: 0,
            column_id: 0,
            type_oid,
            type_size: -1,
            type_modifier: -1,
            format,
        }
    }

    fn sample() -> Row {
        let columns = Arc::new(RowDescription::new(vec![
            field("id", oid::INT4, Format::Binary),
            field("name", oid::VARCHAR, Format::Text),
            field("note", oid::TEXT, Format::Text),
        ]));
        let data = DataRow::new(vec![
            Some(Bytes::from_static(&[0, 0, 0, 7])),
            Some(Bytes::from_static(b"alice")),
            None,
        ]);
        Row::new(columns, data, Arc::new(Codecs::default())).unwrap()
    }

    #[test]
    fn get_by_index_and_name() {
        let row = sample();
        assert_eq!(row.get::<i32>(0).unwrap(), 7);
        assert_eq!(row.get_by_name::<String>("name").unwrap(), "alice");
        assert_eq!(row.get::<Option<String>>(2).unwrap(), None);
        assert!(row.get::<String>(2).is_err());
    }

    #[test]
    fn out_of_range_and_unknown_name() {
        let row = sample();
        assert!(matches!(row.value(3), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            row.get_by_name::<i32>("missing"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn decode_tuple() {
        let row = sample();
        let (id, name, note): (i64, String, Option<String>) = row.decode().unwrap();
        assert_eq!((id, name.as_str(), note), (7, "alice", None));
        assert!(row.decode::<(i32, String)>().is_err());
    }

    #[test]
    fn mismatched_column_count() {
        let columns = Arc::new(RowDescription::new(vec![field("a", oid::INT4, Format::Text)]));
        let data = DataRow::new(vec![None, None]);
        assert!(Row::new(columns, data, Arc::new(Codecs::default())).is_err());
    }
}
