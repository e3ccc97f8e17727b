//! Output records handed to the host.

use std::fmt;

use ferry_client::{DataType, Value};
use serde::{Deserialize, Serialize};

/// One field of an output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    /// Column name.
    pub name: String,
    /// Engine type tag.
    pub data_type: DataType,
    /// Value as read.
    pub value: Value,
}

/// A row as handed to the host: fields in table column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRecord {
    fields: Vec<OutputField>,
}

impl OutputRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all fields, keeping the allocation.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, data_type: DataType, value: Value) {
        self.fields.push(OutputField {
            name: name.into(),
            data_type,
            value,
        });
    }

    /// Returns the fields in column order.
    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at `index`.
    pub fn field(&self, index: usize) -> Option<&OutputField> {
        self.fields.get(index)
    }

    /// Returns the value of the column named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// Returns the values in column order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|field| &field.value)
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_order() {
        let mut record = OutputRecord::new();
        record.push("id", DataType::BigInt, Value::Int(7));
        record.push("name", DataType::Text, Value::from("ada"));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&Value::from("ada")));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.field(0).map(|f| f.name.as_str()), Some("id"));
        assert_eq!(record.to_string(), "{id: 7, name: 'ada'}");

        record.clear();
        assert!(record.is_empty());
    }

    #[test]
    fn test_serializes_as_field_list() {
        let mut record = OutputRecord::new();
        record.push("id", DataType::BigInt, Value::Int(1));

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "id");
    }
}
