//! Tuples conforming to a `TupleDesc`.

use std::fmt;

use crate::field::{Field, FieldType};
use crate::page_id::RecordId;

#[derive(Clone, Debug)]
pub struct FieldDesc {
    pub field_type: FieldType,
    pub field_name: Option<String>,
}

impl FieldDesc {
    pub fn new(field_type: FieldType, field_name: Option<&str>) -> FieldDesc {
        FieldDesc {
            field_type,
            field_name: field_name.map(|s| s.to_string()),
        }
    }
}

impl PartialEq for FieldDesc {
    fn eq(&self, other: &Self) -> bool {
        self.field_type == other.field_type
    }
}

/// Ordered sequence of (field_type, optional field_name).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TupleDesc {
    fields: Vec<FieldDesc>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldDesc>) -> TupleDesc {
        TupleDesc { fields }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_type(&self, i: usize) -> FieldType {
        self.fields[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.fields[i].field_name.as_deref()
    }

    pub fn fields(&self) -> &[FieldDesc] {
        &self.fields
    }

    /// Size, in bytes, of a tuple conforming to this schema.
    pub fn tuple_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.byte_len()).sum()
    }

    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.clone());
        TupleDesc { fields }
    }
}

/// A value conforming to a `TupleDesc`; carries an optional `RecordId` set
/// by the storage layer once the tuple has a home on disk.
#[derive(Clone, Debug)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Tuple {
        debug_assert_eq!(desc.num_fields(), fields.len());
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn set_field(&mut self, i: usize, field: Field) {
        self.fields[i] = field;
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.desc.tuple_size());
        for field in &self.fields {
            buf.extend(field.serialize());
        }
        buf
    }

    pub fn deserialize(desc: &TupleDesc, bytes: &[u8]) -> Tuple {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for fd in desc.fields() {
            let len = fd.field_type.byte_len();
            fields.push(Field::deserialize(fd.field_type, &bytes[offset..offset + len]));
            offset += len;
        }
        Tuple {
            desc: desc.clone(),
            fields,
            record_id: None,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|c| c.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
