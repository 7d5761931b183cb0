use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Attribute name to value mapping held by a record.
pub type Attributes = Map<String, Value>;

/// A single in-memory record of some record type.
///
/// Records are plain values: reading one out of a store hands back a copy,
/// and changes only become visible to other readers once the record is
/// saved back through its repository.
#[derive(Debug, Clone)]
pub struct Record {
    kind: String,
    id: Option<String>,
    attributes: Attributes,
    /// Nested relation data waiting for this record's id.
    staged: Vec<(String, Value)>,
}

impl Record {
    pub fn new(kind: impl Into<String>) -> Self {
        Record {
            kind: kind.into(),
            id: None,
            attributes: Attributes::new(),
            staged: Vec::new(),
        }
    }

    pub fn with_id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        let mut record = Record::new(kind);
        record.id = Some(id.into());
        record
    }

    /// Name of the record type this record belongs to.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String value of an attribute. `null` and non-string values read as `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute to `null`, keeping it part of the record.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.attributes.insert(name.into(), Value::Null);
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn stage(&mut self, name: impl Into<String>, payload: Value) {
        let name = name.into();
        self.staged.retain(|(staged, _)| *staged != name);
        self.staged.push((name, payload));
    }

    pub(crate) fn take_staged(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.staged)
    }

    /// Whether nested relation data is waiting for this record's first save.
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Copy of this record without any staged relation data, as kept in storage.
    pub(crate) fn stored(&self) -> Record {
        Record {
            kind: self.kind.clone(),
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            staged: Vec::new(),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id && self.attributes == other.attributes
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.attributes.len() + usize::from(self.id.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
