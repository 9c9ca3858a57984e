use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Keys owned by the store; caller-supplied values for them are ignored on merge.
pub const RESERVED_KEYS: [&str; 3] = [ID, CREATED_AT, UPDATED_AT];

/// One entry of a collection.
///
/// `id` and the two timestamps are lifted out of the JSON object; everything
/// else stays in `fields` untouched. An `id` that is not a positive integer is
/// left in `fields` as-is, so it survives a load/save cycle without counting
/// as an identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record {
    pub id: Option<u64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub fields: Map<String, Value>,
}

impl Record {
    /// Fresh record with an assigned id, both timestamps set to `now`.
    pub fn new(id: u64, fields: Map<String, Value>, now: &str) -> Self {
        let mut rec = Record {
            id: Some(id),
            created_at: Some(now.to_string()),
            updated_at: Some(now.to_string()),
            fields: Map::new(),
        };
        rec.merge(fields);
        rec
    }

    /// Shallow merge: top-level keys overwrite, absent keys are left alone.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (k, v) in fields {
            if RESERVED_KEYS.contains(&k.as_str()) {
                continue;
            }
            self.fields.insert(k, v);
        }
    }

    pub fn touch(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Copy of this record with the named fields dropped.
    pub fn without(&self, keys: &[&str]) -> Record {
        let mut out = self.clone();
        out.fields.retain(|k, _| !keys.contains(&k.as_str()));
        out
    }

    pub fn to_value(&self) -> Value {
        Value::Object(Map::from(self.clone()))
    }
}

fn valid_id(v: &Value) -> Option<u64> {
    v.as_u64().filter(|n| *n > 0)
}

impl From<Map<String, Value>> for Record {
    fn from(mut map: Map<String, Value>) -> Self {
        let id = match map.get(ID).and_then(valid_id) {
            Some(id) => {
                map.remove(ID);
                Some(id)
            }
            None => None,
        };
        let mut take_str = |key: &str| {
            if !matches!(map.get(key), Some(Value::String(_))) {
                return None;
            }
            match map.remove(key) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            }
        };
        let created_at = take_str(CREATED_AT);
        let updated_at = take_str(UPDATED_AT);
        Record { id, created_at, updated_at, fields: map }
    }
}

impl From<Record> for Map<String, Value> {
    fn from(rec: Record) -> Self {
        let mut map = Map::new();
        if let Some(id) = rec.id {
            map.insert(ID.into(), Value::from(id));
        }
        map.extend(rec.fields);
        if let Some(ts) = rec.created_at {
            map.insert(CREATED_AT.into(), Value::String(ts));
        }
        if let Some(ts) = rec.updated_at {
            map.insert(UPDATED_AT.into(), Value::String(ts));
        }
        map
    }
}
