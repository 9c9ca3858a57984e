//! The persisted document and the pure operations applied to it.
//!
//! Nothing here touches storage. Every mutation takes the timestamp to stamp,
//! so a load-modify-save cycle is `load` + one of these + `save`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::record::{Record, ID};
use crate::errors::ServiceError;

/// Foreign key linking a profile to its user.
pub const USER_ID: &str = "userId";

/// Kept on the user only; never mirrored onto the profile.
pub const PASSWORD: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Profiles,
    Readings,
    Alerts,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Profiles,
        Collection::Readings,
        Collection::Alerts,
        Collection::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Profiles => "profiles",
            Collection::Readings => "readings",
            Collection::Alerts => "alerts",
            Collection::Settings => "settings",
        }
    }

    /// Fields a caller must supply when creating an entry.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["email"],
            _ => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ServiceError::Validation(format!("unknown collection: {}", s)))
    }
}

/// Root persisted object. Missing or `null` collections read as empty;
/// unrecognised top-level keys are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<Record>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profiles: Vec<Record>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub readings: Vec<Record>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alerts: Vec<Record>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub settings: Vec<Record>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(d: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Record>>::deserialize(d)?.unwrap_or_default())
}

/// `max(id) + 1` over records carrying a valid id, `1` when there are none.
/// `None` once the largest id is `u64::MAX`.
pub fn next_id(records: &[Record]) -> Option<u64> {
    records.iter().filter_map(|r| r.id).max().unwrap_or(0).checked_add(1)
}

fn validate_required(collection: Collection, fields: &Map<String, Value>) -> Result<(), ServiceError> {
    for key in collection.required_fields() {
        let present = match fields.get(*key) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        if !present {
            return Err(ServiceError::missing_field(key));
        }
    }
    Ok(())
}

impl Document {
    /// Initial schema written when no document exists yet.
    pub fn seed(with_demo_user: bool, now: &str) -> Self {
        let mut doc = Document::default();
        if with_demo_user {
            let fields = match serde_json::json!({
                "name": "Alex Johnson",
                "email": "alex@example.com",
                "profilePhoto": "https://api.dicebear.com/7.x/avataaars/svg?seed=Alex",
                "role": "user",
                "phone": "+1234567890",
            }) {
                Value::Object(m) => m,
                _ => Map::new(),
            };
            doc.users.push(Record::new(1, fields, now));
        }
        doc
    }

    pub fn collection(&self, c: Collection) -> &Vec<Record> {
        match c {
            Collection::Users => &self.users,
            Collection::Profiles => &self.profiles,
            Collection::Readings => &self.readings,
            Collection::Alerts => &self.alerts,
            Collection::Settings => &self.settings,
        }
    }

    pub fn collection_mut(&mut self, c: Collection) -> &mut Vec<Record> {
        match c {
            Collection::Users => &mut self.users,
            Collection::Profiles => &mut self.profiles,
            Collection::Readings => &mut self.readings,
            Collection::Alerts => &mut self.alerts,
            Collection::Settings => &mut self.settings,
        }
    }

    pub fn counts(&self) -> Vec<(Collection, usize)> {
        Collection::ALL.into_iter().map(|c| (c, self.collection(c).len())).collect()
    }

    pub fn find_by_id(&self, c: Collection, id: u64) -> Option<&Record> {
        self.find_by(c, |r| r.id == Some(id))
    }

    /// First match in insertion order.
    pub fn find_by<F>(&self, c: Collection, pred: F) -> Option<&Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.collection(c).iter().find(|r| pred(*r))
    }

    pub fn find_by_field(&self, c: Collection, key: &str, value: &Value) -> Option<&Record> {
        self.find_by(c, |r| field_matches(r, key, value))
    }

    /// Append a new record with a fresh id. Rejects missing required fields
    /// and a second profile for the same user before touching the collection.
    pub fn insert(&mut self, c: Collection, fields: Map<String, Value>, now: &str) -> Result<Record, ServiceError> {
        validate_required(c, &fields)?;
        if c == Collection::Profiles {
            self.check_profile_owner(&fields, None)?;
        }
        self.append(c, fields, now)
    }

    fn append(&mut self, c: Collection, fields: Map<String, Value>, now: &str) -> Result<Record, ServiceError> {
        let records = self.collection_mut(c);
        let id = next_id(records).ok_or_else(|| ServiceError::Conflict(format!("no ids left in {}", c)))?;
        let rec = Record::new(id, fields, now);
        records.push(rec.clone());
        Ok(rec)
    }

    // one profile per user: `userId` may not point at a user another profile already has
    fn check_profile_owner(&self, fields: &Map<String, Value>, own_id: Option<u64>) -> Result<(), ServiceError> {
        let Some(owner) = fields.get(USER_ID).filter(|v| !v.is_null()) else {
            return Ok(());
        };
        let taken = self
            .profiles
            .iter()
            .any(|p| p.id != own_id && p.get(USER_ID) == Some(owner));
        if taken {
            return Err(ServiceError::Conflict(format!("user {} already has a profile", owner)));
        }
        Ok(())
    }

    /// Merge `fields` into the record with `id`. `Ok(None)` when there is no
    /// such record. No cross-collection effects.
    pub fn update(
        &mut self,
        c: Collection,
        id: u64,
        fields: Map<String, Value>,
        now: &str,
    ) -> Result<Option<Record>, ServiceError> {
        if self.find_by_id(c, id).is_none() {
            return Ok(None);
        }
        if c == Collection::Profiles {
            self.check_profile_owner(&fields, Some(id))?;
        }
        let Some(rec) = self.collection_mut(c).iter_mut().find(|r| r.id == Some(id)) else {
            return Ok(None);
        };
        rec.merge(fields);
        rec.touch(now);
        Ok(Some(rec.clone()))
    }

    /// Merge into the first record whose `key` equals `value`, or append a new
    /// one carrying `key: value`.
    pub fn upsert_by(
        &mut self,
        c: Collection,
        key: &str,
        value: Value,
        mut fields: Map<String, Value>,
        now: &str,
    ) -> Result<Record, ServiceError> {
        fields.remove(key);
        if let Some(rec) = self.collection_mut(c).iter_mut().find(|r| field_matches(r, key, &value)) {
            rec.merge(fields);
            rec.touch(now);
            return Ok(rec.clone());
        }
        fields.insert(key.to_string(), value);
        self.append(c, fields, now)
    }

    /// Update a user and mirror the same fields, minus the password, onto its
    /// profile, creating the profile on first update. Returns the updated user.
    pub fn update_user(&mut self, id: u64, fields: Map<String, Value>, now: &str) -> Result<Option<Record>, ServiceError> {
        if self.find_by_id(Collection::Users, id).is_none() {
            return Ok(None);
        }
        let mut mirrored = fields.clone();
        mirrored.remove(PASSWORD);
        // profile first: it is the only step that can fail
        self.upsert_by(Collection::Profiles, USER_ID, Value::from(id), mirrored, now)?;
        self.update(Collection::Users, id, fields, now)
    }

    /// `update`, plus profile propagation when the target is `users`.
    pub fn apply_update(
        &mut self,
        c: Collection,
        id: u64,
        fields: Map<String, Value>,
        now: &str,
    ) -> Result<Option<Record>, ServiceError> {
        match c {
            Collection::Users => self.update_user(id, fields, now),
            _ => self.update(c, id, fields, now),
        }
    }
}

fn field_matches(rec: &Record, key: &str, value: &Value) -> bool {
    if key == ID {
        return value.as_u64().is_some_and(|v| rec.id == Some(v));
    }
    rec.get(key) == Some(value)
}
