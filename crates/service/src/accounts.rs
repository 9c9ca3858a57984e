//! Registration and login on top of the `users` collection.
//!
//! Passwords are stored and compared as given; there is no hashing here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::errors::ServiceError;
pub use crate::storage::PASSWORD;
use crate::storage::{Collection, Record, RecordStore};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub user: Record,
    pub access_token: String,
    pub token_type: &'static str,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::missing_field(field))
}

/// User as exposed over the API: everything but the password.
pub fn public_view(user: &Record) -> Record {
    user.without(&[PASSWORD])
}

pub fn avatar_url(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", seed)
}

/// Create a user. Email must be unused.
pub async fn register(store: &RecordStore, input: RegisterInput) -> Result<Record, ServiceError> {
    let email = required(&input.email, "email")?.to_string();
    let password = required(&input.password, PASSWORD)?.to_string();
    let name = required(&input.full_name, "full_name")?.to_string();

    let user = store
        .transact(move |doc, now| {
            let taken = Value::String(email.clone());
            if doc.find_by_field(Collection::Users, "email", &taken).is_some() {
                return Err(ServiceError::Conflict("user already exists with this email".into()));
            }
            let mut fields = Map::new();
            fields.insert("name".into(), Value::String(name));
            fields.insert("profilePhoto".into(), Value::String(avatar_url(&email)));
            fields.insert("email".into(), Value::String(email));
            fields.insert(PASSWORD.into(), Value::String(password));
            fields.insert("role".into(), Value::String("user".into()));
            doc.insert(Collection::Users, fields, now)
        })
        .await?;
    info!(user_id = ?user.id, "user registered");
    Ok(public_view(&user))
}

/// Check credentials and hand out a bearer token.
pub async fn login(store: &RecordStore, input: LoginInput) -> Result<Session, ServiceError> {
    let missing = || ServiceError::Validation("missing email or password".into());
    // same normalisation as `register`
    let email = input.email.as_deref().map(str::trim).filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let password = input.password.as_deref().filter(|s| !s.is_empty()).ok_or_else(missing)?;

    let invalid = || ServiceError::Unauthorized("invalid email or password".into());
    let user = store
        .find_by_field(Collection::Users, "email", &Value::String(email.to_string()))
        .await
        .ok_or_else(invalid)?;
    if user.get_str(PASSWORD) != Some(password) {
        return Err(invalid());
    }
    let id = user.id.ok_or_else(invalid)?;

    info!(user_id = id, "user logged in");
    Ok(Session {
        user: public_view(&user),
        access_token: format!("token_{}_{}", id, Utc::now().timestamp()),
        token_type: "bearer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn store() -> Arc<RecordStore> {
        RecordStore::new(Arc::new(MemoryStorage::new()), true)
    }

    fn reg(email: &str, password: &str, name: &str) -> RegisterInput {
        RegisterInput {
            email: Some(email.into()),
            password: Some(password.into()),
            full_name: Some(name.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let store = store();
        let user = register(&store, reg("c@x.com", "pw", "C")).await.unwrap();
        assert_eq!(user.id, Some(2));
        assert_eq!(user.get_str("name"), Some("C"));
        assert_eq!(user.get_str("role"), Some("user"));
        assert!(user.get("password").is_none());

        let stored = store.find_by_id(Collection::Users, 2).await.unwrap();
        assert_eq!(stored.get_str("password"), Some("pw"));

        let session = login(&store, LoginInput { email: Some("c@x.com".into()), password: Some("pw".into()) })
            .await
            .unwrap();
        assert!(session.access_token.starts_with("token_2_"));
        assert_eq!(session.token_type, "bearer");
        assert!(session.user.get("password").is_none());
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let store = store();
        let mut input = reg("d@x.com", "pw", "D");
        input.full_name = None;
        assert!(matches!(register(&store, input).await, Err(ServiceError::Validation(_))));
        let mut input = reg("d@x.com", "pw", "D");
        input.password = Some("   ".into());
        assert!(matches!(register(&store, input).await, Err(ServiceError::Validation(_))));
        assert_eq!(store.list(Collection::Users).await.len(), 1);
    }

    #[tokio::test]
    async fn login_trims_email_like_register() {
        let store = store();
        register(&store, reg(" f@x.com ", "pw", "F")).await.unwrap();
        let same = LoginInput { email: Some(" f@x.com ".into()), password: Some("pw".into()) };
        assert!(login(&store, same).await.is_ok());
        let bare = LoginInput { email: Some("f@x.com".into()), password: Some("pw".into()) };
        assert!(login(&store, bare).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = store();
        let err = register(&store, reg("alex@example.com", "pw", "Alex")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let store = store();
        register(&store, reg("e@x.com", "right", "E")).await.unwrap();

        let wrong = LoginInput { email: Some("e@x.com".into()), password: Some("wrong".into()) };
        assert!(matches!(login(&store, wrong).await, Err(ServiceError::Unauthorized(_))));
        let unknown = LoginInput { email: Some("nobody@x.com".into()), password: Some("right".into()) };
        assert!(matches!(login(&store, unknown).await, Err(ServiceError::Unauthorized(_))));
        // seeded demo user has no password at all
        let demo = LoginInput { email: Some("alex@example.com".into()), password: Some("x".into()) };
        assert!(matches!(login(&store, demo).await, Err(ServiceError::Unauthorized(_))));
        assert!(matches!(login(&store, LoginInput::default()).await, Err(ServiceError::Validation(_))));
    }
}
