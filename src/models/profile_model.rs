use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::registration_model::{Role, ValidatedRegistration};

pub const USERS_COLLECTION: &str = "users";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Fields that only exist for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
    Patient {
        dob: String,
        #[serde(rename = "emergencyContact")]
        emergency_contact: String,
    },
    Doctor {
        license: String,
        specialization: String,
    },
}

impl RoleProfile {
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Patient => RoleProfile::Patient {
                dob: String::new(),
                emergency_contact: String::new(),
            },
            Role::Doctor => RoleProfile::Doctor {
                license: String::new(),
                specialization: String::new(),
            },
        }
    }
}

/// Application profile stored under `users/<lower-cased email>`.
///
/// `createdAt` is not a field here: the store stamps it on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub uid: String,
    pub full_name: String,
    pub email: String,
    pub contact: String,
    #[serde(flatten)]
    pub details: RoleProfile,
    pub verified: bool,
}

impl ProfileRecord {
    pub fn new(uid: impl Into<String>, registration: &ValidatedRegistration) -> Self {
        Self {
            uid: uid.into(),
            full_name: registration.full_name.clone(),
            email: registration.normalized_email(),
            contact: registration.contact.clone(),
            details: RoleProfile::empty(registration.role),
            verified: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.email
    }

    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(serde::ser::Error::custom(format!(
                "profile serialized to {other}, expected an object"
            ))),
        }
    }

    pub fn into_write(self) -> Result<DocumentWrite, serde_json::Error> {
        Ok(DocumentWrite {
            collection: USERS_COLLECTION.to_string(),
            key: self.email.clone(),
            fields: self.to_fields()?,
            server_timestamp_field: Some(CREATED_AT_FIELD.to_string()),
            auth_token: None,
        })
    }
}

/// A create-or-overwrite write of one document.
#[derive(Clone, PartialEq)]
pub struct DocumentWrite {
    pub collection: String,
    pub key: String,
    pub fields: Map<String, Value>,
    /// Field the store fills with its own clock.
    pub server_timestamp_field: Option<String>,
    /// Session token of the account the write is made for.
    pub auth_token: Option<String>,
}

impl DocumentWrite {
    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token;
        self
    }
}

impl fmt::Debug for DocumentWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentWrite")
            .field("collection", &self.collection)
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("server_timestamp_field", &self.server_timestamp_field)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
