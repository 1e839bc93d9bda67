use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::config::FirebaseConfig;
use crate::error::ExternalError;
use crate::models::profile_model::DocumentWrite;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the document or replaces it wholesale.
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError>;
}

/// Encodes a JSON value in Firestore's typed-value form.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": to_firestore_fields(fields) } }),
    }
}

pub fn to_firestore_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), to_firestore_value(value)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorBody {
    error: FirestoreErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorDetail {
    #[serde(default)]
    message: String,
}

/// Cloud Firestore through its REST `documents:commit` endpoint.
pub struct FirestoreDocuments {
    client: reqwest::Client,
    project_id: String,
    firestore_url: String,
}

impl FirestoreDocuments {
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            client,
            project_id: config.project_id.clone(),
            firestore_url: config.firestore_url.trim_end_matches('/').to_string(),
        }
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    /// Body of a commit that overwrites one document and stamps the
    /// server timestamp field, if any.
    pub fn commit_body(&self, write: &DocumentWrite) -> Value {
        let name = format!("{}/{}/{}", self.database_path(), write.collection, write.key);
        let mut entry = json!({
            "update": { "name": name, "fields": to_firestore_fields(&write.fields) }
        });
        if let Some(field) = &write.server_timestamp_field {
            entry["updateTransforms"] =
                json!([{ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }]);
        }
        json!({ "writes": [entry] })
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocuments {
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
        let url = format!("{}/{}:commit", self.firestore_url, self.database_path());
        let mut request = self.client.post(url).json(&self.commit_body(&write));
        if let Some(token) = &write.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        match response.json::<FirestoreErrorBody>().await {
            Ok(body) if !body.error.message.is_empty() => Err(ExternalError::new(body.error.message)),
            _ => Err(ExternalError::new(format!(
                "Firestore write failed with status {}",
                status.as_u16()
            ))),
        }
    }
}

/// Documents as JSONB rows keyed by collection and key.
pub struct PostgresDocuments {
    db: PgPool,
}

impl PostgresDocuments {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocuments {
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
        sqlx::query(
            "INSERT INTO documents (collection, key, fields, updated_at)
             VALUES (
                 $1,
                 $2,
                 CASE WHEN $4::TEXT IS NULL THEN $3::JSONB
                      ELSE $3::JSONB || jsonb_build_object($4::TEXT, to_jsonb(NOW()))
                 END,
                 NOW()
             )
             ON CONFLICT (collection, key)
             DO UPDATE SET fields = EXCLUDED.fields, updated_at = EXCLUDED.updated_at",
        )
        .bind(&write.collection)
        .bind(&write.key)
        .bind(Json(Value::Object(write.fields)))
        .bind(write.server_timestamp_field)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Process-local documents for development and tests.
#[derive(Default)]
pub struct MemoryDocuments {
    documents: Mutex<HashMap<(String, String), Map<String, Value>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<Map<String, Value>> {
        self.documents
            .lock()
            .ok()?
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
        let mut fields = write.fields;
        if let Some(field) = write.server_timestamp_field {
            fields.insert(field, Value::String(Utc::now().to_rfc3339()));
        }
        self.documents
            .lock()
            .map_err(|_| ExternalError::new("document store poisoned"))?
            .insert((write.collection, write.key), fields);
        Ok(())
    }
}
