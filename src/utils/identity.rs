use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::FirebaseConfig;
use crate::error::ExternalError;
use crate::utils::auth::{
    generate_verification_code, hash_password_blocking, Mailer,
    VERIFICATION_CODE_TTL_MINUTES,
};

/// A freshly created provider account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub uid: String,
    pub email: String,
    /// Session token issued at signup, when the provider issues one.
    pub id_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str)
        -> Result<AccountHandle, ExternalError>;

    async fn send_verification(&self, account: &AccountHandle) -> Result<(), ExternalError>;
}

lazy_static! {
    static ref FIREBASE_AUTH_CODES: HashMap<&'static str, &'static str> = HashMap::from([
        ("EMAIL_EXISTS", "email-already-in-use"),
        ("INVALID_EMAIL", "invalid-email"),
        ("WEAK_PASSWORD", "weak-password"),
        ("OPERATION_NOT_ALLOWED", "operation-not-allowed"),
        ("TOO_MANY_ATTEMPTS_TRY_LATER", "too-many-requests"),
        ("INVALID_ID_TOKEN", "invalid-user-token"),
        ("USER_NOT_FOUND", "user-not-found"),
        ("USER_DISABLED", "user-disabled"),
        ("API_KEY_INVALID", "api-key-not-valid"),
    ]);
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    #[serde(default)]
    message: String,
}

/// Turns an Identity Toolkit error code such as `WEAK_PASSWORD : Password
/// should be at least 6 characters` into the web SDK wording.
pub fn firebase_auth_message(raw: &str) -> String {
    let code = raw.split(" : ").next().unwrap_or(raw).trim();
    let auth_code = match FIREBASE_AUTH_CODES.get(code) {
        Some(mapped) => mapped.to_string(),
        None => code.to_lowercase().replace('_', "-"),
    };
    format!("Firebase: Error (auth/{auth_code}).")
}

async fn firebase_error(response: reqwest::Response) -> ExternalError {
    let status = response.status();
    match response.json::<FirebaseErrorBody>().await {
        Ok(body) if !body.error.message.is_empty() => {
            ExternalError::new(firebase_auth_message(&body.error.message))
        }
        _ => ExternalError::new(format!("Firebase: Error (auth/http-{}).", status.as_u16())),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: Option<String>,
}

/// Firebase Authentication through the Identity Toolkit REST API.
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
    auth_url: String,
}

impl FirebaseIdentity {
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.auth_url, method, self.api_key)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, ExternalError> {
        let response = self
            .client
            .post(self.endpoint("signUp"))
            .json(&SignUpRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(firebase_error(response).await);
        }

        let body: SignUpResponse = response.json().await?;
        Ok(AccountHandle {
            uid: body.local_id,
            email: if body.email.is_empty() {
                email.to_string()
            } else {
                body.email
            },
            id_token: body.id_token,
        })
    }

    async fn send_verification(&self, account: &AccountHandle) -> Result<(), ExternalError> {
        let id_token = account
            .id_token
            .as_deref()
            .ok_or_else(|| ExternalError::new(firebase_auth_message("INVALID_ID_TOKEN")))?;

        let response = self
            .client
            .post(self.endpoint("sendOobCode"))
            .json(&json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(firebase_error(response).await);
        }
        Ok(())
    }
}

/// Self-hosted accounts in PostgreSQL; verification codes go out by SMTP.
pub struct PostgresIdentity {
    db: PgPool,
    mailer: Mailer,
}

impl PostgresIdentity {
    pub fn new(db: PgPool, mailer: Mailer) -> Self {
        Self { db, mailer }
    }
}

#[async_trait]
impl IdentityProvider for PostgresIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, ExternalError> {
        let uid = Uuid::new_v4();
        let email = email.to_lowercase();
        let password_hash = hash_password_blocking(password).await?;

        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, email_verified, created_at)
             VALUES ($1, $2, $3, FALSE, NOW())",
        )
        .bind(uid)
        .bind(&email)
        .bind(&password_hash)
        .execute(&self.db)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return ExternalError::new("Email already exists");
                }
            }
            ExternalError::from(err)
        })?;

        Ok(AccountHandle {
            uid: uid.to_string(),
            email,
            id_token: None,
        })
    }

    async fn send_verification(&self, account: &AccountHandle) -> Result<(), ExternalError> {
        let verification_code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES);

        sqlx::query(
            "INSERT INTO email_verifications (id, email, verification_code, expiration_time)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&verification_code)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        self.mailer
            .send_verification_email(&account.email, &verification_code)
            .await
    }
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    uid: String,
    password_hash: String,
}

/// Process-local accounts for development and tests.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, MemoryAccount>>,
    verifications: Mutex<Vec<String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uid of the account registered under `email`, compared case-insensitively.
    pub fn uid_for(&self, email: &str) -> Option<String> {
        self.accounts
            .lock()
            .ok()?
            .get(&email.to_lowercase())
            .map(|account| account.uid.clone())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().map(|accounts| accounts.len()).unwrap_or(0)
    }

    /// Uids a verification was dispatched to, in order.
    pub fn verifications_sent(&self) -> Vec<String> {
        self.verifications
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn password_hash_for(&self, email: &str) -> Option<String> {
        self.accounts
            .lock()
            .ok()?
            .get(&email.to_lowercase())
            .map(|account| account.password_hash.clone())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, ExternalError> {
        let email = email.to_lowercase();
        let password_hash = hash_password_blocking(password).await?;
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| ExternalError::new("account store poisoned"))?;

        if accounts.contains_key(&email) {
            return Err(ExternalError::new("Email already exists"));
        }

        let uid = Uuid::new_v4().simple().to_string();
        accounts.insert(
            email.clone(),
            MemoryAccount {
                uid: uid.clone(),
                password_hash,
            },
        );
        Ok(AccountHandle {
            uid,
            email,
            id_token: None,
        })
    }

    async fn send_verification(&self, account: &AccountHandle) -> Result<(), ExternalError> {
        log::info!("verification requested for account {}", account.uid);
        self.verifications
            .lock()
            .map_err(|_| ExternalError::new("verification log poisoned"))?
            .push(account.uid.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_identity_toolkit_codes_to_sdk_messages() {
        assert_eq!(
            firebase_auth_message("EMAIL_EXISTS"),
            "Firebase: Error (auth/email-already-in-use)."
        );
        assert_eq!(
            firebase_auth_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            "Firebase: Error (auth/weak-password)."
        );
        assert_eq!(
            firebase_auth_message("PROJECT_NOT_FOUND"),
            "Firebase: Error (auth/project-not-found)."
        );
    }

    #[tokio::test]
    async fn memory_identity_rejects_duplicate_email_case_insensitively() {
        let identity = MemoryIdentity::new();
        let account = identity
            .create_account("Ada@Example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(identity.uid_for("ADA@example.com"), Some(account.uid));

        let err = identity
            .create_account("ada@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Email already exists");
        assert_eq!(identity.account_count(), 1);
    }

    #[tokio::test]
    async fn memory_identity_stores_only_a_hash() {
        let identity = MemoryIdentity::new();
        identity.create_account("ada@example.com", "secret1").await.unwrap();
        let hash = identity.password_hash_for("ada@example.com").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn memory_identity_records_verification_dispatch() {
        let identity = MemoryIdentity::new();
        let account = identity.create_account("ada@example.com", "secret1").await.unwrap();
        identity.send_verification(&account).await.unwrap();
        assert_eq!(identity.verifications_sent(), vec![account.uid]);
    }
}
