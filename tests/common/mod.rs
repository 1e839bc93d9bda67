#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use carelink_signup::error::ExternalError;
use carelink_signup::handlers::registration_handler::RegistrationWorkflow;
use carelink_signup::handlers::signup_form::Presenter;
use carelink_signup::models::profile_model::DocumentWrite;
use carelink_signup::models::registration_model::RegistrationInput;
use carelink_signup::utils::documents::{DocumentStore, MemoryDocuments};
use carelink_signup::utils::identity::{AccountHandle, IdentityProvider, MemoryIdentity};

pub fn patient_form(email: &str) -> RegistrationInput {
    RegistrationInput {
        full_name: "Ada Obi".into(),
        email: email.into(),
        contact: "0803123456".into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
        role: "patient".into(),
    }
}

/// Memory identity that counts calls and can be told to fail.
#[derive(Default)]
pub struct ScriptedIdentity {
    pub inner: MemoryIdentity,
    pub create_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub create_error: Option<String>,
}

impl ScriptedIdentity {
    pub fn failing_create(message: &str) -> Self {
        Self {
            create_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst) + self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, ExternalError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.create_error {
            return Err(ExternalError::new(message.clone()));
        }
        self.inner.create_account(email, password).await
    }

    async fn send_verification(&self, account: &AccountHandle) -> Result<(), ExternalError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send_verification(account).await
    }
}

/// Memory documents that count writes and can be told to fail.
#[derive(Default)]
pub struct ScriptedDocuments {
    pub inner: MemoryDocuments,
    pub write_calls: AtomicUsize,
    pub write_error: Option<String>,
}

impl ScriptedDocuments {
    pub fn failing(message: &str) -> Self {
        Self {
            write_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for ScriptedDocuments {
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.write_error {
            return Err(ExternalError::new(message.clone()));
        }
        self.inner.set_document(write).await
    }
}

/// Memory documents that hold every write until `release` is notified.
#[derive(Default)]
pub struct GatedDocuments {
    pub release: Notify,
    pub inner: MemoryDocuments,
    pub entered: AtomicUsize,
}

impl GatedDocuments {
    pub fn waiting(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for GatedDocuments {
    async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.inner.set_document(write).await
    }
}

pub fn workflow(
    identity: &Arc<ScriptedIdentity>,
    documents: &Arc<ScriptedDocuments>,
) -> RegistrationWorkflow {
    RegistrationWorkflow::new(identity.clone(), documents.clone())
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub alerts: Mutex<Vec<String>>,
    pub routes: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}
