use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SignupError;
use crate::handlers::registration_handler::{Registered, RegistrationWorkflow};
use crate::models::registration_model::{FieldErrors, RegistrationInput};
use crate::utils::validation::validate;

pub const ACCOUNT_CREATED_NOTICE: &str = "Account created! Check email for verification.";
pub const SUBMIT_LABEL: &str = "Create Account";
pub const SUBMITTING_LABEL: &str = "Creating...";

/// How the form talks back to the person filling it in.
pub trait Presenter: Send + Sync {
    /// Tell the user something and wait for them to acknowledge it.
    fn alert(&self, message: &str);

    fn navigate(&self, route: &str);
}

#[derive(Debug)]
pub enum FormOutcome {
    /// The form never left the browser; nothing external was called.
    Invalid(FieldErrors),
    Created(Registered),
    Failed(SignupError),
    /// A submission from this form is still running.
    Busy,
}

/// One signup form: idle until submitted, then submitting until the
/// workflow finishes. A second submit while one is in flight is refused.
pub struct SignupForm {
    workflow: RegistrationWorkflow,
    login_route: String,
    submitting: AtomicBool,
}

struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SignupForm {
    pub fn new(workflow: RegistrationWorkflow, login_route: impl Into<String>) -> Self {
        Self {
            workflow,
            login_route: login_route.into(),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Text on the submit button.
    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub async fn submit(&self, input: &RegistrationInput, presenter: &dyn Presenter) -> FormOutcome {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return FormOutcome::Busy;
        }
        let _guard = SubmittingGuard(&self.submitting);

        let registration = match validate(input) {
            Ok(registration) => registration,
            Err(errors) => {
                log::debug!("signup form rejected: {}", errors);
                return FormOutcome::Invalid(errors);
            }
        };

        match self.workflow.submit(&registration).await {
            Ok(registered) => {
                presenter.alert(ACCOUNT_CREATED_NOTICE);
                presenter.navigate(&self.login_route);
                FormOutcome::Created(registered)
            }
            Err(err) => {
                presenter.alert(&err.user_message());
                FormOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::ExternalError;
    use crate::models::profile_model::DocumentWrite;
    use crate::utils::documents::{DocumentStore, MemoryDocuments};
    use crate::utils::identity::MemoryIdentity;

    #[derive(Default)]
    struct Recorder {
        alerts: Mutex<Vec<String>>,
        routes: Mutex<Vec<String>>,
    }

    impl Presenter for Recorder {
        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }

        fn navigate(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    /// Holds every write until released.
    struct GatedDocuments {
        release: Notify,
        inner: MemoryDocuments,
    }

    #[async_trait]
    impl DocumentStore for GatedDocuments {
        async fn set_document(&self, write: DocumentWrite) -> Result<(), ExternalError> {
            self.release.notified().await;
            self.inner.set_document(write).await
        }
    }

    fn input() -> RegistrationInput {
        RegistrationInput {
            full_name: "Ada Obi".into(),
            email: "ada@example.com".into(),
            contact: "0803123456".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            role: "patient".into(),
        }
    }

    fn form_with(documents: Arc<dyn DocumentStore>) -> SignupForm {
        let workflow = RegistrationWorkflow::new(Arc::new(MemoryIdentity::new()), documents);
        SignupForm::new(workflow, "/login")
    }

    #[tokio::test]
    async fn success_alerts_then_navigates_once() {
        let form = form_with(Arc::new(MemoryDocuments::new()));
        let recorder = Recorder::default();

        let outcome = form.submit(&input(), &recorder).await;

        assert!(matches!(outcome, FormOutcome::Created(_)));
        assert_eq!(*recorder.alerts.lock().unwrap(), vec![ACCOUNT_CREATED_NOTICE]);
        assert_eq!(*recorder.routes.lock().unwrap(), vec!["/login"]);
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn invalid_input_shows_no_alert() {
        let form = form_with(Arc::new(MemoryDocuments::new()));
        let recorder = Recorder::default();
        let bad = RegistrationInput {
            confirm_password: "nope".into(),
            ..input()
        };

        match form.submit(&bad, &recorder).await {
            FormOutcome::Invalid(errors) => assert!(errors.contains("confirmPassword")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(recorder.alerts.lock().unwrap().is_empty());
        assert!(recorder.routes.lock().unwrap().is_empty());
        assert_eq!(form.submit_label(), SUBMIT_LABEL);
    }

    #[tokio::test]
    async fn second_submit_is_refused_while_first_is_in_flight() {
        let documents = Arc::new(GatedDocuments {
            release: Notify::new(),
            inner: MemoryDocuments::new(),
        });
        let form = Arc::new(form_with(documents.clone()));
        let recorder = Arc::new(Recorder::default());

        let first = {
            let form = form.clone();
            let recorder = recorder.clone();
            tokio::spawn(async move { form.submit(&input(), recorder.as_ref()).await })
        };

        while !form.is_submitting() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(form.submit_label(), SUBMITTING_LABEL);
        assert!(matches!(
            form.submit(&input(), recorder.as_ref()).await,
            FormOutcome::Busy
        ));

        documents.release.notify_one();
        assert!(matches!(first.await.unwrap(), FormOutcome::Created(_)));
        assert!(!form.is_submitting());
        assert_eq!(recorder.routes.lock().unwrap().len(), 1);
    }
}
