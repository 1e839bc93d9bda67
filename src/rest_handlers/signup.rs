use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::handlers::registration_handler::RegistrationWorkflow;
use crate::handlers::signup_form::{FormOutcome, Presenter, SignupForm};
use crate::models::registration_model::RegistrationInput;

pub const SIGNUP_IN_PROGRESS: &str = "A signup for this email is already in progress";

/// Shared state behind the signup routes.
pub struct SignupState {
    pub workflow: RegistrationWorkflow,
    pub login_route: String,
    in_flight: InFlightEmails,
}

impl SignupState {
    pub fn new(workflow: RegistrationWorkflow, login_route: impl Into<String>) -> Self {
        Self {
            workflow,
            login_route: login_route.into(),
            in_flight: InFlightEmails::default(),
        }
    }
}

/// Normalized emails with a submission currently running.
#[derive(Default, Clone)]
struct InFlightEmails(Arc<Mutex<HashSet<String>>>);

struct InFlightGuard {
    emails: InFlightEmails,
    email: String,
}

impl InFlightEmails {
    fn try_claim(&self, email: String) -> Option<InFlightGuard> {
        let mut emails = self.0.lock().ok()?;
        if !emails.insert(email.clone()) {
            return None;
        }
        Some(InFlightGuard {
            emails: self.clone(),
            email,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut emails) = self.emails.0.lock() {
            emails.remove(&self.email);
        }
    }
}

/// Collects what the form shows so it can be sent back as JSON.
#[derive(Default)]
struct JsonPresenter {
    message: Mutex<Option<String>>,
    redirect: Mutex<Option<String>>,
}

impl Presenter for JsonPresenter {
    fn alert(&self, message: &str) {
        if let Ok(mut slot) = self.message.lock() {
            *slot = Some(message.to_string());
        }
    }

    fn navigate(&self, route: &str) {
        if let Ok(mut slot) = self.redirect.lock() {
            *slot = Some(route.to_string());
        }
    }
}

impl JsonPresenter {
    fn take(&self) -> (Option<String>, Option<String>) {
        let message = self.message.lock().ok().and_then(|mut slot| slot.take());
        let redirect = self.redirect.lock().ok().and_then(|mut slot| slot.take());
        (message, redirect)
    }
}

#[post("/auth/signup")]
async fn signup(
    state: web::Data<SignupState>,
    input: web::Json<RegistrationInput>,
) -> impl Responder {
    let input = input.into_inner();

    let Some(_claim) = state.in_flight.try_claim(input.email.to_lowercase()) else {
        return HttpResponse::Conflict().json(json!({
            "status": "error",
            "message": SIGNUP_IN_PROGRESS
        }));
    };

    let form = SignupForm::new(state.workflow.clone(), state.login_route.clone());
    let presenter = JsonPresenter::default();
    let outcome = form.submit(&input, &presenter).await;
    let (message, redirect) = presenter.take();

    match outcome {
        FormOutcome::Created(registered) => HttpResponse::Created().json(json!({
            "status": "success",
            "message": message,
            "redirect": redirect,
            "uid": registered.uid
        })),
        FormOutcome::Invalid(errors) => HttpResponse::UnprocessableEntity().json(json!({
            "status": "error",
            "errors": errors
        })),
        FormOutcome::Failed(err) => {
            log::error!("signup for {} failed: {:?}", input.email.to_lowercase(), err);
            HttpResponse::BadRequest().json(json!({
                "status": "error",
                "message": message.unwrap_or_else(|| err.user_message())
            }))
        }
        FormOutcome::Busy => HttpResponse::Conflict().json(json!({
            "status": "error",
            "message": SIGNUP_IN_PROGRESS
        })),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Malformed bodies get the same JSON envelope as every other error.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(json!({
        "status": "error",
        "message": err.to_string()
    }));
    InternalError::from_response(err, response).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(signup)
            .service(health),
    );
}
