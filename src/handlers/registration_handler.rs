use std::sync::Arc;

use crate::error::{ExternalError, SignupError};
use crate::models::profile_model::ProfileRecord;
use crate::models::registration_model::ValidatedRegistration;
use crate::utils::documents::DocumentStore;
use crate::utils::identity::IdentityProvider;

/// What a successful signup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub uid: String,
    pub profile_key: String,
}

/// Account creation, verification dispatch and profile write, in that
/// order, each awaited before the next starts.
///
/// Nothing is rolled back: when a later step fails the provider account
/// stays behind without a profile.
#[derive(Clone)]
pub struct RegistrationWorkflow {
    identity: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl RegistrationWorkflow {
    pub fn new(identity: Arc<dyn IdentityProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            documents,
        }
    }

    pub async fn submit(
        &self,
        registration: &ValidatedRegistration,
    ) -> Result<Registered, SignupError> {
        let account = self
            .identity
            .create_account(&registration.email, &registration.password)
            .await
            .map_err(SignupError::AccountCreation)?;
        log::info!(
            "created {} account {} for {}",
            registration.role,
            account.uid,
            registration.normalized_email()
        );

        if let Err(source) = self.identity.send_verification(&account).await {
            log::warn!(
                "verification dispatch failed for account {}, no profile written: {}",
                account.uid,
                source
            );
            return Err(SignupError::VerificationDispatch {
                uid: account.uid,
                source,
            });
        }

        let profile = ProfileRecord::new(account.uid.clone(), registration);
        let profile_key = profile.key().to_string();
        let written = match profile.into_write() {
            Ok(write) => {
                self.documents
                    .set_document(write.with_auth_token(account.id_token.clone()))
                    .await
            }
            Err(err) => Err(ExternalError::from(err)),
        };

        if let Err(source) = written {
            log::warn!(
                "profile write for {} failed, account {} has no profile: {}",
                profile_key,
                account.uid,
                source
            );
            return Err(SignupError::ProfileWrite {
                uid: account.uid,
                source,
            });
        }

        log::info!("stored profile users/{} for account {}", profile_key, account.uid);
        Ok(Registered {
            uid: account.uid,
            profile_key,
        })
    }
}
