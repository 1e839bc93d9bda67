use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand_core::OsRng;

use crate::config::SmtpConfig;
use crate::error::ExternalError;

pub const VERIFICATION_CODE_LEN: usize = 6;
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 15;

pub fn hash_password(password: &str) -> Result<String, ExternalError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ExternalError::new("Failed to hash password"))
}

/// Runs `hash_password` on the blocking pool.
pub async fn hash_password_blocking(password: &str) -> Result<String, ExternalError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| ExternalError::new(format!("password hashing task failed: {err}")))?
}

pub fn generate_verification_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Sends verification codes over SMTP.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ExternalError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config.from.parse()?;
        Ok(Self { transport, from })
    }

    pub async fn send_verification_email(
        &self,
        email: &str,
        verification_code: &str,
    ) -> Result<(), ExternalError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.parse()?)
            .subject("Verify your email")
            .header(header::ContentType::TEXT_PLAIN)
            .body(format!(
                "Your verification code is: {}\nIt expires in {} minutes.",
                verification_code, VERIFICATION_CODE_TTL_MINUTES
            ))?;

        self.transport.send(message).await?;
        Ok(())
    }
}
