use async_trait::async_trait;
use lettre::{
    Message, SmtpTransport, Transport, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

// 1. Mailer Contract

/// Mailer
///
/// Defines the abstract contract for outbound mail. This trait lets us swap the
/// concrete implementation from the real SMTP transport (SmtpMailer) in
/// production to the in-memory Mock (MockMailer) during testing and local runs,
/// without affecting the calling handlers.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers the activation link for a freshly registered account.
    async fn send_activation_link(&self, email: &str, activation_code: &str)
    -> Result<(), ApiError>;
}

// 2. The Real Implementation (SMTP)

/// SmtpMailer
///
/// The concrete implementation using lettre's SMTP transport. The transport is
/// synchronous, so sends run on the blocking thread pool to keep the async
/// runtime free.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
    activation_base_url: String,
}

impl SmtpMailer {
    /// Constructs the SMTP relay client from configuration resolved by AppConfig.
    pub fn new(
        host: &str,
        user: &str,
        password: &str,
        from: &str,
        activation_base_url: &str,
    ) -> Result<Self, ApiError> {
        let transport = SmtpTransport::relay(host)
            .map_err(|e| ApiError::Mail(e.to_string()))?
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();
        Ok(Self {
            transport,
            from: from.to_string(),
            activation_base_url: activation_base_url.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_activation_link(
        &self,
        email: &str,
        activation_code: &str,
    ) -> Result<(), ApiError> {
        let mut body = String::from("Hello,\r\n\r\n");
        body.push_str("An account was registered with this address.\r\n\r\n");
        body.push_str("You can activate it at:\r\n");
        body.push_str(&format!("{}/{}\r\n\r\n", self.activation_base_url, activation_code));
        body.push_str("Kind regards,\r\n\r\nThe CMS team");

        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ApiError::Mail(e.to_string()))?,
            )
            .to(email
                .parse()
                .map_err(|e: lettre::address::AddressError| ApiError::Mail(e.to_string()))?)
            .subject("Account activation")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ApiError::Mail(e.to_string()))?;

        let transport = self.transport.clone();
        // lettre's SmtpTransport blocks; keep it off the async workers.
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| ApiError::Mail(e.to_string()))?
            .map_err(|e| ApiError::Mail(e.to_string()))?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests and Local Runs)

/// MockMailer
///
/// Records every delivery instead of sending it, so tests can assert on the
/// recipient and activation code. `should_fail` simulates a relay outage.
#[derive(Default)]
pub struct MockMailer {
    /// (recipient, activation code) pairs in delivery order.
    pub sent: Mutex<Vec<(String, String)>>,
    pub should_fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_activation_link(
        &self,
        email: &str,
        activation_code: &str,
    ) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Mail("mock relay outage".to_string()));
        }
        self.sent
            .lock()
            .expect("mock mailer poisoned")
            .push((email.to_string(), activation_code.to_string()));
        Ok(())
    }
}

/// MailerState
///
/// The concrete type used to share the mail collaborator across the application
/// state.
pub type MailerState = Arc<dyn Mailer>;
