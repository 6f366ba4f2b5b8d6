/// Outbound account emails
///
/// [`Notifier`] hands each email to a [`Mailer`] on a spawned task and returns
/// immediately. Delivery failures are logged and never reach the request that
/// triggered them, so a failed welcome email does not undo a registration.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::notify::{LogMailer, Notifier};
///
/// # fn example() {
/// let notifier = Notifier::new(Arc::new(LogMailer), "noreply@tasktrack.dev");
/// notifier.welcome("ann@x.com", "Ann");
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub mod sendgrid;

pub use sendgrid::SendGridMailer;

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
}

/// Mail delivery error type
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Request(String),

    #[error("Mail provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers one email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes emails to the log instead of sending them
///
/// Used when no provider key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email (not sent, no mail provider configured)");
        Ok(())
    }
}

pub fn welcome_email(from: &str, to: &str, name: &str) -> Email {
    Email {
        to: to.to_string(),
        from: from.to_string(),
        subject: "Thanks for joining in!".to_string(),
        text: format!(
            "Welcome to the app, {}. Let me know how you get along with the app.",
            name
        ),
    }
}

pub fn cancellation_email(from: &str, to: &str, name: &str) -> Email {
    Email {
        to: to.to_string(),
        from: from.to_string(),
        subject: "Sorry to see you go".to_string(),
        text: format!(
            "We are sorry to see you go, {}. Let me know why you decided to deactivate your account.",
            name
        ),
    }
}

/// Fire-and-forget front for a [`Mailer`]
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    pub fn welcome(&self, to: &str, name: &str) {
        self.dispatch(welcome_email(&self.from, to, name));
    }

    pub fn cancellation(&self, to: &str, name: &str) {
        self.dispatch(cancellation_email(&self.from, to, name));
    }

    /// Must be called from within a tokio runtime
    fn dispatch(&self, email: Email) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let to = email.to.clone();
            if let Err(e) = mailer.send(email).await {
                warn!(to = %to, error = %e, "Failed to send email");
            }
        });
    }
}
