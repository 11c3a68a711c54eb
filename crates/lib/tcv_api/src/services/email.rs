//! Outbound mail: the verification-link email and its transports.

use std::sync::Arc;

use async_trait::async_trait;
use handlebars::Handlebars;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SmtpConfig;

/// Display name on every outgoing message.
pub const SENDER_NAME: &str = "Temp Cover";

pub const VERIFICATION_SUBJECT: &str = "Your Verification Link";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Could not build message: {0}")]
    Build(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),

    #[error("Mail template failed: {0}")]
    Template(String),
}

/// A rendered HTML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Sends through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Address>()
            .map_err(|e| MailError::Address(format!("{}: {e}", config.from)))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        info!(host = %config.host, "SMTP mailer configured");
        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(SENDER_NAME.to_string()), from),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = mail
            .to
            .parse::<Address>()
            .map_err(|e| MailError::Address(format!("{}: {e}", mail.to)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to))
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(to = %mail.to, "mail sent");
        Ok(())
    }
}

/// Records messages in the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "SMTP not configured, mail not sent");
        debug!(html = %mail.html, "unsent mail body");
        Ok(())
    }
}

const VERIFICATION_TEMPLATE: &str = "verification";

const VERIFICATION_HTML: &str = r#"<div style="font-family: Arial, sans-serif; color:#333; line-height:1.6;">
  <p style="font-weight:bold">Hi {{name}},</p>
  <p>You can relax now, everything is taken care of. Your temporary insurance policy is in place and will begin at the time you selected.</p>
  <p>Check out the summary of your policy and a link to view and print your policy documents below.</p>
  <p>Thanks again for choosing
    <a href="{{link}}" style="color:#0066cc; text-decoration:none;">tempcover.com</a>
    for your temporary insurance needs - we hope to see you again soon.
  </p>
  <p style="font-size:12px; color:#666; font-style:italic;">
    This policy meets the Demands and Needs of a customer who wishes to insure a vehicle for a short period.
  </p>
  <div style="margin:18px 0;">
    <a href="{{link}}"
      style="display:inline-block; padding:10px 18px; background:#4CAF50; color:#fff; text-decoration:none; border-radius:5px; font-weight:bold;">
      View your policy documents
    </a>
  </div>
</div>
"#;

/// Registered HTML email templates. Values are HTML-escaped on render.
pub struct MailTemplates {
    registry: Handlebars<'static>,
}

impl MailTemplates {
    pub fn new() -> Result<Self, MailError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(VERIFICATION_TEMPLATE, VERIFICATION_HTML)
            .map_err(|e| MailError::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    /// The email carrying a policyholder's verification link.
    pub fn verification_email(
        &self,
        to: &str,
        name: &str,
        link: &str,
    ) -> Result<OutgoingMail, MailError> {
        let html = self
            .registry
            .render(VERIFICATION_TEMPLATE, &json!({ "name": name, "link": link }))
            .map_err(|e| MailError::Template(e.to_string()))?;
        Ok(OutgoingMail {
            to: to.to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            html,
        })
    }
}

/// SMTP when configured, otherwise mail is only logged.
///
/// A configured relay that cannot be set up is an error, never a silent
/// downgrade to logging.
pub fn mailer_from_config(smtp: Option<&SmtpConfig>) -> Result<Arc<dyn Mailer>, MailError> {
    match smtp {
        Some(config) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}
