use crate::config::Config;
use crate::errors::AppError;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// An outbound email, independent of the transport that delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from_name: Option<String>,
    pub from_address: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    /// Builds the lettre message. Address parse failures are send failures.
    pub fn to_message(&self) -> Result<Message, AppError> {
        let from = Mailbox::new(
            self.from_name.clone(),
            self.from_address.trim().parse::<Address>()?,
        );
        let to = Mailbox::new(None, self.to.trim().parse::<Address>()?);

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML);

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(Mailbox::new(None, reply_to.trim().parse::<Address>()?));
        }

        Ok(builder.body(self.html_body.clone())?)
    }
}

/// Delivers outbound mail. One call is one delivery attempt, no retries.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError>;
}

/// SMTP delivery through the configured mail provider.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Builds the transport from `SMTP_URL`. Credentials are attached only
    /// when both `EMAIL_USER` and `EMAIL_PASS` are set; the provider rejects
    /// unauthenticated sends, which surfaces per request as a send failure.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(&config.smtp_url)?;

        if let (Some(user), Some(pass)) = (&config.email_user, &config.email_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        let message = mail.to_message()?;
        self.mailer.send(message).await?;
        Ok(())
    }
}
