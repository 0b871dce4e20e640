/// Contact form relay shared by the HTTP handler and its tests
///
/// 1. Validate the submission (required fields, email format)
/// 2. Send the message to the operator mailbox, reply-to the submitter
/// 3. If requested, send the submitter a copy of what they wrote
///
/// No retries, no queue: a duplicate submission produces a duplicate send.
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::mail::{MailTransport, OutgoingMail};
use crate::models::{ContactSubmission, ValidatedSubmission};
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Campos obrigatórios não preenchidos.";
pub const INVALID_EMAIL_MESSAGE: &str = "Endereço de e-mail inválido.";
pub const SUCCESS_MESSAGE: &str = "Mensagem enviada com sucesso!";

const SITE_NAME: &str = "Rol-Aju";
const NOT_PROVIDED: &str = "Não informado";
const NO_SUBJECT: &str = "Sem Assunto";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Validate email address format.
pub fn is_valid_email(email: &str) -> bool {
    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .unwrap()
    });

    email_regex.is_match(email)
}

/// Escapes text for embedding inside HTML element content or attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Renders a phone number for the email body.
///
/// Valid Brazilian numbers are shown in international format
/// (`+55 79 99999-0000`); anything else is kept as typed.
pub fn format_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() < 8 {
        return trimmed.to_string();
    }

    match phonenumber::parse(Some(CountryId::BR), trimmed) {
        Ok(number) if phonenumber::is_valid(&number) => {
            number.format().mode(Mode::International).to_string()
        }
        Ok(_) => {
            tracing::debug!("Phone is not a valid BR number, keeping as typed: {}", trimmed);
            trimmed.to_string()
        }
        Err(e) => {
            tracing::debug!("Failed to parse phone '{}': {:?}", trimmed, e);
            trimmed.to_string()
        }
    }
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Checks required fields and the email format.
pub fn validate_submission(submission: &ContactSubmission) -> Result<ValidatedSubmission, AppError> {
    let (Some(sender_name), Some(sender_email), Some(message)) = (
        required(&submission.sender_name),
        required(&submission.sender_email),
        required(&submission.message),
    ) else {
        return Err(AppError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string()));
    };

    if !is_valid_email(&sender_email) {
        tracing::warn!("Invalid email format on contact form: {}", sender_email);
        return Err(AppError::BadRequest(INVALID_EMAIL_MESSAGE.to_string()));
    }

    Ok(ValidatedSubmission {
        sender_name,
        sender_email,
        phone: required(&submission.phone),
        subject: required(&submission.subject),
        message,
        request_copy: submission.request_copy.unwrap_or(false),
    })
}

/// Relays validated submissions to the operator mailbox.
#[derive(Clone)]
pub struct ContactRelay {
    transport: Arc<dyn MailTransport>,
    operator_mailbox: String,
    sender_address: Option<String>,
}

impl ContactRelay {
    pub fn new(transport: Arc<dyn MailTransport>, config: &Config) -> Self {
        Self {
            transport,
            operator_mailbox: config.contact_mailbox.clone(),
            sender_address: config.email_user.clone(),
        }
    }

    /// Message for the site operator. Sent from the service account under
    /// the submitter's name, replies go to the submitter.
    pub fn operator_message(&self, submission: &ValidatedSubmission) -> OutgoingMail {
        let phone = submission
            .phone
            .as_deref()
            .map(format_phone)
            .unwrap_or_else(|| NOT_PROVIDED.to_string());
        let subject = submission.subject.as_deref().unwrap_or(NOT_PROVIDED);

        let html_body = format!(
            r#"
      <h2>Nova mensagem de contato recebida!</h2>
      <p><strong>Nome:</strong> {name}</p>
      <p><strong>Email:</strong> {email}</p>
      <p><strong>Telefone:</strong> {phone}</p>
      <p><strong>Assunto:</strong> {subject}</p>
      <hr>
      <h3>Mensagem:</h3>
      <p>{message}</p>
    "#,
            name = escape_html(&submission.sender_name),
            email = escape_html(&submission.sender_email),
            phone = escape_html(&phone),
            subject = escape_html(subject),
            message = escape_html(&submission.message),
        );

        OutgoingMail {
            from_name: Some(submission.sender_name.clone()),
            from_address: self.sender_address.clone().unwrap_or_default(),
            to: self.operator_mailbox.clone(),
            reply_to: Some(submission.sender_email.clone()),
            subject: format!(
                "Novo Contato ({}): {}",
                SITE_NAME,
                submission.subject.as_deref().unwrap_or(NO_SUBJECT)
            ),
            html_body,
        }
    }

    /// Copy for the submitter, sent from the site's own identity.
    pub fn submitter_copy(&self, submission: &ValidatedSubmission) -> OutgoingMail {
        let phone = submission
            .phone
            .as_deref()
            .map(format_phone)
            .unwrap_or_else(|| NOT_PROVIDED.to_string());
        let subject = submission.subject.as_deref().unwrap_or(NOT_PROVIDED);

        let html_body = format!(
            r#"
      <h2>Obrigado por entrar em contato!</h2>
      <p>Recebemos sua mensagem e responderemos em breve. Abaixo está uma cópia dos dados que você enviou:</p>
      <hr>
      <p><strong>Nome:</strong> {name}</p>
      <p><strong>Telefone:</strong> {phone}</p>
      <p><strong>Assunto:</strong> {subject}</p>
      <h3>Sua Mensagem:</h3>
      <p>{message}</p>
      <hr>
      <p><em>Atenciosamente, Equipe {site}.</em></p>
    "#,
            name = escape_html(&submission.sender_name),
            phone = escape_html(&phone),
            subject = escape_html(subject),
            message = escape_html(&submission.message),
            site = SITE_NAME,
        );

        OutgoingMail {
            from_name: Some(SITE_NAME.to_string()),
            from_address: self.operator_mailbox.clone(),
            to: submission.sender_email.clone(),
            reply_to: None,
            subject: format!("Cópia da sua mensagem para {}", SITE_NAME),
            html_body,
        }
    }

    /// Validates and sends. The copy is only attempted after the operator
    /// message went out; a failure of either is reported the same way.
    pub async fn relay(&self, submission: &ContactSubmission) -> Result<(), AppError> {
        let submission = validate_submission(submission)?;

        self.transport
            .send(&self.operator_message(&submission))
            .await
            .context("operator message")?;
        tracing::info!("E-mail para o administrador enviado com sucesso.");

        if submission.request_copy {
            self.transport
                .send(&self.submitter_copy(&submission))
                .await
                .context("submitter copy")?;
            tracing::info!("Cópia para o usuário enviada com sucesso.");
        }

        Ok(())
    }
}
