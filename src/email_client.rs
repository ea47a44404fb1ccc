use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use rinja_axum::Template;
use secrecy::ExposeSecret;

use crate::{configuration::SmtpSettings, domain::NewSubmission};

#[derive(Template)]
#[template(path = "contact_email.txt")]
struct PlainTextBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "contact_email.html")]
struct HtmlBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    message_lines: Vec<&'a str>,
}

/// Relays validated submissions to the configured inbox.
///
/// A fresh SMTP transport is opened for every submission; nothing is pooled.
pub struct EmailClient {
    settings: SmtpSettings,
    sender: Mailbox,
    recipient: Mailbox,
}

impl EmailClient {
    pub fn new(settings: SmtpSettings) -> Result<Self, RelayError> {
        let sender = settings.sender()?;
        let recipient = settings.recipient()?;
        Ok(Self {
            settings,
            sender,
            recipient,
        })
    }

    #[tracing::instrument(
        name = "Relaying a contact form submission",
        skip(self, submission),
        fields(
            smtp_host = %self.settings.host,
            smtp_port = self.settings.port,
        )
    )]
    pub async fn send_submission(&self, submission: &NewSubmission) -> Result<(), RelayError> {
        // Checked before anything touches the network.
        let Some(password) = self
            .settings
            .password
            .as_ref()
            .filter(|password| !password.expose_secret().is_empty())
        else {
            tracing::error!("SMTP password is not configured");
            return Err(RelayError::MissingCredentials);
        };

        let message = self.build_message(submission)?;
        let transport = self.transport(password.expose_secret())?;

        tracing::info!(
            "Attempting to send email using {}:{}",
            self.settings.host,
            self.settings.port
        );
        tokio::time::timeout(self.settings.timeout(), transport.send(message))
            .await
            .map_err(|_| RelayError::Timeout(self.settings.timeout_milliseconds))??;

        tracing::info!("Email sent successfully to {}", self.recipient.email);
        Ok(())
    }

    fn transport(&self, password: &str) -> Result<AsyncSmtpTransport<Tokio1Executor>, RelayError> {
        let tls_parameters = TlsParameters::new(self.settings.host.clone())?;
        let tls = if self.settings.secure() {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.settings.host)
                .port(self.settings.port)
                .tls(tls)
                .credentials(Credentials::new(
                    self.settings.user().to_owned(),
                    password.to_owned(),
                ))
                .timeout(Some(self.settings.timeout()))
                .build(),
        )
    }

    fn build_message(&self, submission: &NewSubmission) -> Result<Message, RelayError> {
        let first_name = submission.first_name.as_ref();
        let last_name = submission.last_name.as_ref();
        let email = submission.email.as_ref();
        let message = submission.message.as_ref();

        let plain_body = PlainTextBody {
            first_name,
            last_name,
            email,
            message,
        }
        .render()
        .map_err(|e| RelayError::Render(e.to_string()))?;
        let html_body = HtmlBody {
            first_name,
            last_name,
            email,
            message_lines: message.split('\n').collect(),
        }
        .render()
        .map_err(|e| RelayError::Render(e.to_string()))?;

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(format!(
                "New Contact Form Submission from {first_name} {last_name}"
            ));
        // The form accepts addresses the mail library does not; those just lose the reply-to.
        match email.parse() {
            Ok(address) => builder = builder.reply_to(Mailbox::new(None, address)),
            Err(e) => tracing::warn!("Not setting reply-to for {}: {}", email, e),
        }

        Ok(builder.multipart(MultiPart::alternative_plain_html(plain_body, html_body))?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("Email configuration error: SMTP password is not set")]
    MissingCredentials,
    #[error("Email configuration error: invalid address, {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
    #[error("couldn't render the email body, {0}")]
    Render(String),
    #[error("couldn't build the email message, {0}")]
    Message(#[from] lettre::error::Error),
    #[error("couldn't send email, smtp error {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("couldn't send email, no answer from the SMTP server within {0}ms")]
    Timeout(u64),
}

impl RelayError {
    /// Configuration errors are fixed by the operator, not by retrying.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingCredentials | RelayError::InvalidAddress(_)
        )
    }
}
