//! # Credential Email Dispatch
//!
//! Sends the rendered PDF credential to the requester. The mailer is
//! built once at startup from `SMTP_URL` and `FROM_EMAIL`; when either
//! is absent the service runs without email and the send route answers
//! 503. Dispatch is synchronous within the triggering request and a
//! failure never rolls back repository state.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

/// Filename of the attached credential.
const ATTACHMENT_NAME: &str = "accreditation.pdf";

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid recipient address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP dispatch failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP mailer for credential dispatch.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build from `SMTP_URL` and `FROM_EMAIL`. Returns `None` when
    /// either variable is absent so the service degrades to 503 on the
    /// send route instead of refusing to start.
    pub fn from_env() -> Option<Self> {
        let url = match std::env::var("SMTP_URL") {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!("SMTP_URL not set, credential email dispatch disabled");
                return None;
            }
        };
        let from = match std::env::var("FROM_EMAIL") {
            Ok(raw) => match raw.parse::<Mailbox>() {
                Ok(from) => from,
                Err(err) => {
                    tracing::error!(%err, "FROM_EMAIL is not a valid mailbox, dispatch disabled");
                    return None;
                }
            },
            Err(_) => {
                tracing::warn!("FROM_EMAIL not set, credential email dispatch disabled");
                return None;
            }
        };

        let transport = match AsyncSmtpTransport::<Tokio1Executor>::from_url(&url) {
            Ok(builder) => builder.build(),
            Err(err) => {
                tracing::error!(%err, "SMTP_URL is not usable, dispatch disabled");
                return None;
            }
        };

        tracing::info!(from = %from, "SMTP mailer configured");
        Some(Mailer { transport, from })
    }

    /// Send the credential PDF to `to`.
    pub async fn send_credential(&self, to: &str, pdf: Vec<u8>) -> Result<(), MailError> {
        let recipient: Mailbox = to.parse()?;

        let html = "<p>Bonjour,</p>\
                    <p>Veuillez trouver ci-joint votre accréditation véhicule. \
                    Présentez ce document à l'entrée du site.</p>\
                    <p>Palais des Festivals et des Congrès de Cannes</p>"
            .to_string();

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("Votre accréditation véhicule")
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(html))
                    .singlepart(Attachment::new(ATTACHMENT_NAME.to_string()).body(
                        pdf,
                        ContentType::parse("application/pdf").expect("static MIME type"),
                    )),
            )?;

        self.transport.send(message).await?;
        tracing::info!(%to, "credential email dispatched");
        Ok(())
    }
}
