//! SMTP delivery of generated reports.

use crate::error::ReportError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::PathBuf;

/// Connection and addressing parameters for one delivery.
#[derive(Debug, Clone)]
pub struct MailParams {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Message subject.
    pub subject: String,
    /// Plain-text message body.
    pub body: String,
    /// Mail server host name.
    pub server: String,
    /// Mail server port.
    pub port: u16,
    /// Server auth user name; empty disables authentication.
    pub username: String,
    /// Server auth password.
    pub password: String,
    /// Use STARTTLS.
    pub use_tls: bool,
}

/// Composes and synchronously sends one message with file attachments.
pub fn send_report_mail(params: &MailParams, files: &[PathBuf]) -> Result<(), ReportError> {
    let mut builder = Message::builder()
        .from(params.from.parse::<Mailbox>()?)
        .subject(params.subject.clone());
    for to in &params.to {
        builder = builder.to(to.parse::<Mailbox>()?);
    }

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(params.body.clone()));
    let content_type =
        ContentType::parse("application/octet-stream").expect("valid content type");
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report.txt")
            .to_string();
        parts = parts.singlepart(Attachment::new(name).body(fs::read(path)?, content_type.clone()));
    }
    let message = builder.multipart(parts)?;

    let mut transport = if params.use_tls {
        SmtpTransport::starttls_relay(&params.server)?
    } else {
        SmtpTransport::builder_dangerous(&params.server)
    }
    .port(params.port);
    if !params.username.is_empty() {
        transport = transport.credentials(Credentials::new(
            params.username.clone(),
            params.password.clone(),
        ));
    }
    transport.build().send(&message)?;

    Ok(())
}
