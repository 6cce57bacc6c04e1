//! Errors raised while fetching and reformatting SIMP reports.

/// Error raised while fetching, decoding or reformatting SIMP reports.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// I/O error while reading the client certificate or writing a report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport failure talking to the SOAP endpoint.
    #[error("SOAP transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body could not be parsed as XML.
    #[error("XML parsing error: {0}")]
    Parse(#[from] roxmltree::Error),
    /// Failure while rewriting or building an XML document.
    #[error("XML writing error: {0}")]
    Build(#[from] quick_xml::Error),
    /// The normalized document is not valid UTF-8.
    #[error("XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// An expected XML node is absent from a successful response.
    #[error("Required field '{field}' missing")]
    MissingField {
        /// Name of the missing node.
        field: &'static str,
    },
    /// A numeric value could not be parsed.
    #[error("Invalid number '{value}' in field '{field}'")]
    Number {
        /// Offending source value.
        value: String,
        /// Name of the field.
        field: &'static str,
    },
    /// The embedded report payload is not valid base64.
    #[error("Invalid base64 report payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The bank text encoding is unknown to `encoding_rs`.
    #[error("Unknown bank encoding '{label}'")]
    UnknownEncoding {
        /// Requested encoding label.
        label: String,
    },
    /// The report payload could not be decoded with the configured encoding.
    #[error("Report payload is not valid {encoding}")]
    Encoding {
        /// Encoding the payload was decoded with.
        encoding: String,
    },
    /// A mail address could not be parsed.
    #[error("Invalid mail address: {0}")]
    MailAddress(#[from] lettre::address::AddressError),
    /// The mail message could not be assembled.
    #[error("Mail composition error: {0}")]
    MailCompose(#[from] lettre::error::Error),
    /// SMTP delivery failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl ReportError {
    /// True for failures scoped to one report's payload rather than the run.
    #[must_use]
    pub const fn is_report_scoped(&self) -> bool {
        matches!(
            self,
            Self::Base64(_) | Self::Encoding { .. } | Self::UnknownEncoding { .. }
        )
    }
}
