#![warn(missing_docs)]
//! Library for fetching ING SIMP settlement reports over SOAP and
//! reformatting their transaction entries into the SIMP2 flat-text dialect.

mod discovery;
mod envelope;
mod error;
mod mail;
mod simp;
mod transport;
mod types;
mod utils;
mod xmlutil;

pub use crate::discovery::ReportDay;
pub use crate::envelope::build_envelope;
pub use crate::error::ReportError;
pub use crate::mail::{MailParams, send_report_mail};
pub use crate::simp::entries_to_simp;
pub use crate::transport::{HttpTransport, SoapResponse, SoapTransport};
pub use crate::types::*;
pub use crate::xmlutil::strip_namespaces;
