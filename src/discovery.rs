//! Report discovery and pagination for one report date.
//!
//! The endpoint exposes no "list reports" operation. The engine probes
//! sequential slots starting at 0, resolves the bank-assigned report id for
//! each slot, fetches its payload and advances until the bank answers with a
//! business error, which is the only termination signal.

use crate::envelope::build_envelope;
use crate::error::ReportError;
use crate::simp::entries_to_simp;
use crate::transport::{SoapResponse, SoapTransport};
use crate::types::{EmptyReportPolicy, ReportFormat, ReportQuery, ReportRecord};
use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of file names synthesized for itemized reports.
const FILE_PREFIX: &str = "ING-SIMP";

static RAW_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""il\.trn\.:(\d+) "#).expect("valid raw count regex"));

/// Pagination state; `Probe` carries the next slot, `Fetch` the resolved
/// bank-assigned report id.
enum State {
    Probe(u32),
    Fetch(u32),
    Done,
}

/// One date's report run against a SOAP transport.
///
/// # Example
///
/// ```no_run
/// # use ing_simp_report::{HttpTransport, ReportDay, ReportFormat};
/// # use std::path::Path;
/// # fn main() -> Result<(), ing_simp_report::ReportError> {
/// let transport = HttpTransport::new(
///     "https://ws.ingbusiness.pl/ing-ccs/cdc00101",
///     Path::new("client.pem"),
/// )?;
/// let date = chrono::NaiveDate::from_ymd_opt(2021, 9, 17).unwrap();
/// let records = ReportDay::new(&transport, date, "105001617564")
///     .format(ReportFormat::Itemized)
///     .fetch_all()?;
/// # Ok(()) }
/// ```
pub struct ReportDay<'a, T: SoapTransport> {
    transport: &'a T,
    date: NaiveDate,
    simp_code: String,
    format: ReportFormat,
    bank_encoding: String,
    empty_reports: EmptyReportPolicy,
    force: bool,
}

impl<'a, T: SoapTransport> ReportDay<'a, T> {
    /// Creates a run for one date with the reference defaults: raw format,
    /// ISO-8859-2 bank encoding, empty reports kept.
    pub fn new(transport: &'a T, date: NaiveDate, simp_code: impl Into<String>) -> Self {
        Self {
            transport,
            date,
            simp_code: simp_code.into(),
            format: ReportFormat::Raw,
            bank_encoding: "ISO-8859-2".to_string(),
            empty_reports: EmptyReportPolicy::default(),
            force: false,
        }
    }

    /// Selects the payload format fetched from the endpoint.
    #[inline]
    #[must_use]
    pub const fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Overrides the bank text encoding used for raw payloads.
    #[inline]
    #[must_use]
    pub fn bank_encoding(mut self, label: impl Into<String>) -> Self {
        self.bank_encoding = label.into();
        self
    }

    /// Selects the policy for itemized reports with zero entries.
    #[inline]
    #[must_use]
    pub const fn empty_reports(mut self, policy: EmptyReportPolicy) -> Self {
        self.empty_reports = policy;
        self
    }

    /// In force mode undecodable reports are skipped instead of ending the
    /// run. The business-error termination signal is never suppressed.
    #[inline]
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Walks the day's report sequence and returns the discovered records.
    ///
    /// Every record except possibly the last has `status == true`; the
    /// terminating failed probe is not part of the sequence. Transport and
    /// parse failures abort the run as hard errors.
    pub fn fetch_all(&self) -> Result<Vec<ReportRecord>, ReportError> {
        let mut records = Vec::new();
        let mut state = State::Probe(0);

        loop {
            state = match state {
                State::Probe(slot) => match self.resolve_report_id(slot, &records)? {
                    Some(report_id) => State::Fetch(report_id),
                    None => State::Done,
                },
                State::Fetch(report_id) => self.fetch_step(report_id, &mut records)?,
                State::Done => break,
            };
        }

        Ok(records)
    }

    /// Resolves the bank-assigned report id for a probed slot, or `None`
    /// when the bank signals that the slot never materialized.
    fn resolve_report_id(
        &self,
        slot: u32,
        records: &[ReportRecord],
    ) -> Result<Option<u32>, ReportError> {
        let response = self.send_query(slot, Some(ReportFormat::Itemized))?;
        if let Some(rule) = response.business_error() {
            // The terminal condition is worth an error only when the very
            // first probe fails; afterwards it is ordinary end-of-sequence.
            if records.is_empty() {
                error!(
                    "error processing SOAP request, date: {} slot: {slot}, ERR: {rule}",
                    self.date
                );
            } else {
                debug!("pagination ended, date: {} slot: {slot}: {rule}", self.date);
            }
            return Ok(None);
        }
        response.report_id().map(Some)
    }

    /// Fetches one resolved report and decides the next state.
    fn fetch_step(
        &self,
        report_id: u32,
        records: &mut Vec<ReportRecord>,
    ) -> Result<State, ReportError> {
        match self.fetch_report(report_id) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(err) if err.is_report_scoped() => {
                error!("report {report_id}, date {}: {err}", self.date);
                if self.force {
                    warn!("force mode, skipping report {report_id}");
                } else {
                    records.push(ReportRecord {
                        report_id,
                        status: false,
                        transaction_count: 0,
                        report_text: None,
                        filename: String::new(),
                    });
                    return Ok(State::Done);
                }
            }
            Err(err) => return Err(err),
        }

        // The raw variant is a single-report run; only the itemized variant
        // keeps walking the day's sequence.
        Ok(match self.format {
            ReportFormat::Raw => State::Done,
            ReportFormat::Itemized => State::Probe(report_id + 1),
        })
    }

    /// Fetches and decodes one report; `None` means a skipped empty report.
    fn fetch_report(&self, report_id: u32) -> Result<Option<ReportRecord>, ReportError> {
        let response = self.send_query(report_id, Some(self.format))?;

        match self.format {
            ReportFormat::Raw => {
                let file = response.report_file(&self.bank_encoding, self.date)?;
                let transaction_count = RAW_COUNT_RE
                    .captures(&file.text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                Ok(Some(ReportRecord {
                    report_id,
                    status: true,
                    transaction_count,
                    report_text: (!file.text.is_empty()).then_some(file.text),
                    filename: file.filename,
                }))
            }
            ReportFormat::Itemized => {
                let entries = response.entries()?;
                debug!("report {report_id}: {} Ntry records", entries.len());
                let filename = format!("{FILE_PREFIX}_{}_{report_id}.txt", self.date);

                if entries.is_empty() {
                    return match self.empty_reports {
                        EmptyReportPolicy::Keep => Ok(Some(ReportRecord {
                            report_id,
                            status: true,
                            transaction_count: 0,
                            report_text: None,
                            filename,
                        })),
                        EmptyReportPolicy::Skip => {
                            info!(
                                "no transactions in report {report_id}, date {}, skipped",
                                self.date
                            );
                            Ok(None)
                        }
                    };
                }

                Ok(Some(ReportRecord {
                    report_id,
                    status: true,
                    transaction_count: entries.len(),
                    report_text: Some(entries_to_simp(&entries)),
                    filename,
                }))
            }
        }
    }

    /// Builds and sends one query; the message id is a timestamp token.
    fn send_query(
        &self,
        slot_id: u32,
        format: Option<ReportFormat>,
    ) -> Result<SoapResponse, ReportError> {
        let query = ReportQuery {
            report_date: self.date,
            simp_code: self.simp_code.clone(),
            slot_id,
            format,
        };
        let body = build_envelope(&Utc::now().timestamp().to_string(), &query)?;
        debug!("SOAP request: {body}");
        let response = self.transport.send(&body)?;
        debug!("SOAP response: {}", response.xml());
        Ok(response)
    }
}
