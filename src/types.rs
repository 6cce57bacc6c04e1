//! Domain types for SIMP report queries, entries and results.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Monetary value, `Decimal` keeps the bank's exact amounts.
pub type Money = Decimal;

/// Payload format requested from the reporting endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Pre-rendered SIMP file, base64-embedded in the response.
    Raw,
    /// Itemized `Ntry` elements, reformatted locally.
    Itemized,
}

impl ReportFormat {
    /// Value carried in the envelope's `RptFrmt` field.
    #[must_use]
    pub const fn wire_value(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Itemized => "XML",
        }
    }
}

/// One query against the reporting endpoint, immutable once issued.
#[derive(Debug, Clone)]
pub struct ReportQuery {
    /// Report date the query targets.
    pub report_date: NaiveDate,
    /// Customer SIMP code (creditor identifier).
    pub simp_code: String,
    /// Report slot probed, or a bank-assigned report id when fetching.
    pub slot_id: u32,
    /// Requested payload format; `None` omits the lookup field for server
    /// profiles that do not accept `RptFrmt`.
    pub format: Option<ReportFormat>,
}

/// Policy for itemized reports that resolve but contain zero entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyReportPolicy {
    /// Append a `transaction_count == 0` record and keep paginating.
    #[default]
    Keep,
    /// Log the empty report, drop it and keep paginating.
    Skip,
}

/// One transaction entry mapped from an `Ntry` element.
///
/// Dates and identifiers are carried as the server's text so the reformatted
/// report reproduces them byte for byte; absent optional fields default to
/// empty strings rather than failing the whole report.
#[derive(Debug, Clone, Default)]
pub struct TransactionEntry {
    /// SIMP account identifier (`SimpAcct/Id`).
    pub account_id: String,
    /// Account currency (`SimpAcct/Ccy`).
    pub currency: String,
    /// Booking date (`BookgDt/Dt`).
    pub booking_date: String,
    /// Transaction date (`TxDt`).
    pub tx_date: String,
    /// Transaction source marker (`TrnSrc`).
    pub source: String,
    /// Operation sign, `C` or `D` (`OpSgn`).
    pub sign: String,
    /// Debtor identifier (`Dbtr/Id`).
    pub debtor_id: String,
    /// Up to four payer name lines (`Dbtr/Nm`), each independently optional.
    pub payer_names: [Option<String>; 4],
    /// First memo line (`MemoFld/MemoFldLn`).
    pub memo: String,
    /// Transaction reference (`Ref/TxRef`) without its trailing character.
    pub reference: String,
    /// Entry amount with two fraction digits (`AmtDtls`).
    pub amount: Money,
}

impl TransactionEntry {
    /// Amount scaled to integer cents, `round(amount * 100)`.
    #[must_use]
    pub fn cents(&self) -> i64 {
        (self.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .unwrap_or_default()
    }
}

/// One discovered report slot of a date.
#[derive(Debug, Clone)]
pub struct ReportRecord {
    /// Bank-assigned report id (distinct from the probed slot).
    pub report_id: u32,
    /// Whether the report's payload was fetched and decoded.
    pub status: bool,
    /// Number of transactions carried by the report.
    pub transaction_count: usize,
    /// Reformatted or decoded report text; absent for empty reports.
    pub report_text: Option<String>,
    /// File name the report should be persisted under.
    pub filename: String,
}

impl ReportRecord {
    /// True when the record carries transactions worth persisting.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.status && self.transaction_count > 0
    }
}

/// Decoded raw report payload with its server-assigned file name.
#[derive(Debug, Clone)]
pub struct ReportFilePayload {
    /// Decoded report text, empty when the response carried no file.
    pub text: String,
    /// File name derived from `RptNm`, or a date-keyed fallback.
    pub filename: String,
}
