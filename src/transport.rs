//! SOAP transport: the client seam, the HTTPS implementation and parsed
//! responses with their extraction helpers.

use crate::error::ReportError;
use crate::types::{ReportFilePayload, TransactionEntry};
use crate::utils::parse_money_or_zero;
use crate::xmlutil::{child, child_text, descendant, strip_namespaces};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use encoding_rs::Encoding;
use roxmltree::{Document, Node};
use std::fs;
use std::path::Path;

/// Sends one rendered envelope and returns the parsed response.
///
/// The discovery engine only sees this seam; production code goes through
/// [`HttpTransport`], tests script responses.
pub trait SoapTransport {
    /// Performs the call and parses the response body.
    fn send(&self, body: &str) -> Result<SoapResponse, ReportError>;
}

/// Blocking HTTPS transport with mutual TLS.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Builds a client authenticated with the PEM certificate at `cert_path`.
    ///
    /// No timeout is configured; a hung endpoint stalls the run until the
    /// caller imposes an external bound.
    pub fn new(endpoint: impl Into<String>, cert_path: &Path) -> Result<Self, ReportError> {
        let identity = reqwest::Identity::from_pem(&fs::read(cert_path)?)?;
        let client = reqwest::blocking::Client::builder()
            .identity(identity)
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl SoapTransport for HttpTransport {
    fn send(&self, body: &str) -> Result<SoapResponse, ReportError> {
        let text = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/soap+xml")
            .body(body.to_string())
            .send()?
            .text()?;
        SoapResponse::from_raw(&text)
    }
}

/// Namespace-normalized response with its derived business-error signal.
///
/// A present `RuleDesc` node means the bank rejected the query; that is an
/// expected, recoverable condition (end of pagination), not an `Err`.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    xml: String,
    rule_error: Option<String>,
}

impl SoapResponse {
    /// Normalizes and validates a raw response body.
    pub fn from_raw(raw: &str) -> Result<Self, ReportError> {
        let xml = strip_namespaces(raw)?;
        let rule_error = {
            let doc = Document::parse(&xml)?;
            descendant(doc.root(), "RuleDesc")
                .and_then(|n| n.text())
                .map(str::to_string)
        };
        Ok(Self { xml, rule_error })
    }

    /// Whether the bank accepted the query.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.rule_error.is_none()
    }

    /// The bank's rule description when the query was rejected.
    #[must_use]
    pub fn business_error(&self) -> Option<&str> {
        self.rule_error.as_deref()
    }

    /// Normalized response document.
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Bank-assigned report id,
    /// `GetMCReportResponse/Document/MCRpt/Rpt/RptId/EQ`.
    pub fn report_id(&self) -> Result<u32, ReportError> {
        let doc = Document::parse(&self.xml)?;
        let text = descendant(doc.root(), "GetMCReportResponse")
            .and_then(|n| child(n, "Document"))
            .and_then(|n| child(n, "MCRpt"))
            .and_then(|n| child(n, "Rpt"))
            .and_then(|n| child(n, "RptId"))
            .and_then(|n| child_text(n, "EQ"))
            .ok_or(ReportError::MissingField { field: "RptId" })?;
        text.trim().parse().map_err(|_| ReportError::Number {
            value: text.to_string(),
            field: "RptId",
        })
    }

    /// All `Ntry` transaction entries in document order.
    pub fn entries(&self) -> Result<Vec<TransactionEntry>, ReportError> {
        let doc = Document::parse(&self.xml)?;
        doc.descendants()
            .filter(|n| n.has_tag_name("Ntry"))
            .map(entry_from_node)
            .collect()
    }

    /// Decodes the embedded `RptDtls/RptFile` payload.
    ///
    /// A wholly absent report body yields empty text; that is a valid
    /// terminal outcome, not an error. The file name comes from `RptNm`,
    /// falling back to a date-keyed placeholder.
    pub fn report_file(
        &self,
        encoding_label: &str,
        report_date: NaiveDate,
    ) -> Result<ReportFilePayload, ReportError> {
        let doc = Document::parse(&self.xml)?;
        let details = descendant(doc.root(), "RptDtls");

        let text = match details.and_then(|d| child_text(d, "RptFile")) {
            Some(encoded) => decode_report_file(encoded, encoding_label)?,
            None => String::new(),
        };
        let filename = details.and_then(|d| child_text(d, "RptNm")).map_or_else(
            || format!("temp_file_{report_date}.txt"),
            |name| format!("{name}.txt"),
        );

        Ok(ReportFilePayload { text, filename })
    }
}

/// Maps one `Ntry` element; optional fields degrade to empty strings.
fn entry_from_node(node: Node<'_, '_>) -> Result<TransactionEntry, ReportError> {
    let account = child(node, "SimpAcct");
    let debtor = child(node, "Dbtr");

    let mut payer_names: [Option<String>; 4] = Default::default();
    if let Some(debtor) = debtor {
        let names = debtor.children().filter(|c| c.has_tag_name("Nm"));
        for (slot, name) in payer_names.iter_mut().zip(names) {
            *slot = Some(name.text().unwrap_or_default().to_string());
        }
    }

    // The bank terminates TxRef with a filler character; drop it.
    let reference = child(node, "Ref")
        .and_then(|r| child_text(r, "TxRef"))
        .map(|s| {
            let mut s = s.to_string();
            s.pop();
            s
        })
        .unwrap_or_default();

    let amount = parse_money_or_zero(child_text(node, "AmtDtls").unwrap_or(""), "AmtDtls")?;

    Ok(TransactionEntry {
        account_id: account
            .and_then(|a| child_text(a, "Id"))
            .unwrap_or_default()
            .to_string(),
        currency: account
            .and_then(|a| child_text(a, "Ccy"))
            .unwrap_or_default()
            .to_string(),
        booking_date: child(node, "BookgDt")
            .and_then(|d| child_text(d, "Dt"))
            .unwrap_or_default()
            .to_string(),
        tx_date: child_text(node, "TxDt").unwrap_or_default().to_string(),
        source: child_text(node, "TrnSrc").unwrap_or_default().to_string(),
        sign: child_text(node, "OpSgn").unwrap_or_default().to_string(),
        debtor_id: debtor
            .and_then(|d| child_text(d, "Id"))
            .unwrap_or_default()
            .to_string(),
        payer_names,
        memo: child(node, "MemoFld")
            .and_then(|m| child_text(m, "MemoFldLn"))
            .unwrap_or_default()
            .to_string(),
        reference,
        amount,
    })
}

/// Base64-decodes the payload and decodes its bytes with the bank encoding.
fn decode_report_file(encoded: &str, encoding_label: &str) -> Result<String, ReportError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64.decode(compact.as_bytes())?;

    let encoding = Encoding::for_label(encoding_label.as_bytes()).ok_or_else(|| {
        ReportError::UnknownEncoding {
            label: encoding_label.to_string(),
        }
    })?;
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(ReportError::Encoding {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 9, 17).unwrap()
    }

    #[test]
    fn extracts_business_error() {
        let response = SoapResponse::from_raw(
            "<Envelope><Body><Fault><RuleDesc>No report for criteria</RuleDesc></Fault></Body></Envelope>",
        )
        .unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.business_error(), Some("No report for criteria"));
    }

    #[test]
    fn decodes_iso_8859_2_payload_byte_for_byte() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"<SIMP2>666,2021-09-17\r\nWR");
        payload.push(0xd3); // 'Ó' in ISO-8859-2
        payload.extend_from_slice(b"BLEWICE\r\n</SIMP2>\"il.trn.:1 wart.trn.:87.00\"\r\n");
        let encoded = BASE64.encode(&payload);

        let raw = format!(
            "<Envelope><Body><RptDtls><RptNm>netforyou_202109172</RptNm>\
             <RptFile>{encoded}</RptFile></RptDtls></Body></Envelope>"
        );
        let response = SoapResponse::from_raw(&raw).unwrap();
        let file = response.report_file("ISO-8859-2", date()).unwrap();

        assert_eq!(file.filename, "netforyou_202109172.txt");
        assert!(file.text.starts_with("<SIMP2>666,2021-09-17"));
        assert!(file.text.contains("WRÓBLEWICE"));
        assert!(file.text.ends_with("\"il.trn.:1 wart.trn.:87.00\"\r\n"));
    }

    #[test]
    fn missing_report_body_yields_empty_text() {
        let response =
            SoapResponse::from_raw("<Envelope><Body><Rpt/></Body></Envelope>").unwrap();
        let file = response.report_file("ISO-8859-2", date()).unwrap();
        assert_eq!(file.text, "");
        assert_eq!(file.filename, "temp_file_2021-09-17.txt");
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        let raw = format!(
            "<Envelope><RptDtls><RptFile>{}</RptFile></RptDtls></Envelope>",
            BASE64.encode(b"abc")
        );
        let response = SoapResponse::from_raw(&raw).unwrap();
        let err = response.report_file("no-such-charset", date()).unwrap_err();
        assert!(matches!(err, ReportError::UnknownEncoding { .. }));
        assert!(err.is_report_scoped());
    }
}
