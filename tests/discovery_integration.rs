use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use ing_simp_report::{
    EmptyReportPolicy, ReportDay, ReportError, ReportFormat, SoapResponse, SoapTransport,
};
use log::{Level, LevelFilter};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

/// Transport that replays canned response bodies in order and panics on
/// unexpected extra calls.
struct ScriptedTransport {
    responses: RefCell<VecDeque<String>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<String>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
        }
    }

    fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl SoapTransport for ScriptedTransport {
    fn send(&self, _body: &str) -> Result<SoapResponse, ReportError> {
        let xml = self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("unexpected extra SOAP call");
        SoapResponse::from_raw(&xml)
    }
}

/// Logger that records every emitted message, tagged with the emitting
/// thread so concurrently running tests stay independent.
struct CapturingLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records.lock().unwrap().push((
            thread::current().id(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    records: Mutex::new(Vec::new()),
};

/// Installs the capturing logger; a process holds at most one logger, so
/// every test that inspects log output goes through this.
fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger installed");
        log::set_max_level(LevelFilter::Debug);
    });
}

fn errors_from_this_thread() -> Vec<String> {
    let current = thread::current().id();
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(id, level, _)| *id == current && *level == Level::Error)
        .map(|(_, _, message)| message.clone())
        .collect()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 9, 17).unwrap()
}

/// Probe answer resolving the bank-assigned report id, namespaced the way
/// the endpoint namespaces it.
fn probe_response(report_id: u32) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>
        <r:GetMCReportResponse xmlns:r="urn:ca:std:ccs:ing:tech:xsd:rpts.013.001.01">
        <r:Document><r:MCRpt><r:Rpt><r:RptId><r:EQ>{report_id}</r:EQ></r:RptId></r:Rpt>
        </r:MCRpt></r:Document></r:GetMCReportResponse></s:Body></s:Envelope>"#
    )
}

fn rule_error_response() -> String {
    r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>
    <s:Fault><RuleDesc>MCP007: no report matches the criteria</RuleDesc></s:Fault>
    </s:Body></s:Envelope>"#
        .to_string()
}

fn ntry(amount: &str) -> String {
    format!(
        r"<r:Ntry>
        <r:Ref><r:TxRef>972018700278X</r:TxRef></r:Ref>
        <r:BookgDt><r:Dt>2021-09-17</r:Dt></r:BookgDt>
        <r:TxDt>2021-09-16</r:TxDt>
        <r:TrnSrc>E</r:TrnSrc>
        <r:OpSgn>C</r:OpSgn>
        <r:SimpAcct><r:Id>68105001617564000000000000004</r:Id><r:Ccy>PLN</r:Ccy></r:SimpAcct>
        <r:Dbtr><r:Id>78116022020000000462640706</r:Id><r:Nm>LABETSKI STANISLAV</r:Nm></r:Dbtr>
        <r:MemoFld><r:MemoFldLn>Przelew krajowy - NECIOR</r:MemoFldLn></r:MemoFld>
        <r:AmtDtls>{amount}</r:AmtDtls>
        </r:Ntry>"
    )
}

fn itemized_response(amounts: &[&str]) -> String {
    let entries: String = amounts.iter().map(|a| ntry(a)).collect();
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>
        <r:GetMCReportResponse xmlns:r="urn:ca:std:ccs:ing:tech:xsd:rpts.013.001.01">
        <r:Document><r:MCRpt><r:Rpt>{entries}</r:Rpt></r:MCRpt></r:Document>
        </r:GetMCReportResponse></s:Body></s:Envelope>"#
    )
}

fn raw_response(encoded_payload: &str) -> String {
    format!(
        "<Envelope><Body><GetMCReportResponse><Document><Rpt><RptDtls>\
         <RptNm>netforyou_202109172</RptNm><RptFile>{encoded_payload}</RptFile>\
         </RptDtls></Rpt></Document></GetMCReportResponse></Body></Envelope>"
    )
}

#[test]
fn walks_the_full_day_sequence() {
    let transport = ScriptedTransport::new(vec![
        probe_response(3),
        itemized_response(&["87.00"]),
        probe_response(4),
        itemized_response(&["10.55", "1.00"]),
        rule_error_response(),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status));
    assert_eq!(records[0].report_id, 3);
    assert_eq!(records[1].report_id, 4);
    assert_eq!(records[0].transaction_count, 1);
    assert_eq!(records[1].transaction_count, 2);
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn zero_report_date_yields_empty_sequence() {
    let transport = ScriptedTransport::new(vec![rule_error_response()]);
    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .expect("day fetch");
    assert!(records.is_empty());
}

#[test]
fn zero_report_date_logs_exactly_one_error() {
    capture_logs();
    let transport = ScriptedTransport::new(vec![rule_error_response()]);
    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .expect("day fetch");
    assert!(records.is_empty());

    let errors = errors_from_this_thread();
    assert_eq!(errors.len(), 1, "error-level records: {errors:?}");
    assert!(errors[0].contains("error processing SOAP request"));
    assert!(errors[0].contains("MCP007"));
}

#[test]
fn end_of_sequence_after_a_discovery_is_not_an_error() {
    capture_logs();
    let transport = ScriptedTransport::new(vec![
        probe_response(1),
        itemized_response(&["87.00"]),
        rule_error_response(),
    ]);
    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 1);
    // The terminating business error is ordinary end-of-sequence here and
    // must not surface at error level.
    assert!(errors_from_this_thread().is_empty());
}

#[test]
fn single_itemized_report_end_to_end() {
    let transport = ScriptedTransport::new(vec![
        probe_response(5),
        itemized_response(&["87.00"]),
        rule_error_response(),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.report_id, 5);
    assert_eq!(record.transaction_count, 1);
    assert_eq!(record.filename, "ING-SIMP_2021-09-17_5.txt");

    let text = record.report_text.as_deref().expect("report text");
    assert!(text.starts_with("<SIMP2>666,2021-09-17"));
    assert!(text.ends_with("</SIMP2>\"il.trn.:1 wart.trn.:87.0\"\n"));
}

#[test]
fn raw_run_fetches_a_single_report() {
    let payload = b"<SIMP2>666,2021-09-17\r\nline\r\n</SIMP2>\"il.trn.:1 wart.trn.:87.00\"\r\n";
    let transport = ScriptedTransport::new(vec![
        probe_response(2),
        raw_response(&BASE64.encode(payload)),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Raw)
        .fetch_all()
        .expect("day fetch");

    // The raw variant short-circuits after the first fetch.
    assert_eq!(records.len(), 1);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(records[0].transaction_count, 1);
    assert_eq!(records[0].filename, "netforyou_202109172.txt");
    assert!(
        records[0]
            .report_text
            .as_deref()
            .expect("report text")
            .starts_with("<SIMP2>666,2021-09-17")
    );
}

#[test]
fn kept_empty_report_stays_in_the_sequence() {
    let transport = ScriptedTransport::new(vec![
        probe_response(1),
        itemized_response(&[]),
        rule_error_response(),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .empty_reports(EmptyReportPolicy::Keep)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 1);
    assert!(records[0].status);
    assert_eq!(records[0].transaction_count, 0);
    assert!(records[0].report_text.is_none());
}

#[test]
fn skipped_empty_report_is_dropped_but_pagination_continues() {
    let transport = ScriptedTransport::new(vec![
        probe_response(1),
        itemized_response(&[]),
        probe_response(2),
        itemized_response(&["5.00"]),
        rule_error_response(),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .empty_reports(EmptyReportPolicy::Skip)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].report_id, 2);
}

#[test]
fn decode_failure_ends_the_run_with_a_failed_record() {
    let transport = ScriptedTransport::new(vec![
        probe_response(1),
        raw_response("!!! not base64 !!!"),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Raw)
        .fetch_all()
        .expect("day fetch");

    assert_eq!(records.len(), 1);
    assert!(!records[0].status);
    assert!(records[0].report_text.is_none());
}

#[test]
fn force_mode_skips_undecodable_reports() {
    let transport = ScriptedTransport::new(vec![
        probe_response(1),
        raw_response("!!! not base64 !!!"),
    ]);

    let records = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Raw)
        .force(true)
        .fetch_all()
        .expect("day fetch");

    assert!(records.is_empty());
}

#[test]
fn unparsable_response_is_a_hard_error() {
    let transport = ScriptedTransport::new(vec!["HTTP 502 Bad Gateway".to_string()]);
    let err = ReportDay::new(&transport, date(), "105001617564")
        .format(ReportFormat::Itemized)
        .fetch_all()
        .unwrap_err();
    assert!(!err.is_report_scoped());
}
