//! Outbound SOAP envelope construction for the `GetMCReport` operation.

use crate::error::ReportError;
use crate::types::ReportQuery;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Namespace declarations the reporting endpoint expects on the envelope.
const NAMESPACES: [(&str, &str); 4] = [
    (
        "xmlns:soapenv",
        "http://schemas.xmlsoap.org/soap/envelope/",
    ),
    ("xmlns:urn", "urn:ca:std:ccs:ing:tech:xsd:mhdr.001.001.01"),
    ("xmlns:urn1", "urn:ca:std:cdc:tech:xsd:ing.cdc.001.01"),
    ("xmlns:urn2", "urn:ca:std:ccs:ing:tech:xsd:rpts.013.001.01"),
];

/// Renders the request envelope for one `(date, slot)` query.
///
/// Values are written through `quick_xml`, so interpolated text is escaped
/// and cannot break the document structure.
pub fn build_envelope(msg_id: &str, query: &ReportQuery) -> Result<String, ReportError> {
    let mut writer = Writer::new(Vec::new());

    let mut envelope = BytesStart::new("soapenv:Envelope");
    for (key, value) in NAMESPACES {
        envelope.push_attribute((key, value));
    }
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Empty(BytesStart::new("soapenv:Header")))?;

    open(&mut writer, "soapenv:Body")?;
    open(&mut writer, "urn1:GetMCReport")?;
    open(&mut writer, "urn2:Document")?;
    open(&mut writer, "urn2:GetMCRpt")?;

    open(&mut writer, "urn2:MsgId")?;
    leaf(&mut writer, "urn2:Id", msg_id)?;
    close(&mut writer, "urn2:MsgId")?;

    open(&mut writer, "urn2:RptMCQryDef")?;
    open(&mut writer, "urn2:RptMCCrit")?;
    open(&mut writer, "urn2:NewCrit")?;
    open(&mut writer, "urn2:SchCrit")?;

    open(&mut writer, "urn2:Cdtr")?;
    leaf(&mut writer, "urn2:EQ", &query.simp_code)?;
    close(&mut writer, "urn2:Cdtr")?;

    open(&mut writer, "urn2:RptDt")?;
    open(&mut writer, "urn2:DtSch")?;
    leaf(
        &mut writer,
        "urn2:Dt",
        &query.report_date.format("%Y-%m-%d").to_string(),
    )?;
    close(&mut writer, "urn2:DtSch")?;
    close(&mut writer, "urn2:RptDt")?;

    open(&mut writer, "urn2:RptId")?;
    leaf(&mut writer, "urn2:EQ", &query.slot_id.to_string())?;
    close(&mut writer, "urn2:RptId")?;

    // Profiles without RptFrmt support simply leave the field out.
    if let Some(format) = query.format {
        leaf(&mut writer, "urn2:RptFrmt", format.wire_value())?;
    }

    close(&mut writer, "urn2:SchCrit")?;
    close(&mut writer, "urn2:NewCrit")?;
    close(&mut writer, "urn2:RptMCCrit")?;
    close(&mut writer, "urn2:RptMCQryDef")?;

    close(&mut writer, "urn2:GetMCRpt")?;
    close(&mut writer, "urn2:Document")?;
    close(&mut writer, "urn1:GetMCReport")?;
    close(&mut writer, "soapenv:Body")?;
    close(&mut writer, "soapenv:Envelope")?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn open(writer: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))
}

fn close(writer: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

fn leaf(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}
