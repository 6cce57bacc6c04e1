//! Conversion of transaction entries to the SIMP2 flat-text dialect.

use crate::types::TransactionEntry;
use crate::utils::format_total;
use rust_decimal::Decimal;
use std::fmt::Write;

/// Renders a sequence of entries as one SIMP2 report.
///
/// Entries are processed in server order; the header carries the booking
/// date of the last processed entry and the footer the entry count and the
/// sum of unscaled amounts. Zero entries produce an empty report (stated
/// policy; whether an empty report is kept is decided by the caller's
/// [`EmptyReportPolicy`](crate::EmptyReportPolicy)).
#[must_use]
pub fn entries_to_simp(entries: &[TransactionEntry]) -> String {
    let Some(last) = entries.last() else {
        return String::new();
    };

    let mut lines = String::new();
    let mut total = Decimal::ZERO;
    for entry in entries {
        total += entry.amount;
        let _ = writeln!(lines, "{}", entry_line(entry));
    }

    let header = format!("<SIMP2>666,{}\n", last.booking_date);
    let footer = format!(
        "</SIMP2>\"il.trn.:{} wart.trn.:{}\"\n",
        entries.len(),
        format_total(total)
    );

    header + &lines + &footer
}

/// One CSV-dialect line; absent payer-name slots render as empty strings.
fn entry_line(entry: &TransactionEntry) -> String {
    let name = |idx: usize| entry.payer_names[idx].as_deref().unwrap_or("");
    format!(
        "{acct},{cents},{sign},{ccy},{bookg},UZN,{reference},,\"{debtor}\",\
         \"{n1}\",\"{n2}\",\"{n3}\",\"{n4}\",\"{memo}\",\"\",\"\",\"\",{src},,{tx}",
        acct = entry.account_id,
        cents = entry.cents(),
        sign = entry.sign,
        ccy = entry.currency,
        bookg = entry.booking_date,
        reference = entry.reference,
        debtor = entry.debtor_id,
        n1 = name(0),
        n2 = name(1),
        n3 = name(2),
        n4 = name(3),
        memo = entry.memo,
        src = entry.source,
        tx = entry.tx_date,
    )
}

#[cfg(test)]
mod tests {
    use super::entries_to_simp;
    use crate::types::{Money, TransactionEntry};
    use std::str::FromStr;

    fn entry(amount: &str, booking_date: &str) -> TransactionEntry {
        TransactionEntry {
            account_id: "68105001617564000000000000004".to_string(),
            currency: "PLN".to_string(),
            booking_date: booking_date.to_string(),
            tx_date: "2021-09-16".to_string(),
            source: "E".to_string(),
            sign: "C".to_string(),
            debtor_id: "78116022020000000462640706".to_string(),
            payer_names: [
                Some("LABETSKI STANISLAV".to_string()),
                Some(String::new()),
                None,
                None,
            ],
            memo: "Przelew krajowy - NECIOR".to_string(),
            reference: "97201870027".to_string(),
            amount: Money::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn zero_entries_produce_an_empty_report() {
        assert_eq!(entries_to_simp(&[]), "");
    }

    #[test]
    fn renders_header_line_and_footer() {
        let report = entries_to_simp(&[entry("87.00", "2021-09-17")]);
        let mut lines = report.lines();
        assert_eq!(lines.next(), Some("<SIMP2>666,2021-09-17"));
        assert_eq!(
            lines.next(),
            Some(
                "68105001617564000000000000004,8700,C,PLN,2021-09-17,UZN,97201870027,,\
                 \"78116022020000000462640706\",\"LABETSKI STANISLAV\",\"\",\"\",\"\",\
                 \"Przelew krajowy - NECIOR\",\"\",\"\",\"\",E,,2021-09-16"
            )
        );
        assert_eq!(lines.next(), Some("</SIMP2>\"il.trn.:1 wart.trn.:87.0\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn footer_total_is_the_unscaled_sum() {
        let report = entries_to_simp(&[
            entry("87.00", "2021-09-17"),
            entry("10.55", "2021-09-17"),
        ]);
        assert!(report.ends_with("</SIMP2>\"il.trn.:2 wart.trn.:97.55\"\n"));
    }

    #[test]
    fn header_takes_the_last_entry_booking_date() {
        let report = entries_to_simp(&[
            entry("1.00", "2021-09-15"),
            entry("2.00", "2021-09-17"),
        ]);
        assert!(report.starts_with("<SIMP2>666,2021-09-17\n"));
    }
}
