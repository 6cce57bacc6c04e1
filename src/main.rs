//! CLI: fetches the SIMP reports of one date and prints, saves or mails them.

use chrono::{Days, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use ing_simp_report::{
    EmptyReportPolicy, HttpTransport, MailParams, ReportDay, ReportFormat, ReportRecord,
    send_report_mail,
};
use log::{error, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_ENDPOINT: &str = "https://ws.ingbusiness.pl/ing-ccs/cdc00101";
const DEFAULT_CERT: &str = "client.pem";
const DEFAULT_SIMP_CODE: &str = "105001617564";
const DEFAULT_BANK_ENCODING: &str = "ISO-8859-2";
const DEFAULT_MAIL_PORT: u16 = 587;

/// Exit code when the run completed without producing a usable report.
const EXIT_NO_REPORT: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Print fetched reports to stdout.
    Get,
    /// Write one file per fetched report.
    Save,
    /// Write report files and mail them as attachments.
    Send,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Raw,
    Itemized,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Raw => Self::Raw,
            FormatArg::Itemized => Self::Itemized,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmptyArg {
    Keep,
    Skip,
}

impl From<EmptyArg> for EmptyReportPolicy {
    fn from(value: EmptyArg) -> Self {
        match value {
            EmptyArg::Keep => Self::Keep,
            EmptyArg::Skip => Self::Skip,
        }
    }
}

/// ING SIMP report handler.
#[derive(Debug, Parser)]
#[command(name = "ing-simp-report", version)]
struct Cli {
    /// Script mode.
    #[arg(value_enum)]
    mode: Mode,
    /// Report date (default: yesterday).
    #[arg(short, long)]
    date: Option<NaiveDate>,
    /// ING customer SIMP code.
    #[arg(short, long)]
    simpcode: Option<String>,
    /// Text encoding used by the bank.
    #[arg(long)]
    bank_encoding: Option<String>,
    /// Reporting endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,
    /// Client certificate (PEM) for mutual TLS.
    #[arg(long)]
    cert: Option<PathBuf>,
    /// Payload format requested from the endpoint.
    #[arg(long, value_enum)]
    report_format: Option<FormatArg>,
    /// Policy for itemized reports with zero entries.
    #[arg(long, value_enum)]
    empty_reports: Option<EmptyArg>,
    /// Verbose mode.
    #[arg(short, long)]
    verbose: bool,
    /// Force mode: skip undecodable reports instead of stopping.
    #[arg(short, long)]
    force: bool,
    /// TOML config file supplying defaults for unset options.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Target email address for the reports.
    #[arg(long)]
    mail_to: Option<String>,
    /// Source email address the mail is sent from.
    #[arg(long)]
    mail_from: Option<String>,
    /// Mail server host name.
    #[arg(long)]
    mail_host: Option<String>,
    /// Mail server port number.
    #[arg(long)]
    mail_port: Option<u16>,
    /// Mail server user.
    #[arg(long)]
    mail_user: Option<String>,
    /// Mail server password.
    #[arg(long)]
    mail_pass: Option<String>,
}

/// Optional config file; any present field acts as a default.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    simpcode: Option<String>,
    bank_encoding: Option<String>,
    endpoint: Option<String>,
    cert: Option<PathBuf>,
    mail_to: Option<String>,
    mail_from: Option<String>,
    mail_host: Option<String>,
    mail_port: Option<u16>,
    mail_user: Option<String>,
    mail_pass: Option<String>,
}

/// Fully resolved run settings: CLI over config file over defaults.
struct Settings {
    date: NaiveDate,
    simp_code: String,
    bank_encoding: String,
    endpoint: String,
    cert: PathBuf,
    format: ReportFormat,
    empty_reports: EmptyReportPolicy,
    mail_to: Option<String>,
    mail_from: Option<String>,
    mail_host: Option<String>,
    mail_port: u16,
    mail_user: String,
    mail_pass: String,
}

impl Settings {
    fn resolve(cli: &Cli, file: FileConfig) -> Self {
        Self {
            date: cli
                .date
                .unwrap_or_else(|| Local::now().date_naive() - Days::new(1)),
            simp_code: cli
                .simpcode
                .clone()
                .or(file.simpcode)
                .unwrap_or_else(|| DEFAULT_SIMP_CODE.to_string()),
            bank_encoding: cli
                .bank_encoding
                .clone()
                .or(file.bank_encoding)
                .unwrap_or_else(|| DEFAULT_BANK_ENCODING.to_string()),
            endpoint: cli
                .endpoint
                .clone()
                .or(file.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            cert: cli
                .cert
                .clone()
                .or(file.cert)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CERT)),
            format: cli.report_format.map_or(ReportFormat::Raw, Into::into),
            empty_reports: cli.empty_reports.map_or_else(Default::default, Into::into),
            mail_to: cli.mail_to.clone().or(file.mail_to),
            mail_from: cli.mail_from.clone().or(file.mail_from),
            mail_host: cli.mail_host.clone().or(file.mail_host),
            mail_port: cli
                .mail_port
                .or(file.mail_port)
                .unwrap_or(DEFAULT_MAIL_PORT),
            mail_user: cli.mail_user.clone().or(file.mail_user).unwrap_or_default(),
            mail_pass: cli.mail_pass.clone().or(file.mail_pass).unwrap_or_default(),
        }
    }

    fn mail_params(&self) -> Result<MailParams, Box<dyn std::error::Error>> {
        let to = self.mail_to.clone().ok_or("mail_to is required for send mode")?;
        let from = self
            .mail_from
            .clone()
            .ok_or("mail_from is required for send mode")?;
        let server = self
            .mail_host
            .clone()
            .ok_or("mail_host is required for send mode")?;
        Ok(MailParams {
            to: vec![to, from.clone()],
            from,
            subject: format!("ING SIMP report at {}", self.date),
            body: format!(
                "Dear Colleague, please find attached SIMP report generated for: {}",
                self.date
            ),
            server,
            port: self.mail_port,
            username: self.mail_user.clone(),
            password: self.mail_pass.clone(),
            use_tls: true,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            // The library already reported the failed probe at error level;
            // the summary line stays below it.
            warn!("no usable SIMP report produced");
            ExitCode::from(EXIT_NO_REPORT)
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let file = match &cli.config {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, file);

    let transport = HttpTransport::new(settings.endpoint.clone(), &settings.cert)?;
    let records = ReportDay::new(&transport, settings.date, settings.simp_code.clone())
        .format(settings.format)
        .bank_encoding(settings.bank_encoding.clone())
        .empty_reports(settings.empty_reports)
        .force(cli.force)
        .fetch_all()?;

    let usable: Vec<&ReportRecord> = records.iter().filter(|r| r.is_usable()).collect();

    match cli.mode {
        Mode::Get => {
            for record in &usable {
                if let Some(text) = record.report_text.as_deref() {
                    print!("{text}");
                }
            }
        }
        Mode::Save => {
            save_reports(&usable)?;
        }
        Mode::Send => {
            let files = save_reports(&usable)?;
            if !files.is_empty() {
                let params = settings.mail_params()?;
                send_report_mail(&params, &files)?;
                info!("SIMP report sent via email to: {:?}", params.to);
            }
        }
    }

    Ok(!usable.is_empty())
}

/// Writes each usable report under its file name in the working directory.
fn save_reports(records: &[&ReportRecord]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for record in records {
        if let Some(text) = record.report_text.as_deref() {
            fs::write(&record.filename, text)?;
            info!("SIMP report saved: {}", record.filename);
            files.push(PathBuf::from(&record.filename));
        }
    }
    Ok(files)
}
