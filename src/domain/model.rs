use crate::utils::error::{ProbeError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyTicker {
    #[serde(rename = "cik_str")]
    pub cik: u64,
    pub ticker: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormerName {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    pub accession_number: String,
    pub form: String,
    pub filing_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub primary_document: String,
    pub primary_doc_description: String,
    pub size: u64,
    pub is_xbrl: bool,
}

/// Filings in EDGAR order, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingList {
    pub filings: Vec<Filing>,
}

const TABLE_HEADER: [&str; 8] = [
    "form",
    "filing_date",
    "report_date",
    "accession_number",
    "primary_document",
    "primary_doc_description",
    "size",
    "is_xbrl",
];

impl FilingList {
    pub fn new(filings: Vec<Filing>) -> Self {
        Self { filings }
    }

    pub fn len(&self) -> usize {
        self.filings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }

    pub fn filter_form(&self, form: &str) -> FilingList {
        let filings = self
            .filings
            .iter()
            .filter(|f| f.form.eq_ignore_ascii_case(form))
            .cloned()
            .collect();
        FilingList { filings }
    }

    /// Most recent filing by filing date; on equal dates the earlier list entry wins.
    pub fn latest(&self) -> Option<&Filing> {
        self.filings
            .iter()
            .rev()
            .max_by_key(|f| f.filing_date)
    }

    pub fn to_table(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(TABLE_HEADER)?;
        for f in &self.filings {
            let filing_date = f.filing_date.to_string();
            let report_date = f.report_date.map(|d| d.to_string()).unwrap_or_default();
            let size = f.size.to_string();
            writer.write_record([
                f.form.as_str(),
                filing_date.as_str(),
                report_date.as_str(),
                f.accession_number.as_str(),
                f.primary_document.as_str(),
                f.primary_doc_description.as_str(),
                size.as_str(),
                if f.is_xbrl { "true" } else { "false" },
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| {
            let io = std::io::Error::new(e.error().kind(), e.to_string());
            ProbeError::CsvError(io.into())
        })?;
        Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub cik: u64,
    pub name: String,
    pub tickers: Vec<String>,
    pub former_names: Vec<FormerName>,
    pub filings: FilingList,
}

impl Company {
    pub fn get_filings(&self, form: &str) -> FilingList {
        self.filings.filter_form(form)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub concept: String,
    pub label: String,
    pub unit: String,
    pub value: f64,
    pub period_end: NaiveDate,
    pub form: String,
    pub fiscal_period: Option<String>,
    pub accession_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub entity_name: String,
    pub metrics: Vec<FinancialMetric>,
}

/// XBRL facts reported by one filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnexFacts {
    pub accession_number: String,
    pub facts: Vec<FinancialMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingSection {
    pub item: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub cik: String,
    pub accession_number: String,
    pub document: String,
    pub save_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Succeeded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Succeeded)
    }
}

fn format_metric(f: &mut fmt::Formatter<'_>, m: &FinancialMetric) -> fmt::Result {
    writeln!(
        f,
        "  {:<48} {:>20} {:<6} {} ({}{})",
        m.label,
        format_value(m.value),
        m.unit,
        m.period_end,
        m.form,
        m.fiscal_period
            .as_deref()
            .map(|p| format!(" {}", p))
            .unwrap_or_default()
    )
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

impl fmt::Display for FinancialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.entity_name)?;
        if self.metrics.is_empty() {
            return writeln!(f, "  (no financial data reported)");
        }
        for m in &self.metrics {
            format_metric(f, m)?;
        }
        Ok(())
    }
}

impl fmt::Display for AnnexFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "XBRL facts for {} ({} facts)",
            self.accession_number,
            self.facts.len()
        )?;
        for m in &self.facts {
            format_metric(f, m)?;
        }
        Ok(())
    }
}

impl fmt::Display for FormerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (from {} to {})",
            self.name,
            self.from.as_deref().unwrap_or("?"),
            self.to.as_deref().unwrap_or("?")
        )
    }
}

impl fmt::Display for Filing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} filed {} [{}] {}",
            self.form, self.filing_date, self.accession_number, self.primary_document
        )
    }
}
