//! Wire shapes of the EDGAR JSON endpoints and their conversion into domain models.

use crate::domain::model::{
    AnnexFacts, Company, CompanyTicker, Filing, FilingList, FinancialMetric, FinancialSummary,
    FormerName,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// `company_tickers.json` is an object keyed by row index.
pub type TickerTable = HashMap<String, CompanyTicker>;

/// CIK arrives as a number in some endpoints and a string in others.
pub fn de_cik<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid CIK {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid CIK '{}'", s))),
        other => Err(serde::de::Error::custom(format!(
            "expected CIK as number or string, got {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submissions {
    #[serde(deserialize_with = "de_cik")]
    pub cik: u64,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub former_names: Vec<RawFormerName>,
    pub filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
pub struct RawFormerName {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionFilings {
    pub recent: RecentFilings,
}

/// Column-oriented: index `i` of every vector describes the same filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub report_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
    pub primary_doc_description: Vec<String>,
    pub size: Vec<u64>,
    #[serde(rename = "isXBRL")]
    pub is_xbrl: Vec<u8>,
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // formerNames dates carry a time part: 2019-01-01T00:00:00.000Z
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl RecentFilings {
    pub fn into_filing_list(self) -> FilingList {
        let mut filings = Vec::with_capacity(self.accession_number.len());
        for (i, accession_number) in self.accession_number.into_iter().enumerate() {
            let Some(filing_date) = self.filing_date.get(i).and_then(|d| parse_date(d)) else {
                tracing::debug!("Skipping filing {} without a valid filing date", accession_number);
                continue;
            };
            filings.push(Filing {
                accession_number,
                form: self.form.get(i).cloned().unwrap_or_default(),
                filing_date,
                report_date: self.report_date.get(i).and_then(|d| parse_date(d)),
                primary_document: self.primary_document.get(i).cloned().unwrap_or_default(),
                primary_doc_description: self
                    .primary_doc_description
                    .get(i)
                    .cloned()
                    .unwrap_or_default(),
                size: self.size.get(i).copied().unwrap_or(0),
                is_xbrl: self.is_xbrl.get(i).copied().unwrap_or(0) == 1,
            });
        }
        FilingList::new(filings)
    }
}

impl From<Submissions> for Company {
    fn from(s: Submissions) -> Self {
        Company {
            cik: s.cik,
            name: s.name,
            tickers: s.tickers,
            former_names: s
                .former_names
                .into_iter()
                .map(|f| FormerName {
                    name: f.name,
                    from: f.from.as_deref().and_then(parse_date).map(|d| d.to_string()),
                    to: f.to.as_deref().and_then(parse_date).map(|d| d.to_string()),
                })
                .collect(),
            filings: s.filings.recent.into_filing_list(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    pub entity_name: String,
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, Concept>>,
}

#[derive(Debug, Deserialize)]
pub struct Concept {
    pub label: Option<String>,
    #[serde(default)]
    pub units: HashMap<String, Vec<FactValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactValue {
    pub end: String,
    pub val: f64,
    pub accn: String,
    pub fp: Option<String>,
    pub form: String,
    pub filed: String,
}

/// us-gaap concepts shown in a financial summary; later names are fallbacks for the first.
pub const SUMMARY_CONCEPTS: &[&[&str]] = &[
    &[
        "Revenues",
        "RevenueFromContractWithCustomerExcludingAssessedTax",
    ],
    &["NetIncomeLoss"],
    &["OperatingIncomeLoss"],
    &["Assets"],
    &["Liabilities"],
    &["StockholdersEquity"],
    &["CashAndCashEquivalentsAtCarryingValue"],
    &["EarningsPerShareDiluted"],
];

const PERIODIC_FORMS: [&str; 2] = ["10-K", "10-Q"];

fn metric(concept: &str, c: &Concept, unit: &str, fact: &FactValue) -> Option<FinancialMetric> {
    Some(FinancialMetric {
        concept: concept.to_string(),
        label: c.label.clone().unwrap_or_else(|| concept.to_string()),
        unit: unit.to_string(),
        value: fact.val,
        period_end: parse_date(&fact.end)?,
        form: fact.form.clone(),
        fiscal_period: fact.fp.clone(),
        accession_number: fact.accn.clone(),
    })
}

impl CompanyFacts {
    fn us_gaap(&self, concept: &str) -> Option<&Concept> {
        self.facts.get("us-gaap").and_then(|t| t.get(concept))
    }

    fn latest_periodic(concept: &str, c: &Concept) -> Option<FinancialMetric> {
        let mut units: Vec<&String> = c.units.keys().collect();
        units.sort_by_key(|u| match u.as_str() {
            "USD" => 0,
            "USD/shares" => 1,
            _ => 2,
        });
        let unit = units.first()?;
        c.units
            .get(*unit)?
            .iter()
            .filter(|f| PERIODIC_FORMS.contains(&f.form.as_str()))
            .max_by(|a, b| (a.end.as_str(), a.filed.as_str()).cmp(&(b.end.as_str(), b.filed.as_str())))
            .and_then(|fact| metric(concept, c, unit, fact))
    }

    pub fn summary(&self) -> FinancialSummary {
        let metrics = SUMMARY_CONCEPTS
            .iter()
            .filter_map(|candidates| {
                candidates.iter().find_map(|concept| {
                    self.us_gaap(concept)
                        .and_then(|c| Self::latest_periodic(concept, c))
                })
            })
            .collect();
        FinancialSummary {
            entity_name: self.entity_name.clone(),
            metrics,
        }
    }

    pub fn annex_for(&self, accession_number: &str) -> AnnexFacts {
        let mut facts: Vec<FinancialMetric> = self
            .facts
            .values()
            .flat_map(|concepts| concepts.iter())
            .flat_map(move |(name, c)| {
                c.units.iter().flat_map(move |(unit, values)| {
                    values
                        .iter()
                        .filter(move |v| v.accn == accession_number)
                        .filter_map(move |v| metric(name, c, unit, v))
                })
            })
            .collect();
        facts.sort_by(|a, b| {
            a.concept
                .cmp(&b.concept)
                .then(b.period_end.cmp(&a.period_end))
                .then(a.unit.cmp(&b.unit))
        });
        AnnexFacts {
            accession_number: accession_number.to_string(),
            facts,
        }
    }
}
