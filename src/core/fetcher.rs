use crate::core::step::contain;
use crate::domain::model::{AnnexFacts, Company, Filing, FilingList, StepReport};
use crate::domain::ports::{ConfigProvider, FilingsSource, FormPlan, Storage};
use crate::edgar::download::download_document;
use crate::edgar::items;
use crate::utils::error::{ProbeError, Result};
use std::io::Write;

/// Runs the filings walk-through: companies, financials, filing lists, latest-filing
/// items, XBRL annex and exhibit downloads. Every step is contained; a failed step is
/// reported and the run moves on.
pub struct FilingsFetcher<F: FilingsSource, S: Storage, C: ConfigProvider> {
    source: F,
    storage: S,
    config: C,
    output: Box<dyn Write + Send>,
}

impl<F: FilingsSource, S: Storage, C: ConfigProvider> FilingsFetcher<F, S, C> {
    pub fn new(source: F, storage: S, config: C) -> Self {
        Self {
            source,
            storage,
            config,
            output: Box::new(std::io::stdout()),
        }
    }

    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.output, "{}", text) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }

    pub async fn run(&mut self) -> Vec<StepReport> {
        let mut reports = Vec::new();
        tracing::info!(
            "Starting EDGAR fetch for {} companies as '{}'",
            self.config.tickers().len(),
            self.config.identity()
        );

        let companies = self.resolve_companies(&mut reports).await;
        for company in &companies {
            self.company_overview(company, &mut reports).await;
        }

        for plan in self.config.forms() {
            let latest_list = self.list_filings(&plan, &companies, &mut reports).await;
            if let Some((company, filings)) = latest_list {
                self.inspect_latest(&plan, company, &filings, &mut reports)
                    .await;
            }
        }

        self.download_documents(&mut reports).await;
        reports
    }

    async fn resolve_companies(&mut self, reports: &mut Vec<StepReport>) -> Vec<Company> {
        let mut companies = Vec::new();
        for ticker in self.config.tickers() {
            let result = self.source.resolve_company(&ticker).await;
            if let Some(company) = contain(&format!("resolve company {}", ticker), result, reports) {
                tracing::info!("Resolved {} to {} (CIK {})", ticker, company.name, company.cik);
                companies.push(company);
            }
        }
        companies
    }

    async fn company_overview(&mut self, company: &Company, reports: &mut Vec<StepReport>) {
        let result = self.source.financial_summary(company).await;
        if let Some(summary) = contain(&format!("financials for {}", company.name), result, reports) {
            self.emit(&format!("\n{} Financials:", company.name));
            self.emit(summary.to_string().trim_end());
        }

        self.emit(&format!("\n{} Former Names:", company.name));
        if company.former_names.is_empty() {
            self.emit("  (none)");
        }
        for former in &company.former_names {
            self.emit(&format!("  {}", former));
        }
        contain(&format!("former names for {}", company.name), Ok(()), reports);
    }

    /// Prints the filing list of every company; the last successful list feeds the
    /// latest-filing steps.
    async fn list_filings<'a>(
        &mut self,
        plan: &FormPlan,
        companies: &'a [Company],
        reports: &mut Vec<StepReport>,
    ) -> Option<(&'a Company, FilingList)> {
        let mut latest_list = None;
        for company in companies {
            let filings = company.get_filings(&plan.form);
            let result = if filings.is_empty() {
                Err(ProbeError::NoFilings {
                    form: plan.form.clone(),
                })
            } else {
                filings.to_table().map(|table| (filings, table))
            };

            let step = format!("{} filings for {}", plan.form, company.name);
            if let Some((filings, table)) = contain(&step, result, reports) {
                self.emit(&format!(
                    "\n{} {} Filings ({} rows):",
                    company.name,
                    plan.form,
                    filings.len()
                ));
                self.emit(&table);
                latest_list = Some((company, filings));
            }
        }
        latest_list
    }

    async fn inspect_latest(
        &mut self,
        plan: &FormPlan,
        company: &Company,
        filings: &FilingList,
        reports: &mut Vec<StepReport>,
    ) {
        let step = format!("latest {} filing for {}", plan.form, company.name);
        let Some(filing) = contain(
            &step,
            filings.latest().cloned().ok_or_else(|| ProbeError::NoFilings {
                form: plan.form.clone(),
            }),
            reports,
        ) else {
            return;
        };
        self.emit(&format!("\nLatest {}: {}", plan.form, filing));

        if !plan.items.is_empty() || plan.count_phrase.is_some() {
            let step = format!("items of {} {}", plan.form, filing.accession_number);
            let result = self.source.filing_text(company, &filing).await;
            if let Some(html) = contain(&step, result, reports) {
                let text = items::html_to_text(&html);
                self.emit(&format!("\nAvailable items in the {} filing:", plan.form));
                self.emit(&format!("  {:?}", items::available_items(&text)));

                for item in &plan.items {
                    self.show_item(plan, &filing, &text, item, reports);
                }
            }
        }

        if plan.annex {
            let step = format!("XBRL annex of {} {}", plan.form, filing.accession_number);
            let result = self.annex(company, &filing).await;
            if let Some(annex) = contain(&step, result, reports) {
                self.emit(&format!("\nExtracted XBRL data ({}):", plan.form));
                self.emit(annex.to_string().trim_end());
            }
        }
    }

    fn show_item(
        &mut self,
        plan: &FormPlan,
        filing: &Filing,
        text: &str,
        item: &str,
        reports: &mut Vec<StepReport>,
    ) {
        let step = format!("{} of {} {}", item, plan.form, filing.accession_number);
        let result = items::extract_item(text, item).ok_or_else(|| ProbeError::ItemNotFound {
            item: item.to_string(),
        });
        let Some(section) = contain(&step, result, reports) else {
            return;
        };

        self.emit(&format!("\nContent of {}:", section.item));
        self.emit(&section.text);
        if let Some(phrase) = &plan.count_phrase {
            self.emit(&format!(
                "\nNumber of '{}' mentions in {}: {}",
                phrase,
                section.item,
                items::count_phrase(&section.text, phrase)
            ));
        }
    }

    async fn annex(
        &self,
        company: &Company,
        filing: &Filing,
    ) -> Result<AnnexFacts> {
        if !filing.is_xbrl {
            tracing::warn!(
                "{} is not flagged as XBRL; annex may be empty",
                filing.accession_number
            );
        }
        self.source.annex_facts(company, filing).await
    }

    async fn download_documents(&mut self, reports: &mut Vec<StepReport>) {
        for request in self.config.downloads() {
            let step = format!("download {}", request.document);
            let result = download_document(&self.source, &self.storage, &request).await;
            if let Some(path) = contain(&step, result, reports) {
                self.emit(&format!("Document downloaded successfully: {}", path));
            }
        }
    }
}
