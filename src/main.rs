use clap::Parser;
use edgar_probe::core::step::tally;
use edgar_probe::domain::model::StepOutcome;
use edgar_probe::utils::logger;
use edgar_probe::{CliConfig, EdgarClient, FilingsFetcher, LocalStorage, ProbeError, TomlConfig};

fn fail(e: &ProbeError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

fn print_plan(config: &TomlConfig) {
    println!("Identity: {}", config.edgar.identity);
    println!("Companies:");
    for company in &config.companies {
        println!("  {}", company.ticker);
    }
    println!("Forms:");
    for plan in &config.forms {
        let phrase = plan
            .count_phrase
            .as_deref()
            .map(|p| format!(", count '{}'", p))
            .unwrap_or_default();
        let annex = if plan.annex { ", XBRL annex" } else { "" };
        println!("  {} items {:?}{}{}", plan.form, plan.items, phrase, annex);
    }
    println!("Downloads (under {}):", config.edgar.download_dir);
    for request in &config.downloads {
        println!(
            "  {} -> {}",
            EdgarClient::document_url(
                &config.edgar.archives_url,
                &request.cik,
                &request.accession_number,
                &request.document
            ),
            request.save_path
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting edgar-probe");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    if let Err(e) = config.validate_fetcher() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    if cli.dry_run {
        print_plan(&config);
        return Ok(());
    }

    let client = match EdgarClient::new(&config.edgar.identity, config.endpoints(), config.timeout()) {
        Ok(client) => client,
        Err(e) => fail(&e),
    };
    let storage = LocalStorage::new(config.edgar.download_dir.clone());
    let mut fetcher = FilingsFetcher::new(client, storage, config);

    let reports = fetcher.run().await;
    let (succeeded, failed) = tally(&reports);

    println!("\nRun summary: {} steps succeeded, {} failed", succeeded, failed);
    for report in &reports {
        if let StepOutcome::Failed { reason } = &report.outcome {
            println!("  ✗ {}: {}", report.step, reason);
        }
    }

    if failed > 0 {
        tracing::warn!("⚠️ Completed with {} failed steps", failed);
        std::process::exit(2);
    }

    tracing::info!("✅ All steps completed successfully!");
    Ok(())
}
