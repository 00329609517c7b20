use clap::Parser;
use edgar_probe::config::toml_config::DEFAULT_FILTER;
use edgar_probe::sniffer::capture::{self, read_timeout_for};
use edgar_probe::sniffer::{display, raw_data_to_hex, DatalinkSource, Filter};
use edgar_probe::utils::logger;
use edgar_probe::{ProbeError, TomlConfig};
use std::time::Duration;

/// Placeholder payload whose hex form is printed before capturing.
const PLACEHOLDER: &[u8] = b"...";

#[derive(Debug, Parser)]
#[command(name = "packet-sniffer")]
#[command(about = "Capture packets matching a BPF-style filter and show their layers")]
struct Args {
    /// Path to a TOML configuration file ([sniffer] section)
    #[arg(short, long)]
    config: Option<String>,

    /// Interface to capture on (default: first interface that is up with a MAC address)
    #[arg(short, long)]
    interface: Option<String>,

    /// Filter expression, e.g. "ip and (tcp or udp)"
    #[arg(short, long)]
    filter: Option<String>,

    /// Number of matching packets to capture (0 = until interrupted)
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Stop after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the available interfaces and exit
    #[arg(long)]
    list_interfaces: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    log_json: bool,
}

fn fail(e: &ProbeError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

fn resolve(args: &Args) -> Result<TomlConfig, ProbeError> {
    let mut config = match &args.config {
        Some(path) => TomlConfig::from_file(path)?,
        None => TomlConfig::default(),
    };
    if let Some(interface) = &args.interface {
        config.sniffer.interface = Some(interface.clone());
    }
    if let Some(filter) = &args.filter {
        config.sniffer.filter = filter.clone();
    }
    if let Some(count) = args.count {
        config.sniffer.count = count;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.sniffer.timeout_ms = Some(timeout_ms);
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    if args.list_interfaces {
        for line in capture::list_interfaces() {
            println!("{}", line);
        }
        return;
    }

    let config = match resolve(&args) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    // count 0 means "until interrupted" on the command line only
    let count = config.sniffer.count;
    if count > 0 {
        if let Err(e) = config.validate_sniffer() {
            fail(&e);
        }
    }

    println!("{}", raw_data_to_hex(PLACEHOLDER));

    let filter = match Filter::parse(&config.sniffer.filter) {
        Ok(filter) => filter,
        Err(e) => fail(&e),
    };
    if config.sniffer.filter != DEFAULT_FILTER {
        tracing::info!("Using filter '{}'", filter);
    }

    let timeout = config.sniffer.timeout_ms.map(Duration::from_millis);
    let mut source = match DatalinkSource::open(config.sniffer.interface.as_deref(), read_timeout_for(timeout)) {
        Ok(source) => source,
        Err(e) => fail(&e),
    };

    let result = capture::sniff(&mut source, &filter, count, timeout, |frame| {
        println!("{}", display::summary(frame));
        print!("{}", display::show(frame));
    });

    match result {
        Ok(stats) => {
            tracing::info!(
                "✅ Captured {} of {} packets seen on {}",
                stats.matched,
                stats.seen,
                source.interface().name
            );
        }
        Err(e) => fail(&e),
    }
}
