use clap::Parser;

use stats_api::Report;
use stats_bridge::{
    BridgeConfig, BridgeError, ForeignReport, InMemoryHeap, StatsCollectorCallbackWrapper,
};

#[derive(Parser)]
#[command(
    name = "stats-dump",
    about = "Deliver a stats report through the bridge and print the foreign object graph"
)]
struct Cli {
    /// Path to the report JSON file.
    #[arg(long, env = "STATS_DUMP_REPORT")]
    report: String,

    /// Path to TOML configuration file. Defaults apply when omitted.
    #[arg(long, env = "STATS_DUMP_CONFIG")]
    config: Option<String>,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
}

fn load_report(path: &str) -> Result<Report, BridgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Io(e).with_context(path))?;
    serde_json::from_str(&content).map_err(|e| BridgeError::InvalidReport(format!("{path}: {e}")))
}

/// The callback must have received exactly one report.
fn single_report(delivered: Vec<ForeignReport>) -> Result<ForeignReport, BridgeError> {
    let [report]: [ForeignReport; 1] = delivered.try_into().map_err(|rest: Vec<ForeignReport>| {
        BridgeError::Delivery(format!("expected one delivered report, got {}", rest.len()))
    })?;
    Ok(report)
}

fn run(cli: &Cli) -> Result<String, BridgeError> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path, "loading configuration");
            BridgeConfig::load(path)?
        }
        None => BridgeConfig::default(),
    };

    tracing::info!(report = %cli.report, "loading report");
    let report = load_report(&cli.report)?;

    let mut env = InMemoryHeap::new(&config.heap);
    let callback = env.register_callback();
    let wrapper = StatsCollectorCallbackWrapper::new(callback, &config);
    wrapper.on_stats_delivered(&mut env, &report)?;

    tracing::info!(
        records = report.len(),
        objects = env.object_count(),
        peak_local_refs = env.peak_local_refs(),
        "report delivered"
    );

    let delivered = single_report(env.delivered_reports(callback)?)?;
    let output = if cli.pretty {
        serde_json::to_string_pretty(&delivered)
    } else {
        serde_json::to_string(&delivered)
    };
    output.map_err(|e| BridgeError::Io(e.into()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "stats dump failed");
            std::process::exit(1);
        }
    }
}
