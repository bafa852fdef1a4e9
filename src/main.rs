//! Command-line harness: one invocation per process.
//!
//! Usage: landslide_risk [EVENT_JSON | -] [--dry-run] [--demo]
//!
//! The event comes from the first positional argument, from stdin when it
//! is `-`, or is `{}` when absent. `--demo` substitutes the sample event
//! `{"places": ["Kasaan", "Craig", "Anchorage"]}`. `--dry-run` keeps rows in
//! memory instead of connecting to PostgreSQL.

use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use landslide_risk::config::{Config, RainfallSourceKind, Settings, settings_path};
use landslide_risk::db::{MemoryRiskStore, PgRiskStore, RiskStore};
use landslide_risk::event::InvocationEvent;
use landslide_risk::ingest::iem::IemRainfall;
use landslide_risk::ingest::{FixedRainfall, RainfallSource};
use landslide_risk::logging::{self, DataSource};
use landslide_risk::RiskEvaluator;

const DEMO_EVENT: &str = r#"{"places": ["Kasaan", "Craig", "Anchorage"]}"#;

struct Args {
    event: String,
    dry_run: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut event = None;
    let mut dry_run = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--demo" => event = Some(DEMO_EVENT.to_string()),
            "-" => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|e| format!("failed to read event from stdin: {}", e))?;
                event = Some(buffer);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
            raw => event = Some(raw.to_string()),
        }
    }

    Ok(Args {
        event: event.unwrap_or_else(|| "{}".to_string()),
        dry_run,
    })
}

fn build_rainfall(settings: &Settings) -> Result<Box<dyn RainfallSource>, Box<dyn std::error::Error>> {
    let source: Box<dyn RainfallSource> = match settings.rainfall_source()? {
        RainfallSourceKind::Fixed => Box::new(FixedRainfall {
            rainfall_mm: settings.run.fixed_rainfall_mm,
        }),
        RainfallSourceKind::Iem => {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?;
            Box::new(
                IemRainfall::new(client, settings.registry())
                    .with_default_station(settings.default_asos_station().map(String::from)),
            )
        }
    };
    Ok(source)
}

fn run(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    // Configuration is complete before anything is fetched or written.
    let (settings, mut store): (Settings, Box<dyn RiskStore>) = if args.dry_run {
        dotenv::dotenv().ok();
        let settings = Settings::load(&settings_path())?;
        logging::init_logger(settings.log_level(), settings.logging.file.as_deref());
        logging::info(DataSource::System, None, "Dry run: rows are kept in memory");
        let store: Box<dyn RiskStore> = Box::new(MemoryRiskStore::new());
        (settings, store)
    } else {
        let config = Config::load()?;
        logging::init_logger(config.settings.log_level(), config.settings.logging.file.as_deref());
        let store: Box<dyn RiskStore> = Box::new(PgRiskStore::connect_and_verify(&config.db)?);
        (config.settings, store)
    };

    let rainfall = build_rainfall(&settings)?;
    let evaluator = RiskEvaluator::new(&settings, rainfall);

    let response = evaluator.handle(InvocationEvent::parse(&args.event), store.as_mut())?;

    Ok(serde_json::to_string(&response)?)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("usage: landslide_risk [EVENT_JSON | -] [--dry-run] [--demo]");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            eprintln!("landslide_risk: {}", e);
            ExitCode::FAILURE
        }
    }
}
