//! `composer` command line: fixture generation and intent replay

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use composer_catalog::{generate_catalog, FixtureConfig, InMemoryCatalog, InMemoryLocks};
use composer_core::{init_tracing, ComposerConfig, Intent, Session};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("composer")
        .version(composer_core::VERSION)
        .about("Bundle composer editing core")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("fixtures")
                .about("Print a generated catalog as JSON")
                .arg(
                    Arg::new("plans")
                        .long("plans")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Number of plans"),
                )
                .arg(
                    Arg::new("bundles")
                        .long("bundles")
                        .default_value("6")
                        .value_parser(value_parser!(usize))
                        .help("Number of bundles"),
                )
                .arg(
                    Arg::new("channels")
                        .long("channels")
                        .default_value("40")
                        .value_parser(value_parser!(usize))
                        .help("Number of channels"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a script of intents and print the submission payload")
                .arg(
                    Arg::new("catalog")
                        .long("catalog")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Catalog snapshot JSON"),
                )
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of intents"),
                )
                .arg(
                    Arg::new("no-submit")
                        .long("no-submit")
                        .action(ArgAction::SetTrue)
                        .help("Print job summaries instead of submitting"),
                ),
        );

    let matches = cli.get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ComposerConfig::load(path)?,
        None => ComposerConfig::default(),
    };
    init_tracing(&config.log_filter, matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("fixtures", args)) => {
            let fixture = FixtureConfig {
                plans: args.get_one::<usize>("plans").copied().unwrap_or(5),
                bundles: args.get_one::<usize>("bundles").copied().unwrap_or(6),
                channels: args.get_one::<usize>("channels").copied().unwrap_or(40),
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
            };
            let snapshot = generate_catalog(&fixture);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Some(("replay", args)) => {
            let catalog_path = args
                .get_one::<PathBuf>("catalog")
                .context("--catalog is required")?;
            let script_path = args
                .get_one::<PathBuf>("script")
                .context("--script is required")?;

            let catalog_json = std::fs::read_to_string(catalog_path)
                .with_context(|| format!("reading {}", catalog_path.display()))?;
            let script_json = std::fs::read_to_string(script_path)
                .with_context(|| format!("reading {}", script_path.display()))?;
            let intents: Vec<Intent> =
                serde_json::from_str(&script_json).context("script is not a list of intents")?;

            let catalog = InMemoryCatalog::from_json(&catalog_json)?;
            let session = Session::new(Arc::new(catalog), config).with_locks(Arc::new(InMemoryLocks::new()));
            let validator = session.effective_state_validator();

            for (step, intent) in intents.into_iter().enumerate() {
                let name = intent.name();
                let outcome = session
                    .apply(intent, &validator)
                    .await
                    .with_context(|| format!("step {step} ({name}) failed"))?;
                tracing::info!(step, intent = name, outcome = ?outcome, "applied");
            }

            if args.get_flag("no-submit") {
                println!("{}", serde_json::to_string_pretty(&session.jobs())?);
            } else {
                let payload = session.submit().await?;
                println!("{}", payload.to_json()?);
            }
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
