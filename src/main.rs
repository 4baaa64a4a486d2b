#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use astra::backends::BackendSet;
use astra::config::Config;
use astra::exec::ExecutionGate;
use astra::gateway::run_gateway;
use astra::intent::resolve_intent;
use astra::policy::PolicyTables;
use astra::router::route_request;
use astra::security::scrub_text;
use astra::skills::plan_for_intent;
use astra::util::estimate_token_count;

/// Astra - a Linux desktop assistant that only runs whitelisted actions.
#[derive(Parser, Debug)]
#[command(name = "astra")]
#[command(version)]
#[command(about = "Voice-driven desktop agent with whitelisted execution.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Bind address (default from ASTRA_HOST, else 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default from ASTRA_PORT, else 3110)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Resolve text into a command plan, optionally executing it
    Plan {
        /// Free text, e.g. "open firefox" or "run df -h"
        text: String,

        /// Execute the plan through the safety gate (default: print only)
        #[arg(long)]
        run: bool,

        /// Confirm risky commands (rm -rf, dd, ...)
        #[arg(long)]
        confirm: bool,
    },

    /// Show the backend routing decision for a piece of text
    Route {
        text: String,

        /// Route as if the caller forced cloud inference
        #[arg(long)]
        force_cloud: bool,
    },

    /// Run text through the privacy scrubber and print the result
    Scrub { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { host, port } => {
            let config = Config::from_env();
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            run_gateway(&host, port, config).await?;
        }

        Commands::Plan { text, run, confirm } => {
            let config = Config::from_env();
            let policy = PolicyTables::builtin();
            let backends = BackendSet::from_config(&config);

            let Some(intent) = resolve_intent(&text, &policy, backends.local.as_ref()).await
            else {
                bail!("could not parse an intent from {text:?}");
            };
            println!(
                "intent: {} (confidence {:.2})",
                intent.name.as_str(),
                intent.confidence
            );

            let plan = plan_for_intent(&intent, &policy)?;
            for command in &plan {
                println!("  {command}");
            }

            if run {
                let gate = ExecutionGate::new(config, policy);
                let results =
                    tokio::task::spawn_blocking(move || gate.execute(&plan, confirm, false))
                        .await?;
                for r in &results {
                    println!("[{}] {}", r.returncode, r.command);
                    if !r.stdout.is_empty() {
                        println!("{}", r.stdout);
                    }
                    if !r.stderr.is_empty() {
                        eprintln!("{}", r.stderr);
                    }
                }
                if results.iter().any(|r| r.returncode != 0) {
                    std::process::exit(1);
                }
            } else {
                println!("(plan only; pass --run to execute)");
            }
        }

        Commands::Route { text, force_cloud } => {
            let config = Config::from_env();
            let backends = BackendSet::from_config(&config);
            let routed = route_request(&text, force_cloud, &config, &backends);
            println!("backend: {}", routed.name.as_str());
            println!("reason:  {}", routed.reason);
            println!("tokens:  ~{}", estimate_token_count(&text));
        }

        Commands::Scrub { text } => {
            println!("{}", scrub_text(&text));
        }
    }

    Ok(())
}
