use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tabsync::config::{self, SyncConfig};
use tabsync::demo::{self, Scenario, SimulationOptions};

#[derive(Parser)]
#[command(name = "tabsync")]
#[command(
    about = "Simulate participants sharing one value over a local broadcast store",
    version
)]
#[command(after_help = "Protocol:
- Every participant asks for the current value when it mounts
- Any participant holding the value answers; the first answer wins
- Every local update is broadcast and applied by all other participants")]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run several tabs on one channel and report their final states
    Simulate {
        #[arg(short, long, default_value = "3")]
        tabs: usize,

        #[arg(long, default_value = "shared")]
        channel: String,

        /// Increments performed by the first tab
        #[arg(short, long, default_value = "5")]
        updates: usize,

        /// Event loop tick in milliseconds
        #[arg(long, default_value = "10")]
        tick_ms: u64,
    },

    /// Run one of the canned handshake scenarios
    Scenario {
        #[arg(value_enum)]
        name: ScenarioName,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    Update,
    LateJoin,
    Simultaneous,
}

impl From<ScenarioName> for Scenario {
    fn from(name: ScenarioName) -> Self {
        match name {
            ScenarioName::Update => Scenario::Update,
            ScenarioName::LateJoin => Scenario::LateJoin,
            ScenarioName::Simultaneous => Scenario::Simultaneous,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SyncConfig::default(),
    };
    config::init_tracing(&config);

    let command = cli.command.unwrap_or(Commands::Simulate {
        tabs: 3,
        channel: "shared".into(),
        updates: 5,
        tick_ms: 10,
    });

    match command {
        Commands::Simulate {
            tabs,
            channel,
            updates,
            tick_ms,
        } => {
            println!(
                "{}",
                format!("🗂  Simulating {} tabs on channel '{}'...", tabs, channel)
                    .cyan()
                    .bold()
            );

            let options = SimulationOptions {
                tabs,
                channel,
                updates,
                tick: Duration::from_millis(tick_ms),
                config,
            };
            let report = demo::simulate(&options).await?;

            for tab in &report.tabs {
                println!(
                    "  {} tab {} count={} {}",
                    "→".bright_blue(),
                    tab.index,
                    tab.state.count.to_string().bright_yellow(),
                    if tab.initialised {
                        "(initialised)".bright_black()
                    } else {
                        "(waiting)".bright_black()
                    }
                );
            }

            if report.errors() > 0 {
                println!("{} {} messages dropped", "⚠️".bright_yellow(), report.errors());
            }

            if report.converged() {
                println!("{}", "✓ All tabs converged".green());
            } else {
                println!("{}", "✗ Tabs diverged".red());
            }
        }

        Commands::Scenario { name } => {
            let report = demo::run_scenario(name.into())?;
            println!(
                "{}",
                format!("🔄 Scenario: {:?}", report.scenario).cyan().bold()
            );
            for (participant, counter) in &report.participants {
                println!(
                    "  {} {} count={}",
                    "→".bright_blue(),
                    participant.bright_white(),
                    counter.count.to_string().bright_yellow()
                );
            }
        }
    }

    Ok(())
}
