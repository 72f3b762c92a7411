use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use healthchain_abi::{healthcare_records_abi, HEALTHCARE_RECORDS_ABI};
use healthchain_core::{
    render::{render, render_records},
    CoreConfig, DappResult, Dashboard, FormField, WalletConnector,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod shell;

#[derive(Parser)]
#[command(name = "healthchain")]
#[command(about = "HealthChain patient records contract client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the wallet and show the dashboard
    Status,
    /// Fetch a patient's records
    Fetch {
        /// Patient ID (decimal)
        patient_id: String,
    },
    /// Add a record for a patient
    Add {
        /// Patient ID (decimal)
        patient_id: String,
        /// Patient name
        #[arg(long)]
        name: String,
        #[arg(long)]
        diagnosis: String,
        #[arg(long)]
        treatment: String,
    },
    /// Authorize a healthcare provider (contract owner only)
    Authorize {
        /// Provider address (0x-prefixed)
        provider: String,
    },
    /// Print the embedded contract ABI
    Abi,
    /// Print the function selectors
    Selectors,
    /// Interactive dashboard
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthchain_cli=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Abi) => {
            println!("{}", HEALTHCARE_RECORDS_ABI.trim_end());
        }
        Some(Commands::Selectors) => {
            let abi = healthcare_records_abi()?;
            for name in abi.function_names() {
                let function = abi.function(name)?;
                println!(
                    "0x{}  {}",
                    hex::encode(function.selector()),
                    function.signature()
                );
            }
        }
        Some(Commands::Status) => {
            let dashboard = dashboard().await?;
            print!("{}", render(&dashboard));
        }
        Some(Commands::Fetch { patient_id }) => {
            let mut dashboard = dashboard().await?;
            dashboard.set_field(FormField::PatientId, patient_id);
            let result = dashboard.fetch_patient_records().await;
            run(&dashboard, result)?;
            if dashboard.records().is_empty() {
                println!("No records found.");
            } else {
                print!("{}", render_records(dashboard.records(), &Local));
            }
        }
        Some(Commands::Add {
            patient_id,
            name,
            diagnosis,
            treatment,
        }) => {
            let mut dashboard = dashboard().await?;
            dashboard.set_field(FormField::PatientId, patient_id);
            dashboard.set_field(FormField::PatientName, name);
            dashboard.set_field(FormField::Diagnosis, diagnosis);
            dashboard.set_field(FormField::Treatment, treatment);
            let result = dashboard.add_record().await;
            run(&dashboard, result)?;
            print!("{}", render_records(dashboard.records(), &Local));
        }
        Some(Commands::Authorize { provider }) => {
            let mut dashboard = dashboard().await?;
            dashboard.set_field(FormField::ProviderAddress, provider);
            let result = dashboard.authorize_provider().await;
            run(&dashboard, result)?;
        }
        Some(Commands::Shell) => {
            let dashboard = dashboard().await?;
            shell::run(dashboard).await?;
        }
        None => {
            println!("Use 'healthchain --help' for commands");
        }
    }

    Ok(())
}

/// Loads configuration and runs the wallet initialisation task.
async fn dashboard() -> anyhow::Result<Dashboard> {
    let cfg = Arc::new(CoreConfig::from_env().context("invalid configuration")?);
    let connector = WalletConnector::from_config(&cfg);
    Ok(Dashboard::initialise(cfg, connector).await)
}

/// Prints the latest notice and turns a failed action into a non-zero exit.
fn run(dashboard: &Dashboard, result: DappResult<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => {
            if let Some(notice) = dashboard.last_notice() {
                println!("{}", notice.message);
            }
            Ok(())
        }
        Err(e) => {
            let message = dashboard
                .last_notice()
                .map(|n| n.message.clone())
                .unwrap_or_else(|| e.to_string());
            anyhow::bail!(message)
        }
    }
}
