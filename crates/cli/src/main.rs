use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "optcycle")]
#[command(about = "Replay an option-writing cycle against recorded market data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded prices through the lifecycle controller
    Backtest {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Price CSV (timestamp,symbol,price)
        #[arg(short, long)]
        prices: String,
        /// Option chain CSV (as_of,contract)
        #[arg(long)]
        chain: String,
        /// Assignment/expiry schedule CSV (timestamp,event,contract,deliver)
        #[arg(long)]
        schedule: Option<String>,
        /// Commission as a fraction of notional
        #[arg(long, default_value = "0")]
        commission: Decimal,
        /// Slippage in basis points
        #[arg(long, default_value = "0")]
        slippage_bps: Decimal,
    },
    /// Load and validate a config file without running anything
    Validate {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Evaluate one function through the cross-runtime bridge
    Compute {
        /// Function name, e.g. "sin"
        function: String,
        /// Numeric arguments
        #[arg(allow_negative_numbers = true)]
        args: Vec<Decimal>,
        /// Runtime to call into (builtin or python)
        #[arg(long, default_value = "builtin")]
        runtime: String,
        /// Python module functions are resolved from
        #[arg(long, default_value = "numpy")]
        module: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Backtest {
            config,
            prices,
            chain,
            schedule,
            commission,
            slippage_bps,
        } => {
            let inputs = commands::BacktestInputs {
                config,
                prices,
                chain,
                schedule,
                commission,
                slippage_bps,
            };
            commands::run_backtest(&inputs).await?;
        }
        Commands::Validate { config } => {
            commands::validate(&config)?;
        }
        Commands::Compute {
            function,
            args,
            runtime,
            module,
        } => {
            commands::compute(&function, &args, &runtime, &module)?;
        }
    }

    Ok(())
}
