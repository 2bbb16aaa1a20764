// Flagship CLI entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use flagship_common::Amount;
use flagship_config::FundConfig;
use flagship_governance::{FlagshipStatus, FundingSource, VoteChoice};
use flagship_ledger::FundType;

mod app;
mod handlers;
mod output;

use app::App;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dual-fund governance for community flagships")]
struct Cli {
    /// YAML configuration file (defaults to $FLAGSHIP_CONFIG_FILE or ./flagship.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose mode (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Strategic plans steering the Reserve
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Fund balances and contributions
    Fund {
        #[command(subcommand)]
        command: FundCommands,
    },
    /// Members' personal wallets
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
    /// Flagship projects
    Flagship {
        #[command(subcommand)]
        command: FlagshipCommands,
    },
    /// Community votes on Pool flagships
    Vote {
        #[command(subcommand)]
        command: VoteCommands,
    },
    /// Sponsorship of tabled flagships
    Sponsor {
        #[command(subcommand)]
        command: SponsorCommands,
    },
    /// Eligible voters
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PlanCommands {
    /// Create a strategic plan
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        vision: String,
        /// Funding goal
        #[arg(long)]
        goal: Amount,
    },
    /// Mark a plan completed
    Complete { plan_id: String },
    /// Archive a plan
    Archive { plan_id: String },
    /// List all plans
    List,
    /// Reserve balance against the current plan
    Progress,
}

#[derive(Subcommand, Debug)]
enum FundCommands {
    /// Contribute from a member's wallet to the Pool
    Contribute {
        #[arg(long)]
        member: String,
        #[arg(long)]
        amount: Amount,
        #[arg(long)]
        note: Option<String>,
    },
    /// Capitalize a fund as the operator
    Operator {
        /// reserve or pool
        fund: FundType,
        amount: Amount,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show both fund balances
    Balance,
    /// Recompute a fund's balance from its records
    Audit { fund: FundType },
}

#[derive(Subcommand, Debug)]
enum WalletCommands {
    /// Top up a member's wallet
    Credit { member: String, amount: Amount },
    /// Show a member's wallet balance
    Balance { member: String },
}

#[derive(Subcommand, Debug)]
enum FlagshipCommands {
    /// Create a flagship and its project
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long)]
        goal: Amount,
        #[arg(long)]
        creator: String,
        /// reserve or pool
        #[arg(long)]
        source: FundingSource,
        /// Strategic plan, required for reserve flagships
        #[arg(long)]
        plan: Option<String>,
    },
    /// Disburse Reserve money toward a flagship
    Fund { flagship_id: String, amount: Amount },
    /// Show a flagship with its project
    Show { flagship_id: String },
    /// List flagships
    List {
        #[arg(long)]
        status: Option<FlagshipStatus>,
        #[arg(long)]
        source: Option<FundingSource>,
        #[arg(long)]
        plan: Option<String>,
    },
    /// Delete a flagship that has not received money
    Remove { flagship_id: String },
}

#[derive(Subcommand, Debug)]
enum VoteCommands {
    /// Cast or change a vote
    Cast {
        flagship_id: String,
        member: String,
        /// approve, reject or table
        choice: VoteChoice,
    },
    /// Current tally
    Tally { flagship_id: String },
    /// Finalize a vote whose deadline has passed
    Finalize { flagship_id: String },
    /// Finalize every vote whose deadline has passed
    FinalizeDue,
}

#[derive(Subcommand, Debug)]
enum SponsorCommands {
    /// Sponsor a tabled flagship
    Add { flagship_id: String, member: String },
    /// Sponsors so far and sponsors needed
    Status { flagship_id: String },
}

#[derive(Subcommand, Debug)]
enum MemberCommands {
    /// Grant the voting role
    Grant { member: String },
    /// Revoke the voting role
    Revoke { member: String },
    /// List eligible voters
    List,
}

fn load_config(cli: &Cli) -> Result<FundConfig> {
    let mut config = match &cli.config {
        Some(path) => FundConfig::from_file(path)?,
        None => FundConfig::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    match cli.verbose {
        0 => {}
        1 => config.logging.log_level = "debug".to_string(),
        _ => config.logging.log_level = "trace".to_string(),
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    flagship_common::logging::init_logging(&config.logging.log_level, config.logging.log_dir.as_deref())?;

    let app = App::open(&config, cli.json).await?;

    match cli.command {
        Commands::Plan { command } => handlers::plan(&app, command).await,
        Commands::Fund { command } => handlers::fund(&app, command).await,
        Commands::Wallet { command } => handlers::wallet(&app, command).await,
        Commands::Flagship { command } => handlers::flagship(&app, command).await,
        Commands::Vote { command } => handlers::vote(&app, command).await,
        Commands::Sponsor { command } => handlers::sponsor(&app, command).await,
        Commands::Member { command } => handlers::member(&app, command).await,
    }
}
