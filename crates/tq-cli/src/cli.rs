use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tq",
    about = "TerraQuest Ledger: append-only, hash-linked activity log",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./tq.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger database file, overriding the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the ledger database and its genesis block
    Init(InitArgs),
    /// Submit one activity
    Add(AddArgs),
    /// Submit activities interactively
    Submit(SubmitArgs),
    /// Append the bundled sample activities
    Seed(SeedArgs),
    /// List submitted activities
    Activities(ActivitiesArgs),
    /// Record a score for an activity
    Score(ScoreArgs),
    /// Record that a user completed an activity
    Complete(CompleteArgs),
    /// Work with generated campaigns
    Campaigns(CampaignsArgs),
    /// Show the newest blocks
    Log(LogArgs),
    /// Verify hash chain integrity
    Verify(VerifyArgs),
    /// Start the HTTP API
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(short, long)]
    pub description: String,
    /// User who posted the activity
    #[arg(short, long)]
    pub user: String,
    /// Difficulty rating, typically 0-10
    #[arg(long, allow_negative_numbers = true)]
    pub difficulty: f64,
    #[arg(short, long, allow_negative_numbers = true)]
    pub points: i64,
    /// Seconds since the epoch; defaults to now
    #[arg(long)]
    pub time_posted: Option<i64>,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Blocks shown after the session ends
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: u64,
}

#[derive(Args)]
pub struct SeedArgs {}

#[derive(Args)]
pub struct ActivitiesArgs {
    /// Only the most recent submission
    #[arg(long)]
    pub latest: bool,
}

#[derive(Args)]
pub struct ScoreArgs {
    pub activity_id: String,
    #[arg(long)]
    pub difficulty: f64,
    #[arg(short, long)]
    pub points: u64,
    #[arg(long, default_value = "moderate")]
    pub risk: String,
}

#[derive(Args)]
pub struct CompleteArgs {
    pub activity_id: String,
    #[arg(short, long)]
    pub user: String,
    /// Seconds since the epoch; defaults to now
    #[arg(long)]
    pub at: Option<i64>,
}

#[derive(Args)]
pub struct CampaignsArgs {
    #[command(subcommand)]
    pub action: CampaignAction,
}

#[derive(Subcommand)]
pub enum CampaignAction {
    /// Append campaigns from a JSON file (`{"campaigns": [...]}` or a bare list)
    Import { file: PathBuf },
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: u64,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
