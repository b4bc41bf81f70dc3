use std::io;
use std::sync::Arc;

use anyhow::Context as _;
use colored::Colorize;
use serde::Serialize;
use tq_ledger::NewActivity;
use tq_server::handler::ChainEntry;
use tq_server::{Ledger, TerraQuestServer};
use tq_store::{ChainStore, SqliteChainStore};
use tq_types::{ActivityScore, Block, CompletionRecord, Receipt};

use crate::cli::*;
use crate::config::CliConfig;
use crate::{import, interactive, seed};

struct Context {
    config: CliConfig,
    format: OutputFormat,
}

impl Context {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Open the configured database without touching its contents.
    fn open(&self) -> anyhow::Result<Ledger> {
        let path = &self.config.database;
        let store = SqliteChainStore::open(path)
            .with_context(|| format!("opening ledger database {}", path.display()))?;
        let store: Box<dyn ChainStore> = Box::new(store);
        Ok(Ledger::with_config(store, self.config.ledger.clone()))
    }

    /// Open the database and make sure it has a genesis block.
    fn open_ready(&self) -> anyhow::Result<Ledger> {
        let ledger = self.open()?;
        if let Some(genesis) = ledger.initialize_and_ensure_genesis()? {
            tracing::info!(hash = %genesis.hash, "created genesis block");
        }
        Ok(ledger)
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = db;
    }
    let ctx = Context {
        config,
        format: cli.format,
    };

    match cli.command {
        Command::Init(_) => cmd_init(&ctx),
        Command::Add(args) => cmd_add(&ctx, args),
        Command::Submit(args) => cmd_submit(&ctx, args),
        Command::Seed(_) => cmd_seed(&ctx),
        Command::Activities(args) => cmd_activities(&ctx, args),
        Command::Score(args) => cmd_score(&ctx, args),
        Command::Complete(args) => cmd_complete(&ctx, args),
        Command::Campaigns(args) => match args.action {
            CampaignAction::Import { file } => cmd_campaigns_import(&ctx, &file),
        },
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Verify(_) => cmd_verify(&ctx),
        Command::Serve(args) => cmd_serve(ctx, args),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_receipt(ctx: &Context, what: &str, receipt: &Receipt) -> anyhow::Result<()> {
    if ctx.json() {
        return print_json(receipt);
    }
    println!("{} {what}", "✓".green().bold());
    println!("  Block Height: {}", receipt.height.to_string().bold());
    println!("  Block Hash: {}", receipt.hash.yellow());
    Ok(())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn cmd_init(ctx: &Context) -> anyhow::Result<()> {
    let ledger = ctx.open()?;
    let created = ledger.initialize_and_ensure_genesis()?;
    let genesis = ledger
        .block(0)?
        .context("ledger has no genesis block after initialization")?;

    if ctx.json() {
        return print_json(&serde_json::json!({
            "database": ctx.config.database,
            "created": created.is_some(),
            "genesis": genesis.receipt(),
        }));
    }
    let verb = if created.is_some() { "Initialized" } else { "Reopened" };
    println!(
        "{} {verb} ledger in {}",
        "✓".green().bold(),
        ctx.config.database.display().to_string().bold()
    );
    println!("  Genesis: {}", genesis.hash.yellow());
    Ok(())
}

fn cmd_add(ctx: &Context, args: AddArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_ready()?;
    let mut new = NewActivity::new(
        args.name,
        args.description,
        args.user,
        args.difficulty,
        args.points,
    );
    if let Some(ts) = args.time_posted {
        new = new.posted_at(ts);
    }
    let (activity, receipt) = ledger.submit_activity(new)?;

    if ctx.json() {
        return print_json(&serde_json::json!({ "activity": activity, "receipt": receipt }));
    }
    print_receipt(ctx, "Activity stored in ledger.", &receipt)?;
    println!("  Activity: {}", activity.id.cyan());
    Ok(())
}

fn cmd_submit(ctx: &Context, args: SubmitArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_ready()?;
    println!("{}", "TerraQuest Activity Submission".bold());

    let stdin = io::stdin();
    let receipts = interactive::run_session(&ledger, &mut stdin.lock(), &mut io::stdout())?;
    println!("\n{} activities stored.", receipts.len());

    println!("\n{}", "Current Ledger State".bold());
    print_chain(&ledger.blocks(Some(args.limit))?);
    print_verification(&ledger);
    Ok(())
}

fn cmd_seed(ctx: &Context) -> anyhow::Result<()> {
    let ledger = ctx.open_ready()?;
    let samples = seed::sample_activities(now());
    let mut receipts = Vec::with_capacity(samples.len());
    for sample in samples {
        let name = sample.name.clone();
        let receipt = ledger
            .add_activity(sample)
            .with_context(|| format!("seeding {name:?}"))?;
        tracing::debug!(height = receipt.height, %name, "seeded activity");
        receipts.push(receipt);
    }

    if ctx.json() {
        return print_json(&receipts);
    }
    println!("{} Seeded {} sample activities", "✓".green().bold(), receipts.len());
    if let Some(last) = receipts.last() {
        println!("  Tip: {} {}", last.height.to_string().bold(), last.hash.yellow());
    }
    Ok(())
}

fn cmd_activities(ctx: &Context, args: ActivitiesArgs) -> anyhow::Result<()> {
    let ledger = ctx.open()?;
    let events = if args.latest {
        ledger.latest_activity_event()?.into_iter().collect()
    } else {
        ledger.get_activity_events()?
    };

    if ctx.json() {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No activities submitted yet.");
        return Ok(());
    }
    for event in &events {
        let a = &event.activity;
        println!(
            "{}  {} ({} pts, difficulty {}) by {}",
            a.id.dimmed(),
            a.name.bold(),
            a.points,
            a.difficulty_rating,
            a.user_who_posted.cyan()
        );
    }
    Ok(())
}

fn cmd_score(ctx: &Context, args: ScoreArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_ready()?;
    let receipt = ledger.score_activity(ActivityScore {
        activity_id: args.activity_id,
        difficulty_score: args.difficulty,
        points: args.points,
        risk_level: args.risk,
    })?;
    print_receipt(ctx, "Score recorded.", &receipt)
}

fn cmd_complete(ctx: &Context, args: CompleteArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_ready()?;
    let receipt = ledger.record_completion(CompletionRecord {
        user_id: args.user,
        activity_id: args.activity_id,
        completed_at: args.at.unwrap_or_else(now),
    })?;
    print_receipt(ctx, "Completion recorded.", &receipt)
}

fn cmd_campaigns_import(ctx: &Context, file: &std::path::Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let campaigns = import::parse_campaigns(&text)?;
    let ledger = ctx.open_ready()?;

    let events = ledger.get_activity_events()?;
    let tiers = import::tiers_by_id(events.iter().map(|e| &e.activity));

    let mut receipts = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        let mismatched = import::tier_mismatches(&campaign, &tiers);
        if !mismatched.is_empty() {
            tracing::warn!(
                campaign = %campaign.title,
                tier = %campaign.tier,
                activities = ?mismatched,
                "campaign groups activities from other difficulty bands"
            );
        }
        let title = campaign.title.clone();
        let receipt = ledger
            .record_campaign(campaign)
            .with_context(|| format!("recording campaign {title:?}"))?;
        if !ctx.json() {
            println!("  {} {} at height {}", "+".green(), title.bold(), receipt.height);
        }
        receipts.push(receipt);
    }

    if ctx.json() {
        return print_json(&receipts);
    }
    println!("{} Imported {} campaigns", "✓".green().bold(), receipts.len());
    Ok(())
}

fn cmd_log(ctx: &Context, args: LogArgs) -> anyhow::Result<()> {
    let ledger = ctx.open()?;
    let blocks = ledger.blocks(Some(args.limit))?;

    if ctx.json() {
        let entries: Vec<ChainEntry> = blocks.into_iter().map(ChainEntry::from).collect();
        return print_json(&entries);
    }
    if blocks.is_empty() {
        println!("Ledger is empty. Run `tq init` first.");
        return Ok(());
    }
    if args.oneline {
        for block in &blocks {
            println!(
                "{} {} {}",
                format!("#{}", block.height).yellow(),
                block.short_hash().dimmed(),
                block.event_type
            );
        }
    } else {
        print_chain(&blocks);
    }
    Ok(())
}

fn print_chain(blocks: &[Block]) {
    for block in blocks {
        println!(
            "\n{} | {} | ts={}",
            format!("Block {}", block.height).yellow().bold(),
            block.event_type.cyan(),
            block.timestamp
        );
        println!("  prev_hash: {}", block.prev_hash.dimmed());
        println!("  hash:      {}", block.hash);
        let payload = block
            .payload_value()
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| block.payload_json.clone());
        for line in payload.lines() {
            println!("  {line}");
        }
    }
}

/// Print the verification result; `true` when the chain is intact.
fn print_verification(ledger: &Ledger) -> bool {
    let result = ledger.verify_chain();
    match &result.error {
        None => println!("\n{} Chain integrity verified", "✓".green().bold()),
        Some(reason) => println!("\n{} Chain invalid: {}", "✗".red().bold(), reason),
    }
    result.valid
}

fn cmd_verify(ctx: &Context) -> anyhow::Result<()> {
    let ledger = ctx.open()?;
    if ctx.json() {
        let result = ledger.verify_chain();
        print_json(&result)?;
        if let Some(reason) = result.error {
            anyhow::bail!("chain verification failed: {reason}");
        }
        return Ok(());
    }

    let blocks = ledger.block_count()?;
    if print_verification(&ledger) {
        println!("  {} blocks checked", blocks.to_string().bold());
        Ok(())
    } else {
        anyhow::bail!("chain verification failed")
    }
}

fn cmd_serve(ctx: Context, args: ServeArgs) -> anyhow::Result<()> {
    let ledger = Arc::new(ctx.open()?);
    let mut config = ctx.config.server;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "TerraQuest ledger API on {} (database: {})",
        config.bind_addr.to_string().bold(),
        ctx.config.database.display()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(TerraQuestServer::new(config, ledger).serve())?;
    Ok(())
}
