use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::seq::SliceRandom;
use stagechain_core::{
    constants::DEFAULT_DIFFICULTY_BITS, pow, search_parallel, Block, CancelFlag, Ledger,
    SearchLimits, SearchStats, Target,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "stagechain-cli")]
#[command(about = "Prove blocks into an in-memory stage ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a ledger, prove blocks onto it and print it
    Mine(MineArgs),
    /// Show the target for a difficulty
    Target {
        /// Leading zero bits a hash needs, in [0, 256)
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY_BITS)]
        difficulty: u32,
    },
}

#[derive(Args, Debug, Clone)]
struct MineArgs {
    /// Leading zero bits a hash needs, in [0, 256)
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY_BITS)]
    difficulty: u32,

    /// Stages to add after genesis
    #[arg(long, default_value_t = 1)]
    stages: u64,

    /// Blocks to prove per stage
    #[arg(long, default_value_t = 1)]
    blocks_per_stage: usize,

    /// Payload for every block
    #[arg(long, default_value = "Here is some data!")]
    data: String,

    /// Give up on proving after this many seconds in total
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Spread each search over all cores
    #[arg(long)]
    parallel: bool,

    /// Print the ledger as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Mine(args) => mine(args).await,
        Command::Target { difficulty } => {
            let target = Target::from_difficulty(difficulty)?;
            println!("difficulty: {}", target.difficulty_bits());
            println!("target: {target}");
            println!("expected attempts: {}", target.expected_attempts());
            Ok(())
        }
    }
}

async fn mine(args: MineArgs) -> Result<()> {
    let ledger = Arc::new(Ledger::new(args.difficulty).context("creating ledger")?);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling search");
                cancel.cancel();
            }
        });
    }
    let mut limits = SearchLimits::unbounded().with_cancel(cancel);
    if let Some(secs) = args.timeout_secs {
        limits = limits.with_timeout(Duration::from_secs(secs));
    }

    // The ledger is printed even when proving stops early.
    let outcome = extend(&ledger, &args, &limits).await;
    let view = ledger.print();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{view}");
    }
    outcome
}

async fn extend(ledger: &Arc<Ledger>, args: &MineArgs, limits: &SearchLimits) -> Result<()> {
    let target = *ledger.target();
    info!(
        "Proving {} stage(s) of {} block(s), target {} (~{} attempts per block)",
        args.stages,
        args.blocks_per_stage,
        target,
        target.expected_attempts()
    );

    for _ in 0..args.stages {
        let stage = ledger.height();
        let parents = ledger.tip_hashes();
        for _ in 0..args.blocks_per_stage {
            let parent = *parents
                .choose(&mut rand::thread_rng())
                .context("previous stage has no blocks")?;
            let block = Block::new(stage, parent.to_vec(), args.data.as_bytes().to_vec());

            let (block, stats) = prove(block, target, limits.clone(), args.parallel)
                .await
                .with_context(|| format!("proving a block for stage {stage}"))?;
            let acceptance = ledger.add_block(block)?;
            info!(
                stage = acceptance.stage,
                position = acceptance.position,
                attempts = stats.attempts,
                "block added"
            );
        }
    }
    Ok(())
}

/// Run one search on the blocking pool so Ctrl-C can still be observed.
async fn prove(
    mut block: Block,
    target: Target,
    limits: SearchLimits,
    parallel: bool,
) -> Result<(Block, SearchStats)> {
    let stats = tokio::task::spawn_blocking(move || {
        let stats = if parallel {
            search_parallel(&mut block, &target, &limits)
        } else {
            pow::search_with(&mut block, &target, &limits)
        };
        stats.map(|stats| (block, stats))
    })
    .await
    .context("search task panicked")??;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mine_defaults_match_a_single_block_run() {
        let cli = Cli::try_parse_from(["stagechain-cli", "mine"]).unwrap();
        let Command::Mine(args) = cli.cmd else {
            panic!("expected mine");
        };
        assert_eq!(args.difficulty, DEFAULT_DIFFICULTY_BITS);
        assert_eq!(args.stages, 1);
        assert_eq!(args.blocks_per_stage, 1);
        assert_eq!(args.data, "Here is some data!");
        assert!(args.timeout_secs.is_none());
        assert!(!args.parallel && !args.json);
    }

    #[test]
    fn mine_flags_parse() {
        let cli = Cli::try_parse_from([
            "stagechain-cli",
            "mine",
            "--difficulty",
            "4",
            "--stages",
            "3",
            "--blocks-per-stage",
            "2",
            "--timeout-secs",
            "5",
            "--parallel",
            "--json",
        ])
        .unwrap();
        let Command::Mine(args) = cli.cmd else {
            panic!("expected mine");
        };
        assert_eq!(args.difficulty, 4);
        assert_eq!(args.stages, 3);
        assert_eq!(args.blocks_per_stage, 2);
        assert_eq!(args.timeout_secs, Some(5));
        assert!(args.parallel && args.json);
    }

    #[tokio::test]
    async fn extend_builds_every_stage() {
        let ledger = Arc::new(Ledger::new(2).unwrap());
        let args = MineArgs {
            difficulty: 2,
            stages: 3,
            blocks_per_stage: 2,
            data: "d".into(),
            timeout_secs: None,
            parallel: false,
            json: false,
        };
        extend(&ledger, &args, &SearchLimits::unbounded())
            .await
            .unwrap();
        assert_eq!(ledger.height(), 4);
        assert!(ledger.verify().is_ok());
    }

    #[tokio::test]
    async fn cancelled_search_surfaces_error() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let limits = SearchLimits::unbounded().with_cancel(cancel);
        let block = Block::new(1, Block::genesis().hash().to_vec(), b"x".to_vec());
        let target = Target::from_difficulty(255).unwrap();
        let err = prove(block, target, limits, false).await.unwrap_err();
        assert!(err
            .downcast_ref::<stagechain_core::SearchError>()
            .is_some());
    }
}
