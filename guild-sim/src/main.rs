mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use guild_game::GameConfig;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::{
    FileStorage, GameplayStrategy, RunRecord, SimulationConfig, StrategyAggregate,
    aggregate_runs, load_slot, new_session, resolve_seeds, resume_session, run_slot, simulate,
    split_csv,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    /// Take every quest, buy whatever is affordable
    Greedy,
    /// Keep a gold reserve and craft only what is needed
    Cautious,
    /// Seeded random decisions
    Random,
    /// Run every strategy
    All,
}

impl StrategyChoice {
    fn strategies(self) -> Vec<GameplayStrategy> {
        match self {
            Self::Greedy => vec![GameplayStrategy::Greedy],
            Self::Cautious => vec![GameplayStrategy::Cautious],
            Self::Random => vec![GameplayStrategy::Random],
            Self::All => GameplayStrategy::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "guild-sim", version = "0.1.0")]
#[command(about = "Automated Guild Rank playthroughs with per-strategy balance reports")]
struct Args {
    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Strategy to play with
    #[arg(long, value_enum, default_value_t = StrategyChoice::All)]
    strategy: StrategyChoice,

    /// Stop a run after this many days
    #[arg(long, default_value_t = logic::DEFAULT_MAX_DAYS)]
    max_days: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rule configuration JSON (defaults apply to omitted fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Autosave every run into this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Continue a stored slot from --save-dir instead of starting new runs
    #[arg(long, requires = "save_dir")]
    resume: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "info" } else { "warn" }),
    )
    .init();

    announce_banner();

    let start_time = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let storage = args
        .save_dir
        .as_deref()
        .map(FileStorage::open)
        .transpose()
        .context("failed to open save directory")?;

    let records = run_all(&args, &config, storage.as_ref())?;
    let aggregates = aggregate_runs(&records);
    write_reports(&args, &records, &aggregates, start_time)?;

    if records.iter().any(|r| !r.passed()) {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "⚔️  Guild Rank Simulator".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    GameConfig::from_json(&raw).with_context(|| format!("invalid config in {}", path.display()))
}

fn run_all(
    args: &Args,
    config: &GameConfig,
    storage: Option<&FileStorage>,
) -> Result<Vec<RunRecord>> {
    let strategies = args.strategy.strategies();
    let mut records = Vec::new();

    if let Some(slot) = &args.resume {
        let storage = storage.context("--resume needs --save-dir")?;
        if let Some(info) = storage.slot_info(slot)? {
            println!(
                "📂 Resuming `{}` saved {} ({} bytes)",
                slot.bright_white(),
                info.modified.format("%Y-%m-%d %H:%M:%S"),
                info.bytes
            );
        }
        let state = load_slot(config, storage, slot).with_context(|| {
            let known: Vec<String> = storage
                .slots()
                .map(|slots| slots.into_iter().map(|info| info.key).collect())
                .unwrap_or_default();
            format!("available slots: [{}]", known.join(", "))
        })?;
        for strategy in strategies {
            let target = format!("{slot}-{}", strategy.label().to_lowercase());
            let session = resume_session(config, Some(storage), &target, state.clone())?;
            let sim = SimulationConfig::new(strategy, state.seed)
                .with_max_days(args.max_days)
                .with_save_on_exit(true);
            let mut record = simulate(session, &sim);
            record.resumed_from = Some(slot.clone());
            announce_run(args, &record);
            records.push(record);
        }
        return Ok(records);
    }

    let seeds = resolve_seeds(&split_csv(&args.seeds))?;
    println!(
        "{}",
        format!(
            "🎲 {} seed(s) × {} strategy(ies), up to {} days",
            seeds.len(),
            strategies.len(),
            args.max_days
        )
        .bright_yellow()
    );
    for seed in seeds {
        for &strategy in &strategies {
            let session = new_session(config, storage, &run_slot(strategy, seed), seed)?;
            let sim = SimulationConfig::new(strategy, seed)
                .with_max_days(args.max_days)
                .with_save_on_exit(storage.is_some());
            let record = simulate(session, &sim);
            announce_run(args, &record);
            records.push(record);
        }
    }
    if let Some(storage) = storage {
        println!("💾 Saves written to {}", storage.root().display());
    }
    Ok(records)
}

fn announce_run(args: &Args, record: &RunRecord) {
    if let Some(error) = &record.error {
        eprintln!(
            "❌ [{} seed {}] {}",
            record.strategy.label().red(),
            record.seed,
            error
        );
    } else if args.verbose
        && let Some(summary) = &record.summary
    {
        println!(
            "✅ [{} seed {}] {} on day {}",
            record.strategy.label().green(),
            record.seed,
            summary.outcome,
            summary.days
        );
    }
}

fn write_reports(
    args: &Args,
    records: &[RunRecord],
    aggregates: &[StrategyAggregate],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, records, aggregates)?,
        "markdown" => {
            if records.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Guild Rank Simulation Results\n\n_No runs executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, records, aggregates)?;
            }
        }
        "csv" => logic::reports::generate_csv_report(&mut output_target, records)?,
        _ => {
            if records.is_empty() {
                writeln!(&mut output_target, "No runs executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    records,
                    aggregates,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::storage::tests::temp_dir;
    use guild_game::{SaveData, SaveStorage};

    fn base_args() -> Args {
        Args {
            seeds: "1337".to_string(),
            strategy: StrategyChoice::All,
            max_days: 20,
            report: "json".to_string(),
            output: None,
            config: None,
            save_dir: None,
            resume: None,
            verbose: false,
        }
    }

    #[test]
    fn strategy_choice_expands_all() {
        assert_eq!(StrategyChoice::All.strategies(), GameplayStrategy::ALL.to_vec());
        assert_eq!(
            StrategyChoice::Cautious.strategies(),
            vec![GameplayStrategy::Cautious]
        );
    }

    #[test]
    fn cli_parses_every_flag() {
        let args = Args::try_parse_from([
            "guild-sim",
            "--seeds",
            "1,2",
            "--strategy",
            "greedy",
            "--max-days",
            "50",
            "--report",
            "csv",
            "--save-dir",
            "saves",
            "--resume",
            "autosave",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.strategy, StrategyChoice::Greedy);
        assert_eq!(args.max_days, 50);
        assert_eq!(args.resume.as_deref(), Some("autosave"));
        assert!(args.verbose);
    }

    #[test]
    fn resume_requires_a_save_dir() {
        assert!(Args::try_parse_from(["guild-sim", "--resume", "autosave"]).is_err());
        assert!(Args::try_parse_from(["guild-sim", "--report", "yaml"]).is_err());
    }

    #[test]
    fn load_config_defaults_and_validates() {
        assert_eq!(load_config(None).unwrap(), GameConfig::default());

        let dir = temp_dir("config");
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.json");
        std::fs::write(&good, r#"{"initial_gold": 5000}"#).unwrap();
        assert_eq!(load_config(Some(&good)).unwrap().initial_gold, 5000);

        let bad = dir.join("bad.json");
        std::fs::write(&bad, r#"{"initial_gold": -1}"#).unwrap();
        assert!(load_config(Some(&bad)).is_err());
        assert!(load_config(Some(&dir.join("missing.json"))).is_err());
    }

    #[test]
    fn run_all_plays_every_seed_and_strategy() {
        let args = Args {
            seeds: "1,2".to_string(),
            ..base_args()
        };
        let records = run_all(&args, &GameConfig::default(), None).unwrap();
        assert_eq!(records.len(), 2 * GameplayStrategy::ALL.len());
        assert!(records.iter().all(RunRecord::passed));
    }

    #[test]
    fn save_dir_runs_can_be_resumed() {
        let storage = FileStorage::open(temp_dir("resume")).unwrap();
        let args = Args {
            strategy: StrategyChoice::Cautious,
            max_days: 3,
            ..base_args()
        };
        let first = run_all(&args, &GameConfig::default(), Some(&storage)).unwrap();
        let slot = run_slot(GameplayStrategy::Cautious, 1337);
        assert!(storage.exists(&slot).unwrap());
        let saved = SaveData::from_json(&storage.load(&slot).unwrap().unwrap()).unwrap();
        assert_eq!(saved.into_state().seed, 1337);

        let resume = Args {
            resume: Some(slot.clone()),
            max_days: 6,
            ..args
        };
        let resumed = run_all(&resume, &GameConfig::default(), Some(&storage)).unwrap();
        assert_eq!(resumed.len(), 1);
        assert_eq!(resumed[0].resumed_from.as_deref(), Some(slot.as_str()));
        assert!(resumed[0].passed());
        let before = first[0].summary.as_ref().unwrap().days;
        let after = resumed[0].summary.as_ref().unwrap().days;
        assert!(after >= before);
        assert!(storage.exists(&format!("{slot}-cautious")).unwrap());
    }

    #[test]
    fn resuming_a_missing_slot_fails() {
        let storage = FileStorage::open(temp_dir("missing-slot")).unwrap();
        let args = Args {
            resume: Some("nothing-here".to_string()),
            ..base_args()
        };
        assert!(run_all(&args, &GameConfig::default(), Some(&storage)).is_err());
    }

    #[test]
    fn write_reports_emits_each_format() {
        let dir = temp_dir("reports");
        std::fs::create_dir_all(&dir).unwrap();
        let records = run_all(&base_args(), &GameConfig::default(), None).unwrap();
        let aggregates = aggregate_runs(&records);

        for (format, needle) in [
            ("json", "\"strategies\""),
            ("markdown", "# Guild Rank Simulation Results"),
            ("csv", "seed,strategy,outcome"),
            ("console", "Strategy Summary"),
        ] {
            let path = dir.join(format!("report.{format}"));
            let args = Args {
                report: format.to_string(),
                output: Some(path.clone()),
                ..base_args()
            };
            write_reports(&args, &records, &aggregates, Instant::now()).unwrap();
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.contains(needle), "{format} report missing {needle}");
        }
    }

    #[test]
    fn write_reports_handles_no_runs() {
        let path = temp_dir("empty-report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("No runs executed"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
