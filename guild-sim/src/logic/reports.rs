use anyhow::Result;
use colored::Colorize;
use guild_game::RunOutcome;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{GameplayStrategy, RunRecord};

/// Roll-up of every run played with one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAggregate {
    pub strategy: GameplayStrategy,
    pub runs: usize,
    pub errors: usize,
    pub cleared: usize,
    pub game_overs: usize,
    pub unfinished: usize,
    pub clear_rate: f64,
    pub mean_days: f64,
    pub mean_rank: f64,
    pub mean_score: f64,
    pub best_score: i64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// One aggregate per strategy that has records, in declaration order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_runs(records: &[RunRecord]) -> Vec<StrategyAggregate> {
    GameplayStrategy::ALL
        .into_iter()
        .filter_map(|strategy| {
            let runs: Vec<&RunRecord> = records.iter().filter(|r| r.strategy == strategy).collect();
            if runs.is_empty() {
                return None;
            }
            let summaries: Vec<_> = runs.iter().filter_map(|r| r.summary.as_ref()).collect();
            let count = |wanted: fn(&RunOutcome) -> bool| {
                summaries.iter().filter(|s| wanted(&s.outcome)).count()
            };
            let cleared = count(|o| matches!(o, RunOutcome::Cleared));
            Some(StrategyAggregate {
                strategy,
                runs: runs.len(),
                errors: runs.iter().filter(|r| !r.passed()).count(),
                cleared,
                game_overs: count(|o| matches!(o, RunOutcome::GameOver(_))),
                unfinished: count(|o| matches!(o, RunOutcome::InProgress)),
                clear_rate: ratio(cleared, runs.len()),
                mean_days: mean(summaries.iter().map(|s| f64::from(s.days))),
                mean_rank: mean(summaries.iter().map(|s| f64::from(s.rank.ordinal()))),
                mean_score: mean(summaries.iter().map(|s| s.score as f64)),
                best_score: summaries.iter().map(|s| s.score).max().unwrap_or(0),
            })
        })
        .collect()
}

fn outcome_label(record: &RunRecord) -> String {
    record
        .summary
        .as_ref()
        .map_or_else(|| "error".to_string(), |s| s.outcome.to_string())
}

pub fn generate_console_report(
    out: &mut dyn Write,
    records: &[RunRecord],
    aggregates: &[StrategyAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;

    let failed = records.iter().filter(|r| !r.passed()).count();
    writeln!(out, "Total runs: {}", records.len())?;
    writeln!(out, "Errors: {}", failed.to_string().red())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for record in records {
        let status = if record.passed() {
            "✅".green()
        } else {
            "❌".red()
        };
        write!(
            out,
            "{status} {} seed {}: {}",
            record.strategy.label().bold(),
            record.seed,
            outcome_label(record)
        )?;
        if let Some(summary) = &record.summary {
            write!(
                out,
                " (day {}, rank {}, gold {}, score {})",
                summary.days, summary.rank, summary.gold, summary.score
            )?;
        }
        writeln!(out)?;
        if let Some(error) = &record.error {
            writeln!(out, "   • {}", error.red())?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "🏆 Strategy Summary".bright_yellow().bold())?;
    writeln!(out, "{}", "===================".yellow())?;
    for agg in aggregates {
        writeln!(
            out,
            "{:<10} runs {:>3} | cleared {:>5.1}% | over {:>3} | open {:>3} | days {:>6.1} | rank {:>4.2} | score {:>8.1} (best {})",
            agg.strategy.label(),
            agg.runs,
            agg.clear_rate * 100.0,
            agg.game_overs,
            agg.unfinished,
            agg.mean_days,
            agg.mean_rank,
            agg.mean_score,
            agg.best_score
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    runs: &'a [RunRecord],
    strategies: &'a [StrategyAggregate],
}

pub fn generate_json_report(
    out: &mut dyn Write,
    records: &[RunRecord],
    aggregates: &[StrategyAggregate],
) -> Result<()> {
    let report = JsonReport {
        runs: records,
        strategies: aggregates,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    records: &[RunRecord],
    aggregates: &[StrategyAggregate],
) -> Result<()> {
    writeln!(out, "# Guild Rank Simulation Results\n")?;

    writeln!(out, "## Strategies\n")?;
    writeln!(
        out,
        "| Strategy | Runs | Errors | Clear rate | Game overs | Unfinished | Mean days | Mean score | Best |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|---|")?;
    for agg in aggregates {
        writeln!(
            out,
            "| {} | {} | {} | {:.1}% | {} | {} | {:.1} | {:.1} | {} |",
            agg.strategy.label(),
            agg.runs,
            agg.errors,
            agg.clear_rate * 100.0,
            agg.game_overs,
            agg.unfinished,
            agg.mean_days,
            agg.mean_score,
            agg.best_score
        )?;
    }

    writeln!(out, "\n## Runs\n")?;
    for record in records {
        let status = if record.passed() { "✅" } else { "❌" };
        writeln!(
            out,
            "- {status} **{}** seed `{}`: {}",
            record.strategy.label(),
            record.seed,
            outcome_label(record)
        )?;
        if let Some(summary) = &record.summary {
            writeln!(
                out,
                "  - day {}, rank {}, gold {}, quests {}, score {}",
                summary.days, summary.rank, summary.gold, summary.quests_completed, summary.score
            )?;
        }
        if let Some(error) = &record.error {
            writeln!(out, "  - error: {error}")?;
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_csv_report(out: &mut dyn Write, records: &[RunRecord]) -> Result<()> {
    writeln!(
        out,
        "seed,strategy,outcome,days,rank,gold,quests,score,actions,rejected,error"
    )?;
    for record in records {
        let (days, rank, gold, quests, score) = record.summary.as_ref().map_or_else(
            Default::default,
            |s| {
                (
                    s.days.to_string(),
                    s.rank.to_string(),
                    s.gold.to_string(),
                    s.quests_completed.to_string(),
                    s.score.to_string(),
                )
            },
        );
        writeln!(
            out,
            "{},{},{},{days},{rank},{gold},{quests},{score},{},{},{}",
            record.seed,
            record.strategy.label(),
            csv_field(&outcome_label(record)),
            record.stats.actions,
            record.stats.rejected,
            csv_field(record.error.as_deref().unwrap_or_default())
        )?;
    }
    Ok(())
}
