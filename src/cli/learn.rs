// src/cli/learn.rs — Keyword learning reports and maintenance

use super::{CliEngine, LearnAction};
use crate::learner::keyword_stats::KeywordStat;

/// Handle the `adreply learn` command.
pub async fn run_learn(engine: &CliEngine, action: LearnAction) -> anyhow::Result<()> {
    match action {
        LearnAction::Report { json } => show_report(engine, json).await,
        LearnAction::Removals {
            threshold,
            min_matches,
        } => {
            let removals = engine.get_suggested_removals(threshold, min_matches).await?;
            if removals.is_empty() {
                println!("No keywords below the removal threshold.");
            } else {
                println!("Suggested removals (weakest first):");
                println!();
                print_stats(&removals);
            }
            Ok(())
        }
        LearnAction::Recalc => {
            let updated = engine.calculate_scores().await?;
            println!("Recalculated {updated} keyword score(s).");
            Ok(())
        }
        LearnAction::Prune => {
            let removed = engine.prune_orphaned_stats().await?;
            println!("Pruned {removed} orphaned keyword stat(s).");
            Ok(())
        }
    }
}

async fn show_report(engine: &CliEngine, json: bool) -> anyhow::Result<()> {
    let report = engine.get_performance_report().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.categories.is_empty() {
        println!("No keyword statistics yet.");
        println!();
        println!("Statistics accumulate as suggestions are shown and used.");
        return Ok(());
    }

    println!(
        "Overall: {} matches, {} chosen, {} ignored ({:.0}% chosen)",
        report.total_matches,
        report.total_chosen,
        report.total_ignored,
        report.overall_rate * 100.0
    );
    println!();

    for c in &report.categories {
        println!(
            "{}: {} keywords, {} matches, {:.0}% chosen",
            c.category,
            c.keywords,
            c.matches,
            c.selection_rate * 100.0
        );
        print_stats(&c.top_keywords);
        println!();
    }

    if !report.suggested_removals.is_empty() {
        println!("Suggested removals:");
        print_stats(&report.suggested_removals);
    }
    Ok(())
}

fn print_stats(stats: &[KeywordStat]) {
    for s in stats {
        println!(
            "  {:<14} {:<24} {:>6} matches {:>6} chosen {:>6} ignored  {:>3}%",
            s.category,
            s.keyword,
            s.matches,
            s.chosen,
            s.ignored,
            s.percent()
        );
    }
}
