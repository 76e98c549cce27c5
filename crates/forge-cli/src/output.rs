//! Human-readable and JSON rendering of run results.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use forge_types::workflow::{SkipReason, StepResult, StepStatus, WorkflowResult};

/// Print a completed run, either as pretty JSON or as a summary table.
pub fn print_result(result: &WorkflowResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} ({})",
        if result.success {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        },
        style(&result.workflow_name).cyan().bold(),
        style(result.run_id).dim()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Step").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Attempts").fg(Color::White),
        Cell::new("Duration").fg(Color::White),
        Cell::new("Cost").fg(Color::White),
        Cell::new("Detail").fg(Color::White),
    ]);

    for step in &result.steps {
        table.add_row(vec![
            Cell::new(&step.step_id).fg(Color::White),
            status_cell(step.status),
            Cell::new(step.attempts).fg(Color::DarkGrey),
            Cell::new(format!("{}ms", step.duration_ms)).fg(Color::DarkGrey),
            Cell::new(format!("${:.4}", step.cost_usd)).fg(Color::DarkGrey),
            Cell::new(detail(step)).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();

    let findings = result.findings();
    if !findings.is_empty() {
        println!(
            "  {} finding{} collected",
            style(findings.len()).bold(),
            if findings.len() == 1 { "" } else { "s" }
        );
    }
    println!(
        "  total: {} over {}ms, {} tokens",
        style(format!("${:.4}", result.total_cost_usd)).yellow(),
        result.duration_ms,
        result.total_tokens
    );
    println!();

    Ok(())
}

fn status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Succeeded => Cell::new("succeeded").fg(Color::Green),
        StepStatus::Failed => Cell::new("FAILED").fg(Color::Red),
        StepStatus::TimedOut => Cell::new("TIMED OUT").fg(Color::Red),
        StepStatus::Skipped => Cell::new("skipped").fg(Color::Yellow),
        other => Cell::new(other.to_string()).fg(Color::White),
    }
}

fn detail(step: &StepResult) -> String {
    if let Some(error) = &step.error {
        let error = error.replace('\n', " ");
        // Truncate on a char boundary; agent errors are arbitrary text.
        if error.chars().count() > 60 {
            let head: String = error.chars().take(57).collect();
            return format!("{head}...");
        }
        return error;
    }
    match step.skip_reason {
        Some(SkipReason::DependencyFailed) => "dependency failed".to_string(),
        Some(SkipReason::StopOnFailure) => "halted after failure".to_string(),
        Some(SkipReason::BudgetExceeded) => "budget exceeded".to_string(),
        Some(SkipReason::WorkflowTimeout) => "workflow timed out".to_string(),
        Some(SkipReason::Cancelled) => "cancelled".to_string(),
        None => "-".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
