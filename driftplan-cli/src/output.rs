//! Terminal output formatting for compare reports.
//! Uses comfy-table for the operation table and colored for the verbs.

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use driftplan_core::{Action, CompareReport};

/// Print one line per operation, or `No changes detected`.
pub fn print_plan(report: &CompareReport) {
    println!("{}", report.plan);
}

/// Print the full comparison: header, operation table, counts and warnings.
pub fn print_compare_report(report: &CompareReport, quiet: bool) {
    if !quiet {
        println!(
            "{} {} {} {} ({})",
            "Comparing".bold(),
            report.source,
            "->".dimmed(),
            report.target,
            report.dialect
        );
        if !report.object_types.is_empty() {
            let kinds: Vec<String> = report.object_types.iter().map(|k| k.to_string()).collect();
            println!("  Object types: {}", kinds.join(", "));
        }
        println!(
            "  Objects: {} source, {} target",
            report.source_objects, report.target_objects
        );
        println!();
    }

    if report.plan.is_empty() {
        println!("{}", "No changes detected".green());
    } else {
        print_operation_table(report);
        println!(
            "{} to drop, {} to alter, {} to create",
            report.plan.count(Action::Drop).to_string().red(),
            report.plan.count(Action::Alter).to_string().yellow(),
            report.plan.count(Action::Create).to_string().green()
        );
    }

    print_warnings(report);
}

fn print_operation_table(report: &CompareReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#"),
            Cell::new("Action"),
            Cell::new("Type"),
            Cell::new("Name"),
            Cell::new("Details"),
        ]);

    for (i, op) in report.plan.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format_action(op.action)),
            Cell::new(op.kind.to_string()),
            Cell::new(op.name.to_string()),
            Cell::new(op.details.join("\n")),
        ]);
    }

    println!("{table}");
}

/// Return a colored string representation of an action.
fn format_action(action: Action) -> String {
    match action {
        Action::Drop => "Drop".red().bold().to_string(),
        Action::Alter => "Alter".yellow().to_string(),
        Action::Create => "Create".green().to_string(),
    }
}

fn print_warnings(report: &CompareReport) {
    if report.warnings.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", "Warnings".yellow().bold(), report.warnings.len());
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}
