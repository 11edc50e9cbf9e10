use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use tabmap_model::{
    AmbiguityLevel, FileStatus, IssueSeverity, StandardField, Thresholds, UsageReport,
};

use crate::commands::{FileReport, RouteReport};

pub fn print_run_summary(report: &FileReport, thresholds: &Thresholds) {
    println!();
    println!("File: {}", report.file.display());
    print_status_line(report);
    if let Some(entity) = report.entity_type {
        println!("Entity type: {entity}");
    }
    if let Some(routing) = &report.routing {
        let tier = if routing.decision.use_deep_tier {
            "deep"
        } else {
            "cheap"
        };
        let cost = routing
            .decision
            .estimated_cost
            .map_or_else(|| "-".to_string(), |c| format!("${c:.4}"));
        println!(
            "Routing: {tier} tier (score {:.1}, est. {cost}) - {}",
            routing.decision.complexity_score, routing.decision.reason
        );
    }
    if let Some(count) = report.outcome.records_processed {
        println!("Records processed: {count}");
    }
    if let Some(score) = report.outcome.quality_score {
        println!("Quality score: {score:.1}");
    }
    if !report.outcome.dashboards.is_empty() {
        let names: Vec<&str> = report
            .outcome
            .dashboards
            .iter()
            .map(|d| d.as_str())
            .collect();
        println!("Dashboards: {}", names.join(", "));
    }
    print_suggestion_table(report, thresholds);
    print_issue_table(report);
    if !report.outcome.errors.is_empty() {
        eprintln!("Errors:");
        for error in &report.outcome.errors {
            eprintln!("- {error}");
        }
    }
}

fn print_status_line(report: &FileReport) {
    match report.outcome.status {
        FileStatus::MappingRequired => println!(
            "Status: {} - low-confidence suggestions need review, nothing was processed",
            report.outcome.status
        ),
        FileStatus::Failed => println!("Status: {} - see errors below", report.outcome.status),
        _ => println!("Status: {}", report.outcome.status),
    }
}

fn print_suggestion_table(report: &FileReport, thresholds: &Thresholds) {
    if report.suggestions.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source column"),
        header_cell("Target field"),
        header_cell("Domain"),
        header_cell("Confidence"),
        header_cell("Tier"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Center);
    for stored in &report.suggestions {
        let suggestion = &stored.suggestion;
        let domain = suggestion.target_domain.map_or("-", |d| d.as_str());
        table.add_row(vec![
            Cell::new(&suggestion.source_column),
            Cell::new(&suggestion.target_field).fg(Color::Blue),
            Cell::new(domain),
            confidence_cell(suggestion.confidence, thresholds),
            Cell::new(suggestion.model_used),
            suggestion_status_cell(stored.confirmed, suggestion.requires_manual_review(thresholds)),
        ]);
    }
    println!("{table}");
}

fn print_issue_table(report: &FileReport) {
    if report.issues.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Severity"),
        header_cell("Row"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for issue in &report.issues {
        table.add_row(vec![
            Cell::new(issue.stage),
            severity_cell(issue.severity),
            issue
                .row
                .map_or_else(|| dim_cell("-"), |row| Cell::new(row)),
            Cell::new(issue.field.as_deref().unwrap_or("-")),
            Cell::new(&issue.message),
        ]);
    }
    println!();
    println!("Issues:");
    println!("{table}");
}

pub fn print_route_report(report: &RouteReport) {
    println!("File: {}", report.file.display());
    println!("Columns: {}, rows: {}", report.columns, report.rows);
    let complexity = &report.complexity;
    println!(
        "Complexity: {:.1}/5.0 (data quality {:.2}, ambiguity {}, nested {}, business logic {})",
        complexity.score,
        complexity.data_quality_score,
        ambiguity_label(complexity.ambiguity_level),
        complexity.has_nested_relationships,
        complexity.business_logic_detected,
    );
    for reason in &complexity.reasons {
        println!("- {reason}");
    }
    let tier = if report.decision.use_deep_tier {
        "deep"
    } else {
        "cheap"
    };
    let cost = report
        .decision
        .estimated_cost
        .map_or_else(|| "-".to_string(), |c| format!("${c:.4}"));
    println!("Decision: {tier} tier (est. {cost}) - {}", report.decision.reason);
}

pub fn print_usage_report(start: &str, end: &str, report: &UsageReport) {
    println!("Usage from {start} to {end}:");
    if report.total_calls == 0 {
        println!("No model calls recorded.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Date"),
        header_cell("Calls"),
        header_cell("Input tokens"),
        header_cell("Output tokens"),
        header_cell("Cost"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for day in &report.daily_breakdown {
        table.add_row(vec![
            Cell::new(&day.date),
            Cell::new(day.calls),
            Cell::new(day.input_tokens),
            Cell::new(day.output_tokens),
            Cell::new(format!("${:.4}", day.cost)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.total_calls).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(format!("${:.4}", report.total_cost)).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    println!(
        "Average cost per call: ${:.4}",
        report.average_cost_per_call
    );
}

pub fn print_fields(fields: &[StandardField]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Domain"),
        header_cell("Type"),
        header_cell("Aliases"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Center);
    for field in fields {
        table.add_row(vec![
            Cell::new(&field.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&field.label),
            Cell::new(field.domain),
            Cell::new(format!("{:?}", field.data_type).to_lowercase()),
            Cell::new(field.aliases.join(", ")),
        ]);
    }
    println!("{table}");
}

fn confidence_cell(confidence: f64, thresholds: &Thresholds) -> Cell {
    let cell = Cell::new(format!("{confidence:.2}"));
    if confidence >= thresholds.auto_map_confidence {
        cell.fg(Color::Green)
    } else if confidence >= thresholds.review_confidence {
        cell.fg(Color::Yellow)
    } else {
        cell.fg(Color::Red)
    }
}

fn suggestion_status_cell(confirmed: bool, needs_review: bool) -> Cell {
    if confirmed {
        Cell::new("confirmed")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else if needs_review {
        Cell::new("review").fg(Color::Yellow)
    } else {
        Cell::new("suggested")
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Critical => Cell::new("CRITICAL")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
        IssueSeverity::Info => dim_cell("INFO"),
    }
}

fn ambiguity_label(level: AmbiguityLevel) -> &'static str {
    match level {
        AmbiguityLevel::Low => "low",
        AmbiguityLevel::Medium => "medium",
        AmbiguityLevel::High => "high",
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
