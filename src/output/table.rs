//! Table rendering for upgrade plans and execution reports.
//!
//! Tables use a borderless kubectl-style layout.

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::executor::{ExecutionReport, TaskStatus};
use crate::upgrade::UpgradePlan;

/// Row for the upgrade action table.
#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "ITEM")]
    item: String,
    #[tabled(rename = "PROPERTY")]
    property: String,
    #[tabled(rename = "OLD")]
    old: String,
    #[tabled(rename = "NEW")]
    new: String,
}

/// Row for the execution report table.
#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "TASK")]
    task: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "CHANGES")]
    changes: String,
}

/// Render the actions of `plan` as a table.
pub fn render_upgrade_plan(plan: &UpgradePlan) -> String {
    let rows: Vec<ActionRow> = plan
        .actions
        .iter()
        .map(|action| ActionRow {
            item: action.item.clone(),
            property: action.property.clone(),
            old: action.old.clone(),
            new: action.new.clone(),
        })
        .collect();

    let mut table = Table::new(&rows);
    apply_table_style(&mut table);
    table.to_string()
}

pub fn print_upgrade_plan(plan: &UpgradePlan) {
    println!();
    println!(
        "{}",
        format!("Upgrade plan for {}:", plan.cluster).cyan().bold()
    );
    println!("{}", render_upgrade_plan(plan));
    println!();
}

/// Render one row per task. Errors are shown in the CHANGES column.
pub fn render_execution_report(report: &ExecutionReport) -> String {
    let rows: Vec<TaskRow> = report
        .tasks
        .iter()
        .map(|task| {
            let changes = match &task.error {
                Some(error) => error.clone(),
                None if task.changes.is_empty() => "-".to_string(),
                None => task.changes.join(","),
            };
            TaskRow {
                task: task.name.clone(),
                kind: task.kind.to_string(),
                status: colorize_status(task.status),
                changes,
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    apply_table_style(&mut table);
    table.to_string()
}

pub fn print_execution_report(report: &ExecutionReport) {
    println!("{}", render_execution_report(report));
    println!();

    let summary = report.summary();
    if report.is_success() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red().bold());
    }
}

fn colorize_status(status: TaskStatus) -> String {
    let text = status.to_string();
    match status {
        TaskStatus::Unchanged => text.dimmed().to_string(),
        TaskStatus::Created | TaskStatus::Updated => text.green().to_string(),
        TaskStatus::WouldCreate | TaskStatus::WouldUpdate => text.yellow().to_string(),
        TaskStatus::Failed => text.red().bold().to_string(),
        TaskStatus::NotStarted => text.red().to_string(),
    }
}

/// Apply kubectl-style borderless table formatting.
fn apply_table_style(table: &mut Table) {
    use tabled::settings::object::Columns;
    use tabled::settings::themes::Theme;
    use tabled::settings::{Modify, Padding};

    let mut theme = Theme::from_style(Style::empty());
    theme.remove_horizontal_lines();
    table.with(theme);
    table.with(Modify::new(Columns::new(..)).with(Padding::new(0, 2, 0, 0)));
}
