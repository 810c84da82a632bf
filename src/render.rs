//! Colored terminal rendering for plans and reports.

use owo_colors::OwoColorize;
use schedsync_core::diff::{DeleteReason, Operation, OperationKind, Plan};
use schedsync_core::report::{Failure, SyncReport};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for OperationKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            OperationKind::Create => symbol.green().to_string(),
            OperationKind::Update => symbol.yellow().to_string(),
            OperationKind::Delete => symbol.red().to_string(),
            OperationKind::Noop => symbol.dimmed().to_string(),
        }
    }
}

fn colorize(kind: OperationKind, text: &str) -> String {
    match kind {
        OperationKind::Create => text.green().to_string(),
        OperationKind::Update => text.yellow().to_string(),
        OperationKind::Delete => text.red().to_string(),
        OperationKind::Noop => text.dimmed().to_string(),
    }
}

impl Render for Operation {
    fn render(&self) -> String {
        let kind = self.kind();
        let mut line = format!(
            "{} {} {}",
            kind.render(),
            colorize(kind, self.title()),
            self.render_event_time().dimmed()
        );
        if let Operation::Delete {
            reason: DeleteReason::Duplicate,
            ..
        } = self
        {
            line.push_str(&format!(" {}", "(duplicate)".dimmed()));
        }
        line
    }
}

impl Render for Failure {
    fn render(&self) -> String {
        format!("{} {}", "✗".red(), self.to_string().red())
    }
}

/// Above this many changes the plan is shown as counts unless verbose.
const COMPACT_THRESHOLD: usize = 5;

pub trait PlanRender {
    fn render(&self, verbose: bool) -> String;
}

impl PlanRender for Plan {
    fn render(&self, verbose: bool) -> String {
        let mut lines = Vec::new();

        if self.deletes_everything() {
            lines.push(render_deletion_banner(self.counts().delete, self.invalid.len()));
        }

        if self.is_empty() {
            lines.push("   No changes".dimmed().to_string());
        } else {
            let changes: Vec<&Operation> = self.changes().collect();
            if verbose || changes.len() <= COMPACT_THRESHOLD {
                for op in changes {
                    lines.push(format!("   {}", op.render()));
                    let fields = op.changed_fields();
                    if !fields.is_empty() {
                        lines.push(format!("      {}", fields.join(", ").dimmed()));
                    }
                }
            } else {
                render_counts(self, &mut lines);
            }
        }

        for invalid in &self.invalid {
            lines.push(format!("   {} {}", "!".yellow(), invalid.to_string().yellow()));
        }
        for duplicate in &self.duplicates {
            lines.push(format!("   {} {}", "!".yellow(), duplicate.to_string().yellow()));
        }

        lines.join("\n")
    }
}

fn render_counts(plan: &Plan, lines: &mut Vec<String>) {
    let counts = plan.counts();

    if counts.create > 0 {
        let label = format!("({} new {})", counts.create, pluralize("event", counts.create));
        lines.push(format!("   {} {}", "+".green(), label.green()));
    }
    if counts.update > 0 {
        let label = format!("({} changed {})", counts.update, pluralize("event", counts.update));
        lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
    }
    if counts.delete > 0 {
        let label = format!("({} deleted {})", counts.delete, pluralize("event", counts.delete));
        lines.push(format!("   {} {}", "-".red(), label.red()));
    }
}

fn render_deletion_banner(deletes: usize, invalid: usize) -> String {
    let events = pluralize("event", deletes);
    let text = if invalid == 0 {
        format!(" The schedule for this window is empty: all {deletes} schedsync {events} will be deleted ")
    } else {
        format!(
            " All {invalid} {} in this window are invalid: all {deletes} schedsync {events} will be deleted ",
            pluralize("session", invalid)
        )
    };
    format!("   {}", text.white().on_red().bold())
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        for failure in &self.failures {
            lines.push(format!("   {}", failure.render()));
        }
        if self.cancelled {
            lines.push(format!("   {}", "Cancelled before every operation was dispatched".yellow()));
        }

        let summary = self.to_string();
        if self.has_failures() {
            lines.push(format!("\n{}", summary.red()));
        } else {
            lines.push(format!("\n{summary}"));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_banner_names_the_cause() {
        assert!(render_deletion_banner(3, 0).contains("schedule for this window is empty"));

        let banner = render_deletion_banner(3, 2);
        assert!(banner.contains("All 2 sessions in this window are invalid"));
        assert!(!banner.contains("empty"));
    }
}
