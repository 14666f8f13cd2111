//! Run report assembly.
//!
//! One fragment per processed target, in roster order, behind a roster
//! summary. Skipped targets contribute nothing, and a report with no
//! fragments is not worth sending.

use std::fmt::Write;

use crate::model::FieldValue;

/// Notification title for the run report.
pub const TITLE: &str = "Check-in report";

/// Roster-level counts shown at the top of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub completed_today: usize,
}

/// The assembled report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub body: String,

    /// Whether any target was processed (successfully or not) this run.
    pub processed: bool,
}

/// Accumulates per-target fragments during a run.
#[derive(Debug, Default)]
pub struct Report {
    fragments: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful target with its labelled fields.
    pub fn push_success(&mut self, id: &str, entries: &[(&str, &FieldValue)]) {
        let mut html = format!("<h2>{} checked in</h2>", escape(id));
        for (label, value) in entries {
            match value {
                FieldValue::Text(text) => {
                    let _ = write!(html, "• {}: {}<br>", escape(label), escape(text));
                }
                FieldValue::List(items) => {
                    let _ = write!(html, "• {}:<ul>", escape(label));
                    for item in items {
                        let _ = write!(html, "<li>{}</li>", escape(item));
                    }
                    html.push_str("</ul>");
                }
            }
        }
        html.push_str("<hr>");
        self.fragments.push(html);
    }

    /// Appends a failed target.
    pub fn push_failure(&mut self, id: &str) {
        self.fragments.push(format!(
            r#"<h2 style="color:red">{} check-in failed</h2>"#,
            escape(id)
        ));
    }

    /// Appends a target a preview run would check in.
    pub fn push_due(&mut self, id: &str) {
        self.fragments
            .push(format!("<h2>{} due for check-in</h2>", escape(id)));
    }

    pub fn processed(&self) -> bool {
        !self.fragments.is_empty()
    }

    /// Prepends the summary and joins everything into one body.
    pub fn assemble(self, summary: Summary) -> Assembled {
        let mut body = format!(
            "<h1>Check-in summary</h1>\
             Supported targets: {}<br>\
             Active targets: {}<br>\
             Completed today: {}<br><hr>",
            summary.total, summary.active, summary.completed_today
        );
        let processed = self.processed();
        for fragment in self.fragments {
            body.push_str(&fragment);
        }
        Assembled { body, processed }
    }
}

/// Minimal HTML escaping for scraped text.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            total: 7,
            active: 2,
            completed_today: 1,
        }
    }

    #[test]
    fn empty_report_is_not_processed() {
        let assembled = Report::new().assemble(summary());

        assert!(!assembled.processed);
        assert!(assembled.body.contains("Supported targets: 7"));
        assert!(assembled.body.contains("Active targets: 2"));
        assert!(assembled.body.contains("Completed today: 1"));
    }

    #[test]
    fn fragments_follow_summary_in_push_order() {
        let mut report = Report::new();
        let times = FieldValue::from("5");
        report.push_success("A", &[("Check-ins", &times)]);
        report.push_failure("B");
        let assembled = report.assemble(summary());

        assert!(assembled.processed);
        let summary_at = assembled.body.find("Completed today").unwrap();
        let a_at = assembled.body.find("A checked in").unwrap();
        let b_at = assembled.body.find("B check-in failed").unwrap();
        assert!(summary_at < a_at && a_at < b_at);
        assert!(assembled.body.contains("• Check-ins: 5<br>"));
        assert!(assembled.body.contains(r#"style="color:red""#));
    }

    #[test]
    fn list_fields_render_as_items() {
        let mut report = Report::new();
        let notices = FieldValue::List(vec!["2024.01.02 - Maintenance".into()]);
        report.push_success("A", &[("Announcements", &notices)]);
        let body = report.assemble(summary()).body;

        assert!(body.contains("• Announcements:<ul><li>2024.01.02 - Maintenance</li></ul>"));
    }

    #[test]
    fn scraped_markup_is_escaped() {
        let mut report = Report::new();
        let level = FieldValue::from("<b>L3</b> & up");
        report.push_success("A", &[("Level", &level)]);
        let body = report.assemble(summary()).body;

        assert!(body.contains("&lt;b&gt;L3&lt;/b&gt; &amp; up"));
    }
}
