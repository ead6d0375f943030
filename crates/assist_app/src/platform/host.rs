//! Terminal stand-ins for the on-page panel and notifier.

use assist_engine::{DetectionResult, NoticeLevel, Notifier, PanelHost};
use assist_logging::assist_info;
use chrono::{DateTime, Local, Utc};

/// Renders a result the way the panel's status area shows it.
pub(crate) fn render_summary(result: &DetectionResult) -> String {
    let mut lines = vec![
        format!("mode: {:?}", result.page_mode),
        format!("scope: {}", result.scope_description),
        format!(
            "rows: {} with reply field, {} total",
            result.chosen_row_count(),
            result.row_results.len()
        ),
        format!(
            "reply field: {}",
            result
                .reply_input
                .as_ref()
                .map(|c| c.describe())
                .unwrap_or_else(|| "none".to_owned())
        ),
    ];
    if let Some(hint) = result.displayed_count_hint {
        lines.push(format!("displayed count: {hint}"));
    }
    if let Some(warning) = &result.mismatch_warning {
        lines.push(format!("warning: {warning}"));
    }
    if let Some(at) = timestamp(result.timestamp_ms) {
        lines.push(format!("pass {} at {}", result.pass_id, at));
    }
    lines.join("\n")
}

fn timestamp(ms: u64) -> Option<String> {
    let ms = i64::try_from(ms).ok().filter(|ms| *ms > 0)?;
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.with_timezone(&Local).to_rfc3339())
}

/// Prints every published result to stdout.
#[derive(Debug, Default)]
pub(crate) struct TerminalPanel;

impl PanelHost for TerminalPanel {
    fn on_result_changed(&mut self, result: &DetectionResult) {
        println!("{}\n", render_summary(result));
    }

    fn is_present(&self) -> bool {
        true
    }

    fn restore(&mut self) {}
}

#[derive(Debug, Default)]
pub(crate) struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        assist_info!("Notice ({}): {}", level, message);
        eprintln!("[{level}] {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_core::PageMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_of_an_empty_result() {
        let result = DetectionResult {
            page_mode: PageMode::Other,
            scope_description: "not found".to_owned(),
            displayed_count_hint: Some(12),
            mismatch_warning: Some(
                "page shows 12 records but no reply fields are reachable (1 unreadable frames)"
                    .to_owned(),
            ),
            ..DetectionResult::default()
        };
        assert_eq!(
            render_summary(&result),
            "mode: Other\n\
             scope: not found\n\
             rows: 0 with reply field, 0 total\n\
             reply field: none\n\
             displayed count: 12\n\
             warning: page shows 12 records but no reply fields are reachable (1 unreadable frames)"
        );
    }
}
