use serde::Serialize;
use thiserror::Error;

use crate::config::ExclusionRules;
use crate::exclusion::{exclusion_match, FieldAttributes};
use crate::model::{DetectionResult, InputCandidate};
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// The target already holds text; nothing was written.
    Skipped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("no reply field detected")]
    NoTarget,
    #[error("nothing to insert")]
    EmptyText,
    #[error("reply field was re-rendered since detection")]
    Stale,
    #[error("refusing to write into {attribute} matching '{keyword}'")]
    Excluded { attribute: String, keyword: String },
    #[error("session is stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub skipped: usize,
    /// Messages left unconsumed.
    pub remaining: usize,
}

/// Checks the live element right before a write.
fn writable(
    page: &Page,
    target: &InputCandidate,
    rules: &ExclusionRules,
) -> Result<bool, InsertError> {
    let element = page.resolve(target.element).ok_or(InsertError::Stale)?;
    if let Some(hit) = exclusion_match(&FieldAttributes::of(element), rules) {
        return Err(InsertError::Excluded {
            attribute: hit.attribute.to_owned(),
            keyword: hit.keyword,
        });
    }
    let current = page.field_value(target.element).unwrap_or_default();
    Ok(current.trim().is_empty())
}

pub fn insert_single(
    page: &mut Page,
    result: &DetectionResult,
    text: &str,
    rules: &ExclusionRules,
) -> Result<InsertOutcome, InsertError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InsertError::EmptyText);
    }
    let target = result.reply_input.as_ref().ok_or(InsertError::NoTarget)?;
    if !writable(page, target, rules)? {
        return Ok(InsertOutcome::Skipped);
    }
    if page.set_field_value(target.element, text) {
        Ok(InsertOutcome::Inserted)
    } else {
        Err(InsertError::Stale)
    }
}

/// Fills empty row inputs in row order, one message each. Rows whose input
/// already has content, is excluded or went stale are skipped without
/// consuming a message.
pub fn insert_batch(
    page: &mut Page,
    result: &DetectionResult,
    messages: &[String],
    rules: &ExclusionRules,
) -> BatchReport {
    let mut queue = messages
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .peekable();
    let mut report = BatchReport::default();

    for row in &result.row_results {
        if queue.peek().is_none() {
            break;
        }
        let Some(target) = &row.chosen_input else {
            continue;
        };
        match writable(page, target, rules) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                report.skipped += 1;
                continue;
            }
        }
        if let Some(message) = queue.next() {
            if page.set_field_value(target.element, message) {
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }
    }
    report.remaining = queue.count();
    report
}
