use thiserror::Error;
use url::Url;

use crate::decode::DecodeError;
use crate::types::FetchError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageSourceError {
    #[error("sheet URL is empty")]
    EmptyUrl,
    #[error("no data")]
    NoData,
    #[error("malformed CSV: {0}")]
    Csv(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvOptions {
    pub skip_header: bool,
}

fn is_csv_export(url: &str) -> bool {
    url.contains("/export?format=csv") || url.contains("output=csv") || url.contains("/gviz/tq")
}

fn sheet_id(url: &str) -> Option<&str> {
    let rest = url.split("/spreadsheets/d/").nth(1)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    Some(&rest[..end]).filter(|id| !id.is_empty())
}

/// `gid` from the query or the `#gid=` fragment.
fn sheet_gid(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let from_query = parsed
        .query_pairs()
        .find(|(k, _)| k == "gid")
        .map(|(_, v)| v.into_owned());
    from_query
        .or_else(|| {
            parsed
                .fragment()
                .and_then(|f| f.split('&').find_map(|p| p.strip_prefix("gid=")))
                .map(str::to_owned)
        })
        .filter(|gid| !gid.is_empty() && gid.chars().all(|c| c.is_ascii_digit()))
}

/// Turns a shared spreadsheet link into its CSV export address.
pub fn normalize_sheet_url(url: &str) -> Result<String, MessageSourceError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(MessageSourceError::EmptyUrl);
    }
    if is_csv_export(url) {
        return Ok(url.to_owned());
    }
    match sheet_id(url) {
        Some(id) => {
            let gid = sheet_gid(url).unwrap_or_else(|| "0".to_owned());
            Ok(format!(
                "https://docs.google.com/spreadsheets/d/{id}/export?format=csv&gid={gid}"
            ))
        }
        None => Ok(url.to_owned()),
    }
}

/// Second column when present and non-empty, otherwise the first non-empty one.
fn message_of(record: &csv::StringRecord) -> Option<String> {
    record
        .get(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| record.iter().map(str::trim).find(|s| !s.is_empty()))
        .map(str::to_owned)
}

pub fn parse_csv(text: &str, options: CsvOptions) -> Result<Vec<String>, MessageSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(options.skip_header)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut messages = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| MessageSourceError::Csv(err.to_string()))?;
        if let Some(message) = message_of(&record) {
            messages.push(message);
        }
    }
    if messages.is_empty() {
        return Err(MessageSourceError::NoData);
    }
    Ok(messages)
}

/// One message per non-empty line of free text.
pub fn parse_direct_input(text: &str) -> Result<Vec<String>, MessageSourceError> {
    let messages: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();
    if messages.is_empty() {
        return Err(MessageSourceError::NoData);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_link_becomes_export() {
        assert_eq!(
            normalize_sheet_url(" https://docs.google.com/spreadsheets/d/AbC_9-x/edit#gid=123 ")
                .unwrap(),
            "https://docs.google.com/spreadsheets/d/AbC_9-x/export?format=csv&gid=123"
        );
        assert_eq!(
            normalize_sheet_url("https://docs.google.com/spreadsheets/d/AbC/edit").unwrap(),
            "https://docs.google.com/spreadsheets/d/AbC/export?format=csv&gid=0"
        );
    }

    #[test]
    fn exports_and_other_urls_pass_through() {
        let export = "https://docs.google.com/spreadsheets/d/AbC/export?format=csv&gid=7";
        assert_eq!(normalize_sheet_url(export).unwrap(), export);
        assert_eq!(
            normalize_sheet_url("https://files.example.com/replies.csv").unwrap(),
            "https://files.example.com/replies.csv"
        );
        assert_eq!(normalize_sheet_url("  "), Err(MessageSourceError::EmptyUrl));
    }
}
