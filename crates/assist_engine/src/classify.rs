use crate::config::FramePatterns;
use crate::model::FrameRole;

fn matches_any(haystacks: &[String], patterns: &[String]) -> bool {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_lowercase())
        .any(|p| haystacks.iter().any(|h| h.contains(&p)))
}

/// Labels a document from its address and frame name. Listing patterns win
/// when both match; no observable identity degrades to `Unknown`.
pub fn classify_frame(
    address: Option<&str>,
    frame_name: Option<&str>,
    patterns: &FramePatterns,
) -> FrameRole {
    let haystacks: Vec<String> = [address, frame_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect();
    if haystacks.is_empty() {
        return FrameRole::Unknown;
    }
    if matches_any(&haystacks, &patterns.listing) {
        FrameRole::Listing
    } else if matches_any(&haystacks, &patterns.compose) {
        FrameRole::Compose
    } else {
        FrameRole::Unknown
    }
}
