use std::fmt;

use scraper::ElementRef;

use crate::config::{DetectorConfig, InputScoring};
use crate::dom;
use crate::exclusion::{exclusion_match, ExclusionMatch, FieldAttributes};
use crate::model::{CandidateVerdict, InputCandidate};
use crate::page::{DocIndex, PageDocument};

/// Where candidates are being ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringScope {
    /// Whole-document search for a single reply field.
    Document,
    /// Per-row (or document scan standing in for rows) search on a listing.
    Rows,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Invisible,
    Excluded(ExclusionMatch),
    ComposeForm,
    InsidePanel,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Invisible => write!(f, "invisible"),
            Rejection::Excluded(m) => {
                write!(f, "excluded ({} contains '{}')", m.attribute, m.keyword)
            }
            Rejection::ComposeForm => write!(f, "single-send compose form"),
            Rejection::InsidePanel => write!(f, "inside assist panel"),
        }
    }
}

/// Form with exactly one text field and at least one submit control.
pub fn is_compose_form_field(element: ElementRef<'_>) -> bool {
    let Some(form) = dom::closest(element, "form") else {
        return false;
    };
    let mut fields = 0usize;
    let mut has_submit = false;
    for el in form.descendants().filter_map(ElementRef::wrap) {
        if dom::is_text_field(el) {
            fields += 1;
        }
        has_submit |= dom::is_submit_control(el);
    }
    fields == 1 && has_submit
}

pub(crate) fn is_inside_panel(element: ElementRef<'_>, panel_id: &str) -> bool {
    !panel_id.is_empty()
        && std::iter::once(element)
            .chain(dom::ancestors(element))
            .any(|el| el.value().id() == Some(panel_id))
}

pub fn score_attributes(
    attrs: &FieldAttributes,
    placeholder: &str,
    tag: &str,
    editable: bool,
    size_hint: u32,
    rules: &InputScoring,
) -> i32 {
    let mut score = 0;

    let name = attrs.name.to_lowercase();
    if let Some(rank) = rules
        .priority_names
        .iter()
        .position(|p| p.eq_ignore_ascii_case(&name))
    {
        score += (rules.priority_bonus - 10 * rank as i32).max(0);
    }

    let identity = format!("{} {} {}", name, attrs.id, attrs.class).to_lowercase();
    score += rules
        .vocabulary
        .iter()
        .filter(|w| identity.contains(&w.keyword.to_lowercase()))
        .map(|w| w.weight)
        .sum::<i32>();

    let placeholder = placeholder.to_lowercase();
    score += rules
        .placeholder_vocabulary
        .iter()
        .filter(|w| placeholder.contains(&w.keyword.to_lowercase()))
        .map(|w| w.weight)
        .sum::<i32>();

    if tag == "textarea" {
        score += rules.textarea_bonus;
    } else if editable {
        score += rules.editable_bonus;
    }

    if rules.area_per_point > 0 {
        let bonus = (size_hint / rules.area_per_point).min(rules.max_size_bonus.max(0) as u32);
        score += bonus as i32;
    }
    score
}

pub fn score_input(
    document: &PageDocument,
    doc: DocIndex,
    element: ElementRef<'_>,
    config: &DetectorConfig,
    scope: ScoringScope,
) -> Result<InputCandidate, Rejection> {
    if is_inside_panel(element, &config.panel_id) {
        return Err(Rejection::InsidePanel);
    }
    let attrs = FieldAttributes::of(element);
    if let Some(hit) = exclusion_match(&attrs, &config.exclusion) {
        return Err(Rejection::Excluded(hit));
    }
    if !dom::is_visible(element) {
        return Err(Rejection::Invisible);
    }
    if scope == ScoringScope::Rows && is_compose_form_field(element) {
        return Err(Rejection::ComposeForm);
    }

    let tag = dom::tag(element).to_owned();
    let placeholder = element.value().attr("placeholder").unwrap_or_default().to_owned();
    let size_hint = dom::size_hint(element);
    let score = score_attributes(
        &attrs,
        &placeholder,
        &tag,
        dom::is_content_editable(element),
        size_hint,
        &config.inputs,
    );
    Ok(InputCandidate {
        element: document.handle(doc, element),
        tag,
        name: attrs.name,
        id: attrs.id,
        css_class: attrs.class,
        placeholder,
        is_visible: true,
        size_hint,
        score,
    })
}

/// Scored candidates under one root, with the verdict for every field seen.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Accepted candidates in document order.
    pub accepted: Vec<InputCandidate>,
    pub verdicts: Vec<CandidateVerdict>,
}

impl Ranking {
    /// Highest score; the first encountered wins ties.
    pub fn best(&self) -> Option<&InputCandidate> {
        self.accepted
            .iter()
            .fold(None, |best: Option<&InputCandidate>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }

    /// Accepted candidates best first, stable for equal scores.
    pub fn ordered(&self) -> Vec<&InputCandidate> {
        let mut out: Vec<&InputCandidate> = self.accepted.iter().collect();
        out.sort_by(|a, b| b.score.cmp(&a.score));
        out
    }
}

fn describe(element: ElementRef<'_>) -> String {
    let mut out = dom::tag(element).to_owned();
    if let Some(id) = element.value().attr("id") {
        out.push('#');
        out.push_str(id);
    }
    if let Some(name) = element.value().attr("name") {
        out.push_str(&format!("[name={name}]"));
    }
    out
}

pub fn rank_inputs(
    document: &PageDocument,
    doc: DocIndex,
    root: ElementRef<'_>,
    config: &DetectorConfig,
    scope: ScoringScope,
) -> Ranking {
    let mut ranking = Ranking::default();
    for element in root.descendants().filter_map(ElementRef::wrap) {
        if !dom::is_text_field(element) {
            continue;
        }
        match score_input(document, doc, element, config, scope) {
            Ok(candidate) => {
                ranking.verdicts.push(CandidateVerdict {
                    description: candidate.describe(),
                    score: Some(candidate.score),
                    rejection: None,
                });
                ranking.accepted.push(candidate);
            }
            Err(Rejection::InsidePanel) => {}
            Err(rejection) => ranking.verdicts.push(CandidateVerdict {
                description: describe(element),
                score: None,
                rejection: Some(rejection.to_string()),
            }),
        }
    }
    ranking
}
