use scraper::ElementRef;

use crate::config::ExclusionRules;
use crate::dom;

/// The structural attributes the exclusion gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAttributes {
    pub name: String,
    pub id: String,
    pub class: String,
    /// Nearest `data-type` marker on the field or an ancestor.
    pub data_type: Option<String>,
}

impl FieldAttributes {
    pub fn of(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            name: value.attr("name").unwrap_or_default().to_owned(),
            id: value.attr("id").unwrap_or_default().to_owned(),
            class: value.attr("class").unwrap_or_default().to_owned(),
            data_type: dom::nearest_data_type(element),
        }
    }
}

/// Which attribute matched which keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionMatch {
    pub attribute: &'static str,
    pub keyword: String,
}

fn contains_any(haystack: &str, keywords: &[String]) -> Option<String> {
    if haystack.is_empty() {
        return None;
    }
    let haystack = haystack.to_lowercase();
    keywords
        .iter()
        .find(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
        .cloned()
}

pub fn exclusion_match(attrs: &FieldAttributes, rules: &ExclusionRules) -> Option<ExclusionMatch> {
    let checks: [(&'static str, &str, &[String]); 4] = [
        ("name", &attrs.name, &rules.name_or_id),
        ("id", &attrs.id, &rules.name_or_id),
        ("class", &attrs.class, &rules.class),
        (
            "data-type",
            attrs.data_type.as_deref().unwrap_or_default(),
            &rules.data_type,
        ),
    ];
    checks.into_iter().find_map(|(attribute, value, keywords)| {
        contains_any(value, keywords).map(|keyword| ExclusionMatch { attribute, keyword })
    })
}

/// Hard safety gate: any match excludes the field from ranking and writing.
pub fn is_excluded(attrs: &FieldAttributes, rules: &ExclusionRules) -> bool {
    exclusion_match(attrs, rules).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(name: &str, id: &str, class: &str) -> FieldAttributes {
        FieldAttributes {
            name: name.to_owned(),
            id: id.to_owned(),
            class: class.to_owned(),
            data_type: None,
        }
    }

    #[test]
    fn memo_fields_are_excluded_case_insensitively() {
        let rules = ExclusionRules::default();
        assert!(is_excluded(&attrs("Admin_Memo", "", ""), &rules));
        assert!(is_excluded(&attrs("", "futari_box", ""), &rules));
        assert!(is_excluded(&attrs("", "", "msg STAFF-NOTE"), &rules));
        assert!(!is_excluded(&attrs("message1", "reply", "msg wd100"), &rules));
    }

    #[test]
    fn data_type_marker_is_checked() {
        let rules = ExclusionRules::default();
        let mut field = attrs("message", "", "");
        field.data_type = Some("memo".to_owned());
        assert_eq!(
            exclusion_match(&field, &rules),
            Some(ExclusionMatch {
                attribute: "data-type",
                keyword: "memo".to_owned()
            })
        );
    }
}
