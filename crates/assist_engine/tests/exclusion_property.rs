use assist_engine::{
    is_excluded, rank_inputs, DetectorConfig, FieldAttributes, Page, ScoringScope, MAIN_DOCUMENT,
};
use proptest::prelude::*;

const KEYWORDS: &[&str] = &["memo", "admin", "note", "futari", "staff"];

fn attr_fragment() -> impl Strategy<Value = String> {
    "[a-z0-9_]{0,8}"
}

fn keyword() -> impl Strategy<Value = String> {
    prop::sample::select(KEYWORDS).prop_map(|k| k.to_owned())
}

/// Randomly upper-cases some characters.
fn mixed_case(keyword: String) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), keyword.len()).prop_map(move |flags| {
        keyword
            .chars()
            .zip(flags)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

proptest! {
    #[test]
    fn keyword_anywhere_in_name_or_id_excludes(
        prefix in attr_fragment(),
        suffix in attr_fragment(),
        kw in keyword().prop_flat_map(mixed_case),
        in_id in any::<bool>(),
    ) {
        let value = format!("{prefix}{kw}{suffix}");
        let attrs = if in_id {
            FieldAttributes { id: value, ..FieldAttributes::default() }
        } else {
            FieldAttributes { name: value, ..FieldAttributes::default() }
        };
        prop_assert!(is_excluded(&attrs, &DetectorConfig::default().exclusion));
    }

    #[test]
    fn scorer_never_selects_excluded_fields(
        prefix in attr_fragment(),
        kw in keyword(),
        rows in 1usize..6,
        cols in 20u32..120,
    ) {
        // Rich messaging vocabulary and a large size on the excluded field
        // must not get it selected.
        let html = format!(
            r#"<textarea name="message1" id="{prefix}{kw}" class="message reply" rows="{rows}0" cols="{cols}" placeholder="返信"></textarea>
               <textarea name="other"></textarea>"#
        );
        let page = Page::new(None, &html);
        let document = page.main();
        for scope in [ScoringScope::Document, ScoringScope::Rows] {
            let ranking = rank_inputs(
                document,
                MAIN_DOCUMENT,
                document.body(),
                &DetectorConfig::default(),
                scope,
            );
            prop_assert!(ranking.accepted.iter().all(|c| c.name != "message1"));
            prop_assert_eq!(ranking.best().map(|c| c.name.as_str()), Some("other"));
        }
    }
}
