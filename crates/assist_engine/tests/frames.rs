use assist_engine::{
    analyze_all, classify_frame, enumerate_documents, reconcile, DetectorConfig, FrameContent,
    FrameRole, Page, MAIN_DOCUMENT,
};
use pretty_assertions::assert_eq;

fn nested_page() -> Page {
    let mut page = Page::new(
        Some("https://site.test/staff/index.php"),
        r#"<iframe name="menu" src="menu.php"></iframe>
           <iframe name="main" src="box_char.php"></iframe>
           <iframe src="https://ads.partner.test/banner"></iframe>
           <iframe src="about:blank"></iframe>"#,
    );
    page.attach_frame_by_src(
        MAIN_DOCUMENT,
        "menu.php",
        FrameContent::SameOrigin {
            address: Some("https://site.test/staff/menu.php".to_owned()),
            html: "<a href='#'>inbox</a>".to_owned(),
        },
    );
    let listing = page
        .attach_frame_by_src(
            MAIN_DOCUMENT,
            "box_char.php",
            FrameContent::SameOrigin {
                address: Some("https://site.test/staff/box_char.php".to_owned()),
                html: r#"<iframe name="compose" src="mail_send.php"></iframe>"#.to_owned(),
            },
        )
        .unwrap();
    page.attach_frame_by_src(
        listing,
        "mail_send.php",
        FrameContent::SameOrigin {
            address: Some("https://site.test/staff/mail_send.php".to_owned()),
            html: "<textarea name='message'></textarea>".to_owned(),
        },
    );
    page.attach_frame_by_src(
        MAIN_DOCUMENT,
        "https://ads.partner.test/banner",
        FrameContent::CrossOrigin { address: None },
    );
    page
}

#[test]
fn enumeration_is_idempotent() {
    let page = nested_page();
    let first = enumerate_documents(&page, 6);
    let second = enumerate_documents(&page, 6);
    assert_eq!(first, second);

    let shape: Vec<(usize, bool, Option<&str>)> = first
        .iter()
        .map(|h| (h.depth, h.reachable, h.frame_name.as_deref()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (0, true, None),
            (1, true, Some("menu")),
            (1, true, Some("main")),
            (2, true, Some("compose")),
            (1, false, None),
            (1, false, None),
        ]
    );
}

#[test]
fn unreadable_frames_yield_empty_reports() {
    let page = nested_page();
    let config = DetectorConfig::default();
    let handles = enumerate_documents(&page, config.max_frame_depth);
    let reports = analyze_all(&page, &handles, &config);

    assert_eq!(reports.len(), handles.len());
    let unreachable: Vec<_> = reports.iter().filter(|r| !r.handle.reachable).collect();
    assert_eq!(unreachable.len(), 2);
    assert!(unreachable
        .iter()
        .all(|r| r.rows.is_empty() && r.reply_input.is_none() && r.error.is_none()));

    let roles: Vec<FrameRole> = reports.iter().map(|r| r.frame_role).collect();
    assert_eq!(roles[2], FrameRole::Listing);
    assert_eq!(roles[3], FrameRole::Compose);
    assert_eq!(
        classify_frame(None, None, &config.frames),
        FrameRole::Unknown
    );
}

#[test]
fn compose_inside_addressless_listing_loses_to_sibling_profile() {
    let mut page = Page::new(
        Some("https://site.test/staff/index.php"),
        r#"<iframe name="main" src="box_char.php"></iframe>
           <iframe name="profile" src="profile.php"></iframe>"#,
    );
    let listing = page
        .attach_frame_by_src(
            MAIN_DOCUMENT,
            "box_char.php",
            FrameContent::SameOrigin {
                address: None,
                html: r#"<iframe name="reply" src="mail_send.php"></iframe>"#.to_owned(),
            },
        )
        .unwrap();
    page.attach_frame_by_src(
        listing,
        "mail_send.php",
        FrameContent::SameOrigin {
            address: None,
            html: "<textarea name='message'></textarea>".to_owned(),
        },
    );
    page.attach_frame_by_src(
        MAIN_DOCUMENT,
        "profile.php",
        FrameContent::SameOrigin {
            address: None,
            html: "<textarea name='message'></textarea>".to_owned(),
        },
    );

    let config = DetectorConfig::default();
    let handles = enumerate_documents(&page, config.max_frame_depth);
    assert_eq!(
        handles[2].address.as_deref(),
        Some("https://site.test/staff/mail_send.php")
    );

    let reports = analyze_all(&page, &handles, &config);
    let roles: Vec<FrameRole> = reports.iter().map(|r| r.frame_role).collect();
    assert_eq!(roles[1], FrameRole::Listing);
    assert_eq!(roles[2], FrameRole::Compose);

    let result = reconcile(&reports);
    let chosen = result.chosen_document.expect("a writable document");
    assert_eq!(chosen.frame_name.as_deref(), Some("profile"));
}
