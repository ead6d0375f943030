use std::collections::HashSet;

use assist_core::{PageMode, Phase};
use assist_engine::{
    BatchReport, FrameContent, InsertError, InsertOutcome, ManualClock, Page, RecordingNotifier,
    Session, MAIN_DOCUMENT,
};
use pretty_assertions::assert_eq;

const LISTING_ADDRESS: &str = "https://site.test/staff/box_char.php";

fn listing_html(prefilled: &[(usize, &str)]) -> String {
    let rows: String = (0..5)
        .map(|i| {
            let text = prefilled
                .iter()
                .find(|(row, _)| *row == i)
                .map(|(_, text)| *text)
                .unwrap_or("");
            format!(
                r#"<tr class="rowitem" id="row{i}">
                     <td><input type="checkbox" name="sel{i}"></td>
                     <td class="chatview">user {i}</td>
                     <td><textarea name="message1" id="msg{i}" rows="3" cols="40">{text}</textarea></td>
                     <td><textarea name="memo{i}" id="memo{i}" rows="3" cols="60"></textarea></td>
                   </tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
             <div id="reply-assist-panel"><textarea id="panel-input"></textarea></div>
             <table class="list" width="100%">
               <tr><th></th><th>名前</th><th>メッセージ</th><th>メモ</th></tr>
               {rows}
             </table>
           </body></html>"#
    )
}

fn started(page: Page) -> (Session, ManualClock) {
    let clock = ManualClock::new();
    let mut session = Session::new(page).with_clock(clock.clone());
    session.start();
    (session, clock)
}

fn value_by_id(session: &Session, id: &str) -> String {
    let document = session.page().main();
    let selector = scraper::Selector::parse(&format!("#{id}")).unwrap();
    let element = document.html().select(&selector).next().unwrap();
    document.value_of(element)
}

fn messages(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn listing_batch_fills_eligible_rows_in_order() {
    let (mut session, _clock) = started(Page::new(Some(LISTING_ADDRESS), &listing_html(&[])));

    let result = session.result();
    assert_eq!(result.page_mode, PageMode::Listing);
    assert_eq!(result.chosen_row_count(), 5);
    assert_eq!(session.scheduler().phase, Phase::Settled);

    let report = session.insert_batch(&messages(&["a", "b", "c"])).unwrap();
    assert_eq!(
        report,
        BatchReport {
            inserted: 3,
            skipped: 0,
            remaining: 0
        }
    );
    let filled: Vec<String> = (0..5).map(|i| value_by_id(&session, &format!("msg{i}"))).collect();
    assert_eq!(filled, vec!["a", "b", "c", "", ""]);
    for i in 0..5 {
        assert_eq!(value_by_id(&session, &format!("memo{i}")), "");
    }
    assert_eq!(value_by_id(&session, "panel-input"), "");
}

#[test]
fn single_record_with_text_is_skipped() {
    let html = r#"<form action="send.php">
                    <textarea name="message" rows="6" cols="50">Thanks for your mail</textarea>
                    <button type="submit">送信</button>
                  </form>"#;
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new();
    let page = Page::new(Some("https://site.test/staff/mailbox.php?id=3"), html);
    let mut session = Session::new(page)
        .with_clock(clock)
        .with_notifier(notifier.clone());
    session.start();

    let result = session.result();
    assert_eq!(result.page_mode, PageMode::SingleRecord);
    let target = result.reply_input.clone().expect("reply input");

    assert_eq!(session.insert_single("x"), Ok(InsertOutcome::Skipped));
    assert_eq!(
        session.page().field_value(target.element).as_deref(),
        Some("Thanks for your mail")
    );
    assert_eq!(notifier.notices().len(), 1);
}

#[test]
fn unreachable_listing_with_hint_reports_zero_rows() {
    let html = r#"<p>受信一覧 全 12 件</p>
                  <iframe name="list" src="https://partner.test/staff/box_char.php"></iframe>"#;
    let mut page = Page::new(Some("https://site.test/staff/index.php"), html);
    page.attach_frame_by_src(
        MAIN_DOCUMENT,
        "https://partner.test/staff/box_char.php",
        FrameContent::CrossOrigin { address: None },
    );
    let (mut session, clock) = started(page);

    let result = session.result();
    assert_eq!(result.row_results.len(), 0);
    assert_eq!(result.displayed_count_hint, Some(12));
    assert_eq!(
        result.mismatch_warning.as_deref(),
        Some("page shows 12 records but no reply fields are reachable (1 unreadable frames)")
    );

    // Staged retries run out without a crash and settle on the empty result.
    for delay in [500, 1000, 2000, 4000] {
        clock.advance(delay);
        session.tick();
    }
    assert_eq!(session.scheduler().phase, Phase::Settled);
    assert_eq!(session.result().row_results.len(), 0);
    assert_eq!(session.insert_single("x"), Err(InsertError::NoTarget));
}

#[test]
fn prefilled_rows_are_never_overwritten() {
    let prefilled = [(0, "already replied"), (2, "draft"), (3, "   ")];
    let (mut session, _clock) =
        started(Page::new(Some(LISTING_ADDRESS), &listing_html(&prefilled)));

    let report = session.insert_batch(&messages(&["a", " ", "b", "c"])).unwrap();
    assert_eq!(
        report,
        BatchReport {
            inserted: 3,
            skipped: 2,
            remaining: 0
        }
    );
    let filled: Vec<String> = (0..5).map(|i| value_by_id(&session, &format!("msg{i}"))).collect();
    assert_eq!(filled, vec!["already replied", "a", "draft", "b", "c"]);

    let again = session.insert_batch(&messages(&["z"])).unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.remaining, 1);
    assert_eq!(value_by_id(&session, "msg0"), "already replied");
}

#[test]
fn every_row_claims_a_distinct_input() {
    let (session, _clock) = started(Page::new(Some(LISTING_ADDRESS), &listing_html(&[])));
    let result = session.result();
    let nodes: Vec<_> = result
        .row_results
        .iter()
        .filter_map(|r| r.chosen_input.as_ref().map(|c| c.element.node))
        .collect();
    let unique: HashSet<_> = nodes.iter().collect();
    assert_eq!(nodes.len(), unique.len());
    assert!(result
        .row_results
        .iter()
        .filter_map(|r| r.chosen_input.as_ref())
        .all(|c| c.name == "message1"));
}

#[test]
fn rerendered_field_is_not_written() {
    let html = r#"<textarea name="message" rows="6" cols="50"></textarea>"#;
    let (mut session, _clock) = started(Page::new(Some("https://site.test/profile.php"), html));
    assert!(session.result().reply_input.is_some());

    session.rerender(MAIN_DOCUMENT, html);
    assert_eq!(session.insert_single("hello"), Err(InsertError::Stale));
}

#[test]
fn stopped_session_freezes_result() {
    let (mut session, clock) = started(Page::new(Some(LISTING_ADDRESS), &listing_html(&[])));
    let before = session.result();
    let passes = session.passes_run();

    session.stop();
    session.stop();
    session.rerender(MAIN_DOCUMENT, "<p>gone</p>");
    session.trigger_manual_detect();
    clock.advance(60_000);
    session.tick();

    assert_eq!(session.passes_run(), passes);
    assert_eq!(*session.result(), *before);
    assert_eq!(session.next_deadline_ms(), None);
    assert_eq!(session.insert_single("late"), Err(InsertError::Stopped));
}
