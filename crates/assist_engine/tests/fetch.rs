use std::sync::{Arc, Mutex};
use std::time::Duration;

use assist_engine::{
    load_sheet, CsvOptions, FailureKind, FetchSettings, Fetcher, MessageSourceError, ProgressSink,
    SheetEvent, SheetFetcher, SheetLoaderHandle,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<SheetEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<SheetEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: SheetEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn fetcher_returns_csv_and_emits_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("1,hello\n2,world\n", "text/csv"))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let sink = TestSink::default();
    let url = format!("{}/sheet.csv", server.uri());

    let output = fetcher.fetch(1, &url, &sink).await.expect("fetch ok");
    assert_eq!(output.final_url, url);
    assert_eq!(output.content_type.as_deref(), Some("text/csv"));
    assert_eq!(output.bytes, b"1,hello\n2,world\n");
    assert!(sink
        .take()
        .iter()
        .any(|event| matches!(event, SheetEvent::Progress { load_id: 1, .. })));
}

#[tokio::test]
async fn forbidden_and_missing_sheets_map_to_distinct_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let sink = TestSink::default();

    let forbidden = fetcher
        .fetch(1, &format!("{}/private", server.uri()), &sink)
        .await
        .unwrap_err();
    assert_eq!(forbidden.kind, FailureKind::Forbidden);
    assert!(forbidden.operator_message().contains("403"));

    let missing = fetcher
        .fetch(2, &format!("{}/gone", server.uri()), &sink)
        .await
        .unwrap_err();
    assert_eq!(missing.kind, FailureKind::NotFound);
}

#[tokio::test]
async fn html_login_page_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(1, &format!("{}/login", server.uri()), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::NotShared);
    assert!(err.operator_message().contains("sign-in"));
}

#[tokio::test]
async fn export_redirect_is_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("Location", format!("{}/content", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("1,moved\n", "text/csv"))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let output = fetcher
        .fetch(1, &format!("{}/export", server.uri()), &TestSink::default())
        .await
        .expect("redirected fetch");
    assert_eq!(output.final_url, format!("{}/content", server.uri()));
    assert_eq!(output.bytes, b"1,moved\n");
}

#[tokio::test]
async fn oversized_export_is_cut_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'a'; 4096], "text/csv"))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings {
        max_bytes: 1024,
        ..FetchSettings::default()
    });
    let err = fetcher
        .fetch(1, &format!("{}/big", server.uri()), &TestSink::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 1024, .. }));
}

#[tokio::test]
async fn load_sheet_decodes_shift_jis_export() {
    let server = MockServer::start().await;
    let (body, _, _) = encoding_rs::SHIFT_JIS.encode(
        "番号,メッセージ\n\
         1,こんにちは、ご連絡ありがとうございます。\n\
         2,本日もよろしくお願いいたします。\n",
    );
    Mock::given(method("GET"))
        .and(path("/export"))
        .and(query_param("format", "csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.into_owned(), "text/csv; charset=Shift_JIS"),
        )
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let url = format!("{}/export?format=csv&gid=0", server.uri());
    let (messages, encoding) = load_sheet(
        &fetcher,
        1,
        &url,
        CsvOptions { skip_header: true },
        &TestSink::default(),
    )
    .await
    .unwrap();
    assert_eq!(encoding, "Shift_JIS");
    assert_eq!(
        messages,
        vec![
            "こんにちは、ご連絡ありがとうございます。",
            "本日もよろしくお願いいたします。"
        ]
    );
}

#[tokio::test]
async fn empty_export_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("\n\n", "text/csv"))
        .mount(&server)
        .await;

    let fetcher = SheetFetcher::new(FetchSettings::default());
    let err = load_sheet(
        &fetcher,
        1,
        &format!("{}/empty.csv", server.uri()),
        CsvOptions::default(),
        &TestSink::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, MessageSourceError::NoData);
}

#[tokio::test]
async fn loader_thread_reports_results_over_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/replies.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("a\nb\n", "text/csv"))
        .mount(&server)
        .await;

    let loader = SheetLoaderHandle::new(FetchSettings::default());
    let url = format!("{}/replies.csv", server.uri());
    loader.load(7, url.clone(), CsvOptions::default());

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    let mut loaded = None;
    while std::time::Instant::now() < deadline {
        match loader.try_recv() {
            Some(SheetEvent::Loaded { load_id, messages, .. }) => {
                loaded = Some((load_id, messages));
                break;
            }
            Some(SheetEvent::Failed { message, .. }) => panic!("load failed: {message}"),
            Some(_) => {}
            None => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    assert_eq!(loaded, Some((7, vec!["a".to_owned(), "b".to_owned()])));
}
