//! Issue, user and link import against a mock YouTrack server.

use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};

use youtrack_client::api::{
    issues_xml, Connection, ConnectionOptions, DenyList, ImportLink, ImportOptions, ImportUser,
    IssueRecord,
};

fn options() -> ConnectionOptions {
    ConnectionOptions {
        request_timeout: Duration::from_secs(5),
        gateway_backoff: Duration::ZERO,
        count_poll_interval: Duration::ZERO,
    }
}

fn connect(server: &ServerGuard) -> Connection {
    Connection::with_token(&server.url(), "perm:abc", options()).unwrap()
}

fn issue(number: &str, summary: &str) -> IssueRecord {
    IssueRecord::new()
        .with("numberInProject", number)
        .with("summary", summary)
        .with("votes", "3")
}

/// Mocks the lookups the deny list needs: no time tracking, markdown supported.
async fn mock_deny_list_lookups(server: &mut ServerGuard) {
    server
        .mock("GET", "/api/admin/project/ABC/timetracking")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/api/config")
        .match_query(Matcher::UrlEncoded("fields".into(), "build".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"build": 50000}"#)
        .create_async()
        .await;
}

#[tokio::test]
async fn test_import_issues_reports_each_item() {
    let mut server = Server::new_async().await;
    mock_deny_list_lookups(&mut server).await;
    let issues = [issue("1", "First"), issue("2", "Second")];
    let expected = issues_xml(&issues, &DenyList::standard());
    assert!(!expected.xml.contains("votes"));

    let import = server
        .mock("PUT", "/api/import/ABC/issues")
        .match_query(Matcher::UrlEncoded("assigneeGroup".into(), "dev".into()))
        .match_header("content-type", "application/xml")
        .match_body(expected.xml.as_str())
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(r#"<importResult><item id="1" imported="true"/><item id="2" imported="true"/></importResult>"#)
        .create_async()
        .await;

    let mut conn = connect(&server);
    let report = conn
        .import_issues("ABC", "dev", &issues)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.submitted, 2);
    assert!(report.count_matches());
    assert!(report.all_imported());
    assert!(report.fallback.is_empty());
    import.assert_async().await;
}

#[tokio::test]
async fn test_import_partial_failure_is_not_an_error() {
    let mut server = Server::new_async().await;
    mock_deny_list_lookups(&mut server).await;
    server
        .mock("PUT", "/api/import/ABC/issues")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(r#"<importResult><item id="1" imported="true"/><item id="2" imported="false"><error>bad</error></item></importResult>"#)
        .create_async()
        .await;

    let mut conn = connect(&server);
    let report = conn
        .import_issues("ABC", "dev", &[issue("1", "First"), issue("2", "Second")])
        .await
        .unwrap()
        .unwrap();

    let failed: Vec<&str> = report.failed().map(|item| item.id.as_str()).collect();
    assert_eq!(failed, ["2"]);
    assert!(!report.all_imported());
}

#[tokio::test]
async fn test_empty_batch_response_falls_back_within_budget() {
    let mut server = Server::new_async().await;
    mock_deny_list_lookups(&mut server).await;
    let issues = [issue("1", "First"), issue("2", "Second")];
    let deny = DenyList::standard();
    let batch = issues_xml(&issues, &deny);
    let first = issues_xml(&issues[..1], &deny);
    let second = issues_xml(&issues[1..], &deny);

    let batch_mock = server
        .mock("PUT", "/api/import/ABC/issues")
        .match_query(Matcher::Any)
        .match_body(batch.xml.as_str())
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let first_mock = server
        .mock("PUT", "/api/import/ABC/issues")
        .match_query(Matcher::Any)
        .match_body(first.xml.as_str())
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(r#"<importResult><item id="1" imported="true"/></importResult>"#)
        .expect(1)
        .create_async()
        .await;
    let second_mock = server
        .mock("PUT", "/api/import/ABC/issues")
        .match_query(Matcher::Any)
        .match_body(second.xml.as_str())
        .expect(0)
        .create_async()
        .await;

    let mut conn = connect(&server);
    let report = conn
        .import_issues_with(
            "ABC",
            "dev",
            &issues,
            &ImportOptions {
                fallback_budget: Some(1),
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert!(report.items.is_empty());
    assert_eq!(report.fallback.len(), 1);
    assert!(report.fallback[0].all_imported());
    assert_eq!(report.skipped, ["2"]);
    assert!(!report.all_imported());
    batch_mock.assert_async().await;
    first_mock.assert_async().await;
    second_mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_imports_send_nothing() {
    let mut server = Server::new_async().await;
    let any_put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut conn = connect(&server);
    assert!(conn.import_issues("ABC", "dev", &[]).await.unwrap().is_none());
    assert!(conn.import_users(&[]).await.unwrap().is_none());
    assert!(conn.import_links(&[]).await.unwrap().is_none());
    assert!(conn.import_work_items("ABC-1", &[]).await.unwrap().is_none());

    any_put.assert_async().await;
}

#[tokio::test]
async fn test_import_users_sends_list_document() {
    let mut server = Server::new_async().await;
    let import = server
        .mock("PUT", "/api/import/users")
        .match_body(Matcher::Regex(r#"<user login="jane" fullName="Jane &amp; Co" />"#.to_string()))
        .with_status(200)
        .with_body("<importResult/>")
        .create_async()
        .await;

    let mut user = ImportUser::new("jane");
    user.full_name = Some("Jane & Co".to_string());

    let mut conn = connect(&server);
    let response = conn.import_users(&[user]).await.unwrap();

    assert_eq!(response.as_deref(), Some("<importResult/>"));
    import.assert_async().await;
}

#[tokio::test]
async fn test_import_links_tolerates_bad_request() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/api/import/links")
        .with_status(400)
        .with_body("<importResult><error>duplicate</error></importResult>")
        .create_async()
        .await;

    let mut conn = connect(&server);
    let response = conn
        .import_links(&[ImportLink::new("Depend", "ABC-1", "ABC-2")])
        .await
        .unwrap();

    assert!(response.unwrap().contains("duplicate"));
}

#[tokio::test]
async fn test_deny_list_includes_time_spent_and_markdown_on_old_servers() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/admin/project/ABC/timetracking")
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(
            r#"<settings enabled="true"><estimation name="Estimation"/><spentTime name="Spent time"/></settings>"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/config")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"build": 30000}"#)
        .create_async()
        .await;

    let mut conn = connect(&server);
    let deny = conn.import_deny_list("ABC").await.unwrap();

    assert!(deny.contains("Spent time"));
    assert!(deny.contains("markdown"));
    assert!(deny.contains("votes"));
}
