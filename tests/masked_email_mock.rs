use assert_cmd::Command;
use fastmask::{Client, ClientConfig, Credentials, FastmailError, MaskedEmail, ReqwestTransport};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/jmap/api/";

fn api_url(server: &MockServer) -> String {
    format!("{}{API_PATH}", server.uri())
}

fn client_for(server: &MockServer) -> Client<ReqwestTransport> {
    let cfg = ClientConfig::new(
        Url::parse(&api_url(server)).unwrap(),
        Url::parse(&format!("{}/jmap/authenticate/", server.uri())).unwrap(),
    );
    Client::new(ReqwestTransport::new().unwrap(), cfg)
        .with_credentials(Credentials::new("acct-1", "tok-1"))
}

fn created_response() -> Value {
    json!({
        "sessionState": "s1",
        "methodResponses": [
            ["MaskedEmail/set", {
                "accountId": "acct-1",
                "created": {
                    "fastmask": {
                        "id": "masked-12345678",
                        "email": "fun.times1234@fastmail.com",
                        "state": "enabled",
                        "description": "avoiding endless newsletters",
                        "forDomain": "example.com",
                        "url": null,
                        "createdBy": "fastmask",
                        "createdAt": "2000-01-01T00:00:01Z",
                        "lastMessageAt": null
                    }
                },
                "oldState": null,
                "newState": "s2"
            }, "0"]
        ]
    })
}

async fn mount_api(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn sent_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    requests[0].body_json().expect("request json")
}

#[tokio::test]
async fn create_sends_one_masked_email_set_call() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(created_response()),
    )
    .await;

    let created = client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com").with_description("avoiding endless newsletters"),
            true,
            &CancellationToken::new(),
        )
        .await
        .expect("create");

    assert_eq!(created.id.as_deref(), Some("masked-12345678"));
    assert_eq!(created.email.as_deref(), Some("fun.times1234@fastmail.com"));

    let body = sent_body(&server).await;
    assert_eq!(
        body,
        json!({
            "using": ["urn:ietf:params:jmap:core", "https://www.fastmail.com/dev/maskedemail"],
            "methodCalls": [["MaskedEmail/set", {
                "accountId": "acct-1",
                "create": {
                    "fastmask": {
                        "state": "enabled",
                        "description": "avoiding endless newsletters",
                        "forDomain": "example.com"
                    }
                }
            }, "0"]]
        })
    );
}

#[tokio::test]
async fn create_disabled_sends_disabled_state() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(created_response()),
    )
    .await;

    client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com"),
            false,
            &CancellationToken::new(),
        )
        .await
        .expect("create");

    let body = sent_body(&server).await;
    assert_eq!(
        body.pointer("/methodCalls/0/1/create/fastmask/state"),
        Some(&json!("disabled"))
    );
}

#[tokio::test]
async fn create_with_two_method_responses_is_a_shape_error() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [
                ["MaskedEmail/set", {"created": {}}, "0"],
                ["MaskedEmail/set", {"created": {}}, "1"]
            ]
        })),
    )
    .await;

    let err = client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com"),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            FastmailError::MethodResponseShape {
                got: 2,
                expected: 1,
                ..
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn create_with_empty_created_map_is_no_items_returned() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [
                ["MaskedEmail/set", {
                    "accountId": "acct-1",
                    "created": {},
                    "notCreated": {"fastmask": {"type": "invalidProperties"}}
                }, "0"]
            ]
        })),
    )
    .await;

    let err = client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com"),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FastmailError::NoItemsReturned), "{err:?}");
}

#[tokio::test]
async fn unauthorized_is_a_sentinel_regardless_of_body() {
    for body in ["", "{}", "{\"methodResponses\": []}", "<html>nope</html>"] {
        let server = MockServer::start().await;
        mount_api(&server, ResponseTemplate::new(401).set_body_string(body)).await;

        let client = client_for(&server);
        let err = client
            .create_masked_email(
                MaskedEmail::for_domain("example.com"),
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FastmailError::Unauthorized), "{err:?}");
        assert!(err.needs_reauth());

        let err = client
            .delete_masked_emails(["masked-1"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FastmailError::Unauthorized), "{err:?}");
    }
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(500).set_body_string("test error message"),
    )
    .await;

    let err = client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com"),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, FastmailError::Api { status: 500, .. }),
        "{err:?}"
    );
    assert!(err.to_string().contains("test error message"));
}

#[tokio::test]
async fn method_error_response_is_surfaced() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [["error", {"type": "accountNotFound"}, "0"]]
        })),
    )
    .await;

    let err = client_for(&server)
        .create_masked_email(
            MaskedEmail::for_domain("example.com"),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(&err, FastmailError::Method { kind, .. } if kind == "accountNotFound"),
        "{err:?}"
    );
}

#[tokio::test]
async fn delete_sends_destroy_list() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [
                ["MaskedEmail/set", {"accountId": "acct-1", "destroyed": ["m1", "m2"]}, "0"]
            ]
        })),
    )
    .await;

    client_for(&server)
        .delete_masked_emails(["m1", "m2"], &CancellationToken::new())
        .await
        .expect("delete");

    let body = sent_body(&server).await;
    assert_eq!(
        body.pointer("/methodCalls/0"),
        Some(&json!(["MaskedEmail/set", {"accountId": "acct-1", "destroy": ["m1", "m2"]}, "0"]))
    );
}

#[tokio::test]
async fn delete_reports_ids_the_server_refused() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [
                ["MaskedEmail/set", {
                    "accountId": "acct-1",
                    "destroyed": ["m1"],
                    "notDestroyed": {"m2": {"type": "notFound"}}
                }, "0"]
            ]
        })),
    )
    .await;

    let err = client_for(&server)
        .delete_masked_emails(["m1", "m2"], &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        FastmailError::NotDestroyed { ids } => assert_eq!(ids, vec!["m2".to_string()]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_tolerates_an_uninterpretable_batch() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"sessionState": "s1"})),
    )
    .await;

    client_for(&server)
        .delete_masked_emails(["m1"], &CancellationToken::new())
        .await
        .expect("delete");
}

#[tokio::test]
async fn delete_tolerates_an_oddly_typed_payload() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [["MaskedEmail/set", {"destroyed": [{"id": "m1"}]}, "0"]]
        })),
    )
    .await;

    client_for(&server)
        .delete_masked_emails(["m1"], &CancellationToken::new())
        .await
        .expect("delete");
}

#[tokio::test]
async fn delete_still_surfaces_method_errors() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [["error", {"type": "forbidden"}, "0"]]
        })),
    )
    .await;

    let err = client_for(&server)
        .delete_masked_emails(["m1"], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, FastmailError::Method { kind, .. } if kind == "forbidden"),
        "{err:?}"
    );
}

#[tokio::test]
async fn delete_with_no_ids_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_masked_emails(Vec::<String>::new(), &CancellationToken::new())
        .await
        .expect("delete");
}

#[tokio::test]
async fn cancelled_operation_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(created_response()))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client_for(&server)
        .create_masked_email(MaskedEmail::for_domain("example.com"), true, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, FastmailError::Cancelled), "{err:?}");
}

fn fastmask(server: &MockServer, cfg_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fastmask"));
    cmd.env("FASTMASK_CONFIG_PATH", cfg_dir.path().join("config.json"))
        .env("FASTMASK_API_URL", api_url(server))
        .env("FASTMASK_ACCOUNT_ID", "acct-1")
        .env("FASTMASK_ACCESS_TOKEN", "tok-1");
    cmd
}

#[tokio::test]
async fn cli_create_prints_created_masked_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("\"state\":\"disabled\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(created_response()))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().expect("tmp");
    let output = fastmask(&server, &tmp)
        .args(["create", "example.com", "-d", "newsletters", "--disabled"])
        .output()
        .expect("run");

    assert!(
        output.status.success(),
        "fastmask failed. status={:?}\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let v: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v.get("command").and_then(|v| v.as_str()), Some("create"));
    assert_eq!(
        v.pointer("/data/email").and_then(|v| v.as_str()),
        Some("fun.times1234@fastmail.com")
    );
}

#[tokio::test]
async fn cli_delete_with_no_confirm_destroys_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("\"destroy\":[\"m1\",\"m2\"]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessionState": "s1",
            "methodResponses": [["MaskedEmail/set", {"destroyed": ["m1", "m2"]}, "0"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().expect("tmp");
    let output = fastmask(&server, &tmp)
        .args(["delete", "m1", "m2", "-y"])
        .output()
        .expect("run");

    assert!(output.status.success());
    let v: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(v.pointer("/data/deleted"), Some(&json!(["m1", "m2"])));
}

#[tokio::test]
async fn cli_unauthorized_suggests_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().expect("tmp");
    let output = fastmask(&server, &tmp)
        .args(["create", "example.com"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let v: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(
        v.pointer("/error/kind").and_then(|v| v.as_str()),
        Some("unauthorized")
    );
    assert!(
        v.pointer("/error/message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .contains("fastmask login")
    );
}
