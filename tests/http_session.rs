use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::runtime::Runtime;
use vk_session::{
    CaptchaChallenge, MethodRequest, Namespace, ReqwestTransport, Session, SessionError,
    TransportError,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "integration-token-0001";

struct WithoutToken;

impl Match for WithoutToken {
    fn matches(&self, request: &Request) -> bool {
        !String::from_utf8_lossy(&request.body).contains("access_token=")
    }
}

fn start_server(runtime: &Runtime) -> MockServer {
    runtime.block_on(MockServer::start())
}

fn session_for(server: &MockServer) -> vk_session::SessionBuilder {
    Session::builder()
        .with_api_url(format!("{}/method", server.uri()))
        .with_access_token(TOKEN)
        .with_timeout(Duration::from_secs(5))
}

fn received_bodies(runtime: &Runtime, server: &MockServer) -> Vec<String> {
    runtime
        .block_on(server.received_requests())
        .unwrap_or_default()
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

#[test]
fn posts_form_encoded_call_and_returns_payload() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/method/users.get"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("user_ids=1%2C2"))
            .and(body_string_contains("extended=1"))
            .and(body_string_contains("v=5.53"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"response":[{"id":1,"first_name":"Pavel"}]}"#),
            )
            .expect(1)
            .mount(&server),
    );

    let mut session = session_for(&server).build().unwrap();
    let request = Namespace::new("users")
        .method("get")
        .param("user_ids", vec![1, 2])
        .param("extended", true)
        .param("fields", serde_json::Value::Null)
        .build();

    let payload = session.execute(&request).unwrap();

    assert_eq!(payload, json!([{"id": 1, "first_name": "Pavel"}]));
    let bodies = received_bodies(&runtime, &server);
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains(&format!("access_token={TOKEN}")));
    assert!(!bodies[0].contains("fields="));
}

#[test]
fn resolves_captcha_and_retries() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(async {
        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .and(body_string_contains("captcha_sid=548747100691"))
            .and(body_string_contains("captcha_key=xk7q"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"response":{"post_id":7}}"#))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"error":{"error_code":14,"error_msg":"Captcha needed","captcha_sid":"548747100691","captcha_img":"https://api.vk.com/captcha.php?sid=548747100691"}}"#,
            ))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;
    });

    let solver = |challenge: &CaptchaChallenge| {
        assert_eq!(challenge.sid, "548747100691");
        Some("xk7q".to_string())
    };
    let mut session = session_for(&server)
        .with_captcha_solver(Arc::new(solver))
        .build()
        .unwrap();

    let payload = session
        .execute(&MethodRequest::from_parts("wall", "post", [("message", "hello")]))
        .unwrap();

    assert_eq!(payload, json!({"post_id": 7}));
    assert_eq!(received_bodies(&runtime, &server).len(), 2);
}

#[test]
fn drops_rejected_token_before_retrying() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(async {
        Mock::given(method("POST"))
            .and(path("/method/account.getInfo"))
            .and(WithoutToken)
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"response":{"lang":0}}"#))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/method/account.getInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"error":{"error_code":5,"error_msg":"User authorization failed: invalid access_token (4)."}}"#,
            ))
            .with_priority(2)
            .mount(&server)
            .await;
    });

    let mut session = session_for(&server).build().unwrap();
    let payload = session.execute(&MethodRequest::new("account.getInfo")).unwrap();

    assert_eq!(payload, json!({"lang": 0}));
    assert!(session.credentials().peek().is_empty());
    let bodies = received_bodies(&runtime, &server);
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].contains("access_token="));
    assert!(!bodies[1].contains("access_token="));
}

#[test]
fn concatenated_error_and_response_is_an_error() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"error":{"error_code":100,"error_msg":"invalid parameter"}}{"response":5}"#,
            ))
            .expect(1)
            .mount(&server),
    );

    let mut session = session_for(&server).build().unwrap();
    let err = session.execute(&MethodRequest::new("users.get")).unwrap_err();

    let api_error = err.api_error().expect("remote error");
    assert_eq!(api_error.code(), 100);
    assert_eq!(api_error.message(), "invalid parameter");
}

#[test]
fn http_failure_is_not_retried() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server),
    );

    let mut session = session_for(&server).build().unwrap();
    let err = session.execute(&MethodRequest::new("users.get")).unwrap_err();

    assert!(matches!(
        err,
        SessionError::Transport(TransportError::Status { status: 503, .. })
    ));
}

#[test]
fn slow_response_hits_timeout() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"response":1}"#)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server),
    );

    let mut session = session_for(&server)
        .with_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = session.execute(&MethodRequest::new("users.get")).unwrap_err();

    assert!(matches!(err, SessionError::Transport(TransportError::Network(_))));
}

#[test]
fn custom_reqwest_client_is_used() {
    let runtime = Runtime::new().unwrap();
    let server = start_server(&runtime);
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/method/status.get"))
            .and(header("user-agent", "vk-session-tests/1.0"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"response":{"text":"ok"}}"#))
            .expect(1)
            .mount(&server),
    );

    let client = reqwest::blocking::Client::builder()
        .user_agent("vk-session-tests/1.0")
        .build()
        .unwrap();
    let mut session = session_for(&server)
        .with_transport(Arc::new(ReqwestTransport::from_client(client)))
        .build()
        .unwrap();

    let payload = session.execute(&MethodRequest::new("status.get")).unwrap();
    assert_eq!(payload, json!({"text": "ok"}));
}
