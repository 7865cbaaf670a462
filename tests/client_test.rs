use celebchat::{ChatBackend, ChatError, ChatRequest, Config, HttpChatClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(celebrity: &str, message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        session_id: "7f1c0c2e-0000-4000-8000-000000000000".to_string(),
        celebrity_name: celebrity.to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_posts_request_and_returns_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({
            "message": "Hello",
            "sessionId": "7f1c0c2e-0000-4000-8000-000000000000",
            "celebrityName": "Tom Hanks",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Hi there!" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&Config::new(server.uri()));
    let reply = client.chat(&request("Tom Hanks", "Hello")).await.unwrap();
    assert_eq!(reply, "Hi there!");
}

#[test_log::test(tokio::test)]
async fn test_base_url_with_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&Config::new(format!("{}/api/", server.uri())));
    assert_eq!(client.chat(&request("Tom Hanks", "Hi")).await.unwrap(), "ok");
}

#[test_log::test(tokio::test)]
async fn test_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model unavailable"))
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&Config::new(server.uri()));
    let err = client.chat(&request("Tom Hanks", "Hello")).await.unwrap_err();
    match err {
        ChatError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "model unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_missing_reply_field_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "wrong key" })))
        .mount(&server)
        .await;

    let client = HttpChatClient::new(&Config::new(server.uri()));
    let err = client.chat(&request("Tom Hanks", "Hello")).await.unwrap_err();
    assert!(matches!(err, ChatError::MalformedBody(_)), "got {err:?}");
}

#[test_log::test(tokio::test)]
async fn test_unreachable_backend_is_network_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    // The listener is dropped; its port refuses connections.
    let client = HttpChatClient::new(&Config::new(format!("http://{addr}")));
    let err = client.chat(&request("Tom Hanks", "Hello")).await.unwrap_err();
    assert!(matches!(err, ChatError::Network(_)), "got {err:?}");
}
