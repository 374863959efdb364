//! HTTP response handling against a one-shot local server.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tarpit::providers::openai::OpenAiProvider;
use tarpit::providers::{
    check_http_response, sanitize_http_error_body, CompletionRequest, LlmProvider, Message,
    ProviderError,
};

/// Serve exactly one HTTP response and return the base URL.
async fn serve_once(status_line: &str, content_type: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr");

    let status_line = status_line.to_owned();
    let content_type = content_type.to_owned();
    let body = body.to_owned();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut read_buf = [0_u8; 4096];
            let _ = socket.read(&mut read_buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn error_status_body_is_redacted() {
    let token = "gsk_abcdefghijklmnopqrstuvwxyz123456";
    let url = serve_once(
        "401 Unauthorized",
        "text/plain",
        &format!("invalid key {token}"),
    )
    .await;

    let response = reqwest::get(url).await.expect("request should complete");
    let err = check_http_response(response)
        .await
        .expect_err("non-success status should fail");

    match err {
        ProviderError::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(!body.contains(token));
            assert!(body.contains("[REDACTED]"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn long_bodies_are_truncated() {
    let body = "x".repeat(1000);
    let sanitized = sanitize_http_error_body(&body);
    assert!(sanitized.ends_with("...[truncated]"));
    assert!(sanitized.len() < 300);
}

#[tokio::test]
async fn openai_compatible_provider_end_to_end() {
    let body = r#"{"model":"llama-3.1-8b-instant","choices":[{"message":{"role":"assistant","content":"Which bank?"}}],"usage":{"prompt_tokens":50,"completion_tokens":3}}"#;
    let base = serve_once("200 OK", "application/json", body).await;

    let provider = OpenAiProvider::new(
        "groq/llama-3.1-8b-instant".to_owned(),
        "llama-3.1-8b-instant".to_owned(),
        format!("{base}/openai/v1/chat/completions"),
        "test-key".to_owned(),
    );
    let response = provider
        .complete(CompletionRequest {
            messages: vec![Message::user("hello")],
            system: None,
            max_tokens: Some(200),
            temperature: Some(0.7),
        })
        .await
        .expect("completion");

    assert_eq!(response.text, "Which bank?");
    assert_eq!(response.usage.output_tokens, 3);
    assert_eq!(provider.model_id(), "groq/llama-3.1-8b-instant");
}
