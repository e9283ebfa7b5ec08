use std::sync::{Arc, Mutex};
use std::time::Duration;

use a2a_chat::ChatClientBuilder;
use a2a_chat::core::TurnOutcome;
use a2a_chat::http::HttpConfigBuilder;
use a2a_chat::model::{FinishReason, Message, MessageStatus, Role};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Reads one request and returns its body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0; 1024];
    let head_len = loop {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before the request ended");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..head_len]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while raw.len() < head_len + body_len {
        let n = stream.read(&mut buf).await.unwrap();
        raw.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&raw[head_len..]).into_owned()
}

/// A backend that streams every reply in small chunks, with a pause
/// between them. Request bodies are forwarded to the returned channel.
async fn spawn_backend(
    replies: Vec<Vec<&'static str>>,
    pause: Duration,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (body_tx, body_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for chunks in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            body_tx.send(read_request(&mut stream).await).ok();
            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: text/event-stream\r\n\
                        Connection: close\r\n\r\n";
            if stream.write_all(head.as_bytes()).await.is_err() {
                continue;
            }
            for chunk in chunks {
                sleep(pause).await;
                if stream.write_all(chunk.as_bytes()).await.is_err() {
                    // The client went away.
                    break;
                }
            }
            stream.shutdown().await.ok();
        }
    });
    (format!("http://{addr}/a2a/messages"), body_rx)
}

#[tokio::test]
async fn test_streamed_conversation() {
    let (endpoint, mut bodies) = spawn_backend(
        vec![
            vec!["data: Hel\n\n", "data: lo\n\n", "data: [DONE]\n\n"],
            vec!["data: Fine, ", "thanks\n\ndata: [DONE]\n\n"],
        ],
        Duration::from_millis(5),
    )
    .await;

    let updates = Arc::new(Mutex::new(Vec::new()));
    let client = ChatClientBuilder::with_config(
        HttpConfigBuilder::new().with_endpoint(endpoint).build(),
    )
    .on_update({
        let updates = Arc::clone(&updates);
        move |msgs: &[Message]| {
            if let Some(tail) = msgs.last() {
                updates.lock().unwrap().push(tail.text());
            }
        }
    })
    .build();

    let outcome = client.submit("Hi").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed("Hello".to_owned()));
    assert_eq!(
        bodies.recv().await.unwrap(),
        r#"{"messages":[{"role":"user","content":"Hi"}]}"#
    );
    assert_eq!(*updates.lock().unwrap(), ["Hi", "", "Hel", "Hello", "Hello"]);

    let outcome = client.submit("How are you?").await.unwrap();
    assert_eq!(outcome.text(), "Fine, thanks");
    assert_eq!(
        bodies.recv().await.unwrap(),
        concat!(
            r#"{"messages":[{"role":"user","content":"Hi"},"#,
            r#"{"role":"assistant","content":"Hello"},"#,
            r#"{"role":"user","content":"How are you?"}]}"#
        )
    );

    let msgs = client.messages();
    assert_eq!(msgs.len(), 4);
    assert_eq!(msgs[3].role, Role::Assistant);
    assert_eq!(
        msgs[3].status,
        MessageStatus::Complete {
            reason: FinishReason::Stop
        }
    );
}

#[tokio::test]
async fn test_conversation_id_sends_latest_only() {
    let (endpoint, mut bodies) = spawn_backend(
        vec![vec!["data: one\n\n"], vec!["data: two\n\n"]],
        Duration::from_millis(1),
    )
    .await;
    let client = ChatClientBuilder::with_config(
        HttpConfigBuilder::new()
            .with_endpoint(endpoint)
            .with_conversation_id("abc")
            .build(),
    )
    .build();

    client.submit("first").await.unwrap();
    client.submit("second").await.unwrap();
    bodies.recv().await.unwrap();
    assert_eq!(
        bodies.recv().await.unwrap(),
        r#"{"messages":[{"role":"user","content":"second"}]}"#
    );
}

#[tokio::test]
async fn test_cancel_releases_the_stream() {
    let (endpoint, _bodies) = spawn_backend(
        vec![vec![
            "data: one\n\n",
            "data: two\n\n",
            "data: three\n\n",
            "data: four\n\n",
            "data: [DONE]\n\n",
        ]],
        Duration::from_millis(50),
    )
    .await;
    let client = ChatClientBuilder::with_config(
        HttpConfigBuilder::new().with_endpoint(endpoint).build(),
    )
    .build();

    let mut snapshot_rx = client.subscribe();
    let turn = client.submit("Count");
    snapshot_rx
        .wait_for(|msgs| msgs.last().is_some_and(|m| m.text() == "one"))
        .await
        .unwrap();
    client.cancel();

    let outcome = turn.await.unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled("one".to_owned()));

    sleep(Duration::from_millis(200)).await;
    let msgs = client.messages();
    let tail = msgs.last().unwrap();
    assert_eq!(tail.status, MessageStatus::Cancelled);
    assert_eq!(tail.text(), "one");
}

#[tokio::test]
async fn test_reset_without_conversation_id() {
    let client = ChatClientBuilder::with_config(
        HttpConfigBuilder::new()
            .with_endpoint("http://127.0.0.1:9/a2a/messages")
            .build(),
    )
    .build();
    assert!(!client.reset_conversation().await.unwrap());
}
