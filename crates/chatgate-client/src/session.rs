//! One chat session: single-flight submit, placeholder lifecycle, and
//! incremental rendering of the streamed answer.

use chatgate_models::{ChatRequest, ErrorBody};
use futures::StreamExt;
use thiserror::Error;

use crate::decode::StreamDecoder;
use crate::transcript::Transcript;

/// Shown when an error response does not carry the `{ "error": ... }` shape.
const GENERIC_ERROR: &str = "Something went wrong.";

/// Failure surfaced by [`ChatSession::ask`]; its display string is what the
/// caller puts in the error banner.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The server rejected the question (quota, validation or upstream).
    #[error("{0}")]
    Server(String),

    /// The request never completed: connection failure, or an error status
    /// whose body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The answer stream broke after bytes had already arrived. Whatever
    /// was accumulated so far is discarded along with the in-progress turn.
    #[error("answer stream failed: {0}")]
    Stream(#[source] reqwest::Error),
}

/// Outcome of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The question was sent and the answer fully streamed.
    Completed,
    /// Nothing was sent: empty question, or another ask was in flight.
    Ignored,
}

/// A single client session against a chatgate server.
///
/// Holds the transcript, a single-flight guard and the last error. One ask
/// at a time; a failed ask leaves only the user's question behind.
pub struct ChatSession {
    client: reqwest::Client,
    base_url: String,
    transcript: Transcript,
    loading: bool,
    last_error: Option<String>,
}

impl ChatSession {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            transcript: Transcript::new(),
            loading: false,
            last_error: None,
        }
    }

    /// Seeds the transcript with an opening bot turn, shown before any user
    /// input. It is an ordinary turn: never rewritten, never removed.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.transcript.push_bot(greeting);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message for the error banner, if the last ask failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Submits one question and streams the answer into the transcript.
    pub async fn ask(&mut self, question: &str) -> Result<Submission, SessionError> {
        self.ask_with(question, |_| {}).await
    }

    /// Like [`ask`](Self::ask), invoking `progress` with the accumulated
    /// answer after every decoded chunk.
    pub async fn ask_with(
        &mut self,
        question: &str,
        mut progress: impl FnMut(&str),
    ) -> Result<Submission, SessionError> {
        if question.trim().is_empty() || self.loading {
            return Ok(Submission::Ignored);
        }

        self.transcript.push_user(question);
        self.transcript.push_placeholder();
        self.last_error = None;
        self.loading = true;

        let result = self.stream_answer(question, &mut progress).await;
        // Loading clears on every exit path.
        self.loading = false;

        match result {
            Ok(()) => Ok(Submission::Completed),
            Err(err) => {
                tracing::debug!(error = %err, "ask failed, dropping placeholder");
                self.transcript.drop_trailing_bot();
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn stream_answer(
        &mut self,
        question: &str,
        progress: &mut impl FnMut(&str),
    ) -> Result<(), SessionError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest {
                query: question.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => GENERIC_ERROR.to_string(),
            };
            return Err(SessionError::Server(message));
        }

        let mut chunks = response.bytes_stream();
        let mut decoder = StreamDecoder::new();
        let mut answer = String::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(SessionError::Stream)?;
            answer.push_str(&decoder.decode(&chunk));
            self.transcript.rewrite_last(&answer);
            progress(&answer);
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            answer.push_str(&tail);
            self.transcript.rewrite_last(&answer);
            progress(&answer);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::PLACEHOLDER;
    use async_stream::stream;
    use axum::Router;
    use axum::body::{Body, Bytes};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use chatgate_models::Role;
    use std::convert::Infallible;
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn chunked(parts: &'static [&'static [u8]]) -> Router {
        Router::new().route(
            "/api/chat",
            post(move || async move {
                let body = stream! {
                    for part in parts.iter().copied() {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        yield Ok::<_, Infallible>(Bytes::from_static(part));
                    }
                };
                Body::from_stream(body)
            }),
        )
    }

    /// Answers with one good chunk, then breaks the body mid-stream.
    fn broken_mid_stream() -> Router {
        Router::new().route(
            "/api/chat",
            post(|| async {
                let body = stream! {
                    yield Ok::<_, std::io::Error>(Bytes::from_static(b"Go, Rust"));
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    yield Err(std::io::Error::other("upstream hung up"));
                };
                Body::from_stream(body)
            }),
        )
    }

    fn erroring(status: StatusCode, body: &'static str) -> Router {
        Router::new().route(
            "/api/chat",
            post(move || async move { (status, body).into_response() }),
        )
    }

    #[tokio::test]
    async fn answer_grows_in_place_and_completes() {
        let url = serve(chunked(&[b"Go", b", Rust", b", TypeScript"])).await;
        let mut session = ChatSession::new(url);

        let mut states = Vec::new();
        let outcome = session
            .ask_with("What languages do you know?", |answer| {
                states.push(answer.to_string())
            })
            .await
            .unwrap();

        assert_eq!(outcome, Submission::Completed);
        assert_eq!(states, vec!["Go", "Go, Rust", "Go, Rust, TypeScript"]);

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "What languages do you know?");
        assert_eq!(turns[1].role, Role::Bot);
        assert_eq!(turns[1].content, "Go, Rust, TypeScript");
        assert!(!session.is_loading());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn code_point_split_across_relay_chunks_survives() {
        // "café" with 'é' split between the two chunks.
        let url = serve(chunked(&[&[0x63, 0x61, 0x66, 0xC3], &[0xA9]])).await;
        let mut session = ChatSession::new(url);

        session.ask("question").await.unwrap();
        assert_eq!(session.transcript().last().unwrap().content, "café");
    }

    #[tokio::test]
    async fn midstream_failure_discards_the_partial_answer() {
        let url = serve(broken_mid_stream()).await;
        let mut session = ChatSession::new(url);

        let mut states = Vec::new();
        let err = session
            .ask_with("hello", |answer| states.push(answer.to_string()))
            .await
            .unwrap_err();

        // The partial answer was visible while streaming...
        assert_eq!(states, vec!["Go, Rust"]);
        assert!(matches!(err, SessionError::Stream(_)));
        assert!(err.to_string().contains("answer stream failed"));

        // ...but a truncated turn leaves no trace beyond the question.
        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert!(session.last_error().is_some());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn greeting_opens_the_transcript_and_survives_failures() {
        let mut session =
            ChatSession::new("http://127.0.0.1:1").with_greeting("Hi, how can I help?");

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Bot);

        // A failed ask drops its own placeholder, never the greeting.
        session.ask("hello").await.unwrap_err();
        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "Hi, how can I help?");
        assert_eq!(turns[1].role, Role::User);
    }

    #[tokio::test]
    async fn server_error_removes_the_placeholder() {
        let url = serve(erroring(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":"You have reached the limit of 50 messages. Email chat@example.com."}"#,
        ))
        .await;
        let mut session = ChatSession::new(url);

        let err = session.ask("hello").await.unwrap_err();
        assert!(err.to_string().contains("limit of 50 messages"));

        // Only the user's question remains; no placeholder, banner set.
        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert!(session.last_error().unwrap().contains("Email"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn malformed_error_body_falls_back_to_generic_message() {
        let url = serve(erroring(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;
        let mut session = ChatSession::new(url);

        let err = session.ask("hello").await.unwrap_err();
        assert_eq!(err.to_string(), GENERIC_ERROR);
    }

    #[tokio::test]
    async fn failed_ask_leaves_earlier_turns_untouched() {
        let good = serve(chunked(&[b"fine"])).await;
        let mut session = ChatSession::new(good);
        session.ask("first").await.unwrap();

        // Point the next ask at a dead endpoint by swapping the base url.
        session.base_url = "http://127.0.0.1:1".to_string();
        session.ask("second").await.unwrap_err();

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].content, "fine");
        assert_eq!(turns[2].content, "second");
    }

    #[tokio::test]
    async fn same_question_twice_yields_two_independent_turn_pairs() {
        let url = serve(chunked(&[b"answer"])).await;
        let mut session = ChatSession::new(url);

        session.ask("repeat me").await.unwrap();
        session.ask("repeat me").await.unwrap();

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, turns[2].content);
        assert_eq!(turns[1].content, turns[3].content);
    }

    #[tokio::test]
    async fn empty_question_is_ignored_without_a_trace() {
        let url = serve(chunked(&[b"never"])).await;
        let mut session = ChatSession::new(url);

        assert_eq!(session.ask("").await.unwrap(), Submission::Ignored);
        assert_eq!(session.ask("   ").await.unwrap(), Submission::Ignored);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn ask_is_ignored_while_another_is_in_flight() {
        let url = serve(chunked(&[b"slow"])).await;
        let mut session = ChatSession::new(url);
        session.loading = true;

        assert_eq!(session.ask("queued?").await.unwrap(), Submission::Ignored);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn first_progress_state_replaces_the_placeholder() {
        let url = serve(chunked(&[b"Go"])).await;
        let mut session = ChatSession::new(url);

        let mut states = Vec::new();
        session
            .ask_with("q", |answer| states.push(answer.to_string()))
            .await
            .unwrap();

        assert_eq!(states, vec!["Go"]);
        assert_ne!(session.transcript().last().unwrap().content, PLACEHOLDER);
    }
}
