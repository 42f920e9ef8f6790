use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use keno_core::{FailureReason, Notification, Phase, RunSnapshot};
use keno_engine::{
    BodyStream, ExportFormat, FailureKind, FetchError, JobClient, ReqwestJobClient, RunAccumulator,
    RunError, RunObserver, TriggerSettings,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    keno_logging::initialize_for_tests();
}

fn result_line(draw_number: u64, progress: u32) -> String {
    format!(
        "data: {{\"progress\": {progress}, \"result\": {{\"drawNumber\": {draw_number}, \"date\": \"28.10.2025\", \"numbers\": [1, 2, 3]}}}}\n\n"
    )
}

/// Serves a fixed sequence of chunks, optionally followed by a body that never ends.
struct ScriptedClient {
    chunks: Vec<Result<Bytes, FetchError>>,
    hang_after: bool,
}

impl ScriptedClient {
    fn new(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks
                .into_iter()
                .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                .collect(),
            hang_after: false,
        }
    }

    fn hanging(mut self) -> Self {
        self.hang_after = true;
        self
    }

    fn then_fail(mut self) -> Self {
        self.chunks.push(Err(FetchError::new(
            FailureKind::Network,
            "connection reset",
        )));
        self
    }
}

#[async_trait::async_trait]
impl JobClient for ScriptedClient {
    async fn trigger(&self) -> Result<BodyStream, FetchError> {
        let chunks = stream::iter(self.chunks.clone());
        if self.hang_after {
            Ok(Box::pin(chunks.chain(stream::pending())))
        } else {
            Ok(Box::pin(chunks))
        }
    }
}

struct RejectingClient;

#[async_trait::async_trait]
impl JobClient for RejectingClient {
    async fn trigger(&self) -> Result<BodyStream, FetchError> {
        Err(FetchError::new(FailureKind::HttpStatus(502), "502 Bad Gateway"))
    }
}

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<RunSnapshot>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RunObserver for Recorder {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn on_notification(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(*notification);
    }
}

async fn wait_for(accumulator: &RunAccumulator, done: impl Fn(&RunSnapshot) -> bool) {
    for _ in 0..200 {
        if done(&accumulator.current_state()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn completed_run_accumulates_results_in_order() {
    init_logging();
    let first = result_line(3_147_000, 50);
    let second = result_line(3_146_999, 100);
    // Boundaries deliberately cut through lines.
    let body = format!("{first}{second}data: {{\"complete\": true, \"total\": 2}}\n\n");
    let (a, rest) = body.split_at(17);
    let (b, c) = rest.split_at(first.len());
    let client = ScriptedClient::new(vec![a, b, c]);

    let recorder = Arc::new(Recorder::default());
    let accumulator = RunAccumulator::new(Arc::new(client)).with_observer(recorder.clone());

    let snapshot = accumulator.start(CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.reported_total, Some(2));
    let numbers: Vec<_> = snapshot.results.iter().map(|r| r.draw_number).collect();
    assert_eq!(numbers, vec![3_147_000, 3_146_999]);
    assert_eq!(accumulator.current_state(), snapshot);

    assert_eq!(
        *recorder.notifications.lock().unwrap(),
        vec![Notification::Completed {
            total: Some(2),
            received: 2,
        }]
    );

    // Results only ever grow while the run is observed.
    let snapshots = recorder.snapshots.lock().unwrap();
    assert_eq!(snapshots.first().unwrap().phase, Phase::Running);
    assert!(snapshots
        .windows(2)
        .all(|w| w[0].results.len() <= w[1].results.len()));
}

#[tokio::test]
async fn rejected_trigger_fails_run_with_empty_results() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let accumulator =
        RunAccumulator::new(Arc::new(RejectingClient)).with_observer(recorder.clone());

    let err = accumulator.start(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Request(FetchError {
            kind: FailureKind::HttpStatus(502),
            ..
        })
    ));
    let state = accumulator.current_state();
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureReason::Request));
    assert!(state.results.is_empty());
    assert_eq!(
        *recorder.notifications.lock().unwrap(),
        vec![Notification::Failed {
            reason: FailureReason::Request
        }]
    );
}

#[tokio::test]
async fn transport_error_keeps_partial_results() {
    init_logging();
    let line = result_line(1, 10);
    let client = ScriptedClient::new(vec![line.as_str()]).then_fail();
    let accumulator = RunAccumulator::new(Arc::new(client));

    let err = accumulator.start(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, RunError::Transport(_)));
    let state = accumulator.current_state();
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureReason::Transport));
    assert_eq!(state.results.len(), 1);
}

#[tokio::test]
async fn stream_closed_without_completion_is_incomplete() {
    init_logging();
    let line = result_line(1, 10);
    // Last line has no terminating newline and is flushed at end of input.
    let client = ScriptedClient::new(vec![line.as_str(), "data: {\"progress\": 20}"]);
    let recorder = Arc::new(Recorder::default());
    let accumulator = RunAccumulator::new(Arc::new(client)).with_observer(recorder.clone());

    let snapshot = accumulator.start(CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Failed);
    assert_eq!(snapshot.failure, Some(FailureReason::Incomplete));
    assert_eq!(snapshot.progress, 20);
    assert_eq!(snapshot.results.len(), 1);
    assert!(recorder.notifications.lock().unwrap().is_empty());
    assert_eq!(
        recorder.snapshots.lock().unwrap().last().map(|s| s.phase),
        Some(Phase::Failed)
    );
}

#[tokio::test]
async fn malformed_lines_do_not_change_state() {
    init_logging();
    let client = ScriptedClient::new(vec![
        "data: {\"progress\": 30}\n",
        "data: {\"result\": oops}\n",
        "data: {\"complete\": true, \"total\": 0}\n",
    ]);
    let accumulator = RunAccumulator::new(Arc::new(client));

    let snapshot = accumulator.start(CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.progress, 30);
    assert!(snapshot.results.is_empty());
}

#[tokio::test]
async fn events_after_complete_are_ignored() {
    init_logging();
    let late = result_line(2, 100);
    let body = format!(
        "{}data: {{\"complete\": true, \"total\": 1}}\n{late}",
        result_line(1, 50)
    );
    let client = ScriptedClient::new(vec![body.as_str(), late.as_str()]);
    let accumulator = RunAccumulator::new(Arc::new(client));

    let snapshot = accumulator.start(CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.progress, 50);
    assert_eq!(snapshot.results.len(), 1);
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    init_logging();
    let line = result_line(1, 10);
    let client = ScriptedClient::new(vec![line.as_str()]).hanging();
    let accumulator = Arc::new(RunAccumulator::new(Arc::new(client)));
    let token = CancellationToken::new();

    let running = {
        let accumulator = accumulator.clone();
        let token = token.clone();
        tokio::spawn(async move { accumulator.start(token).await })
    };
    wait_for(&accumulator, |s| s.results.len() == 1).await;

    let err = accumulator.start(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, RunError::AlreadyRunning);
    assert_eq!(accumulator.current_state().phase, Phase::Running);

    token.cancel();
    let outcome = running.await.unwrap();
    assert_eq!(outcome.unwrap_err(), RunError::Cancelled);
    let state = accumulator.current_state();
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureReason::Cancelled));
    assert_eq!(state.results.len(), 1);
}

#[tokio::test]
async fn export_is_allowed_mid_run() {
    init_logging();
    let first = result_line(11, 10);
    let second = result_line(12, 20);
    let client = ScriptedClient::new(vec![first.as_str(), second.as_str()]).hanging();
    let accumulator = Arc::new(RunAccumulator::new(Arc::new(client)));
    let token = CancellationToken::new();

    let running = {
        let accumulator = accumulator.clone();
        let token = token.clone();
        tokio::spawn(async move { accumulator.start(token).await })
    };
    wait_for(&accumulator, |s| s.results.len() == 2).await;

    assert!(accumulator.current_state().is_loading());
    let csv = accumulator.export(ExportFormat::Csv).unwrap();
    assert_eq!(
        csv,
        "Тираж,Дата,Числа\n11,28.10.2025,1 2 3\n12,28.10.2025,1 2 3"
    );

    token.cancel();
    let _ = running.await.unwrap();
}

#[tokio::test]
async fn cancelled_before_trigger_never_runs() {
    init_logging();
    let accumulator = RunAccumulator::new(Arc::new(ScriptedClient::new(vec![])));
    let token = CancellationToken::new();
    token.cancel();

    let err = accumulator.start(token).await.unwrap_err();

    assert_eq!(err, RunError::Cancelled);
    assert_eq!(
        accumulator.current_state().failure,
        Some(FailureReason::Cancelled)
    );
}

#[tokio::test]
async fn dropped_run_is_finalized_as_cancelled() {
    init_logging();
    let line = result_line(1, 10);
    let client = ScriptedClient::new(vec![line.as_str()]).hanging();
    let recorder = Arc::new(Recorder::default());
    let accumulator = RunAccumulator::new(Arc::new(client)).with_observer(recorder.clone());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), accumulator.start(CancellationToken::new()))
            .await;
    assert!(abandoned.is_err());

    let state = accumulator.current_state();
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureReason::Cancelled));
    assert_eq!(state.results.len(), 1);
    assert_eq!(recorder.notifications.lock().unwrap().len(), 1);

    // A new run may start once the abandoned one is finalized.
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(
        accumulator.start(token).await.unwrap_err(),
        RunError::Cancelled
    );
}

#[tokio::test]
async fn end_to_end_over_http() {
    init_logging();
    let server = MockServer::start().await;
    let mut body = String::new();
    for i in 0..5u32 {
        body.push_str(&result_line(3_147_000 - u64::from(i), (i + 1) * 20));
    }
    body.push_str("data: {\"complete\": true, \"total\": 5}\n\n");
    Mock::given(method("POST"))
        .and(path("/parse-keno"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = ReqwestJobClient::new(TriggerSettings {
        endpoint: format!("{}/parse-keno", server.uri()),
        ..TriggerSettings::default()
    })
    .unwrap();
    let accumulator = RunAccumulator::new(Arc::new(client));

    let snapshot = accumulator.start(CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.results.len(), 5);
    assert_eq!(snapshot.results[4].draw_number, 3_146_996);
}

#[tokio::test]
async fn server_error_over_http_fails_run() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ReqwestJobClient::new(TriggerSettings {
        endpoint: server.uri(),
        ..TriggerSettings::default()
    })
    .unwrap();
    let accumulator = RunAccumulator::new(Arc::new(client));

    let err = accumulator.start(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, RunError::Request(_)));
    assert_eq!(accumulator.current_state().phase, Phase::Failed);
    assert!(accumulator.current_state().results.is_empty());
}
