//! End-to-end orchestrator tests over a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use uplink_client::{
    FilePayload, ProgressSink, Transport, UploadSession, UploadStatus, Uploader,
};
use uplink_core::{UploadError, UploadResult};

type CallScript = Box<dyn Fn(&str, &Value) -> UploadResult<Value> + Send + Sync>;

/// Scripted [`Transport`]: `on_call` answers the protocol calls, and PUTs
/// against URLs containing `fail_puts_containing` fail with a transfer
/// error. `blocking_puts` parks every PUT until its cancellation token
/// fires. Every call and PUT is recorded.
struct MockTransport {
    on_call: CallScript,
    fail_puts_containing: Option<String>,
    block_puts: bool,
    calls: Mutex<Vec<(String, Value)>>,
    puts: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(on_call: CallScript) -> Self {
        Self {
            on_call,
            fail_puts_containing: None,
            block_puts: false,
            calls: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
        }
    }

    fn failing_puts(mut self, fragment: &str) -> Self {
        self.fail_puts_containing = Some(fragment.to_string());
        self
    }

    fn blocking_puts(mut self) -> Self {
        self.block_puts = true;
        self
    }

    fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(
        &self,
        _endpoint: &str,
        _route: &str,
        action: &str,
        body: Value,
    ) -> UploadResult<Value> {
        self.calls.lock().push((action.to_string(), body.clone()));
        (self.on_call)(action, &body)
    }

    async fn put_signed(
        &self,
        url: &str,
        _content_type: &str,
        content: Bytes,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> UploadResult<()> {
        self.puts.lock().push(url.to_string());
        if self.block_puts {
            cancel.cancelled().await;
            return Err(UploadError::transfer("transfer canceled"));
        }
        if let Some(fragment) = &self.fail_puts_containing {
            if url.contains(fragment) {
                return Err(UploadError::transfer("simulated storage outage"));
            }
        }
        let total = content.len() as u64;
        progress(total / 2, total);
        progress(total, total);
        Ok(())
    }
}

/// Answers authorize with one grant per file and complete with one
/// confirmed URL per entry, deriving keys from file names.
fn granting_script() -> CallScript {
    Box::new(|action, body| match action {
        "authorize" => {
            let files = body["files"].as_array().cloned().unwrap_or_default();
            let results: Vec<Value> = files
                .iter()
                .map(|f| {
                    let name = f["name"].as_str().unwrap_or_default();
                    json!({
                        "success": true,
                        "signedUrl": format!("https://storage.test/put/{name}"),
                        "objectKey": format!("photos/{name}"),
                        "metadata": {"userId": "u1"},
                    })
                })
                .collect();
            Ok(json!({ "results": results }))
        }
        "complete" => {
            let entries = body["completions"].as_array().cloned().unwrap_or_default();
            let results: Vec<Value> = entries
                .iter()
                .map(|e| {
                    let key = e["objectKey"].as_str().unwrap_or_default();
                    json!({
                        "success": true,
                        "url": format!("https://cdn.test/{key}"),
                        "objectKey": key,
                    })
                })
                .collect();
            Ok(json!({ "results": results }))
        }
        other => Err(UploadError::protocol(format!("unexpected action {other}"))),
    })
}

fn payloads(names: &[&str]) -> Vec<FilePayload> {
    names
        .iter()
        .map(|n| FilePayload::new(*n, "image/png", vec![7u8; 1024]))
        .collect()
}

#[tokio::test]
async fn happy_path_confirms_every_file_and_merges_urls() {
    let transport = Arc::new(MockTransport::new(granting_script()));
    let uploader = Uploader::new(transport.clone(), "https://api.test/upload", "avatar");

    let session = uploader
        .upload(payloads(&["a.png", "b.png"]))
        .await
        .unwrap();

    let tasks = session.tasks();
    assert_eq!(tasks.len(), 2);
    for (task, name) in tasks.iter().zip(["a.png", "b.png"]) {
        assert_eq!(task.status, UploadStatus::Success);
        assert_eq!(task.progress_percent, 100);
        assert_eq!(task.key.as_deref(), Some(format!("photos/{name}").as_str()));
        assert_eq!(
            task.url.as_deref(),
            Some(format!("https://cdn.test/photos/{name}").as_str())
        );
    }
    assert_eq!(session.aggregate_percent(), 100);

    let calls = transport.recorded_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "authorize");
    assert_eq!(calls[1].0, "complete");
    assert_eq!(calls[1].1["completions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rejected_grant_fails_only_that_file() {
    let script: CallScript = Box::new(|action, body| match action {
        "authorize" => Ok(json!({
            "results": [
                {
                    "success": true,
                    "signedUrl": "https://storage.test/put/ok.png",
                    "objectKey": "photos/ok.png",
                },
                {
                    "success": false,
                    "error": {"code": "too_large", "message": "File exceeds 4 MB"},
                },
            ]
        })),
        "complete" => {
            assert_eq!(body["completions"].as_array().unwrap().len(), 1);
            Ok(json!({
                "results": [
                    {"success": true, "url": "https://cdn.test/photos/ok.png", "objectKey": "photos/ok.png"},
                ]
            }))
        }
        other => Err(UploadError::protocol(format!("unexpected action {other}"))),
    });
    let transport = Arc::new(MockTransport::new(script));
    let uploader = Uploader::new(transport, "https://api.test/upload", "avatar");

    let session = uploader
        .upload(payloads(&["ok.png", "huge.png"]))
        .await
        .unwrap();

    let tasks = session.tasks();
    assert_eq!(tasks[0].status, UploadStatus::Success);
    assert_eq!(tasks[1].status, UploadStatus::Error);
    assert_eq!(tasks[1].error_message.as_deref(), Some("File exceeds 4 MB"));
    assert!(tasks[1].url.is_none());
}

#[tokio::test]
async fn failed_transfer_is_excluded_from_completion() {
    let transport =
        Arc::new(MockTransport::new(granting_script()).failing_puts("flaky.png"));
    let uploader = Uploader::new(transport.clone(), "https://api.test/upload", "avatar");

    let session = uploader
        .upload(payloads(&["good.png", "flaky.png"]))
        .await
        .unwrap();

    let tasks = session.tasks();
    assert_eq!(tasks[0].status, UploadStatus::Success);
    assert_eq!(tasks[1].status, UploadStatus::Error);
    assert!(tasks[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("simulated storage outage"));

    let calls = transport.recorded_calls();
    let completions = calls[1].1["completions"].as_array().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0]["objectKey"], "photos/good.png");
}

#[tokio::test]
async fn every_transfer_failing_skips_the_complete_call() {
    let transport = Arc::new(MockTransport::new(granting_script()).failing_puts(".png"));
    let uploader = Uploader::new(transport.clone(), "https://api.test/upload", "avatar");

    let session = uploader.upload(payloads(&["a.png", "b.png"])).await.unwrap();

    assert!(session
        .tasks()
        .iter()
        .all(|t| t.status == UploadStatus::Error));
    assert_eq!(transport.recorded_calls().len(), 1);
}

#[tokio::test]
async fn systemic_authorize_failure_marks_every_task() {
    let script: CallScript =
        Box::new(|_, _| Err(UploadError::transfer("endpoint unreachable: refused")));
    let transport = Arc::new(MockTransport::new(script));
    let uploader = Uploader::new(transport, "https://api.test/upload", "avatar");

    let files = payloads(&["a.png", "b.png", "c.png"]);
    let descriptors: Vec<_> = files.iter().map(|f| f.descriptor.clone()).collect();
    let session = UploadSession::for_files(&descriptors);

    let err = uploader.run(&session, files).await.unwrap_err();
    assert!(err.retryable());

    let tasks = session.tasks();
    assert_eq!(tasks.len(), 3);
    for task in &tasks {
        assert_eq!(task.status, UploadStatus::Error);
        assert!(task
            .error_message
            .as_deref()
            .unwrap()
            .contains("endpoint unreachable"));
    }
}

#[tokio::test]
async fn completion_rejection_never_downgrades_a_transferred_file() {
    let script: CallScript = Box::new(|action, body| match action {
        "authorize" => granting_script()(action, body),
        "complete" => Ok(json!({
            "results": [
                {
                    "success": false,
                    "objectKey": "photos/a.png",
                    "error": {"code": "transfer_failed", "message": "Object was never uploaded"},
                },
            ]
        })),
        other => Err(UploadError::protocol(format!("unexpected action {other}"))),
    });
    let transport = Arc::new(MockTransport::new(script));
    let uploader = Uploader::new(transport, "https://api.test/upload", "avatar");

    let session = uploader.upload(payloads(&["a.png"])).await.unwrap();

    // the PUT settled, so the task is terminal; the rejected completion
    // only costs it the server URL
    let task = &session.tasks()[0];
    assert_eq!(task.status, UploadStatus::Success);
    assert!(task.url.is_none());
    assert!(task.error_message.is_none());
}

#[tokio::test]
async fn systemic_complete_failure_preserves_transferred_files() {
    let script: CallScript = Box::new(|action, body| match action {
        "authorize" => granting_script()(action, body),
        "complete" => Err(UploadError::transfer("endpoint unreachable: refused")),
        other => Err(UploadError::protocol(format!("unexpected action {other}"))),
    });
    let transport = Arc::new(MockTransport::new(script));
    let uploader = Uploader::new(transport, "https://api.test/upload", "avatar");

    let files = payloads(&["a.png", "b.png"]);
    let descriptors: Vec<_> = files.iter().map(|f| f.descriptor.clone()).collect();
    let session = UploadSession::for_files(&descriptors);

    let err = uploader.run(&session, files).await.unwrap_err();
    assert!(err.retryable());

    // both PUTs settled before the complete call, so both stay terminal
    for task in session.tasks() {
        assert_eq!(task.status, UploadStatus::Success);
        assert!(task.url.is_none());
    }
    assert_eq!(session.aggregate_eta_seconds(), None);
}

#[tokio::test]
async fn reset_aborts_inflight_transfers() {
    let transport = Arc::new(MockTransport::new(granting_script()).blocking_puts());
    let uploader = Uploader::new(transport.clone(), "https://api.test/upload", "avatar");

    let files = payloads(&["a.png", "b.png"]);
    let descriptors: Vec<_> = files.iter().map(|f| f.descriptor.clone()).collect();
    let session = UploadSession::for_files(&descriptors);

    let run = uploader.run(&session, files);
    let abort = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.reset();
    };
    let (result, _) = tokio::join!(run, abort);

    // no transfer settled, so there is nothing to complete
    assert!(result.is_ok());
    assert_eq!(transport.recorded_calls().len(), 1);
    assert_eq!(transport.puts.lock().len(), 2);

    assert!(session.is_cancelled());
    let tasks = session.tasks();
    assert!(tasks.iter().all(|t| t.status == UploadStatus::Error));
    assert!(tasks.iter().all(|t| t.status != UploadStatus::Uploading));
}

#[tokio::test]
async fn mismatched_result_count_is_a_protocol_error() {
    let script: CallScript = Box::new(|action, _| match action {
        "authorize" => Ok(json!({ "results": [] })),
        other => Err(UploadError::protocol(format!("unexpected action {other}"))),
    });
    let transport = Arc::new(MockTransport::new(script));
    let uploader = Uploader::new(transport, "https://api.test/upload", "avatar");

    let err = uploader
        .upload(payloads(&["a.png"]))
        .await
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err.error_code(), "protocol_error");
}
