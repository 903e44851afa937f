//! Client-side orchestration of the three-phase upload protocol:
//! authorize, direct transfer, complete.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, warn};

use uplink_core::{
    AuthorizeRequest, AuthorizeResponse, CompleteRequest, CompleteResponse, CompletionEntry,
    FileDescriptor, UploadError, UploadResult,
};

use crate::progress::ProgressEvent;
use crate::session::UploadSession;
use crate::task::UploadStatus;
use crate::transport::{ProgressSink, Transport};

/// One file queued for upload: its wire descriptor plus the bytes to PUT.
#[derive(Clone)]
pub struct FilePayload {
    pub descriptor: FileDescriptor,
    pub content: Bytes,
}

impl FilePayload {
    pub fn new<N, M, B>(name: N, mime_type: M, content: B) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        B: Into<Bytes>,
    {
        let content = content.into();
        Self {
            descriptor: FileDescriptor::new(name, content.len() as u64, mime_type),
            content,
        }
    }
}

struct TransferJob {
    task_id: String,
    signed_url: String,
    object_key: String,
    metadata: Option<serde_json::Value>,
    descriptor: FileDescriptor,
    content: Bytes,
}

/// Drives a batch of files through the upload protocol against one named
/// route on one endpoint.
///
/// Failures are isolated per file wherever the protocol allows it: a
/// rejected authorization or a failed PUT marks that file's task and
/// leaves the rest of the batch running. Only failures of the protocol
/// calls themselves fail every still-active task at once.
pub struct Uploader {
    transport: Arc<dyn Transport>,
    endpoint: String,
    route: String,
}

impl Uploader {
    pub fn new<E, R>(transport: Arc<dyn Transport>, endpoint: E, route: R) -> Self
    where
        E: Into<String>,
        R: Into<String>,
    {
        Self {
            transport,
            endpoint: endpoint.into(),
            route: route.into(),
        }
    }

    /// Upload a batch of files, returning the session that tracked them.
    /// A systemic protocol failure is also surfaced as `Err`; per-file
    /// outcomes always live on the session's tasks.
    pub async fn upload(&self, files: Vec<FilePayload>) -> UploadResult<UploadSession> {
        let descriptors: Vec<FileDescriptor> =
            files.iter().map(|f| f.descriptor.clone()).collect();
        let session = UploadSession::for_files(&descriptors);
        let result = self.run(&session, files).await;
        result.map(|_| session)
    }

    /// Drive `files` through the protocol against an existing session.
    /// The session must have been seeded from the same files, in order.
    pub async fn run(&self, session: &UploadSession, files: Vec<FilePayload>) -> UploadResult<()> {
        let task_ids = session.task_ids();
        if task_ids.len() != files.len() {
            return Err(UploadError::protocol(
                "session was seeded from a different file batch",
            ));
        }

        let jobs = self.authorize(session, &task_ids, &files).await?;
        debug!(
            route = %self.route,
            granted = jobs.len(),
            total = files.len(),
            "authorization finished"
        );

        let completions = self.transfer_all(session, jobs).await;
        if completions.is_empty() {
            return Ok(());
        }

        self.complete(session, completions).await
    }

    async fn authorize(
        &self,
        session: &UploadSession,
        task_ids: &[String],
        files: &[FilePayload],
    ) -> UploadResult<Vec<TransferJob>> {
        let request = AuthorizeRequest {
            files: files.iter().map(|f| f.descriptor.clone()).collect(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| UploadError::protocol(format!("unencodable authorize request: {e}")))?;

        let response = match self
            .transport
            .call(&self.endpoint, &self.route, "authorize", body)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                session.fail_all_active(err.to_string());
                return Err(err);
            }
        };

        let response: AuthorizeResponse = match serde_json::from_value(response) {
            Ok(parsed) => parsed,
            Err(e) => {
                let err =
                    UploadError::protocol(format!("malformed authorize response: {e}"));
                session.fail_all_active(err.to_string());
                return Err(err);
            }
        };
        if response.results.len() != files.len() {
            let err = UploadError::protocol(format!(
                "authorize returned {} results for {} files",
                response.results.len(),
                files.len()
            ));
            session.fail_all_active(err.to_string());
            return Err(err);
        }

        let mut jobs = Vec::new();
        for ((outcome, file), task_id) in response.results.into_iter().zip(files).zip(task_ids) {
            match (outcome.success, outcome.signed_url, outcome.object_key) {
                (true, Some(signed_url), Some(object_key)) => {
                    session.with_task(task_id, |t| {
                        t.key = Some(object_key.clone());
                        t.transition(UploadStatus::Uploading)
                    });
                    jobs.push(TransferJob {
                        task_id: task_id.clone(),
                        signed_url,
                        object_key,
                        metadata: outcome.metadata,
                        descriptor: file.descriptor.clone(),
                        content: file.content.clone(),
                    });
                }
                (true, _, _) => {
                    warn!(file = %file.descriptor.name, "grant missing signed URL or key");
                    session.with_task(task_id, |t| {
                        t.mark_error("authorization grant was incomplete")
                    });
                }
                (false, _, _) => {
                    let message = outcome
                        .error
                        .map(|d| d.message)
                        .unwrap_or_else(|| "authorization rejected".to_string());
                    session.with_task(task_id, |t| t.mark_error(message));
                }
            }
        }
        Ok(jobs)
    }

    /// Run every granted transfer concurrently. Each PUT settles on its
    /// own; one failure never tears down the others.
    async fn transfer_all(
        &self,
        session: &UploadSession,
        jobs: Vec<TransferJob>,
    ) -> Vec<(String, CompletionEntry)> {
        let transfers = jobs.into_iter().map(|job| {
            let transport = Arc::clone(&self.transport);
            let session = session.clone();
            async move {
                let sink: ProgressSink = {
                    let session = session.clone();
                    let task_id = job.task_id.clone();
                    Arc::new(move |loaded, total| {
                        session.apply_progress(ProgressEvent {
                            file_id: task_id.clone(),
                            loaded,
                            total,
                            timestamp: Instant::now(),
                        });
                    })
                };

                let sent = transport
                    .put_signed(
                        &job.signed_url,
                        &job.descriptor.mime_type,
                        job.content,
                        sink,
                        session.cancel_token(),
                    )
                    .await;

                match sent {
                    Ok(()) => {
                        // A settled PUT is terminal; completion only adds
                        // the server-resolved URL afterwards.
                        session.with_task(&job.task_id, |t| t.mark_success());
                        Some((
                            job.task_id,
                            CompletionEntry {
                                object_key: job.object_key,
                                file: job.descriptor,
                                metadata: job.metadata,
                            },
                        ))
                    }
                    Err(err) => {
                        warn!(file = %job.descriptor.name, error = %err, "transfer failed");
                        session.with_task(&job.task_id, |t| t.mark_error(err.to_string()));
                        None
                    }
                }
            }
        });

        futures::future::join_all(transfers)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Report confirmed transfers back and merge the final URLs into the
    /// session. Tasks are already terminal by now; a rejected entry is
    /// logged and leaves its task's status untouched.
    async fn complete(
        &self,
        session: &UploadSession,
        completions: Vec<(String, CompletionEntry)>,
    ) -> UploadResult<()> {
        let request = CompleteRequest {
            completions: completions.iter().map(|(_, e)| e.clone()).collect(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| UploadError::protocol(format!("unencodable complete request: {e}")))?;

        let response = self
            .transport
            .call(&self.endpoint, &self.route, "complete", body)
            .await?;

        let response: CompleteResponse = serde_json::from_value(response)
            .map_err(|e| UploadError::protocol(format!("malformed complete response: {e}")))?;
        if response.results.len() != completions.len() {
            return Err(UploadError::protocol(format!(
                "complete returned {} results for {} entries",
                response.results.len(),
                completions.len()
            )));
        }

        for (outcome, (task_id, entry)) in response.results.into_iter().zip(completions) {
            if outcome.success {
                session.with_task(&task_id, |t| t.url = outcome.url.clone());
            } else {
                let message = outcome
                    .error
                    .map(|d| d.message)
                    .unwrap_or_else(|| "completion rejected".to_string());
                warn!(key = %entry.object_key, %message, "completion rejected");
            }
        }
        Ok(())
    }
}
