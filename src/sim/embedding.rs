use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::graph::NodeId;
use super::propagation::PropagationOrigin;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding service answered with status {0}")]
    Status(u16),
    #[error("embedding response was malformed: {0}")]
    Malformed(String),
    #[error("embedding service returned an empty vector")]
    Empty,
}

/// Turns text into a numeric vector. Implementations may block; they are
/// only ever called from the worker thread.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Posts `{"input": text}` to a JSON endpoint answering `{"embedding": [...]}`.
pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl EmbeddingProvider for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { input: text })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status(status.as_u16()));
        }

        let body = response.text()?;
        let parsed: EmbedResponse = serde_json::from_str(&body)
            .map_err(|error| EmbeddingError::Malformed(error.to_string()))?;
        match parsed.embedding {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(EmbeddingError::Empty),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EmbeddingJob {
    NodeLabel {
        generation: u64,
        node: NodeId,
        text: String,
    },
    Propagation {
        generation: u64,
        source: NodeId,
        text: String,
        origin: PropagationOrigin,
    },
}

impl EmbeddingJob {
    pub fn generation(&self) -> u64 {
        match self {
            Self::NodeLabel { generation, .. } | Self::Propagation { generation, .. } => *generation,
        }
    }

    fn is_urgent(&self) -> bool {
        matches!(self, Self::Propagation { .. })
    }

    fn text(&self) -> &str {
        match self {
            Self::NodeLabel { text, .. } | Self::Propagation { text, .. } => text,
        }
    }
}

/// A finished job. `embedding` is `None` when the provider failed.
#[derive(Clone, Debug)]
pub struct EmbeddingReply {
    pub job: EmbeddingJob,
    pub embedding: Option<Vec<f32>>,
}

/// Background thread that resolves embedding jobs one at a time. Replies are
/// collected with [`EmbeddingWorker::poll`] from the frame loop.
///
/// Propagation text is resolved ahead of queued label lookups, and jobs from
/// a graph generation other than the current one are skipped unresolved.
pub struct EmbeddingWorker {
    jobs: Sender<EmbeddingJob>,
    replies: Receiver<EmbeddingReply>,
    generation: Arc<AtomicU64>,
}

#[derive(Default)]
struct JobQueue {
    urgent: VecDeque<EmbeddingJob>,
    labels: VecDeque<EmbeddingJob>,
}

impl JobQueue {
    fn push(&mut self, job: EmbeddingJob) {
        if job.is_urgent() {
            self.urgent.push_back(job);
        } else {
            self.labels.push_back(job);
        }
    }

    fn pop(&mut self) -> Option<EmbeddingJob> {
        self.urgent.pop_front().or_else(|| self.labels.pop_front())
    }

    fn is_empty(&self) -> bool {
        self.urgent.is_empty() && self.labels.is_empty()
    }
}

impl EmbeddingWorker {
    pub fn spawn(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let (jobs, job_rx) = mpsc::channel::<EmbeddingJob>();
        let (reply_tx, replies) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));
        let current = Arc::clone(&generation);

        thread::spawn(move || {
            let mut queue = JobQueue::default();
            loop {
                if queue.is_empty() {
                    match job_rx.recv() {
                        Ok(job) => queue.push(job),
                        Err(_) => break,
                    }
                }
                while let Ok(job) = job_rx.try_recv() {
                    queue.push(job);
                }
                let Some(job) = queue.pop() else {
                    continue;
                };

                if job.generation() != current.load(Ordering::Acquire) {
                    debug!(stale = job.generation(), "skipping embedding for a previous graph");
                    continue;
                }

                let embedding = match provider.embed(job.text()) {
                    Ok(vector) => Some(vector),
                    Err(error) => {
                        warn!(%error, "embedding lookup failed, continuing without it");
                        None
                    }
                };
                if reply_tx.send(EmbeddingReply { job, embedding }).is_err() {
                    break;
                }
            }
            debug!("embedding worker stopped");
        });

        Self {
            jobs,
            replies,
            generation,
        }
    }

    /// Jobs tagged with any other generation are dropped before lookup.
    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    /// Queues a job. Returns false when the worker thread is gone.
    pub fn submit(&self, job: EmbeddingJob) -> bool {
        self.jobs.send(job).is_ok()
    }

    /// Every reply that has arrived since the last poll, without blocking.
    pub fn poll(&self) -> Vec<EmbeddingReply> {
        let mut ready = Vec::new();
        loop {
            match self.replies.try_recv() {
                Ok(reply) => ready.push(reply),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("embedding worker disconnected");
                    break;
                }
            }
        }
        ready
    }

    #[cfg(test)]
    pub(super) fn wait(&self, timeout: Duration) -> Option<EmbeddingReply> {
        self.replies.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
pub(super) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Instant;

    use super::*;

    /// Records every text it is asked for. Each lookup blocks until
    /// [`GatedEmbedder::open`] is called.
    #[derive(Default)]
    pub struct GatedEmbedder {
        open: AtomicBool,
        entered: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl GatedEmbedder {
        pub fn open(&self) {
            self.open.store(true, Ordering::Release);
        }

        /// Waits until some lookup is blocked on the gate.
        pub fn wait_until_busy(&self, timeout: Duration) -> bool {
            let started = Instant::now();
            while self.entered.load(Ordering::Acquire) == 0 {
                if started.elapsed() > timeout {
                    return false;
                }
                thread::sleep(Duration::from_millis(1));
            }
            true
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    impl EmbeddingProvider for GatedEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.entered.fetch_add(1, Ordering::AcqRel);
            while !self.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(text.to_owned());
            }
            Ok(vec![1.0, 0.0])
        }
    }

    /// Maps text to a fixed vector; any other text fails.
    pub struct FixedEmbedder(pub Vec<(&'static str, Vec<f32>)>);

    impl EmbeddingProvider for FixedEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.0
                .iter()
                .find(|(key, _)| *key == text)
                .map(|(_, vector)| vector.clone())
                .ok_or(EmbeddingError::Empty)
        }
    }
}
