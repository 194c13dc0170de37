//! Runs the engine off the caller's thread.
//!
//! A [`Worker`] owns an [`Engine`] and executes each submitted job on its own
//! thread. Progress and the final outcome arrive as [`WorkerEvent`]s over a
//! channel; a panic inside the engine is reported as an error event instead
//! of tearing down the caller.

use crate::{
    engine::{Engine, ProcessedOutput, ProjectInput},
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

const JOB_THREAD_NAME: &str = "source-flow-job";

/// Message sent from a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEvent {
    /// Advisory status text
    Progress(String),

    /// Job finished with output
    Success(ProcessedOutput),

    /// Job failed
    Error {
        /// Human-readable failure description
        message: String,
    },
}

/// Executes engine jobs on background threads.
#[derive(Debug, Clone, Default)]
pub struct Worker {
    engine: Arc<Engine>,
}

impl Worker {
    /// Creates a worker around an engine.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Starts a job and returns a handle to its events.
    ///
    /// # Errors
    ///
    /// Returns an error if the job thread cannot be spawned.
    pub fn submit(&self, input: ProjectInput) -> Result<JobHandle> {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let thread = thread::Builder::new()
            .name(JOB_THREAD_NAME.to_string())
            .spawn(move || run_job(&engine, &input, &tx))
            .map_err(|e| Error::processing(format!("failed to start job thread: {e}")))?;

        Ok(JobHandle {
            events: rx,
            thread: Some(thread),
        })
    }
}

fn run_job(engine: &Engine, input: &ProjectInput, tx: &Sender<WorkerEvent>) {
    debug!("Job started for '{}'", input.project_name);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.process_with_progress(input, &mut |progress| {
            // a dropped receiver just means nobody is listening
            let _ = tx.send(WorkerEvent::Progress(progress.to_string()));
        })
    }));

    let event = match result {
        Ok(Ok(output)) => WorkerEvent::Success(output),
        Ok(Err(e)) => WorkerEvent::Error {
            message: e.to_string(),
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Job for '{}' panicked: {}", input.project_name, message);
            WorkerEvent::Error {
                message: format!("An unexpected error occurred: {message}"),
            }
        }
    };

    let _ = tx.send(event);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to one running job.
#[derive(Debug)]
pub struct JobHandle {
    events: Receiver<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Returns the next event, blocking until one arrives.
    ///
    /// Returns `None` once the job has finished and all events were consumed.
    pub fn next_event(&self) -> Option<WorkerEvent> {
        self.events.recv().ok()
    }

    /// Blocks until the job finishes, passing progress text to `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job failed or ended without a result.
    pub fn wait(mut self, mut on_progress: impl FnMut(&str)) -> Result<ProcessedOutput> {
        let outcome = loop {
            match self.next_event() {
                Some(WorkerEvent::Progress(message)) => on_progress(&message),
                Some(WorkerEvent::Success(output)) => break Ok(output),
                Some(WorkerEvent::Error { message }) => break Err(Error::processing(message)),
                None => break Err(Error::processing("job ended without a result")),
            }
        };

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Job thread did not shut down cleanly");
            }
        }

        outcome
    }
}

/// Runs the engine on Tokio's blocking pool.
///
/// # Errors
///
/// Returns the engine's error, or [`Error::Processing`] if the task panicked.
#[cfg(feature = "async")]
pub async fn process_async(engine: Arc<Engine>, input: ProjectInput) -> Result<ProcessedOutput> {
    tokio::task::spawn_blocking(move || engine.process(&input))
        .await
        .map_err(|e| Error::processing(format!("An unexpected error occurred: {e}")))?
}
