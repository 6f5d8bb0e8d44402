//! Background job runner for pixtrace pipeline processing.
//!
//! A [`Worker`] owns a thread that takes [`JobRequest`]s from a channel,
//! runs the pipeline on each in submission order, and streams
//! [`JobResponse`]s back. [`JobClient`] sits in front of it, numbering
//! jobs and hiding responses that belong to anything but the most
//! recent submission.
//!
//! Superseded jobs are not interrupted: they run to completion and their
//! responses are dropped by the client.

pub mod protocol;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use pixtrace_pipeline::{PipelineError, VectorizeConfig, process_with_progress};
use tracing::{debug, info, warn};

pub use protocol::{
    ImagePayload, JobId, JobRequest, JobResponse, decode_request, encode_response,
};

/// Errors surfaced to job submitters.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread has exited.
    #[error("worker thread has stopped")]
    Disconnected,

    /// No job is awaiting a response.
    #[error("no job is in flight")]
    Idle,

    /// The job ended with an error response.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: JobId, message: String },
}

/// Run one job to completion on the calling thread.
///
/// Validates the configuration, checks the pixel buffer, traces the
/// image while forwarding progress, and serializes the SVG. `emit`
/// receives the progress messages and then exactly one terminal message.
/// A panic inside the pipeline is caught and reported as an error
/// response; no partial SVG is ever emitted.
pub fn run_job(request: JobRequest, mut emit: impl FnMut(JobResponse)) {
    let job_id = request.job_id;
    info!(
        job_id,
        width = request.image.width,
        height = request.image.height,
        "job started"
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        trace_to_svg(request, |progress| {
            emit(JobResponse::Progress { job_id, progress });
        })
    }));

    let terminal = match outcome {
        Ok(Ok(svg)) => {
            info!(job_id, bytes = svg.len(), "job finished");
            JobResponse::Result { job_id, svg }
        }
        Ok(Err(e)) => {
            warn!(job_id, error = %e, "job rejected");
            JobResponse::Error {
                job_id,
                message: e.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(job_id, %message, "job panicked");
            JobResponse::Error { job_id, message }
        }
    };
    emit(terminal);
}

fn trace_to_svg(request: JobRequest, on_progress: impl FnMut(u8)) -> Result<String, PipelineError> {
    request.config.validate()?;
    let image = request.image.into_raw_image()?;
    let traced = process_with_progress(&image, &request.config, on_progress);
    debug!(
        paths = traced.paths.len(),
        clusters = traced.summary.clusters_found,
        "pipeline complete"
    );
    Ok(pixtrace_export::to_svg(&traced))
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || "pipeline panicked".to_owned(),
            |msg| format!("pipeline panicked: {msg}"),
        )
}

/// A background thread that runs submitted jobs in order.
///
/// Dropping the worker closes its queue and waits for queued jobs to
/// finish.
#[derive(Debug)]
pub struct Worker {
    requests: Option<Sender<JobRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread.
    ///
    /// Returns the worker and the receiving end of its response stream.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] if the OS refuses to create the
    /// thread.
    pub fn spawn() -> Result<(Self, Receiver<JobResponse>), WorkerError> {
        let (request_tx, request_rx) = mpsc::channel::<JobRequest>();
        let (response_tx, response_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("pixtrace-worker".to_owned())
            .spawn(move || {
                for request in request_rx {
                    let mut receiver_gone = false;
                    run_job(request, |response| {
                        receiver_gone |= response_tx.send(response).is_err();
                    });
                    if receiver_gone {
                        debug!("response receiver dropped, stopping worker");
                        break;
                    }
                }
            })?;

        Ok((
            Self {
                requests: Some(request_tx),
                handle: Some(handle),
            },
            response_rx,
        ))
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has
    /// exited.
    pub fn submit(&self, request: JobRequest) -> Result<(), WorkerError> {
        self.requests
            .as_ref()
            .ok_or(WorkerError::Disconnected)?
            .send(request)
            .map_err(|_| WorkerError::Disconnected)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue ends the worker's receive loop.
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("worker thread panicked");
        }
    }
}

/// A notification for the most recently submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Progress(u8),
    Finished(String),
    Failed(String),
}

/// Submits jobs to a [`Worker`] and filters its responses down to the
/// latest submission.
#[derive(Debug)]
pub struct JobClient {
    worker: Worker,
    responses: Receiver<JobResponse>,
    next_id: JobId,
    active: Option<JobId>,
}

impl JobClient {
    /// Start a worker and a client in front of it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] if the worker thread cannot start.
    pub fn new() -> Result<Self, WorkerError> {
        let (worker, responses) = Worker::spawn()?;
        Ok(Self {
            worker,
            responses,
            next_id: 1,
            active: None,
        })
    }

    /// Submit an image, superseding any job still in flight.
    ///
    /// Returns the id assigned to the new job.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker has exited.
    pub fn submit(
        &mut self,
        image: ImagePayload,
        config: VectorizeConfig,
    ) -> Result<JobId, WorkerError> {
        let job_id = self.next_id;
        self.next_id += 1;
        if let Some(previous) = self.active {
            debug!(previous, job_id, "superseding job");
        }
        self.worker.submit(JobRequest {
            job_id,
            image,
            config,
        })?;
        self.active = Some(job_id);
        Ok(job_id)
    }

    /// The job whose responses are currently being delivered.
    #[must_use]
    pub const fn active_job(&self) -> Option<JobId> {
        self.active
    }

    /// Block until the next update for the active job.
    ///
    /// Responses for superseded jobs are discarded. After a terminal
    /// update the client is idle until the next submission.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Idle`] when no job is in flight and
    /// [`WorkerError::Disconnected`] if the worker has exited.
    pub fn recv(&mut self) -> Result<JobUpdate, WorkerError> {
        let active = self.active.ok_or(WorkerError::Idle)?;
        loop {
            let response = self
                .responses
                .recv()
                .map_err(|_| WorkerError::Disconnected)?;
            if response.job_id() != active {
                debug!(job_id = response.job_id(), active, "discarding stale response");
                continue;
            }
            if response.is_terminal() {
                self.active = None;
            }
            return Ok(match response {
                JobResponse::Progress { progress, .. } => JobUpdate::Progress(progress),
                JobResponse::Result { svg, .. } => JobUpdate::Finished(svg),
                JobResponse::Error { message, .. } => JobUpdate::Failed(message),
            });
        }
    }

    /// Block until the active job finishes, passing progress to
    /// `on_progress`, and return its SVG.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::JobFailed`] if the job reported an error,
    /// plus the errors of [`recv`](Self::recv).
    pub fn wait(&mut self, mut on_progress: impl FnMut(u8)) -> Result<String, WorkerError> {
        let job_id = self.active.ok_or(WorkerError::Idle)?;
        loop {
            match self.recv()? {
                JobUpdate::Progress(progress) => on_progress(progress),
                JobUpdate::Finished(svg) => return Ok(svg),
                JobUpdate::Failed(message) => {
                    return Err(WorkerError::JobFailed { job_id, message });
                }
            }
        }
    }
}
