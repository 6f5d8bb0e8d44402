//! Job message protocol.
//!
//! Requests and responses are plain serde types tagged by a `type`
//! field, so they travel equally well over a channel or as JSON:
//!
//! ```json
//! {"type":"vectorize","job_id":1,"image":{"width":1,"height":1,"data":[0,0,0,0]},"config":{}}
//! {"type":"progress","job_id":1,"progress":40}
//! {"type":"result","job_id":1,"svg":"<?xml ...</svg>"}
//! {"type":"error","job_id":1,"message":"..."}
//! ```

use pixtrace_pipeline::{PipelineError, RawImage, VectorizeConfig};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a job by its submitter.
pub type JobId = u64;

/// Raw RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImagePayload {
    /// Check the buffer length and wrap it for the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BufferSize`] if `data` does not hold
    /// exactly `width * height` RGBA pixels.
    pub fn into_raw_image(self) -> Result<RawImage, PipelineError> {
        RawImage::from_raw(self.width, self.height, self.data)
    }
}

/// A request to trace one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "vectorize")]
pub struct JobRequest {
    pub job_id: JobId,
    pub image: ImagePayload,
    /// Missing fields take their defaults.
    #[serde(default)]
    pub config: VectorizeConfig,
}

/// A message streamed back for a job.
///
/// Every job yields zero or more `Progress` messages followed by exactly
/// one `Result` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobResponse {
    Progress { job_id: JobId, progress: u8 },
    Result { job_id: JobId, svg: String },
    Error { job_id: JobId, message: String },
}

impl JobResponse {
    /// The job this message belongs to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::Progress { job_id, .. } | Self::Result { job_id, .. } | Self::Error { job_id, .. } => {
                *job_id
            }
        }
    }

    /// Whether this is the last message of its job.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Parse a JSON request.
///
/// # Errors
///
/// Returns the `serde_json` error for malformed input.
pub fn decode_request(json: &str) -> Result<JobRequest, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a response as a single JSON line.
///
/// # Errors
///
/// Returns the `serde_json` error if serialization fails.
pub fn encode_response(response: &JobResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}
