//! Content Understanding analyzer access.
//!
//! - `client` submits documents to a named analyzer
//! - `poller` waits on asynchronous jobs
//! - `service` carries the endpoint, API version and auth headers both share

pub mod client;
pub mod job;
pub mod poller;
pub mod service;

pub use client::{AnalyzerClient, Submission, DOCUMENT_ANALYZER, LAYOUT_ANALYZER};
pub use job::{JobHandle, JobResult, JobStatus};
pub use poller::ResultPoller;
pub use service::ServiceEndpoint;
