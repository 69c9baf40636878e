//! Resume-vs-job-description analysis: the sequential pipeline, its prompt
//! constants, report shaping for the dashboard, and the HTTP handlers.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod report;
