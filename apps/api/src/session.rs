//! Session state machine — replaces the ad-hoc page/upload flags of the
//! original dashboard with explicit states and transitions.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Where the single analysis session currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Upload,
    Analyzing,
    Report,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no resume has been uploaded")]
    NoResume,

    #[error("an analysis is already in progress")]
    AnalysisInProgress,

    #[error("operation not allowed in the {0:?} phase")]
    InvalidPhase(Phase),
}

/// The single analysis session: uploaded resume, current phase, and the last
/// report. Multi-user sessions are out of scope.
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    resume_path: Option<PathBuf>,
    report: Option<Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn resume_path(&self) -> Option<&PathBuf> {
        self.resume_path.as_ref()
    }

    pub fn report(&self) -> Option<&Value> {
        self.report.as_ref()
    }

    /// Attach (or replace) the uploaded resume. Only legal while uploading.
    pub fn attach_resume(&mut self, path: PathBuf) -> Result<(), SessionError> {
        match self.phase {
            Phase::Upload => {
                self.resume_path = Some(path);
                Ok(())
            }
            Phase::Analyzing => Err(SessionError::AnalysisInProgress),
            Phase::Report => Err(SessionError::InvalidPhase(Phase::Report)),
        }
    }

    /// Remove the uploaded resume. Only legal while uploading.
    pub fn clear_resume(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Upload => {
                self.resume_path = None;
                Ok(())
            }
            phase => Err(SessionError::InvalidPhase(phase)),
        }
    }

    /// Upload -> Analyzing. Requires a resume to be attached.
    /// Returns the resume path the pipeline should consume.
    pub fn begin_analysis(&mut self) -> Result<PathBuf, SessionError> {
        match self.phase {
            Phase::Upload => {
                let path = self.resume_path.clone().ok_or(SessionError::NoResume)?;
                self.phase = Phase::Analyzing;
                Ok(path)
            }
            Phase::Analyzing => Err(SessionError::AnalysisInProgress),
            Phase::Report => Err(SessionError::InvalidPhase(Phase::Report)),
        }
    }

    /// Analyzing -> Report. Stores whatever the pipeline returned, error
    /// marker included — failure is data here, not a fault.
    pub fn complete_analysis(&mut self, report: Value) -> Result<(), SessionError> {
        match self.phase {
            Phase::Analyzing => {
                self.report = Some(report);
                self.phase = Phase::Report;
                Ok(())
            }
            phase => Err(SessionError::InvalidPhase(phase)),
        }
    }

    /// Analyzing -> Upload, discarding the in-flight analysis. The escape
    /// hatch for a pipeline that died without reporting; keeps the resume.
    pub fn abort_analysis(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Analyzing => {
                self.phase = Phase::Upload;
                Ok(())
            }
            phase => Err(SessionError::InvalidPhase(phase)),
        }
    }

    /// Report -> Upload. Keeps the resume so the user can re-analyze against
    /// a different job description.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Report => {
                self.report = None;
                self.phase = Phase::Upload;
                Ok(())
            }
            phase => Err(SessionError::InvalidPhase(phase)),
        }
    }
}
