//! Run states and outcomes

use std::fmt;
use std::time::Duration;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ValidatingPaths,
    Gating,
    Discovering,
    AcquiringContext,
    Executing,
    CommittingHistory,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ValidatingPaths => "validating-paths",
            Self::Gating => "gating",
            Self::Discovering => "discovering",
            Self::AcquiringContext => "acquiring-context",
            Self::Executing => "executing",
            Self::CommittingHistory => "committing-history",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Plugins ran and history was committed
    Completed,
    /// Nothing changed since the last successful run
    SkippedClean,
    /// Artifact unchanged but a plugin changed; a rebuild is needed
    SkippedWithWarning,
    /// Configuration error: bad paths, bad manifest or no plugins
    Aborted,
    /// A plugin reported an error
    Failed,
    /// Unexpected error or panic
    Faulted,
}

impl RunOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedClean | Self::SkippedWithWarning)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::SkippedClean => "skipped",
            Self::SkippedWithWarning => "skipped (rebuild required)",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Result of one orchestrated run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// True iff no error-severity message was logged
    pub success: bool,
    pub elapsed: Duration,
}
