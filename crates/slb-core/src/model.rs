use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    Locked,
    Unlocked,
    Unknown,
}

impl LeaseStatus {
    /// Service strings are matched case-insensitively; anything else is `Unknown`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("locked") => Self::Locked,
            Some("unlocked") => Self::Unlocked,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LeaseState {
    Leased,
    Available,
    Expired,
    Breaking,
    Broken,
    Unknown,
}

impl LeaseState {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("leased") => Self::Leased,
            Some("available") => Self::Available,
            Some("expired") => Self::Expired,
            Some("breaking") => Self::Breaking,
            Some("broken") => Self::Broken,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leased => "leased",
            Self::Available => "available",
            Self::Expired => "expired",
            Self::Breaking => "breaking",
            Self::Broken => "broken",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaseInfo {
    pub status: LeaseStatus,
    pub state: LeaseState,
}

impl LeaseInfo {
    pub fn new(status: LeaseStatus, state: LeaseState) -> Self {
        Self { status, state }
    }

    pub fn from_raw(status: Option<&str>, state: Option<&str>) -> Self {
        Self {
            status: LeaseStatus::from_raw(status),
            state: LeaseState::from_raw(state),
        }
    }

    pub fn unknown() -> Self {
        Self::new(LeaseStatus::Unknown, LeaseState::Unknown)
    }

    pub fn locked_leased() -> Self {
        Self::new(LeaseStatus::Locked, LeaseState::Leased)
    }

    pub fn unlocked_available() -> Self {
        Self::new(LeaseStatus::Unlocked, LeaseState::Available)
    }

    /// Both conditions are required for the fallback tier.
    pub fn is_locked_and_leased(&self) -> bool {
        self.status == LeaseStatus::Locked && self.state == LeaseState::Leased
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionReason {
    CutoffEligible,
    UserConfirmedFallback,
    None,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}
