use serde::{Deserialize, Serialize};
use std::fmt;

pub const STATUS_OK: &str = "ok";

/// Response of `POST /auth`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResult {
    // Missing fields decode as empty: no status is a rejection, no token is unusable.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub token: String,
}

impl AuthResult {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Response of `POST /stages`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageResult {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageState {
    On,
    Off,
}

impl From<bool> for StageState {
    fn from(on: bool) -> Self {
        if on {
            StageState::On
        } else {
            StageState::Off
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageState::On => "On",
            StageState::Off => "Off",
        })
    }
}

/// Desired state of both heating stages. Exactly one stage is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagePair {
    stage_1: StageState,
    stage_2: StageState,
}

impl StagePair {
    pub fn stage_1_on() -> Self {
        Self::complementary(true)
    }

    pub fn stage_2_on() -> Self {
        Self::complementary(false)
    }

    pub fn complementary(stage_1_on: bool) -> Self {
        StagePair {
            stage_1: stage_1_on.into(),
            stage_2: (!stage_1_on).into(),
        }
    }

    pub fn stage_1(&self) -> StageState {
        self.stage_1
    }

    pub fn stage_2(&self) -> StageState {
        self.stage_2
    }
}

impl fmt::Display for StagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage_1={} stage_2={}", self.stage_1, self.stage_2)
    }
}

/// Body of `POST /stages`.
#[derive(Debug, Serialize)]
pub struct StageUpdate {
    #[serde(rename = "STG")]
    pub stages: StagePair,
}
