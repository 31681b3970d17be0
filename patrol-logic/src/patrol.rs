use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// A geofenced location the guard has to physically reach to be credited with inspecting it
pub struct PatrolPoint {
    pub id: Id,
    /// Display name of the point
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// How close (in meters) the guard has to be for the point to count as visited
    pub radius_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// A guard's active round
pub struct Patrol {
    pub id: Id,
    /// When the guard started this patrol
    pub start_time: UtcDT,
    /// Points in the order they should be visited
    pub patrol_points: Vec<PatrolPoint>,
    /// IDs of points that have already been verified
    pub completed_points: Vec<Id>,
}

impl Patrol {
    pub fn point(&self, id: Id) -> Option<&PatrolPoint> {
        self.patrol_points.iter().find(|p| p.id == id)
    }

    pub fn is_completed(&self, id: Id) -> bool {
        self.completed_points.contains(&id)
    }

    /// IDs of every point that hasn't been completed yet, in patrol order
    pub fn remaining_ids(&self) -> Vec<Id> {
        self.patrol_points
            .iter()
            .filter(|p| !self.is_completed(p.id))
            .map(|p| p.id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, specta::Type)]
/// Whether the patrol store lets the user shorten waiting times for manual testing
pub enum TestMode {
    /// The store has no notion of test mode, toggling does nothing
    #[default]
    Unsupported,
    Supported { enabled: bool },
}

impl TestMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Supported { enabled: true })
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Unsupported => Self::Unsupported,
            Self::Supported { enabled } => Self::Supported { enabled: !enabled },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(default)]
/// Settings owned by the patrol store, the screen only displays these
pub struct PatrolSettings {
    /// How long the store waits before treating a point as overdue
    pub wait_seconds: u32,
    /// Waiting thresholds are divided by this while test mode is on
    pub test_mode_divisor: u32,
}

impl PatrolSettings {
    pub fn effective_wait(&self, test_mode: TestMode) -> Duration {
        let secs = if test_mode.is_enabled() {
            self.wait_seconds / self.test_mode_divisor.max(1)
        } else {
            self.wait_seconds
        };
        Duration::from_secs(secs as u64)
    }
}

impl Default for PatrolSettings {
    fn default() -> Self {
        Self {
            wait_seconds: 300,
            test_mode_divisor: 10,
        }
    }
}
