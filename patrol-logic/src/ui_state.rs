use serde::{Deserialize, Serialize};

use crate::{
    clock::format_elapsed,
    location::Position,
    messages,
    patrol::{Id, Patrol, PatrolPoint, PatrolSettings, TestMode},
};

#[derive(Debug, Clone, Serialize, Deserialize, specta::Type)]
/// One row in the list of points
pub struct PointRow {
    pub point: PatrolPoint,
    pub is_completed: bool,
    /// Whether tapping the row should try to verify the point
    pub is_verifiable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, specta::Type)]
/// Everything the UI needs to draw the patrol screen
pub struct PatrolUiState {
    pub patrol_id: Id,
    pub title: String,
    pub elapsed_seconds: u32,
    /// `elapsed_seconds` as HH:MM:SS
    pub elapsed_display: String,
    pub completed_count: u32,
    pub total_count: u32,
    pub progress_label: String,
    /// Number of points this screen still considers unverified
    pub remaining_count: u32,
    pub remaining_label: String,
    pub points: Vec<PointRow>,
    pub test_mode: TestMode,
    /// Tooltip for the test mode button, [None] if test mode is unsupported
    pub test_mode_button_title: Option<String>,
    pub test_mode_banner: Option<String>,
    pub settings: PatrolSettings,
    /// Overdue threshold currently applied by the store, shortened while test mode is on
    pub wait_seconds: u32,
    pub position: Option<Position>,
    /// All points are verified and the patrol is about to end on its own
    pub auto_end_pending: bool,
}

pub(crate) struct UiInputs<'a> {
    pub patrol: &'a Patrol,
    pub remaining: &'a [Id],
    pub elapsed_seconds: u32,
    pub test_mode: TestMode,
    pub settings: PatrolSettings,
    pub position: Option<Position>,
    pub auto_end_pending: bool,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl PatrolUiState {
    pub(crate) fn build(inputs: UiInputs<'_>) -> Self {
        let UiInputs {
            patrol,
            remaining,
            elapsed_seconds,
            test_mode,
            settings,
            position,
            auto_end_pending,
        } = inputs;

        let completed_count = count(patrol.completed_points.len());
        let total_count = count(patrol.patrol_points.len());
        let remaining_count = count(remaining.len());

        let points = patrol
            .patrol_points
            .iter()
            .map(|point| {
                let is_completed = patrol.is_completed(point.id);
                PointRow {
                    point: point.clone(),
                    is_completed,
                    is_verifiable: remaining.contains(&point.id) && !auto_end_pending,
                }
            })
            .collect();

        let test_mode_button_title = match test_mode {
            TestMode::Unsupported => None,
            TestMode::Supported { enabled: true } => Some(messages::DISABLE_TEST_MODE.to_string()),
            TestMode::Supported { enabled: false } => Some(messages::ENABLE_TEST_MODE.to_string()),
        };

        let test_mode_banner = test_mode
            .is_enabled()
            .then(|| messages::test_mode_banner(settings.test_mode_divisor));

        let wait_seconds =
            u32::try_from(settings.effective_wait(test_mode).as_secs()).unwrap_or(u32::MAX);

        Self {
            patrol_id: patrol.id,
            title: messages::TITLE.to_string(),
            elapsed_seconds,
            elapsed_display: format_elapsed(elapsed_seconds),
            completed_count,
            total_count,
            progress_label: messages::progress(completed_count, total_count),
            remaining_count,
            remaining_label: messages::remaining(remaining_count),
            points,
            test_mode,
            test_mode_button_title,
            test_mode_banner,
            settings,
            wait_seconds,
            position,
            auto_end_pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn mk_patrol() -> Patrol {
        let points = (0..3)
            .map(|i| PatrolPoint {
                id: Uuid::new_v4(),
                name: format!("Point {i}"),
                latitude: 0.0,
                longitude: 0.0,
                radius_meters: 25.0,
            })
            .collect::<Vec<_>>();
        Patrol {
            id: Uuid::new_v4(),
            start_time: Utc::now(),
            completed_points: vec![points[0].id],
            patrol_points: points,
        }
    }

    #[test]
    fn test_labels() {
        let patrol = mk_patrol();
        let remaining = patrol.remaining_ids();
        let state = PatrolUiState::build(UiInputs {
            patrol: &patrol,
            remaining: &remaining,
            elapsed_seconds: 61,
            test_mode: TestMode::Supported { enabled: true },
            settings: PatrolSettings::default(),
            position: None,
            auto_end_pending: false,
        });

        assert_eq!(state.elapsed_display, "00:01:01");
        assert_eq!(state.progress_label, "1/3 перевірено");
        assert_eq!(state.remaining_label, "2 залишилось");
        assert_eq!(
            state.test_mode_button_title.as_deref(),
            Some(messages::DISABLE_TEST_MODE)
        );
        assert!(
            state
                .test_mode_banner
                .as_deref()
                .is_some_and(|b| b.contains("в 10 разів"))
        );
        assert_eq!(state.wait_seconds, 30);
        assert!(state.points[0].is_completed);
        assert!(!state.points[0].is_verifiable);
        assert!(state.points[1].is_verifiable);
    }

    #[test]
    fn test_rows_follow_remaining_cache() {
        let mut patrol = mk_patrol();
        let last = patrol.patrol_points[2].id;
        let remaining = vec![last];
        // Completed by the store after the screen took its snapshot
        patrol.completed_points.push(last);

        let state = PatrolUiState::build(UiInputs {
            patrol: &patrol,
            remaining: &remaining,
            elapsed_seconds: 0,
            test_mode: TestMode::Supported { enabled: false },
            settings: PatrolSettings::default(),
            position: None,
            auto_end_pending: false,
        });

        assert_eq!(state.wait_seconds, 300);
        assert!(state.points[2].is_completed);
        assert!(state.points[2].is_verifiable);
        assert!(!state.points[1].is_verifiable);
    }

    #[test]
    fn test_unsupported_test_mode_has_no_button() {
        let patrol = mk_patrol();
        let state = PatrolUiState::build(UiInputs {
            patrol: &patrol,
            remaining: &[],
            elapsed_seconds: 0,
            test_mode: TestMode::Unsupported,
            settings: PatrolSettings::default(),
            position: None,
            auto_end_pending: true,
        });

        assert!(state.test_mode_button_title.is_none());
        assert!(state.test_mode_banner.is_none());
        assert!(state.points.iter().all(|row| !row.is_verifiable));
    }
}
