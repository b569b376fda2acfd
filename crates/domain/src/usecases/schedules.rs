//! Trigger list maintenance

use std::sync::Arc;

use uuid::Uuid;

use crate::model::Schedule;
use crate::ports::{ScheduleStore, ScheduleStoreError};

/// Reads and rewrites the persisted trigger list
#[derive(Clone)]
pub struct ScheduleBook {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleBook {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Schedule>, ScheduleStoreError> {
        self.store.load().await
    }

    /// Replace the whole list, assigning ids to entries without one
    pub async fn replace(
        &self,
        mut schedules: Vec<Schedule>,
    ) -> Result<Vec<Schedule>, ScheduleStoreError> {
        for schedule in &mut schedules {
            if schedule.id.trim().is_empty() {
                schedule.id = Uuid::new_v4().to_string();
            }
        }
        self.store.save(&schedules).await?;
        tracing::info!(count = schedules.len(), "Schedules saved");
        Ok(schedules)
    }

    /// Disable the given triggers; returns how many changed
    pub async fn deactivate(&self, ids: &[String]) -> Result<usize, ScheduleStoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut schedules = self.store.load().await?;
        let mut changed = 0;
        for schedule in schedules.iter_mut().filter(|s| ids.contains(&s.id)) {
            if schedule.enabled {
                schedule.enabled = false;
                changed += 1;
            }
        }

        if changed > 0 {
            self.store.save(&schedules).await?;
            tracing::info!(count = changed, "Deactivated one-shot schedules");
        }
        Ok(changed)
    }
}
