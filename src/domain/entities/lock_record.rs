//! Lock Record Entity
//!
//! Exists in the backend only while a mutating operation is in flight.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{HolderId, StageKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub holder: HolderId,
    pub acquired_at: DateTime<Utc>,
    pub key: StageKey,
}

impl LockRecord {
    pub fn new(key: StageKey, holder: HolderId) -> Self {
        Self {
            holder,
            acquired_at: Utc::now(),
            key,
        }
    }

    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        &self.holder == holder
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.acquired_at).max(Duration::zero())
    }

    /// Short human description, e.g. `alice@box:412/9f2c1a0e (5m ago)`
    pub fn describe(&self, now: DateTime<Utc>) -> String {
        format!("{} ({} ago)", self.holder, humanize(self.age(now)))
    }
}

fn humanize(age: Duration) -> String {
    let secs = age.num_seconds();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}
