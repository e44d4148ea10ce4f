//! Small free-function helpers shared across module boundaries, mirroring
//! the original's `common.py` grab-bag module.

use chrono::{DateTime, Utc};

pub fn publish_timestamp() -> DateTime<Utc> {
    Utc::now()
}
