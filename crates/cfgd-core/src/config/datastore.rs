//! Configuration datastore locations.

use serde::{Deserialize, Serialize};

/// Where the candidate and running configuration snapshots live.
///
/// The storage layer owns both; plugins only see these references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Candidate (proposed) configuration database.
    #[serde(default = "default_candidate_db")]
    pub candidate_db: String,
    /// Running (committed) configuration database.
    #[serde(default = "default_running_db")]
    pub running_db: String,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            candidate_db: default_candidate_db(),
            running_db: default_running_db(),
        }
    }
}

fn default_candidate_db() -> String {
    "./db/candidate_db".to_string()
}

fn default_running_db() -> String {
    "./db/running_db".to_string()
}
