use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::farm::FarmProfile;

/// A farm profile as persisted in the `farms` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFarm {
    pub id: i64,
    #[serde(flatten)]
    pub profile: FarmProfile,
    pub created_at: DateTime<Utc>,
}
