//! Monthly arrangements — a plan linking a year/month to a set of
//! congregations. Unique per `(year, month)`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A congregation as embedded in an arrangement listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongregationRef {
  pub congregation_id: Uuid,
  pub name:            String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrangement {
  pub arrangement_id: Uuid,
  pub year:           i32,
  /// 1–12.
  pub month:          u32,
  /// Linked congregations, ordered by name.
  pub congregations:  Vec<CongregationRef>,
}

/// Input to create/update an arrangement.
#[derive(Debug, Clone)]
pub struct NewArrangement {
  pub year:             i32,
  pub month:            u32,
  pub congregation_ids: Vec<Uuid>,
}

impl NewArrangement {
  pub fn validate(&self) -> Result<()> {
    if !(1..=12).contains(&self.month) {
      return Err(Error::InvalidMonth(self.month));
    }
    Ok(())
  }
}
