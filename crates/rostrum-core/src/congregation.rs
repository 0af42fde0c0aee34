//! Congregations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Congregation {
  pub congregation_id: Uuid,
  pub name:            String,
  pub address:         Option<String>,
  pub contact_name:    Option<String>,
  pub contact_phone:   Option<String>,
  /// Weekday of the congregation's public meeting, free text.
  pub meeting_day:     Option<String>,
  pub meeting_time:    Option<String>,
}

/// Input to create/update a congregation.
#[derive(Debug, Clone)]
pub struct NewCongregation {
  pub name:          String,
  pub address:       Option<String>,
  pub contact_name:  Option<String>,
  pub contact_phone: Option<String>,
  pub meeting_day:   Option<String>,
  pub meeting_time:  Option<String>,
}
