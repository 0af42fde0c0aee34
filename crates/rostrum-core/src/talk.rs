//! Talks — the outline catalogue.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A public talk outline. `number` is unique across the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Talk {
  pub talk_id:            Uuid,
  pub number:             u32,
  pub topic:              String,
  /// Date the outline was last revised, when known.
  pub outline_revised_on: Option<NaiveDate>,
}

/// Input to create/update a talk.
#[derive(Debug, Clone)]
pub struct NewTalk {
  pub number:             u32,
  pub topic:              String,
  pub outline_revised_on: Option<NaiveDate>,
}
