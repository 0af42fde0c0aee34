//! Speakers and their delivered-outline list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A speaker, optionally tied to a home congregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
  pub speaker_id:      Uuid,
  pub name:            String,
  pub phone:           Option<String>,
  pub email:           Option<String>,
  pub active:          bool,
  pub congregation_id: Option<Uuid>,
  /// Talk numbers this speaker has personally delivered, sorted ascending
  /// with no duplicates. Written only by the completion transition —
  /// ordinary speaker updates never touch it.
  pub outline_numbers: Vec<u32>,
}

/// Input to create/update a speaker. Deliberately has no
/// `outline_numbers` field; that list is derived state.
#[derive(Debug, Clone)]
pub struct NewSpeaker {
  pub name:            String,
  pub phone:           Option<String>,
  pub email:           Option<String>,
  pub active:          bool,
  pub congregation_id: Option<Uuid>,
}

/// A speaker joined with their home congregation's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerDetail {
  #[serde(flatten)]
  pub speaker:           Speaker,
  pub congregation_name: Option<String>,
}
