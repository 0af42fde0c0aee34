//! [`SqliteStore`] — the SQLite implementation of [`ScheduleStore`].

use std::path::Path;

use chrono::{Local, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use uuid::Uuid;

use rostrum_core::{
  arrangement::{Arrangement, CongregationRef, NewArrangement},
  congregation::{Congregation, NewCongregation},
  entry::{EntryDetail, NewEntry, TalkOccurrence},
  gaps,
  history::HistoryDetail,
  speaker::{NewSpeaker, SpeakerDetail},
  store::{
    CongregationQuery, DEFAULT_LOOKBACK_DAYS, EntryQuery, Page, PageRequest,
    ScheduleStore, SpeakerQuery, TalkQuery,
  },
  talk::{NewTalk, Talk},
};

use crate::{
  Error, Result,
  encode::{
    RawCongregation, RawEntryDetail, RawHistoryDetail, RawOccurrence,
    RawSpeakerDetail, RawTalk, decode_date, decode_kind,
    decode_outline_numbers, decode_uuid, encode_date, encode_dt, encode_kind,
    encode_opt_uuid, encode_outline_numbers, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── SELECT fragments ────────────────────────────────────────────────────────

const ENTRY_SELECT: &str = "SELECT
    e.entry_id, e.date, e.talk_id, e.speaker_id, e.congregation_id,
    e.kind, e.notes,
    t.number AS talk_number,
    t.topic  AS talk_topic,
    s.name   AS speaker_name,
    c.name   AS congregation_name
  FROM schedule_entries e
  LEFT JOIN talks t         ON t.talk_id = e.talk_id
  LEFT JOIN speakers s      ON s.speaker_id = e.speaker_id
  LEFT JOIN congregations c ON c.congregation_id = e.congregation_id";

const ENTRY_COUNT: &str = "SELECT COUNT(*)
  FROM schedule_entries e
  LEFT JOIN talks t         ON t.talk_id = e.talk_id
  LEFT JOIN speakers s      ON s.speaker_id = e.speaker_id
  LEFT JOIN congregations c ON c.congregation_id = e.congregation_id";

const SPEAKER_SELECT: &str = "SELECT
    s.speaker_id, s.name, s.phone, s.email, s.active, s.congregation_id,
    s.outline_numbers,
    c.name AS congregation_name
  FROM speakers s
  LEFT JOIN congregations c ON c.congregation_id = s.congregation_id";

const SPEAKER_COUNT: &str = "SELECT COUNT(*)
  FROM speakers s
  LEFT JOIN congregations c ON c.congregation_id = s.congregation_id";

const HISTORY_SELECT: &str = "SELECT
    h.record_id, h.talk_id, h.speaker_id, h.congregation_id,
    h.date, h.kind, h.notes, h.archived_at,
    t.number AS talk_number,
    t.topic  AS talk_topic,
    s.name   AS speaker_name,
    c.name   AS congregation_name
  FROM history_records h
  LEFT JOIN talks t         ON t.talk_id = h.talk_id
  LEFT JOIN speakers s      ON s.speaker_id = h.speaker_id
  LEFT JOIN congregations c ON c.congregation_id = h.congregation_id";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntryDetail> {
  Ok(RawEntryDetail {
    entry_id:          row.get(0)?,
    date:              row.get(1)?,
    talk_id:           row.get(2)?,
    speaker_id:        row.get(3)?,
    congregation_id:   row.get(4)?,
    kind:              row.get(5)?,
    notes:             row.get(6)?,
    talk_number:       row.get(7)?,
    talk_topic:        row.get(8)?,
    speaker_name:      row.get(9)?,
    congregation_name: row.get(10)?,
  })
}

fn talk_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTalk> {
  Ok(RawTalk {
    talk_id:            row.get(0)?,
    number:             row.get(1)?,
    topic:              row.get(2)?,
    outline_revised_on: row.get(3)?,
  })
}

fn speaker_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSpeakerDetail> {
  Ok(RawSpeakerDetail {
    speaker_id:        row.get(0)?,
    name:              row.get(1)?,
    phone:             row.get(2)?,
    email:             row.get(3)?,
    active:            row.get(4)?,
    congregation_id:   row.get(5)?,
    outline_numbers:   row.get(6)?,
    congregation_name: row.get(7)?,
  })
}

fn congregation_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawCongregation> {
  Ok(RawCongregation {
    congregation_id: row.get(0)?,
    name:            row.get(1)?,
    address:         row.get(2)?,
    contact_name:    row.get(3)?,
    contact_phone:   row.get(4)?,
    meeting_day:     row.get(5)?,
    meeting_time:    row.get(6)?,
  })
}

fn history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawHistoryDetail> {
  Ok(RawHistoryDetail {
    record_id:         row.get(0)?,
    talk_id:           row.get(1)?,
    speaker_id:        row.get(2)?,
    congregation_id:   row.get(3)?,
    date:              row.get(4)?,
    kind:              row.get(5)?,
    notes:             row.get(6)?,
    archived_at:       row.get(7)?,
    talk_number:       row.get(8)?,
    talk_topic:        row.get(9)?,
    speaker_name:      row.get(10)?,
    congregation_name: row.get(11)?,
  })
}

fn occurrence_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawOccurrence> {
  Ok(RawOccurrence {
    source:          row.get(0)?,
    id:              row.get(1)?,
    talk_id:         row.get(2)?,
    speaker_id:      row.get(3)?,
    congregation_id: row.get(4)?,
    date:            row.get(5)?,
    kind:            row.get(6)?,
    notes:           row.get(7)?,
  })
}

// ─── Query-building helpers ──────────────────────────────────────────────────

fn where_clause(conds: &[String]) -> String {
  if conds.is_empty() {
    String::new()
  } else {
    format!(" WHERE {}", conds.join(" AND "))
  }
}

fn push_page(sql: &mut String, vals: &mut Vec<Value>, page: PageRequest) {
  match (page.limit, page.offset) {
    (Some(limit), offset) => {
      sql.push_str(" LIMIT ? OFFSET ?");
      vals.push(Value::Integer(limit as i64));
      vals.push(Value::Integer(offset as i64));
    }
    (None, offset) if offset > 0 => {
      sql.push_str(" LIMIT -1 OFFSET ?");
      vals.push(Value::Integer(offset as i64));
    }
    _ => {}
  }
}

fn entry_conditions(query: &EntryQuery) -> (Vec<String>, Vec<Value>) {
  let mut conds = Vec::new();
  let mut vals = Vec::new();

  if let Some(text) = &query.search {
    let pattern = format!("%{text}%");
    conds.push(
      "(CAST(t.number AS TEXT) LIKE ? OR t.topic LIKE ? \
       OR s.name LIKE ? OR c.name LIKE ?)"
        .to_owned(),
    );
    for _ in 0..4 {
      vals.push(Value::Text(pattern.clone()));
    }
  }

  // Multi-kind wins over single-kind for backward compatibility.
  let kinds = if query.kinds.is_empty() {
    query.kind.into_iter().collect::<Vec<_>>()
  } else {
    query.kinds.clone()
  };
  if !kinds.is_empty() {
    let placeholders = vec!["?"; kinds.len()].join(", ");
    conds.push(format!("e.kind IN ({placeholders})"));
    vals.extend(kinds.iter().map(|k| Value::Text(encode_kind(*k))));
  }

  if let Some(cid) = query.congregation_id {
    conds.push("e.congregation_id = ?".to_owned());
    vals.push(Value::Text(encode_uuid(cid)));
  }
  if let Some(from) = query.from {
    conds.push("e.date >= ?".to_owned());
    vals.push(Value::Text(encode_date(from)));
  }
  if let Some(to) = query.to {
    conds.push("e.date <= ?".to_owned());
    vals.push(Value::Text(encode_date(to)));
  }

  (conds, vals)
}

fn row_exists<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
) -> rusqlite::Result<bool> {
  conn
    .query_row(sql, params, |_| Ok(true))
    .optional()
    .map(|found| found.unwrap_or(false))
}

/// Lift a domain error out of a `conn.call` closure.
fn call_err(
  e: impl std::error::Error + Send + Sync + 'static,
) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Outcome of an arrangement write performed inside a transaction.
enum ArrangementWrite {
  Done,
  NotFound,
  Duplicate,
  MissingCongregation(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rostrum store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a filtered SELECT and its COUNT twin in one round-trip.
  /// `select` must already carry its WHERE and ORDER BY clauses; `count`
  /// shares the same placeholders.
  async fn paged_query<R, F>(
    &self,
    select: String,
    count: String,
    vals: Vec<Value>,
    page: PageRequest,
    map: F,
  ) -> Result<(Vec<R>, u64)>
  where
    R: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let result = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row(&count, params_from_iter(vals.clone()), |r| r.get(0))?;

        let mut sql = select;
        let mut data_vals = vals;
        push_page(&mut sql, &mut data_vals, page);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(data_vals), |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total as u64))
      })
      .await?;
    Ok(result)
  }

  /// Verify that every referenced id exists before a schedule write.
  async fn check_references(
    &self,
    talk_id: Option<Uuid>,
    speaker_id: Option<Uuid>,
    congregation_id: Option<Uuid>,
  ) -> Result<()> {
    if talk_id.is_none() && speaker_id.is_none() && congregation_id.is_none() {
      return Ok(());
    }

    let t = encode_opt_uuid(talk_id);
    let s = encode_opt_uuid(speaker_id);
    let c = encode_opt_uuid(congregation_id);

    let (talk_ok, speaker_ok, congregation_ok) = self
      .conn
      .call(move |conn| {
        let talk_ok = match &t {
          None => true,
          Some(id) => row_exists(
            conn,
            "SELECT 1 FROM talks WHERE talk_id = ?1",
            rusqlite::params![id],
          )?,
        };
        let speaker_ok = match &s {
          None => true,
          Some(id) => row_exists(
            conn,
            "SELECT 1 FROM speakers WHERE speaker_id = ?1",
            rusqlite::params![id],
          )?,
        };
        let congregation_ok = match &c {
          None => true,
          Some(id) => row_exists(
            conn,
            "SELECT 1 FROM congregations WHERE congregation_id = ?1",
            rusqlite::params![id],
          )?,
        };
        Ok((talk_ok, speaker_ok, congregation_ok))
      })
      .await?;

    if let Some(id) = talk_id
      && !talk_ok
    {
      return Err(rostrum_core::Error::TalkNotFound(id).into());
    }
    if let Some(id) = speaker_id
      && !speaker_ok
    {
      return Err(rostrum_core::Error::SpeakerNotFound(id).into());
    }
    if let Some(id) = congregation_id
      && !congregation_ok
    {
      return Err(rostrum_core::Error::CongregationNotFound(id).into());
    }
    Ok(())
  }

  /// Shared shape of the three history listings.
  async fn history_where(
    &self,
    condition: &'static str,
    id: Uuid,
  ) -> Result<Vec<HistoryDetail>> {
    let id_str = encode_uuid(id);
    let raws = self
      .conn
      .call(move |conn| {
        let sql =
          format!("{HISTORY_SELECT} WHERE {condition} ORDER BY h.date DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], history_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawHistoryDetail::into_detail).collect()
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = Error;

  // ── Schedule entries ──────────────────────────────────────────────────────

  async fn list_entries(
    &self,
    query: &EntryQuery,
    page: PageRequest,
  ) -> Result<Page<EntryDetail>> {
    let (conds, vals) = entry_conditions(query);
    let where_sql = where_clause(&conds);
    let select = format!("{ENTRY_SELECT}{where_sql} ORDER BY e.date");
    let count = format!("{ENTRY_COUNT}{where_sql}");

    let (raws, total) =
      self.paged_query(select, count, vals, page, entry_row).await?;
    let items = raws
      .into_iter()
      .map(RawEntryDetail::into_detail)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn get_entry(&self, id: Uuid) -> Result<Option<EntryDetail>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{ENTRY_SELECT} WHERE e.entry_id = ?1"),
              rusqlite::params![id_str],
              entry_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawEntryDetail::into_detail).transpose()
  }

  async fn create_entry(
    &self,
    input: NewEntry,
    confirm: bool,
  ) -> Result<EntryDetail> {
    self
      .check_references(input.talk_id, input.speaker_id, input.congregation_id)
      .await?;

    // Advisory guard: a talk delivered or booked inside the lookback
    // window needs explicit confirmation. The check and the insert are
    // separate statements; concurrent creates can both pass.
    if let Some(talk_id) = input.talk_id
      && !confirm
    {
      let occurrences = self
        .recent_talk_occurrences(talk_id, DEFAULT_LOOKBACK_DAYS)
        .await?;
      if !occurrences.is_empty() {
        return Err(
          rostrum_core::Error::ConfirmationRequired(occurrences).into(),
        );
      }
    }

    let entry_id = Uuid::new_v4();
    let id_str = encode_uuid(entry_id);
    let date_str = encode_date(input.date);
    let talk_str = encode_opt_uuid(input.talk_id);
    let speaker_str = encode_opt_uuid(input.speaker_id);
    let congregation_str = encode_opt_uuid(input.congregation_id);
    let kind_str = encode_kind(input.kind);
    let notes = input.notes;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schedule_entries
             (entry_id, date, talk_id, speaker_id, congregation_id, kind, notes)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            date_str,
            talk_str,
            speaker_str,
            congregation_str,
            kind_str,
            notes,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .get_entry(entry_id)
      .await?
      .ok_or_else(|| Error::Core(rostrum_core::Error::EntryNotFound(entry_id)))
  }

  async fn update_entry(
    &self,
    id: Uuid,
    input: NewEntry,
  ) -> Result<Option<EntryDetail>> {
    self
      .check_references(input.talk_id, input.speaker_id, input.congregation_id)
      .await?;

    let id_str = encode_uuid(id);
    let date_str = encode_date(input.date);
    let talk_str = encode_opt_uuid(input.talk_id);
    let speaker_str = encode_opt_uuid(input.speaker_id);
    let congregation_str = encode_opt_uuid(input.congregation_id);
    let kind_str = encode_kind(input.kind);
    let notes = input.notes;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE schedule_entries
              SET date = ?1, talk_id = ?2, speaker_id = ?3,
                  congregation_id = ?4, kind = ?5, notes = ?6
            WHERE entry_id = ?7",
          rusqlite::params![
            date_str,
            talk_str,
            speaker_str,
            congregation_str,
            kind_str,
            notes,
            id_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_entry(id).await
  }

  async fn delete_entry(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM schedule_entries WHERE entry_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn complete_entry(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let record_id = encode_uuid(Uuid::new_v4());
    let archived_at = encode_dt(Utc::now());

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row = tx
          .query_row(
            "SELECT e.date, e.talk_id, e.speaker_id, e.congregation_id,
                    e.kind, e.notes, t.number
               FROM schedule_entries e
               LEFT JOIN talks t ON t.talk_id = e.talk_id
              WHERE e.entry_id = ?1",
            rusqlite::params![id_str],
            |r| {
              Ok((
                r.get::<_, String>(0)?,
                r.get::<_, Option<String>>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, Option<i64>>(6)?,
              ))
            },
          )
          .optional()?;

        let Some((
          raw_date,
          talk_id,
          speaker_id,
          congregation_id,
          kind,
          notes,
          talk_number,
        )) = row
        else {
          return Ok(false);
        };

        // Re-normalise the date on the archive copy so history never
        // inherits a drifted value.
        let date = rostrum_core::date::normalize_str(&raw_date)
          .map_err(call_err)?
          .map(encode_date)
          .unwrap_or(raw_date);

        tx.execute(
          "INSERT INTO history_records
             (record_id, talk_id, speaker_id, congregation_id,
              date, kind, notes, archived_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            record_id,
            talk_id,
            speaker_id,
            congregation_id,
            date,
            kind,
            notes,
            archived_at,
          ],
        )?;

        // Set-insert the talk number into the speaker's outline list.
        if let (Some(speaker_id), Some(number)) = (&speaker_id, talk_number)
          && let Ok(number) = u32::try_from(number)
        {
          let current: String = tx.query_row(
            "SELECT outline_numbers FROM speakers WHERE speaker_id = ?1",
            rusqlite::params![speaker_id],
            |r| r.get(0),
          )?;
          let mut numbers = decode_outline_numbers(&current);
          if !numbers.contains(&number) {
            numbers.push(number);
            numbers.sort_unstable();
            tx.execute(
              "UPDATE speakers SET outline_numbers = ?1 WHERE speaker_id = ?2",
              rusqlite::params![encode_outline_numbers(&numbers), speaker_id],
            )?;
          }
        }

        tx.execute(
          "DELETE FROM schedule_entries WHERE entry_id = ?1",
          rusqlite::params![id_str],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| {
        Error::Core(rostrum_core::Error::Transaction(e.to_string()))
      })?;

    if found {
      Ok(())
    } else {
      Err(Error::Core(rostrum_core::Error::EntryNotFound(id)))
    }
  }

  async fn recent_talk_occurrences(
    &self,
    talk_id: Uuid,
    lookback_days: u32,
  ) -> Result<Vec<TalkOccurrence>> {
    let today = Local::now().date_naive();
    let cutoff = today - chrono::Days::new(u64::from(lookback_days));
    let cutoff_str = encode_date(cutoff);
    let id_str = encode_uuid(talk_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT 'active' AS source, entry_id AS id, talk_id, speaker_id,
                  congregation_id, date, kind, notes
             FROM schedule_entries
            WHERE talk_id = ?1 AND date >= ?2
           UNION ALL
           SELECT 'historical' AS source, record_id AS id, talk_id,
                  speaker_id, congregation_id, date, kind, notes
             FROM history_records
            WHERE talk_id = ?1 AND date >= ?2
           ORDER BY date DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, cutoff_str], occurrence_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccurrence::into_occurrence).collect()
  }

  async fn covered_week_starts(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<NaiveDate>> {
    let from_str = encode_date(from);
    let to_str = encode_date(to);

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT date, kind FROM schedule_entries
            WHERE date >= ?1 AND date <= ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![from_str, to_str], |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut weeks = std::collections::BTreeSet::new();
    for (date_str, kind_str) in rows {
      let date = decode_date(&date_str)?;
      let kind = decode_kind(&kind_str)?;
      if gaps::is_weekend(date) && kind.covers_home_weekend() {
        weeks.insert(gaps::week_start(date));
      }
    }
    Ok(weeks.into_iter().collect())
  }

  // ── Talks ─────────────────────────────────────────────────────────────────

  async fn add_talk(&self, input: NewTalk) -> Result<Talk> {
    let talk = Talk {
      talk_id:            Uuid::new_v4(),
      number:             input.number,
      topic:              input.topic,
      outline_revised_on: input.outline_revised_on,
    };

    let id_str = encode_uuid(talk.talk_id);
    let number = i64::from(talk.number);
    let topic = talk.topic.clone();
    let revised = talk.outline_revised_on.map(encode_date);

    let duplicate = self
      .conn
      .call(move |conn| {
        let taken = row_exists(
          conn,
          "SELECT 1 FROM talks WHERE number = ?1",
          rusqlite::params![number],
        )?;
        if taken {
          return Ok(true);
        }
        conn.execute(
          "INSERT INTO talks (talk_id, number, topic, outline_revised_on)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, number, topic, revised],
        )?;
        Ok(false)
      })
      .await?;

    if duplicate {
      return Err(rostrum_core::Error::DuplicateTalkNumber(talk.number).into());
    }
    Ok(talk)
  }

  async fn get_talk(&self, id: Uuid) -> Result<Option<Talk>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT talk_id, number, topic, outline_revised_on
                 FROM talks WHERE talk_id = ?1",
              rusqlite::params![id_str],
              talk_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTalk::into_talk).transpose()
  }

  async fn list_talks(
    &self,
    query: &TalkQuery,
    page: PageRequest,
  ) -> Result<Page<Talk>> {
    let mut conds = Vec::new();
    let mut vals = Vec::new();
    if let Some(text) = &query.search {
      let pattern = format!("%{text}%");
      conds
        .push("(CAST(number AS TEXT) LIKE ? OR topic LIKE ?)".to_owned());
      vals.push(Value::Text(pattern.clone()));
      vals.push(Value::Text(pattern));
    }
    let where_sql = where_clause(&conds);
    let select = format!(
      "SELECT talk_id, number, topic, outline_revised_on FROM talks\
       {where_sql} ORDER BY number"
    );
    let count = format!("SELECT COUNT(*) FROM talks{where_sql}");

    let (raws, total) =
      self.paged_query(select, count, vals, page, talk_row).await?;
    let items = raws
      .into_iter()
      .map(RawTalk::into_talk)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn update_talk(&self, id: Uuid, input: NewTalk) -> Result<Option<Talk>> {
    let id_str = encode_uuid(id);
    let number = i64::from(input.number);
    let topic = input.topic;
    let revised = input.outline_revised_on.map(encode_date);

    let (duplicate, changed) = self
      .conn
      .call(move |conn| {
        let taken = row_exists(
          conn,
          "SELECT 1 FROM talks WHERE number = ?1 AND talk_id != ?2",
          rusqlite::params![number, id_str],
        )?;
        if taken {
          return Ok((true, 0));
        }
        let changed = conn.execute(
          "UPDATE talks SET number = ?1, topic = ?2, outline_revised_on = ?3
            WHERE talk_id = ?4",
          rusqlite::params![number, topic, revised, id_str],
        )?;
        Ok((false, changed))
      })
      .await?;

    if duplicate {
      return Err(
        rostrum_core::Error::DuplicateTalkNumber(input.number).into(),
      );
    }
    if changed == 0 {
      return Ok(None);
    }
    self.get_talk(id).await
  }

  async fn delete_talk(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let referenced = self
      .conn
      .call(move |conn| {
        let in_schedule = row_exists(
          conn,
          "SELECT 1 FROM schedule_entries WHERE talk_id = ?1 LIMIT 1",
          rusqlite::params![id_str],
        )?;
        let in_history = row_exists(
          conn,
          "SELECT 1 FROM history_records WHERE talk_id = ?1 LIMIT 1",
          rusqlite::params![id_str],
        )?;
        if in_schedule || in_history {
          return Ok(true);
        }
        conn.execute(
          "DELETE FROM talks WHERE talk_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(false)
      })
      .await?;

    if referenced {
      return Err(rostrum_core::Error::TalkInUse(id).into());
    }
    Ok(())
  }

  async fn talk_history(&self, id: Uuid) -> Result<Vec<HistoryDetail>> {
    self.history_where("h.talk_id = ?1", id).await
  }

  // ── Speakers ──────────────────────────────────────────────────────────────

  async fn add_speaker(&self, input: NewSpeaker) -> Result<SpeakerDetail> {
    self.check_references(None, None, input.congregation_id).await?;

    let speaker_id = Uuid::new_v4();
    let id_str = encode_uuid(speaker_id);
    let name = input.name;
    let phone = input.phone;
    let email = input.email;
    let active = input.active;
    let congregation_str = encode_opt_uuid(input.congregation_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO speakers
             (speaker_id, name, phone, email, active, congregation_id,
              outline_numbers)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, '')",
          rusqlite::params![
            id_str,
            name,
            phone,
            email,
            active,
            congregation_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.get_speaker(speaker_id).await?.ok_or_else(|| {
      Error::Core(rostrum_core::Error::SpeakerNotFound(speaker_id))
    })
  }

  async fn get_speaker(&self, id: Uuid) -> Result<Option<SpeakerDetail>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SPEAKER_SELECT} WHERE s.speaker_id = ?1"),
              rusqlite::params![id_str],
              speaker_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSpeakerDetail::into_detail).transpose()
  }

  async fn list_speakers(
    &self,
    query: &SpeakerQuery,
    page: PageRequest,
  ) -> Result<Page<SpeakerDetail>> {
    let mut conds = Vec::new();
    let mut vals = Vec::new();

    if let Some(text) = &query.search {
      let pattern = format!("%{text}%");
      conds.push(
        "(s.name LIKE ? OR s.email LIKE ? OR s.phone LIKE ?)".to_owned(),
      );
      for _ in 0..3 {
        vals.push(Value::Text(pattern.clone()));
      }
    }
    if let Some(active) = query.active {
      conds.push("s.active = ?".to_owned());
      vals.push(Value::Integer(i64::from(active)));
    }
    if let Some(cid) = query.congregation_id {
      conds.push("s.congregation_id = ?".to_owned());
      vals.push(Value::Text(encode_uuid(cid)));
    }

    let where_sql = where_clause(&conds);
    let select = format!("{SPEAKER_SELECT}{where_sql} ORDER BY s.name");
    let count = format!("{SPEAKER_COUNT}{where_sql}");

    let (raws, total) =
      self.paged_query(select, count, vals, page, speaker_row).await?;
    let items = raws
      .into_iter()
      .map(RawSpeakerDetail::into_detail)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn update_speaker(
    &self,
    id: Uuid,
    input: NewSpeaker,
  ) -> Result<Option<SpeakerDetail>> {
    self.check_references(None, None, input.congregation_id).await?;

    let id_str = encode_uuid(id);
    let name = input.name;
    let phone = input.phone;
    let email = input.email;
    let active = input.active;
    let congregation_str = encode_opt_uuid(input.congregation_id);

    // outline_numbers deliberately untouched: it is derived state owned
    // by the completion transition.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE speakers
              SET name = ?1, phone = ?2, email = ?3, active = ?4,
                  congregation_id = ?5
            WHERE speaker_id = ?6",
          rusqlite::params![
            name,
            phone,
            email,
            active,
            congregation_str,
            id_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_speaker(id).await
  }

  async fn delete_speaker(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let referenced = self
      .conn
      .call(move |conn| {
        let in_schedule = row_exists(
          conn,
          "SELECT 1 FROM schedule_entries WHERE speaker_id = ?1 LIMIT 1",
          rusqlite::params![id_str],
        )?;
        let in_history = row_exists(
          conn,
          "SELECT 1 FROM history_records WHERE speaker_id = ?1 LIMIT 1",
          rusqlite::params![id_str],
        )?;
        if in_schedule || in_history {
          return Ok(true);
        }
        conn.execute(
          "DELETE FROM speakers WHERE speaker_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(false)
      })
      .await?;

    if referenced {
      return Err(rostrum_core::Error::SpeakerInUse(id).into());
    }
    Ok(())
  }

  async fn speaker_sent_history(&self, id: Uuid) -> Result<Vec<HistoryDetail>> {
    self
      .history_where("h.speaker_id = ?1 AND h.kind = 'sent'", id)
      .await
  }

  // ── Congregations ─────────────────────────────────────────────────────────

  async fn add_congregation(
    &self,
    input: NewCongregation,
  ) -> Result<Congregation> {
    let congregation = Congregation {
      congregation_id: Uuid::new_v4(),
      name:            input.name,
      address:         input.address,
      contact_name:    input.contact_name,
      contact_phone:   input.contact_phone,
      meeting_day:     input.meeting_day,
      meeting_time:    input.meeting_time,
    };

    let id_str = encode_uuid(congregation.congregation_id);
    let name = congregation.name.clone();
    let address = congregation.address.clone();
    let contact_name = congregation.contact_name.clone();
    let contact_phone = congregation.contact_phone.clone();
    let meeting_day = congregation.meeting_day.clone();
    let meeting_time = congregation.meeting_time.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO congregations
             (congregation_id, name, address, contact_name, contact_phone,
              meeting_day, meeting_time)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            name,
            address,
            contact_name,
            contact_phone,
            meeting_day,
            meeting_time,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(congregation)
  }

  async fn get_congregation(&self, id: Uuid) -> Result<Option<Congregation>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT congregation_id, name, address, contact_name,
                      contact_phone, meeting_day, meeting_time
                 FROM congregations WHERE congregation_id = ?1",
              rusqlite::params![id_str],
              congregation_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCongregation::into_congregation).transpose()
  }

  async fn list_congregations(
    &self,
    query: &CongregationQuery,
    page: PageRequest,
  ) -> Result<Page<Congregation>> {
    let mut conds = Vec::new();
    let mut vals = Vec::new();
    if let Some(text) = &query.search {
      let pattern = format!("%{text}%");
      conds.push(
        "(name LIKE ? OR address LIKE ? OR contact_name LIKE ?)".to_owned(),
      );
      for _ in 0..3 {
        vals.push(Value::Text(pattern.clone()));
      }
    }
    let where_sql = where_clause(&conds);
    let select = format!(
      "SELECT congregation_id, name, address, contact_name, contact_phone,
              meeting_day, meeting_time
         FROM congregations{where_sql} ORDER BY name"
    );
    let count = format!("SELECT COUNT(*) FROM congregations{where_sql}");

    let (raws, total) = self
      .paged_query(select, count, vals, page, congregation_row)
      .await?;
    let items = raws
      .into_iter()
      .map(RawCongregation::into_congregation)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
  }

  async fn update_congregation(
    &self,
    id: Uuid,
    input: NewCongregation,
  ) -> Result<Option<Congregation>> {
    let id_str = encode_uuid(id);
    let name = input.name;
    let address = input.address;
    let contact_name = input.contact_name;
    let contact_phone = input.contact_phone;
    let meeting_day = input.meeting_day;
    let meeting_time = input.meeting_time;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE congregations
              SET name = ?1, address = ?2, contact_name = ?3,
                  contact_phone = ?4, meeting_day = ?5, meeting_time = ?6
            WHERE congregation_id = ?7",
          rusqlite::params![
            name,
            address,
            contact_name,
            contact_phone,
            meeting_day,
            meeting_time,
            id_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_congregation(id).await
  }

  async fn delete_congregation(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let referenced = self
      .conn
      .call(move |conn| {
        for sql in [
          "SELECT 1 FROM schedule_entries WHERE congregation_id = ?1 LIMIT 1",
          "SELECT 1 FROM history_records WHERE congregation_id = ?1 LIMIT 1",
          "SELECT 1 FROM speakers WHERE congregation_id = ?1 LIMIT 1",
          "SELECT 1 FROM arrangement_congregations
            WHERE congregation_id = ?1 LIMIT 1",
        ] {
          if row_exists(conn, sql, rusqlite::params![id_str])? {
            return Ok(true);
          }
        }
        conn.execute(
          "DELETE FROM congregations WHERE congregation_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(false)
      })
      .await?;

    if referenced {
      return Err(rostrum_core::Error::CongregationInUse(id).into());
    }
    Ok(())
  }

  async fn congregation_received_history(
    &self,
    id: Uuid,
  ) -> Result<Vec<HistoryDetail>> {
    self
      .history_where("h.congregation_id = ?1 AND h.kind = 'received'", id)
      .await
  }

  // ── Arrangements ──────────────────────────────────────────────────────────

  async fn add_arrangement(
    &self,
    input: NewArrangement,
  ) -> Result<Arrangement> {
    input.validate().map_err(Error::Core)?;

    let arrangement_id = Uuid::new_v4();
    let id_str = encode_uuid(arrangement_id);
    let year = i64::from(input.year);
    let month = i64::from(input.month);
    let congregation_ids: Vec<String> =
      input.congregation_ids.iter().copied().map(encode_uuid).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = row_exists(
          &tx,
          "SELECT 1 FROM arrangements WHERE year = ?1 AND month = ?2",
          rusqlite::params![year, month],
        )?;
        if taken {
          return Ok(ArrangementWrite::Duplicate);
        }

        for cid in &congregation_ids {
          let exists = row_exists(
            &tx,
            "SELECT 1 FROM congregations WHERE congregation_id = ?1",
            rusqlite::params![cid],
          )?;
          if !exists {
            return Ok(ArrangementWrite::MissingCongregation(cid.clone()));
          }
        }

        tx.execute(
          "INSERT INTO arrangements (arrangement_id, year, month)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, year, month],
        )?;
        for cid in &congregation_ids {
          tx.execute(
            "INSERT INTO arrangement_congregations
               (arrangement_id, congregation_id)
             VALUES (?1, ?2)",
            rusqlite::params![id_str, cid],
          )?;
        }

        tx.commit()?;
        Ok(ArrangementWrite::Done)
      })
      .await?;

    match outcome {
      ArrangementWrite::Done => {
        self.get_arrangement(arrangement_id).await?.ok_or_else(|| {
          Error::Core(rostrum_core::Error::Storage(
            "arrangement vanished after insert".to_owned(),
          ))
        })
      }
      ArrangementWrite::Duplicate => {
        Err(rostrum_core::Error::DuplicateArrangement {
          year:  input.year,
          month: input.month,
        }
        .into())
      }
      ArrangementWrite::MissingCongregation(cid) => Err(
        rostrum_core::Error::CongregationNotFound(decode_uuid(&cid)?).into(),
      ),
      // add never updates an existing row
      ArrangementWrite::NotFound => Err(Error::Core(
        rostrum_core::Error::Storage("unexpected arrangement state".to_owned()),
      )),
    }
  }

  async fn get_arrangement(&self, id: Uuid) -> Result<Option<Arrangement>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        let head = conn
          .query_row(
            "SELECT arrangement_id, year, month FROM arrangements
              WHERE arrangement_id = ?1",
            rusqlite::params![id_str],
            |r| {
              Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, i64>(2)?,
              ))
            },
          )
          .optional()?;

        let Some(head) = head else { return Ok(None) };

        let mut stmt = conn.prepare(
          "SELECT c.congregation_id, c.name
             FROM arrangement_congregations ac
             JOIN congregations c ON c.congregation_id = ac.congregation_id
            WHERE ac.arrangement_id = ?1
            ORDER BY c.name",
        )?;
        let congregations = stmt
          .query_map(rusqlite::params![id_str], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((head, congregations)))
      })
      .await?;

    let Some(((id_str, year, month), congregations)) = raw else {
      return Ok(None);
    };

    let congregations = congregations
      .into_iter()
      .map(|(cid, name)| {
        Ok(CongregationRef {
          congregation_id: decode_uuid(&cid)?,
          name,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Some(Arrangement {
      arrangement_id: decode_uuid(&id_str)?,
      year: year as i32,
      month: month as u32,
      congregations,
    }))
  }

  async fn list_arrangements(
    &self,
    page: PageRequest,
  ) -> Result<Page<Arrangement>> {
    let (rows, total) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row("SELECT COUNT(*) FROM arrangements", [], |r| {
            r.get(0)
          })?;

        let mut inner =
          String::from("SELECT * FROM arrangements ORDER BY year, month");
        let mut vals = Vec::new();
        push_page(&mut inner, &mut vals, page);

        let sql = format!(
          "SELECT a.arrangement_id, a.year, a.month,
                  c.congregation_id, c.name
             FROM ({inner}) a
             LEFT JOIN arrangement_congregations ac
               ON ac.arrangement_id = a.arrangement_id
             LEFT JOIN congregations c
               ON c.congregation_id = ac.congregation_id
            ORDER BY a.year, a.month, c.name"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(vals), |r| {
            Ok((
              r.get::<_, String>(0)?,
              r.get::<_, i64>(1)?,
              r.get::<_, i64>(2)?,
              r.get::<_, Option<String>>(3)?,
              r.get::<_, Option<String>>(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total as u64))
      })
      .await?;

    let mut items: Vec<Arrangement> = Vec::new();
    for (id_str, year, month, cid, cname) in rows {
      let id = decode_uuid(&id_str)?;
      if items.last().map(|a| a.arrangement_id) != Some(id) {
        items.push(Arrangement {
          arrangement_id: id,
          year:           year as i32,
          month:          month as u32,
          congregations:  Vec::new(),
        });
      }
      if let (Some(cid), Some(name)) = (cid, cname)
        && let Some(last) = items.last_mut()
      {
        last.congregations.push(CongregationRef {
          congregation_id: decode_uuid(&cid)?,
          name,
        });
      }
    }

    Ok(Page { items, total })
  }

  async fn update_arrangement(
    &self,
    id: Uuid,
    input: NewArrangement,
  ) -> Result<Option<Arrangement>> {
    input.validate().map_err(Error::Core)?;

    let id_str = encode_uuid(id);
    let year = i64::from(input.year);
    let month = i64::from(input.month);
    let congregation_ids: Vec<String> =
      input.congregation_ids.iter().copied().map(encode_uuid).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = row_exists(
          &tx,
          "SELECT 1 FROM arrangements
            WHERE year = ?1 AND month = ?2 AND arrangement_id != ?3",
          rusqlite::params![year, month, id_str],
        )?;
        if taken {
          return Ok(ArrangementWrite::Duplicate);
        }

        for cid in &congregation_ids {
          let exists = row_exists(
            &tx,
            "SELECT 1 FROM congregations WHERE congregation_id = ?1",
            rusqlite::params![cid],
          )?;
          if !exists {
            return Ok(ArrangementWrite::MissingCongregation(cid.clone()));
          }
        }

        let changed = tx.execute(
          "UPDATE arrangements SET year = ?1, month = ?2
            WHERE arrangement_id = ?3",
          rusqlite::params![year, month, id_str],
        )?;
        if changed == 0 {
          return Ok(ArrangementWrite::NotFound);
        }

        tx.execute(
          "DELETE FROM arrangement_congregations WHERE arrangement_id = ?1",
          rusqlite::params![id_str],
        )?;
        for cid in &congregation_ids {
          tx.execute(
            "INSERT INTO arrangement_congregations
               (arrangement_id, congregation_id)
             VALUES (?1, ?2)",
            rusqlite::params![id_str, cid],
          )?;
        }

        tx.commit()?;
        Ok(ArrangementWrite::Done)
      })
      .await?;

    match outcome {
      ArrangementWrite::Done => self.get_arrangement(id).await,
      ArrangementWrite::NotFound => Ok(None),
      ArrangementWrite::Duplicate => {
        Err(rostrum_core::Error::DuplicateArrangement {
          year:  input.year,
          month: input.month,
        }
        .into())
      }
      ArrangementWrite::MissingCongregation(cid) => Err(
        rostrum_core::Error::CongregationNotFound(decode_uuid(&cid)?).into(),
      ),
    }
  }

  async fn delete_arrangement(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM arrangement_congregations WHERE arrangement_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM arrangements WHERE arrangement_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
