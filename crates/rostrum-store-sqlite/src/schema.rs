//! SQL schema for the Rostrum SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS congregations (
    congregation_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    address         TEXT,
    contact_name    TEXT,
    contact_phone   TEXT,
    meeting_day     TEXT,
    meeting_time    TEXT
);

CREATE TABLE IF NOT EXISTS talks (
    talk_id            TEXT PRIMARY KEY,
    number             INTEGER NOT NULL UNIQUE,
    topic              TEXT NOT NULL,
    outline_revised_on TEXT              -- calendar date or NULL
);

CREATE TABLE IF NOT EXISTS speakers (
    speaker_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    phone           TEXT,
    email           TEXT,
    active          INTEGER NOT NULL DEFAULT 1,
    congregation_id TEXT REFERENCES congregations(congregation_id),
    -- Sorted, comma-separated talk numbers, e.g. '4, 16, 24'.
    -- Written only by the completion transition.
    outline_numbers TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS schedule_entries (
    entry_id        TEXT PRIMARY KEY,
    date            TEXT NOT NULL,      -- calendar date, YYYY-MM-DD
    talk_id         TEXT REFERENCES talks(talk_id),
    speaker_id      TEXT REFERENCES speakers(speaker_id),
    congregation_id TEXT REFERENCES congregations(congregation_id),
    kind            TEXT NOT NULL,      -- 'local' | 'sent' | 'received'
    notes           TEXT
);

-- Archived deliveries are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS history_records (
    record_id       TEXT PRIMARY KEY,
    talk_id         TEXT REFERENCES talks(talk_id),
    speaker_id      TEXT REFERENCES speakers(speaker_id),
    congregation_id TEXT REFERENCES congregations(congregation_id),
    date            TEXT NOT NULL,      -- calendar date, YYYY-MM-DD
    kind            TEXT NOT NULL,
    notes           TEXT,
    archived_at     TEXT NOT NULL       -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS arrangements (
    arrangement_id TEXT PRIMARY KEY,
    year           INTEGER NOT NULL,
    month          INTEGER NOT NULL,
    UNIQUE (year, month)
);

CREATE TABLE IF NOT EXISTS arrangement_congregations (
    arrangement_id  TEXT NOT NULL
                      REFERENCES arrangements(arrangement_id)
                      ON DELETE CASCADE,
    congregation_id TEXT NOT NULL REFERENCES congregations(congregation_id),
    PRIMARY KEY (arrangement_id, congregation_id)
);

CREATE INDEX IF NOT EXISTS entries_date_idx    ON schedule_entries(date);
CREATE INDEX IF NOT EXISTS entries_talk_idx    ON schedule_entries(talk_id);
CREATE INDEX IF NOT EXISTS history_talk_idx    ON history_records(talk_id);
CREATE INDEX IF NOT EXISTS history_speaker_idx ON history_records(speaker_id);
CREATE INDEX IF NOT EXISTS history_date_idx    ON history_records(date);

PRAGMA user_version = 1;
";
