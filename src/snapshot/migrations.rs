pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS elections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    year INTEGER NOT NULL UNIQUE,
    label TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    source_hash TEXT,
    imported_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS regions (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS provinces (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    region_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS parties (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS constituencies (
    id INTEGER PRIMARY KEY,
    province_id INTEGER NOT NULL,
    area_number INTEGER NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS constituency_stats (
    election_id INTEGER NOT NULL,
    constituency_id INTEGER NOT NULL,
    eligible_voters INTEGER NOT NULL DEFAULT 0,
    ballots_cast INTEGER,
    PRIMARY KEY (election_id, constituency_id)
);

CREATE TABLE IF NOT EXISTS candidate_participations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    election_id INTEGER NOT NULL,
    constituency_id INTEGER NOT NULL,
    ballot_number INTEGER NOT NULL,
    party_id INTEGER NOT NULL,
    full_name TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    UNIQUE (election_id, constituency_id, ballot_number)
);
CREATE INDEX IF NOT EXISTS idx_participations_election
    ON candidate_participations(election_id, constituency_id);

CREATE TABLE IF NOT EXISTS party_list_results (
    election_id INTEGER NOT NULL,
    party_id INTEGER NOT NULL,
    seats INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (election_id, party_id)
);
"#;
