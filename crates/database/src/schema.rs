use const_format::formatcp;

/// Table for replay transitions.
pub const TRANSITIONS: &str = "transitions";

/// Representations and summaries are stored as JSON text; nullable
/// columns mark terminal transitions.
pub const CREATES: &str = formatcp!(
    "CREATE TABLE IF NOT EXISTS {TRANSITIONS} (
        id        BIGINT PRIMARY KEY,
        game      BIGINT NOT NULL,
        state     TEXT   NOT NULL,
        action    TEXT   NOT NULL,
        reward    REAL   NOT NULL,
        successor TEXT,
        summary   TEXT
    );"
);

pub const MAX_ID: &str = formatcp!("SELECT MAX(id)   FROM {TRANSITIONS};");
pub const MAX_GAME: &str = formatcp!("SELECT MAX(game) FROM {TRANSITIONS};");

pub const INSERTS: &str = formatcp!(
    "INSERT INTO {TRANSITIONS}
        (id, game, state, action, reward, successor, summary)
     VALUES ($1, $2, $3, $4, $5, $6, $7);"
);

/// Oldest-first eviction below an id floor.
pub const EVICTS: &str = formatcp!("DELETE FROM {TRANSITIONS} WHERE id < $1;");

pub const SAMPLES: &str = formatcp!(
    "SELECT state, action, reward, successor, summary
     FROM {TRANSITIONS} WHERE id = ANY($1);"
);
