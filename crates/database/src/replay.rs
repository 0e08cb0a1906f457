use super::*;
use rand::Rng;
use std::sync::Arc;
use std::sync::Mutex;
use tempo_core::*;
use tempo_scoring::*;
use tokio_postgres::Client;

/// The shared replay store.
///
/// Writers (finished games) and the trainer (batch sampling) touch it
/// concurrently; the id counters sit behind their own lock, allocated
/// before any await so the lock never spans I/O. A failed push or
/// sample is logged by the caller and abandoned; it cannot corrupt the
/// counters or the table.
pub struct Replay {
    client: Arc<Client>,
    /// (next transition id, next game id), both monotonic.
    ids: Mutex<(TransitionId, GameId)>,
}

impl Replay {
    /// Ensure the table exists and resume the monotonic counters from
    /// whatever the store already holds.
    pub async fn load(client: Arc<Client>) -> Self {
        client
            .batch_execute(CREATES)
            .await
            .expect("create transitions table");
        let next_id = client
            .query_one(MAX_ID, &[])
            .await
            .expect("query max transition id")
            .get::<_, Option<TransitionId>>(0)
            .map_or(0, |max| max + 1);
        let next_game = client
            .query_one(MAX_GAME, &[])
            .await
            .expect("query max game id")
            .get::<_, Option<GameId>>(0)
            .map_or(0, |max| max + 1);
        log::info!("replay memory resumes at transition {next_id}, game {next_game}");
        Self {
            client,
            ids: Mutex::new((next_id, next_game)),
        }
    }

    /// Store one finished game's transitions under a fresh game id,
    /// evicting the oldest rows beyond the retention cap first.
    pub async fn push(&self, transitions: &[TransitionRecord]) -> anyhow::Result<()> {
        anyhow::ensure!(!transitions.is_empty(), "no transitions to push");
        let (base, game) = {
            let mut ids = self.ids.lock().expect("ids lock");
            let out = *ids;
            ids.0 += transitions.len() as TransitionId;
            ids.1 += 1;
            out
        };
        let floor = base + transitions.len() as TransitionId - REPLAY_CAPACITY;
        if floor > 0 {
            self.client.execute(EVICTS, &[&floor]).await?;
        }
        for (offset, t) in transitions.iter().enumerate() {
            let id = base + offset as TransitionId;
            let state = serde_json::to_string(&t.state)?;
            let action = serde_json::to_string(&t.action)?;
            let successor = t.successor.as_ref().map(serde_json::to_string).transpose()?;
            let summary = t.summary.as_ref().map(serde_json::to_string).transpose()?;
            self.client
                .execute(
                    INSERTS,
                    &[&id, &game, &state, &action, &t.reward, &successor, &summary],
                )
                .await?;
        }
        Ok(())
    }

    /// Uniform random sample over the retained id range. Ids that have
    /// been evicted or never landed simply thin the batch; callers get
    /// at most `batch` rows.
    pub async fn sample(&self, batch: usize) -> anyhow::Result<Vec<TransitionRecord>> {
        let ceiling = self.ids.lock().expect("ids lock").0;
        anyhow::ensure!(ceiling > 0, "sampling an empty replay memory");
        let floor = (ceiling - REPLAY_CAPACITY).max(0);
        // scope the thread rng so the future stays Send
        let ids = {
            let ref mut rng = rand::rng();
            (0..batch)
                .map(|_| rng.random_range(floor..ceiling))
                .collect::<Vec<TransitionId>>()
        };
        let rows = self.client.query(SAMPLES, &[&ids]).await?;
        rows.into_iter()
            .map(|row| {
                Ok(TransitionRecord {
                    state: serde_json::from_str(row.get(0))?,
                    action: serde_json::from_str(row.get(1))?,
                    reward: row.get(2),
                    successor: row
                        .get::<_, Option<&str>>(3)
                        .map(serde_json::from_str)
                        .transpose()?,
                    summary: row
                        .get::<_, Option<&str>>(4)
                        .map(serde_json::from_str)
                        .transpose()?,
                })
            })
            .collect()
    }

    /// Drop the store handle. The connection itself is shared and owned
    /// by the caller.
    pub fn close(self) {
        log::info!("replay memory closed");
    }
}
