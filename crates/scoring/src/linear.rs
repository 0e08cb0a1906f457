use super::*;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Mutex;
use tempo_core::*;
use tempo_encoding::*;

const LEARNING_RATE: f32 = 1e-4;
const CHECKPOINT_DIR: &str = "checkpoints";

/// Dual parameter sets over the flattened representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Params {
    online: Vec<f32>,
    target: Vec<f32>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            online: vec![0.0; REP_FLAT_LEN],
            target: vec![0.0; REP_FLAT_LEN],
        }
    }
}

/// Baseline linear value function.
///
/// One weight per representation feature, trained by SGD on squared
/// error. Stands in for the external deep approximator so the full
/// search / replay / training loop runs in-repo; the [`Network`] seam
/// is where a real substrate plugs in.
#[derive(Debug, Default)]
pub struct LinearValue {
    session: Mutex<Option<Params>>,
}

impl LinearValue {
    pub fn new() -> Self {
        Self::default()
    }

    fn predict(weights: &[f32], rep: &GameRep) -> Score {
        weights
            .iter()
            .zip(rep.flat())
            .map(|(w, x)| w * x)
            .sum::<f32>()
    }

    fn checkpoint(tag: Epoch) -> std::path::PathBuf {
        std::path::Path::new(CHECKPOINT_DIR).join(format!("linear-{:08}.json", tag))
    }

    fn latest() -> anyhow::Result<std::path::PathBuf> {
        let newest = std::fs::read_dir(CHECKPOINT_DIR)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .max();
        newest.ok_or_else(|| anyhow::anyhow!("no checkpoints under {}", CHECKPOINT_DIR))
    }
}

impl Network for LinearValue {
    fn score(&self, online: bool, states: &[GameRep]) -> Vec<Score> {
        let session = self.session.lock().expect("params lock");
        match session.as_ref() {
            Some(params) => {
                let weights = if online { &params.online } else { &params.target };
                states.iter().map(|s| Self::predict(weights, s)).collect()
            }
            None => {
                log::error!("scoring against a closed session, returning zeros");
                vec![0.0; states.len()]
            }
        }
    }

    fn train(&self, states: &[GameRep], targets: &[Score]) -> anyhow::Result<Score> {
        anyhow::ensure!(states.len() == targets.len(), "states/targets mismatch");
        anyhow::ensure!(!states.is_empty(), "empty training batch");
        let mut session = self.session.lock().expect("params lock");
        let params = session
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("training against a closed session"))?;
        let mut loss = 0.0;
        for (state, &target) in states.iter().zip(targets) {
            let flat = state.flat();
            let error = Self::predict(&params.online, state) - target;
            loss += error * error / 2.0;
            for (w, x) in params.online.iter_mut().zip(flat) {
                *w -= LEARNING_RATE * error * x;
            }
        }
        Ok(loss / states.len() as f32)
    }

    fn sync(&self) {
        let mut session = self.session.lock().expect("params lock");
        if let Some(params) = session.as_mut() {
            params.target = params.online.clone();
        }
    }

    fn save(&self, tag: Epoch) -> anyhow::Result<()> {
        let session = self.session.lock().expect("params lock");
        let params = session
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("saving a closed session"))?;
        std::fs::create_dir_all(CHECKPOINT_DIR)?;
        std::fs::write(Self::checkpoint(tag), serde_json::to_vec(params)?)?;
        Ok(())
    }

    fn load(&self) -> anyhow::Result<()> {
        let path = Self::latest()?;
        let params = serde_json::from_slice::<Params>(&std::fs::read(&path)?)?;
        anyhow::ensure!(
            params.online.len() == REP_FLAT_LEN && params.target.len() == REP_FLAT_LEN,
            "checkpoint {} does not match the representation schema",
            path.display(),
        );
        *self.session.lock().expect("params lock") = Some(params);
        log::info!("restored {}", path.display());
        Ok(())
    }

    fn open(&self) -> bool {
        let mut session = self.session.lock().expect("params lock");
        match session.as_ref() {
            Some(_) => false,
            None => {
                *session = Some(Params::default());
                true
            }
        }
    }

    fn close(&self) -> bool {
        self.session.lock().expect("params lock").take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(health: Feature) -> GameRep {
        let mut board = BoardVec::default();
        board[0][0] = health;
        GameRep::from(board)
    }

    #[test]
    fn session_bracket_is_idempotent() {
        let net = LinearValue::new();
        assert!(net.open());
        assert!(!net.open());
        assert!(net.close());
        assert!(!net.close());
    }

    #[test]
    fn closed_session_scores_zero() {
        let net = LinearValue::new();
        assert_eq!(net.score(true, &[rep(10)]), vec![0.0]);
        assert!(net.train(&[rep(10)], &[1.0]).is_err());
    }

    #[test]
    fn training_reduces_loss() {
        let net = LinearValue::new();
        net.open();
        let states = vec![rep(10), rep(20)];
        let targets = vec![1.0, 2.0];
        let first = net.train(&states, &targets).unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = net.train(&states, &targets).unwrap();
        }
        assert!(last < first);
    }

    #[test]
    fn sync_aligns_target_with_online() {
        let net = LinearValue::new();
        net.open();
        net.train(&[rep(10)], &[5.0]).unwrap();
        let ref states = [rep(10)];
        assert_ne!(net.score(true, states), net.score(false, states));
        net.sync();
        assert_eq!(net.score(true, states), net.score(false, states));
    }
}
