//! Highscores: per-player best scores and per-game leaderboards
//!
//! A player's stored score only ever goes up. Every successful save is also
//! mirrored into the game's ranking so the leaderboard can read the top 10.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::LEADERBOARD_SIZE;
use crate::persistence::{BackendError, KvBackend};

/// One player's best score for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub game_id: String,
    pub score: u64,
    pub owner_id: String,
    pub display_name: String,
    /// Unix timestamp (ms) of the save
    pub updated_at: f64,
}

/// The signed-in player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
    pub display_name: String,
}

impl Identity {
    /// Display name falls back to the e-mail local part, then "Player"
    pub fn new(owner_id: &str, display_name: Option<&str>, email: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| {
                email
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("Player")
            .to_string();
        Self {
            owner_id: owner_id.to_string(),
            display_name,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not encode score record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where finished runs are recorded
pub trait HighscoreStore {
    /// Stored best for the signed-in player; 0 if absent or signed out
    fn get_highscore(&self, game_id: &str) -> u64;

    /// Record `score` if it beats the stored best. Returns whether it did.
    fn save_highscore(&self, game_id: &str, score: u64) -> Result<bool, StoreError>;

    /// Top entries by score, ties to the earliest save, then owner id
    fn leaderboard(&self, game_id: &str) -> Vec<ScoreRecord>;
}

/// Milliseconds since the Unix epoch
pub fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Highscores on top of a key-value backend
pub struct KvHighscoreStore<B: KvBackend> {
    backend: B,
    identity: RefCell<Option<Identity>>,
    clock: Box<dyn Fn() -> f64>,
}

impl<B: KvBackend> KvHighscoreStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            identity: RefCell::new(None),
            clock: Box::new(now_ms),
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: impl Fn() -> f64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn sign_in(&self, identity: Identity) {
        log::info!("Signed in as {}", identity.display_name);
        *self.identity.borrow_mut() = Some(identity);
    }

    pub fn sign_out(&self) {
        *self.identity.borrow_mut() = None;
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn record_key(owner_id: &str, game_id: &str) -> String {
        format!("hs:{owner_id}:{game_id}")
    }

    fn ranking_prefix(game_id: &str) -> String {
        format!("rank:{game_id}:")
    }

    fn read_record(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError> {
        match self.backend.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl<B: KvBackend> HighscoreStore for KvHighscoreStore<B> {
    fn get_highscore(&self, game_id: &str) -> u64 {
        let Some(identity) = self.identity() else {
            return 0;
        };
        match self.read_record(&Self::record_key(&identity.owner_id, game_id)) {
            Ok(record) => record.map_or(0, |r| r.score),
            Err(e) => {
                log::warn!("Error loading highscore for {game_id}: {e}");
                0
            }
        }
    }

    fn save_highscore(&self, game_id: &str, score: u64) -> Result<bool, StoreError> {
        let Some(identity) = self.identity() else {
            return Ok(false);
        };
        let key = Self::record_key(&identity.owner_id, game_id);
        let stored = self.read_record(&key)?.map_or(0, |r| r.score);
        if score <= stored {
            return Ok(false);
        }

        let record = ScoreRecord {
            game_id: game_id.to_string(),
            score,
            owner_id: identity.owner_id.clone(),
            display_name: identity.display_name.clone(),
            updated_at: (self.clock)(),
        };
        let json = serde_json::to_string(&record)?;
        self.backend.set(&key, &json)?;

        // A failed mirror write leaves the personal record in place
        let rank_key = format!("{}{}", Self::ranking_prefix(game_id), identity.owner_id);
        if let Err(e) = self.backend.set(&rank_key, &json) {
            log::warn!("Ranking for {game_id} not updated: {e}");
        }

        log::info!("New best for {game_id}: {score}");
        Ok(true)
    }

    fn leaderboard(&self, game_id: &str) -> Vec<ScoreRecord> {
        let keys = match self.backend.keys_with_prefix(&Self::ranking_prefix(game_id)) {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("Leaderboard for {game_id} unavailable: {e}");
                return Vec::new();
            }
        };

        let mut records: Vec<ScoreRecord> = keys
            .iter()
            .filter_map(|key| match self.read_record(key) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping ranking entry {key}: {e}");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.updated_at.total_cmp(&b.updated_at))
                .then_with(|| a.owner_id.cmp(&b.owner_id))
        });
        records.truncate(LEADERBOARD_SIZE);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryBackend, ReadOnlyBackend};
    use std::cell::Cell;
    use std::rc::Rc;

    fn store() -> KvHighscoreStore<MemoryBackend> {
        let tick = Rc::new(Cell::new(0.0));
        let store = KvHighscoreStore::new(MemoryBackend::new()).with_clock(move || {
            tick.set(tick.get() + 1.0);
            tick.get()
        });
        store.sign_in(Identity::new("u1", Some("Ada"), None));
        store
    }

    #[test]
    fn test_monotonic_max() {
        let store = store();
        let mut stored = Vec::new();
        let mut returned = Vec::new();
        for score in [50, 30, 80, 80, 79] {
            returned.push(store.save_highscore("dodge", score).unwrap());
            stored.push(store.get_highscore("dodge"));
        }
        assert_eq!(stored, vec![50, 50, 80, 80, 80]);
        assert_eq!(returned, vec![true, false, true, false, false]);
    }

    #[test]
    fn test_signed_out() {
        let store = store();
        store.sign_out();
        assert_eq!(store.get_highscore("dodge"), 0);
        assert!(!store.save_highscore("dodge", 10).unwrap());
        assert!(store.backend().is_empty());
    }

    #[test]
    fn test_games_are_separate() {
        let store = store();
        store.save_highscore("dodge", 10).unwrap();
        assert_eq!(store.get_highscore("merge"), 0);
    }

    #[test]
    fn test_zero_score_never_saved() {
        let store = store();
        assert!(!store.save_highscore("dodge", 0).unwrap());
    }

    #[test]
    fn test_leaderboard_order_and_tie_break() {
        let store = KvHighscoreStore::new(MemoryBackend::new());
        let save = |id: &str, score: u64, at: f64| {
            let record = ScoreRecord {
                game_id: "jumper".into(),
                score,
                owner_id: id.into(),
                display_name: id.into(),
                updated_at: at,
            };
            let json = serde_json::to_string(&record).unwrap();
            store
                .backend()
                .set(&format!("rank:jumper:{id}"), &json)
                .unwrap();
        };
        save("bob", 100, 2.0);
        save("dave", 100, 1.0);
        save("alice", 100, 1.0);
        save("carol", 120, 9.0);
        let order: Vec<String> = store
            .leaderboard("jumper")
            .into_iter()
            .map(|r| r.owner_id)
            .collect();
        assert_eq!(order, vec!["carol", "alice", "dave", "bob"]);
    }

    #[test]
    fn test_leaderboard_top_ten() {
        let store = store();
        for i in 0..15u64 {
            store.sign_in(Identity::new(&format!("p{i:02}"), None, None));
            store.save_highscore("merge", 100 + i).unwrap();
        }
        let board = store.leaderboard("merge");
        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board[0].score, 114);
        assert_eq!(board[9].score, 105);
        assert!(store.leaderboard("dodge").is_empty());
    }

    #[test]
    fn test_ranking_mirrors_best_only() {
        let store = store();
        store.save_highscore("stop", 40).unwrap();
        store.save_highscore("stop", 20).unwrap();
        let board = store.leaderboard("stop");
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 40);
        assert_eq!(board[0].display_name, "Ada");
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(Identity::new("x", Some("  "), Some("neo@matrix.io")).display_name, "neo");
        assert_eq!(Identity::new("x", None, None).display_name, "Player");
        assert_eq!(Identity::new("x", Some("Trinity"), None).display_name, "Trinity");
    }

    #[test]
    fn test_backend_failure_is_an_error() {
        let store = KvHighscoreStore::new(ReadOnlyBackend::new());
        store.sign_in(Identity::new("u1", None, None));
        assert!(matches!(
            store.save_highscore("dodge", 10),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.get_highscore("dodge"), 0);
    }

    /// Accepts personal records, refuses ranking entries
    #[derive(Default)]
    struct NoRankingWrites {
        inner: MemoryBackend,
    }

    impl KvBackend for NoRankingWrites {
        fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
            if key.starts_with("rank:") {
                return Err(BackendError::Rejected {
                    key: key.to_string(),
                    message: "quota".to_string(),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), BackendError> {
            self.inner.remove(key)
        }

        fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
            self.inner.keys_with_prefix(prefix)
        }
    }

    #[test]
    fn test_ranking_failure_keeps_the_record() {
        let store = KvHighscoreStore::new(NoRankingWrites::default());
        store.sign_in(Identity::new("u1", None, None));
        assert!(store.save_highscore("dodge", 40).unwrap());
        assert_eq!(store.get_highscore("dodge"), 40);
        assert!(store.leaderboard("dodge").is_empty());
        assert!(!store.save_highscore("dodge", 40).unwrap());
    }

    #[test]
    fn test_corrupt_record_reads_as_zero() {
        let store = store();
        store.backend().set("hs:u1:dodge", "garbage").unwrap();
        assert_eq!(store.get_highscore("dodge"), 0);
        assert!(matches!(
            store.save_highscore("dodge", 5),
            Err(StoreError::Encode(_))
        ));
    }
}
