use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use tq_crypto::{BlockHasher, CanonicalEncoder, HashChainVerifier};
use tq_store::{ChainStore, Tip};
use tq_types::{
    Activity, ActivityScore, ActivitySubmission, Block, Campaign, CompletionRecord, EventPayload,
    EventType, GenesisRecord, Receipt, ValidationError, GENESIS_PREV_HASH, PAYLOAD_VERSION,
};

use crate::activity::NewActivity;
use crate::config::LedgerConfig;
use crate::error::LedgerError;

/// Outcome of a full-chain tamper check.
///
/// Integrity failures are data, not errors: `valid` is `false` and `error`
/// describes the first violation found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub error: Option<String>,
}

impl ChainVerification {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

/// The single write path into the ledger.
///
/// Owns a store handle and turns typed events into hash-linked blocks. Safe
/// to share across threads; concurrent appends are serialized by the store's
/// compare-and-append and retried here.
pub struct LedgerService<S: ChainStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: ChainStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create the schema and, if the ledger is empty, the genesis block.
    ///
    /// Returns the genesis receipt when this call created it. Losing the
    /// genesis race to another writer is not an error.
    pub fn initialize_and_ensure_genesis(&self) -> Result<Option<Receipt>, LedgerError> {
        self.store.initialize()?;
        if self.store.try_tip()?.is_some() {
            return Ok(None);
        }

        let payload = EventPayload::Genesis(GenesisRecord {
            version: PAYLOAD_VERSION,
            note: self.config.genesis_note.clone(),
        });
        payload.validate()?;
        let payload_json = CanonicalEncoder::encode_map(&stamped(&payload)?);
        let block = seal(0, now(), GENESIS_PREV_HASH, EventType::Genesis.as_str(), payload_json);

        match self.store.append_if_tip_matches(None, &block) {
            Ok(()) => {
                info!(hash = %block.hash, "created genesis block");
                Ok(Some(block.receipt()))
            }
            Err(e) if e.is_tip_moved() => {
                debug!("genesis already written by another writer");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append an arbitrary event payload.
    ///
    /// The payload is stamped with `event_type` and `version`, canonically
    /// encoded, and appended on the current tip. A lost race on the tip is
    /// retried up to `max_append_attempts` times.
    pub fn append_event(
        &self,
        event_type: &EventType,
        payload: Map<String, Value>,
    ) -> Result<Receipt, LedgerError> {
        if *event_type == EventType::Genesis {
            let err = ValidationError::new("event_type", "genesis is reserved for height 0");
            return Err(err.into());
        }
        let mut payload = payload;
        payload.insert("event_type".into(), Value::String(event_type.to_string()));
        payload.insert("version".into(), Value::from(PAYLOAD_VERSION));
        let payload_json = CanonicalEncoder::encode_map(&payload);
        self.commit(event_type.as_str(), &payload_json)
    }

    /// Validate and append a typed payload.
    pub fn append(&self, payload: &EventPayload) -> Result<Receipt, LedgerError> {
        payload.validate()?;
        let map = stamped(payload)?;
        self.append_event(&payload.event_type(), map)
    }

    /// Validate a submission, assign it an id, and append it.
    ///
    /// Returns the stored activity alongside the receipt.
    pub fn submit_activity(&self, new: NewActivity) -> Result<(Activity, Receipt), LedgerError> {
        let id = uuid::Uuid::new_v4().to_string();
        let activity = new.into_activity(id, now())?;
        let receipt = self.append(&EventPayload::ActivitySubmission(ActivitySubmission {
            activity: activity.clone(),
        }))?;
        Ok((activity, receipt))
    }

    pub fn add_activity(&self, new: NewActivity) -> Result<Receipt, LedgerError> {
        self.submit_activity(new).map(|(_, receipt)| receipt)
    }

    pub fn score_activity(&self, score: ActivityScore) -> Result<Receipt, LedgerError> {
        self.append(&EventPayload::ActivityScored(score))
    }

    pub fn record_completion(&self, completion: CompletionRecord) -> Result<Receipt, LedgerError> {
        self.append(&EventPayload::Completion(completion))
    }

    pub fn record_campaign(&self, campaign: Campaign) -> Result<Receipt, LedgerError> {
        self.append(&EventPayload::CampaignGenerated(campaign))
    }

    /// Every activity submission, oldest first.
    pub fn get_activity_events(&self) -> Result<Vec<ActivitySubmission>, LedgerError> {
        self.store
            .scan_by_event_type(EventType::ActivitySubmission.as_str())?
            .iter()
            .map(decode_submission)
            .collect()
    }

    /// The most recent activity submission, if any.
    pub fn latest_activity_event(&self) -> Result<Option<ActivitySubmission>, LedgerError> {
        let blocks = self
            .store
            .scan_by_event_type(EventType::ActivitySubmission.as_str())?;
        blocks.last().map(decode_submission).transpose()
    }

    /// Blocks carrying `event_type`, oldest first.
    pub fn events_of_type(&self, event_type: &EventType) -> Result<Vec<Block>, LedgerError> {
        Ok(self.store.scan_by_event_type(event_type.as_str())?)
    }

    /// The `limit` newest blocks (all when `None`), oldest first.
    pub fn blocks(&self, limit: Option<u64>) -> Result<Vec<Block>, LedgerError> {
        match limit {
            Some(limit) => Ok(self.store.scan_latest(limit)?),
            None => Ok(self.store.scan_all()?),
        }
    }

    pub fn block(&self, height: u64) -> Result<Option<Block>, LedgerError> {
        Ok(self.store.get_by_height(height)?)
    }

    pub fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, LedgerError> {
        Ok(self.store.get_by_hash(hash)?)
    }

    /// Current tip, or `None` before genesis.
    pub fn tip(&self) -> Result<Option<Tip>, LedgerError> {
        Ok(self.store.try_tip()?)
    }

    pub fn block_count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.block_count()?)
    }

    /// Re-walk the chain from genesis up to the tip seen now, recomputing
    /// every hash and link.
    ///
    /// Blocks appended while the scan runs are not considered. Store
    /// failures are reported in the result rather than returned.
    pub fn verify_chain(&self) -> ChainVerification {
        let tip = match self.store.try_tip() {
            Ok(Some(tip)) => tip,
            Ok(None) => return ChainVerification::failed("No blocks found"),
            Err(e) => return ChainVerification::failed(format!("Store unavailable: {e}")),
        };
        let blocks = match self.store.scan_range(0, tip.height) {
            Ok(blocks) => blocks,
            Err(e) => return ChainVerification::failed(format!("Store unavailable: {e}")),
        };

        match HashChainVerifier::verify_chain(&blocks) {
            Ok(()) => {
                debug!(tip = tip.height, "chain verified");
                ChainVerification::ok()
            }
            Err(violation) => {
                warn!(%violation, "chain verification failed");
                ChainVerification::failed(violation.to_string())
            }
        }
    }

    fn commit(&self, event_type: &str, payload_json: &str) -> Result<Receipt, LedgerError> {
        let attempts = self.config.max_append_attempts.max(1);
        for attempt in 1..=attempts {
            let tip = self.store.tip()?;
            let height = tip.height + 1;
            let block = seal(height, now(), &tip.hash, event_type, payload_json.to_string());

            match self.store.append_if_tip_matches(Some(tip.height), &block) {
                Ok(()) => {
                    debug!(
                        height = block.height,
                        event_type,
                        hash = %block.short_hash(),
                        "appended block"
                    );
                    return Ok(block.receipt());
                }
                Err(e) if e.is_tip_moved() => {
                    warn!(attempt, attempts, event_type, "tip moved during append, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!(attempts, event_type, "append gave up: tip kept moving");
        Err(LedgerError::AppendFailed { attempts })
    }
}

/// Serialize a typed payload to its map form with the version stamp.
fn stamped(payload: &EventPayload) -> Result<Map<String, Value>, LedgerError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| tq_crypto::EncodeError::Serialization(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(tq_crypto::EncodeError::Serialization("payload is not an object".into()).into());
    };
    map.insert("version".into(), Value::from(PAYLOAD_VERSION));
    Ok(map)
}

fn seal(
    height: u64,
    timestamp: i64,
    prev_hash: &str,
    event_type: &str,
    payload_json: String,
) -> Block {
    Block {
        height,
        timestamp,
        prev_hash: prev_hash.to_string(),
        hash: BlockHasher::hash(height, timestamp, prev_hash, event_type, &payload_json),
        event_type: event_type.to_string(),
        payload_json,
    }
}

fn decode_submission(block: &Block) -> Result<ActivitySubmission, LedgerError> {
    match block.decode()? {
        EventPayload::ActivitySubmission(submission) => Ok(submission),
        other => Err(tq_types::TypeError::PayloadMismatch {
            event_type: block.event_type.clone(),
            reason: format!("decoded as {}", other.event_type()),
        }
        .into()),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;
    use tq_store::{InMemoryChainStore, SqliteChainStore, StoreError, StoreResult};
    use tq_types::CampaignTier;

    use super::*;

    fn ledger() -> LedgerService<InMemoryChainStore> {
        let ledger = LedgerService::new(InMemoryChainStore::new());
        ledger.initialize_and_ensure_genesis().unwrap();
        ledger
    }

    fn old_rag() -> NewActivity {
        NewActivity::new("Old Rag Mountain Trail", "9 mile hike", "alex", 8.7, 250)
    }

    fn kayak() -> NewActivity {
        NewActivity::new("Shenandoah River Kayaking", "Calm river paddle", "maria", 5.5, 140)
    }

    // ---------------------------------------------------------------
    // Genesis
    // ---------------------------------------------------------------

    #[test]
    fn genesis_is_created_once() {
        let ledger = LedgerService::new(InMemoryChainStore::new());
        let first = ledger.initialize_and_ensure_genesis().unwrap();
        let second = ledger.initialize_and_ensure_genesis().unwrap();

        let receipt = first.unwrap();
        assert_eq!(receipt.height, 0);
        assert_eq!(receipt.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(receipt.event_type, "genesis");
        assert!(second.is_none());
        assert_eq!(ledger.block_count().unwrap(), 1);
    }

    #[test]
    fn genesis_payload_carries_note_and_version() {
        let ledger = ledger();
        let genesis = ledger.block(0).unwrap().unwrap();
        assert_eq!(
            genesis.payload_json,
            r#"{"event_type":"genesis","note":"TerraQuest Ledger v1","version":1}"#
        );
    }

    #[test]
    fn configured_genesis_note() {
        let config = LedgerConfig {
            genesis_note: "Staging ledger".into(),
            ..LedgerConfig::default()
        };
        let ledger = LedgerService::with_config(InMemoryChainStore::new(), config);
        ledger.initialize_and_ensure_genesis().unwrap();
        let genesis = ledger.block(0).unwrap().unwrap();
        assert!(genesis.payload_json.contains(r#""note":"Staging ledger""#));
    }

    #[test]
    fn append_before_genesis_fails() {
        let ledger = LedgerService::new(InMemoryChainStore::new());
        assert!(matches!(
            ledger.add_activity(old_rag()),
            Err(LedgerError::EmptyStore)
        ));
    }

    // ---------------------------------------------------------------
    // Appends
    // ---------------------------------------------------------------

    #[test]
    fn add_activity_lands_at_height_one() {
        let ledger = ledger();
        let genesis = ledger.tip().unwrap().unwrap();
        let receipt = ledger.add_activity(old_rag()).unwrap();

        assert_eq!(receipt.height, 1);
        assert_eq!(receipt.prev_hash, genesis.hash);
        assert_eq!(receipt.event_type, "activity_submission");
        assert!(tq_types::is_hex_digest(&receipt.hash));
        assert_eq!(ledger.verify_chain(), ChainVerification::ok());
    }

    #[test]
    fn submitted_activity_is_normalized() {
        let ledger = ledger();
        let padded = NewActivity::new("  Old Rag  ", "9 mile hike", " alex ", 8.7, 250)
            .posted_at(1_700_000_000);
        let (activity, receipt) = ledger.submit_activity(padded).unwrap();

        assert_eq!(activity.name, "Old Rag");
        assert_eq!(activity.user_who_posted, "alex");
        assert_eq!(activity.time_posted, 1_700_000_000);
        assert!(uuid::Uuid::parse_str(&activity.id).is_ok());

        let block = ledger.block(receipt.height).unwrap().unwrap();
        let payload = block.payload_value().unwrap();
        assert_eq!(payload["event_type"], "activity_submission");
        assert_eq!(payload["version"], 1);
        assert_eq!(payload["activity"]["id"], activity.id.as_str());
        assert!(block.payload_json.contains(r#""difficulty_rating":8.7"#));
    }

    #[test]
    fn invalid_activity_is_not_appended() {
        let ledger = ledger();
        let mut bad = old_rag();
        bad.points = -5;
        let err = ledger.add_activity(bad).unwrap_err();
        assert_eq!(err.field(), Some("points"));
        assert_eq!(ledger.block_count().unwrap(), 1);
    }

    #[test]
    fn every_event_type_appends() {
        let ledger = ledger();
        let (activity, _) = ledger.submit_activity(old_rag()).unwrap();

        let scored = ledger
            .score_activity(ActivityScore {
                activity_id: activity.id.clone(),
                difficulty_score: 8.7,
                points: 250,
                risk_level: "moderate".into(),
            })
            .unwrap();
        let completed = ledger
            .record_completion(CompletionRecord {
                user_id: "user_1".into(),
                activity_id: activity.id.clone(),
                completed_at: 1_700_000_500,
            })
            .unwrap();
        let campaign = ledger
            .record_campaign(Campaign {
                title: "Summit Seekers".into(),
                description: "Extreme hikes".into(),
                tier: CampaignTier::Extreme,
                total_points: 250,
                activities: vec![activity.id.clone()],
            })
            .unwrap();

        assert_eq!(scored.height, 2);
        assert_eq!(completed.height, 3);
        assert_eq!(campaign.height, 4);
        assert_eq!(campaign.event_type, "campaign_generated");
        assert!(ledger.verify_chain().valid);
    }

    #[test]
    fn custom_event_type_via_generic_append() {
        let ledger = ledger();
        let kind: EventType = "badge_awarded".parse().unwrap();
        let payload = json!({"user_id": "alex", "badge": "summit"});
        let Value::Object(map) = payload else { unreachable!() };
        let receipt = ledger.append_event(&kind, map).unwrap();

        assert_eq!(receipt.event_type, "badge_awarded");
        let blocks = ledger.events_of_type(&kind).unwrap();
        assert_eq!(
            blocks[0].payload_json,
            r#"{"badge":"summit","event_type":"badge_awarded","user_id":"alex","version":1}"#
        );
    }

    #[test]
    fn stamp_overrides_caller_supplied_tag() {
        let ledger = ledger();
        let Value::Object(map) = json!({"event_type": "genesis", "version": 7}) else {
            unreachable!()
        };
        let receipt = ledger.append_event(&EventType::Completion, map).unwrap();
        let block = ledger.block(receipt.height).unwrap().unwrap();
        assert_eq!(block.payload_json, r#"{"event_type":"completion","version":1}"#);
    }

    #[test]
    fn genesis_cannot_be_appended_later() {
        let ledger = ledger();
        let err = ledger.append_event(&EventType::Genesis, Map::new()).unwrap_err();
        assert_eq!(err.field(), Some("event_type"));
    }

    #[test]
    fn invalid_campaign_rejected() {
        let ledger = ledger();
        let err = ledger
            .record_campaign(Campaign {
                title: " ".into(),
                description: "x".into(),
                tier: CampaignTier::Easy,
                total_points: 0,
                activities: vec![],
            })
            .unwrap_err();
        assert_eq!(err.field(), Some("title"));
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    #[test]
    fn activity_events_are_full_history_in_order() {
        let ledger = ledger();
        assert!(ledger.get_activity_events().unwrap().is_empty());
        assert!(ledger.latest_activity_event().unwrap().is_none());

        ledger.add_activity(old_rag()).unwrap();
        ledger
            .record_completion(CompletionRecord {
                user_id: "u".into(),
                activity_id: "a".into(),
                completed_at: 0,
            })
            .unwrap();
        ledger.add_activity(kayak()).unwrap();

        let events = ledger.get_activity_events().unwrap();
        let names: Vec<&str> = events.iter().map(|e| e.activity.name.as_str()).collect();
        assert_eq!(names, vec!["Old Rag Mountain Trail", "Shenandoah River Kayaking"]);

        let latest = ledger.latest_activity_event().unwrap().unwrap();
        assert_eq!(latest.activity.name, "Shenandoah River Kayaking");
    }

    #[test]
    fn blocks_with_limit_are_newest_ascending() {
        let ledger = ledger();
        for _ in 0..4 {
            ledger.add_activity(old_rag()).unwrap();
        }
        let heights: Vec<u64> = ledger.blocks(Some(2)).unwrap().iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![3, 4]);
        assert_eq!(ledger.blocks(None).unwrap().len(), 5);
    }

    #[test]
    fn lookup_by_hash() {
        let ledger = ledger();
        let receipt = ledger.add_activity(old_rag()).unwrap();
        let block = ledger.block_by_hash(&receipt.hash).unwrap().unwrap();
        assert_eq!(block.height, receipt.height);
        assert!(ledger.block_by_hash(&"0".repeat(64)).unwrap().is_none());
    }

    // ---------------------------------------------------------------
    // Verification
    // ---------------------------------------------------------------

    #[test]
    fn empty_ledger_does_not_verify() {
        let ledger = LedgerService::new(InMemoryChainStore::new());
        assert_eq!(ledger.verify_chain(), ChainVerification::failed("No blocks found"));
    }

    #[test]
    fn corrupted_hash_is_reported() {
        let ledger = ledger();
        ledger.add_activity(old_rag()).unwrap();
        ledger.store().tamper(1, |b| b.hash = "f".repeat(64)).unwrap();

        let result = ledger.verify_chain();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Hash mismatch at height 1"));
    }

    #[test]
    fn replaced_prev_hash_is_reported() {
        let ledger = ledger();
        ledger.add_activity(old_rag()).unwrap();
        ledger.add_activity(kayak()).unwrap();
        ledger.store().tamper(2, |b| b.prev_hash = "a".repeat(64)).unwrap();

        let result = ledger.verify_chain();
        assert_eq!(result.error.as_deref(), Some("Broken link at height 2"));
    }

    #[test]
    fn edited_payload_is_reported() {
        let ledger = ledger();
        ledger.add_activity(old_rag()).unwrap();
        ledger
            .store()
            .tamper(1, |b| b.payload_json = b.payload_json.replace("250", "999"))
            .unwrap();
        assert_eq!(
            ledger.verify_chain().error.as_deref(),
            Some("Hash mismatch at height 1")
        );
    }

    #[test]
    fn tampered_genesis_link_is_reported() {
        let ledger = ledger();
        ledger.store().tamper(0, |b| b.prev_hash = "1".repeat(64)).unwrap();
        assert_eq!(
            ledger.verify_chain().error.as_deref(),
            Some("Broken link at height 0")
        );
    }

    #[test]
    fn verification_serializes_as_valid_and_error() {
        let json = serde_json::to_value(ChainVerification::ok()).unwrap();
        assert_eq!(json, json!({"valid": true, "error": null}));
    }

    #[test]
    fn sqlite_tamper_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraquest.db");
        let ledger = LedgerService::new(SqliteChainStore::open(&path).unwrap());
        ledger.initialize_and_ensure_genesis().unwrap();
        ledger.add_activity(old_rag()).unwrap();
        assert!(ledger.verify_chain().valid);

        let raw = rusqlite::Connection::open(&path).unwrap();
        raw.execute(
            "UPDATE blocks SET payload_json = replace(payload_json, 'alex', 'mallory') WHERE height = 1",
            [],
        )
        .unwrap();

        assert_eq!(
            ledger.verify_chain().error.as_deref(),
            Some("Hash mismatch at height 1")
        );
    }

    fn sqlite_ledger_with_activity() -> (tempfile::TempDir, LedgerService<SqliteChainStore>) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerService::new(SqliteChainStore::open(dir.path().join("tq.db")).unwrap());
        ledger.initialize_and_ensure_genesis().unwrap();
        ledger.add_activity(old_rag()).unwrap();
        (dir, ledger)
    }

    fn overwrite_with_bytes(dir: &tempfile::TempDir, column: &str, bytes: Vec<u8>) {
        let raw = rusqlite::Connection::open(dir.path().join("tq.db")).unwrap();
        raw.execute(
            &format!("UPDATE blocks SET {column} = CAST(?1 AS TEXT) WHERE height = 1"),
            [bytes],
        )
        .unwrap();
    }

    #[test]
    fn non_utf8_payload_is_a_hash_mismatch() {
        let (dir, ledger) = sqlite_ledger_with_activity();
        let mut payload = ledger.block(1).unwrap().unwrap().payload_json.into_bytes();
        payload[0] ^= 0x80;
        overwrite_with_bytes(&dir, "payload_json", payload);

        let result = ledger.verify_chain();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Hash mismatch at height 1"));
        assert_eq!(ledger.blocks(None).unwrap().len(), 2);
    }

    #[test]
    fn non_utf8_hash_is_a_hash_mismatch() {
        let (dir, ledger) = sqlite_ledger_with_activity();
        let mut hash = ledger.block(1).unwrap().unwrap().hash.into_bytes();
        hash[0] = 0xc3;
        overwrite_with_bytes(&dir, "hash", hash);

        assert_eq!(
            ledger.verify_chain().error.as_deref(),
            Some("Hash mismatch at height 1")
        );
    }

    #[test]
    fn non_utf8_prev_hash_is_a_broken_link() {
        let (dir, ledger) = sqlite_ledger_with_activity();
        let mut prev = ledger.block(1).unwrap().unwrap().prev_hash.into_bytes();
        prev[63] = 0x80;
        overwrite_with_bytes(&dir, "prev_hash", prev);

        assert_eq!(
            ledger.verify_chain().error.as_deref(),
            Some("Broken link at height 1")
        );
    }

    // ---------------------------------------------------------------
    // Concurrency
    // ---------------------------------------------------------------

    /// Delegates to an in-memory store but reports a lost race for the first
    /// `losses` appends.
    struct FlakyStore {
        inner: InMemoryChainStore,
        losses: AtomicU32,
        attempts: AtomicU32,
    }

    impl FlakyStore {
        fn losing(losses: u32) -> Self {
            Self {
                inner: InMemoryChainStore::new(),
                losses: AtomicU32::new(losses),
                attempts: AtomicU32::new(0),
            }
        }
    }

    impl ChainStore for FlakyStore {
        fn initialize(&self) -> StoreResult<()> {
            self.inner.initialize()
        }

        fn tip(&self) -> StoreResult<Tip> {
            self.inner.tip()
        }

        fn append_if_tip_matches(
            &self,
            expected_tip: Option<u64>,
            block: &Block,
        ) -> StoreResult<()> {
            if expected_tip.is_some() {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                let remaining = self.losses.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.losses.store(remaining - 1, Ordering::SeqCst);
                    return Err(StoreError::TipMoved {
                        expected: expected_tip,
                        actual: expected_tip.map(|h| h + 1),
                    });
                }
            }
            self.inner.append_if_tip_matches(expected_tip, block)
        }

        fn scan_all(&self) -> StoreResult<Vec<Block>> {
            self.inner.scan_all()
        }

        fn scan_by_event_type(&self, event_type: &str) -> StoreResult<Vec<Block>> {
            self.inner.scan_by_event_type(event_type)
        }

        fn scan_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>> {
            self.inner.scan_range(from, to)
        }

        fn get_by_height(&self, height: u64) -> StoreResult<Option<Block>> {
            self.inner.get_by_height(height)
        }

        fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Block>> {
            self.inner.get_by_hash(hash)
        }

        fn block_count(&self) -> StoreResult<u64> {
            self.inner.block_count()
        }
    }

    #[test]
    fn lost_races_are_retried() {
        let ledger = LedgerService::new(FlakyStore::losing(3));
        ledger.initialize_and_ensure_genesis().unwrap();
        let receipt = ledger.add_activity(old_rag()).unwrap();

        assert_eq!(receipt.height, 1);
        assert_eq!(ledger.store().attempts.load(Ordering::SeqCst), 4);
        assert!(ledger.verify_chain().valid);
    }

    #[test]
    fn retries_are_bounded() {
        let config = LedgerConfig {
            max_append_attempts: 3,
            ..LedgerConfig::default()
        };
        let ledger = LedgerService::with_config(FlakyStore::losing(u32::MAX), config);
        ledger.initialize_and_ensure_genesis().unwrap();

        let err = ledger.add_activity(old_rag()).unwrap_err();
        assert!(matches!(err, LedgerError::AppendFailed { attempts: 3 }));
        assert_eq!(ledger.store().attempts.load(Ordering::SeqCst), 3);
        assert_eq!(ledger.block_count().unwrap(), 1);
    }

    #[test]
    fn concurrent_appends_never_share_a_height() {
        let config = LedgerConfig {
            max_append_attempts: 64,
            ..LedgerConfig::default()
        };
        let ledger = Arc::new(LedgerService::with_config(InMemoryChainStore::new(), config));
        ledger.initialize_and_ensure_genesis().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    (0..5)
                        .map(|_| ledger.add_activity(old_rag()).unwrap().height)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut heights: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        heights.sort_unstable();
        assert_eq!(heights, (1..=40).collect::<Vec<_>>());
        assert!(ledger.verify_chain().valid);
    }

    #[test]
    fn separate_processes_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraquest.db");
        let config = LedgerConfig {
            max_append_attempts: 64,
            ..LedgerConfig::default()
        };
        LedgerService::new(SqliteChainStore::open(&path).unwrap())
            .initialize_and_ensure_genesis()
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let config = config.clone();
                thread::spawn(move || {
                    let ledger =
                        LedgerService::with_config(SqliteChainStore::open(&path).unwrap(), config);
                    assert!(ledger.initialize_and_ensure_genesis().unwrap().is_none());
                    for _ in 0..3 {
                        ledger.add_activity(kayak()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ledger = LedgerService::new(SqliteChainStore::open(&path).unwrap());
        assert_eq!(ledger.block_count().unwrap(), 13);
        assert_eq!(ledger.events_of_type(&EventType::Genesis).unwrap().len(), 1);
        assert!(ledger.verify_chain().valid);
    }
}
