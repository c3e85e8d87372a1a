//! Collaborator facade.
//!
//! The minimal contract the HTTP layer (out of scope here) consumes: submit
//! events, request checkpoints, audit, fetch tree levels and inclusion
//! proofs. Also carries the AI-scorer contract - the scorer itself is
//! opaque, the core only accepts a pre-computed score plus a feature-hash
//! blob and records it like any other event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use claimchain_core::{CancelToken, Checkpoint, CheckpointId, EntryId, Error, Hash, InclusionProof, Result};
use claimchain_keys::KeyManager;
use claimchain_storage::Store;
use claimchain_verify::{AuditReport, Verifier};

use crate::append::AppendLog;
use crate::checkpoint::CheckpointEngine;

/// What a caller gets back for an accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReceipt {
    pub entry_id: EntryId,
    pub chain_hash: Hash,
}

/// Checkpoint metadata without the signature payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub checkpoint_id: CheckpointId,
    pub merkle_root: Hash,
    pub range_lo: EntryId,
    pub range_hi: EntryId,
    pub signer_epoch_id: String,
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            checkpoint_id: cp.id,
            merkle_root: cp.merkle_root,
            range_lo: cp.range_lo,
            range_hi: cp.range_hi,
            signer_epoch_id: cp.signer_epoch_id.clone(),
            created_at: cp.created_at,
        }
    }
}

/// The AI-scorer contract: a pre-computed fraud score plus the hash of the
/// feature vector it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePayload {
    /// Fraud score in `[0, 1]`.
    pub score: f32,
    /// Version tag of the scoring model.
    pub model_version: String,
    /// SHA3-256 of the canonical feature vector, 64 hex characters.
    pub feature_hash: String,
}

impl ScorePayload {
    fn validate(&self) -> Result<()> {
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(Error::invalid_input("score must be within [0, 1]"));
        }
        if self.model_version.is_empty() {
            return Err(Error::invalid_input("model_version must not be empty"));
        }
        // Round-trips the hex so malformed digests are rejected up front.
        Hash::from_hex(&self.feature_hash)
            .map_err(|_| Error::invalid_input("feature_hash must be 64 hex characters"))?;
        Ok(())
    }
}

/// Thin wrapper over the append log, checkpoint engine, and verifier.
pub struct LogService<S> {
    log: AppendLog<S>,
    engine: CheckpointEngine<S>,
    verifier: Verifier<S>,
    store: Arc<S>,
}

impl<S: Store> LogService<S> {
    pub fn new(store: Arc<S>, keys: Arc<KeyManager<S>>) -> Self {
        Self {
            log: AppendLog::new(Arc::clone(&store)),
            engine: CheckpointEngine::new(Arc::clone(&store), keys),
            verifier: Verifier::new(Arc::clone(&store)),
            store,
        }
    }

    /// The underlying append log, for callers that need more than the
    /// facade.
    pub fn log(&self) -> &AppendLog<S> {
        &self.log
    }

    /// The underlying checkpoint engine.
    pub fn engine(&self) -> &CheckpointEngine<S> {
        &self.engine
    }

    /// Record a claim lifecycle event.
    pub fn submit_claim_event(
        &self,
        claim_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<EventReceipt> {
        let entry = self.log.append(claim_id, event_type, payload)?;
        Ok(EventReceipt {
            entry_id: entry.id,
            chain_hash: entry.prev_hash,
        })
    }

    /// Record an AI fraud score for a claim.
    pub fn submit_score(&self, claim_id: &str, score: ScorePayload) -> Result<EventReceipt> {
        score.validate()?;
        let payload = json!({
            "score": score.score,
            "model_version": score.model_version,
            "feature_hash": score.feature_hash,
        });
        let entry = self.log.append(claim_id, "score", &payload)?;
        Ok(EventReceipt {
            entry_id: entry.id,
            chain_hash: entry.prev_hash,
        })
    }

    /// Checkpoint everything appended since the last checkpoint.
    pub fn request_checkpoint(&self) -> Result<CheckpointSummary> {
        let checkpoint = self.engine.generate()?;
        Ok(CheckpointSummary::from(&checkpoint))
    }

    /// Run verification and return the aggregate report.
    ///
    /// With no range this is a full audit: the whole chain plus every
    /// checkpoint. With a range, the chain is verified over that range and
    /// only checkpoints fully contained in it are checked.
    pub fn audit(
        &self,
        range: Option<(EntryId, EntryId)>,
        cancel: &CancelToken,
    ) -> Result<AuditReport> {
        match range {
            None => self.verifier.full_verification(cancel),
            Some((lo, hi)) => {
                let chain = self.verifier.verify_chain(lo, hi, cancel)?;
                let mut checkpoints = Vec::new();
                for checkpoint in self.store.checkpoints()? {
                    cancel.check()?;
                    if checkpoint.range_lo >= lo && checkpoint.range_hi <= hi {
                        checkpoints.push(self.verifier.verify_checkpoint(&checkpoint)?);
                    }
                }
                Ok(AuditReport {
                    chain,
                    checkpoints,
                    entries_checked: hi - lo + 1,
                })
            }
        }
    }

    /// Merkle levels over a range; defaults to the whole log.
    pub fn tree_levels(&self, range: Option<(EntryId, EntryId)>) -> Result<Vec<Vec<Hash>>> {
        let (lo, hi) = match range {
            Some(range) => range,
            None => {
                let hi = self.log.last_id()?.ok_or(Error::EmptyRange)?;
                (1, hi)
            }
        };
        self.engine.list_levels(lo, hi)
    }

    /// Inclusion proof for an entry against its covering checkpoint.
    pub fn inclusion_proof(&self, entry_id: EntryId) -> Result<InclusionProof> {
        self.engine.inclusion_proof(entry_id)
    }

    /// Convenience: is the log currently clean end to end?
    pub fn is_clean(&self, cancel: &CancelToken) -> Result<bool> {
        Ok(self.verifier.full_verification(cancel)?.is_clean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimchain_keys::{FixedClock, MasterSeed};
    use claimchain_storage::MemoryStore;

    fn service() -> LogService<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::with_clock(
            Arc::clone(&store),
            MasterSeed::from_bytes([3u8; 32]),
            FixedClock::new("E1"),
        ));
        LogService::new(store, keys)
    }

    #[test]
    fn test_submit_returns_receipt() {
        let svc = service();
        let receipt = svc
            .submit_claim_event("CLM-1", "submit", &json!({"amount": 100}))
            .unwrap();
        assert_eq!(receipt.entry_id, 1);
        assert_eq!(receipt.chain_hash, svc.log().get(1).unwrap().prev_hash);
    }

    #[test]
    fn test_score_contract_validation() {
        let svc = service();
        let good = ScorePayload {
            score: 0.42,
            model_version: "fraud-v3".into(),
            feature_hash: "ab".repeat(32),
        };
        assert!(svc.submit_score("CLM-1", good).is_ok());

        for bad in [
            ScorePayload {
                score: 1.5,
                model_version: "m".into(),
                feature_hash: "ab".repeat(32),
            },
            ScorePayload {
                score: f32::NAN,
                model_version: "m".into(),
                feature_hash: "ab".repeat(32),
            },
            ScorePayload {
                score: 0.5,
                model_version: String::new(),
                feature_hash: "ab".repeat(32),
            },
            ScorePayload {
                score: 0.5,
                model_version: "m".into(),
                feature_hash: "not-hex".into(),
            },
        ] {
            assert!(matches!(
                svc.submit_score("CLM-1", bad),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_checkpoint_and_audit_flow() {
        let svc = service();
        for i in 0..4 {
            svc.submit_claim_event("CLM-1", "submit", &json!({ "i": i }))
                .unwrap();
        }

        let summary = svc.request_checkpoint().unwrap();
        assert_eq!((summary.range_lo, summary.range_hi), (1, 4));

        let report = svc.audit(None, &CancelToken::new()).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.entries_checked, 4);
        assert!(svc.is_clean(&CancelToken::new()).unwrap());
    }

    #[test]
    fn test_ranged_audit_selects_contained_checkpoints() {
        let svc = service();
        for i in 0..6 {
            svc.submit_claim_event("CLM-1", "submit", &json!({ "i": i }))
                .unwrap();
        }
        svc.engine().generate_to(3).unwrap(); // covers 1..=3
        svc.request_checkpoint().unwrap(); // covers 4..=6

        let report = svc.audit(Some((4, 6)), &CancelToken::new()).unwrap();
        assert_eq!(report.checkpoints.len(), 1);
        assert_eq!(report.checkpoints[0].checkpoint_id(), 2);
    }

    #[test]
    fn test_tree_levels_default_range() {
        let svc = service();
        assert!(matches!(svc.tree_levels(None), Err(Error::EmptyRange)));

        for i in 0..3 {
            svc.submit_claim_event("CLM-1", "submit", &json!({ "i": i }))
                .unwrap();
        }
        let levels = svc.tree_levels(None).unwrap();
        assert_eq!(levels[0].len(), 3);
        assert_eq!(levels.last().unwrap().len(), 1);
    }
}
