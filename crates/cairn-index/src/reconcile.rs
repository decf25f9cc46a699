//! Repair pass for objects the write path missed.

use serde::Serialize;
use tracing::{info, warn};

use crate::manager::{IndexManager, IndexOutcome};

/// Summary of a [`IndexManager::reconcile`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Locally available objects examined.
    pub scanned: usize,
    /// Objects now present in a schema index.
    pub indexed: usize,
    /// Objects now present in the unclassified list.
    pub unclassified: usize,
    /// Internal objects, schemas, unindexed instances, and objects still in
    /// flight.
    pub skipped: usize,
    /// Deleted objects, left out of every index.
    pub removed: usize,
    /// Objects whose indexing returned an error.
    pub failed: usize,
}

impl IndexManager {
    /// Re-index every locally available object.
    ///
    /// Objects that are not yet local are covered when they arrive, through
    /// the write path. Safe to run at any time: indexing is idempotent.
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for id in self.store().object_ids() {
            report.scanned += 1;
            if self.registry().state().is_internal(&id) {
                report.skipped += 1;
                continue;
            }
            match self.ensure_indexed(&id).await {
                Ok(IndexOutcome::Indexed { .. } | IndexOutcome::AlreadyIndexed) => report.indexed += 1,
                Ok(IndexOutcome::Unclassified | IndexOutcome::AlreadyUnclassified) => {
                    report.unclassified += 1
                }
                Ok(IndexOutcome::Skipped | IndexOutcome::SchemaRegistered | IndexOutcome::InFlight) => {
                    report.skipped += 1
                }
                Ok(IndexOutcome::Removed) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(object = %id.short_hex(), error = %e, "reconciliation failed for object");
                }
            }
        }
        info!(
            scanned = report.scanned,
            indexed = report.indexed,
            unclassified = report.unclassified,
            skipped = report.skipped,
            removed = report.removed,
            failed = report.failed,
            "reconciliation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::manager::tests::{create_instance, create_schema, setup};
    use cairn_types::ObjectId;

    #[tokio::test]
    async fn reconcile_indexes_missed_objects() {
        // No hook installed: every write below is "missed".
        let (store, manager) = setup();
        let task = create_schema(&store, "app/schema/task", true);
        let note = create_schema(&store, "app/schema/note", false);
        let tasks: Vec<ObjectId> = (0..2).map(|_| create_instance(&store, Some(&task))).collect();
        create_instance(&store, Some(&note));
        let loose = create_instance(&store, None);
        create_instance(&store, Some(&ObjectId::from_bytes(b"remote schema")));

        let total = store.len();
        let report = manager.reconcile().await;
        assert_eq!(report.scanned, total);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.unclassified, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.scanned,
            report.indexed + report.unclassified + report.skipped + report.removed + report.failed
        );

        let mut members = manager.members(&task).unwrap();
        members.sort();
        let mut expected = tasks.clone();
        expected.sort();
        assert_eq!(members, expected);
        assert_eq!(manager.unclassified_members().unwrap(), vec![loose]);

        let again = manager.reconcile().await;
        assert_eq!(again.indexed, 2);
        assert_eq!(manager.members(&task).unwrap().len(), 2);
    }
}
