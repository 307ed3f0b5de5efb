use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use courier_protocol::constants::REGISTRY_GRACE_PERIOD;
use serde::Serialize;
use tracing::debug;

/// Lifecycle of one transfer as shown to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Nothing is tracked under the identifier.
    Idle,
    InProgress,
    Completed,
    Failed,
}

/// Point-in-time view of one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferSnapshot {
    pub status: TransferStatus,
    /// Integer percentage in `[0, 100]`.
    pub progress: u8,
    /// Monotonic token distinguishing reuses of the same identifier.
    pub generation: u64,
}

struct Entry {
    generation: u64,
    status: TransferStatus,
    progress: u8,
}

struct RegistryInner {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

/// Maps transfer identifiers to `{status, progress}` for the UI.
///
/// Each in-flight transfer owns exactly its own key, so independent
/// transfers never corrupt each other's entries. Every [`begin`] bumps a
/// monotonic generation; the grace-period clear removes an entry only if
/// its generation still matches, so a newer transfer reusing an identifier
/// is never erased by a stale cleanup.
///
/// [`begin`]: TransferRegistry::begin
pub struct TransferRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for TransferRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                entries: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Registers a transfer under `id` at `InProgress` with progress 0.
    ///
    /// Replaces any previous entry for the identifier and returns the new
    /// generation token, which the owning operation passes back to
    /// [`schedule_clear`](Self::schedule_clear).
    pub fn begin(&self, id: &str) -> u64 {
        let mut inner = self.inner.write().unwrap();
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.entries.insert(
            id.to_string(),
            Entry {
                generation,
                status: TransferStatus::InProgress,
                progress: 0,
            },
        );
        generation
    }

    /// Reports progress for `id`, creating the entry if needed.
    ///
    /// Values are clamped to 100 and never move backwards within one
    /// attempt; reports against a terminal entry are ignored.
    pub fn set_progress(&self, id: &str, percent: u8) {
        let mut inner = self.inner.write().unwrap();
        let entry = Self::entry_mut(&mut inner, id);
        if entry.status != TransferStatus::InProgress {
            return;
        }
        entry.progress = entry.progress.max(percent.min(100));
    }

    /// Sets the status for `id`, creating the entry if needed.
    ///
    /// `Completed` forces progress to 100; `Failed` resets it to 0.
    pub fn set_status(&self, id: &str, status: TransferStatus) {
        let mut inner = self.inner.write().unwrap();
        let entry = Self::entry_mut(&mut inner, id);
        entry.status = status;
        match status {
            TransferStatus::Completed => entry.progress = 100,
            TransferStatus::Failed => entry.progress = 0,
            _ => {}
        }
    }

    /// Returns the entry for `id`, or `None` if nothing is tracked.
    pub fn get(&self, id: &str) -> Option<TransferSnapshot> {
        let inner = self.inner.read().unwrap();
        inner.entries.get(id).map(|e| TransferSnapshot {
            status: e.status,
            progress: e.progress,
            generation: e.generation,
        })
    }

    /// Status for `id`; `Idle` when nothing is tracked under it.
    pub fn status_of(&self, id: &str) -> TransferStatus {
        self.get(id).map_or(TransferStatus::Idle, |s| s.status)
    }

    /// All tracked transfers, for list-style presentation.
    pub fn snapshot_all(&self) -> Vec<(String, TransferSnapshot)> {
        let inner = self.inner.read().unwrap();
        inner
            .entries
            .iter()
            .map(|(id, e)| {
                (
                    id.clone(),
                    TransferSnapshot {
                        status: e.status,
                        progress: e.progress,
                        generation: e.generation,
                    },
                )
            })
            .collect()
    }

    /// Removes the entry for `id` unconditionally.
    pub fn clear(&self, id: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.entries.remove(id);
    }

    /// Removes the entry for `id` only if its generation still matches.
    ///
    /// No-ops when a newer transfer has taken over the identifier.
    pub fn clear_if_current(&self, id: &str, generation: u64) {
        let mut inner = self.inner.write().unwrap();
        if let Some(entry) = inner.entries.get(id)
            && entry.generation == generation
        {
            inner.entries.remove(id);
            debug!(id, generation, "cleared transfer entry");
        }
    }

    /// Schedules a generation-guarded clear after the display grace period.
    pub fn schedule_clear(self: &Arc<Self>, id: &str, generation: u64) {
        let registry = Arc::clone(self);
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(REGISTRY_GRACE_PERIOD).await;
            registry.clear_if_current(&id, generation);
        });
    }

    fn entry_mut<'a>(inner: &'a mut RegistryInner, id: &str) -> &'a mut Entry {
        // Entries appear implicitly on the first report for an identifier.
        if !inner.entries.contains_key(id) {
            let generation = inner.next_generation;
            inner.next_generation += 1;
            inner.entries.insert(
                id.to_string(),
                Entry {
                    generation,
                    status: TransferStatus::InProgress,
                    progress: 0,
                },
            );
        }
        inner.entries.get_mut(id).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn begin_registers_in_progress_at_zero() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        let snap = reg.get("t1").unwrap();
        assert_eq!(snap.status, TransferStatus::InProgress);
        assert_eq!(snap.progress, 0);
    }

    #[test]
    fn missing_entry_is_idle() {
        let reg = TransferRegistry::new();
        assert_eq!(reg.status_of("nope"), TransferStatus::Idle);
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn progress_is_monotone_within_attempt() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        reg.set_progress("t1", 40);
        assert_eq!(reg.get("t1").unwrap().progress, 40);

        // A late or duplicate report never moves the bar backwards.
        reg.set_progress("t1", 25);
        assert_eq!(reg.get("t1").unwrap().progress, 40);

        reg.set_progress("t1", 90);
        assert_eq!(reg.get("t1").unwrap().progress, 90);
    }

    #[test]
    fn progress_clamped_to_hundred() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        reg.set_progress("t1", 250);
        assert_eq!(reg.get("t1").unwrap().progress, 100);
    }

    #[test]
    fn implicit_creation_on_first_report() {
        let reg = TransferRegistry::new();
        reg.set_progress("t1", 10);
        let snap = reg.get("t1").unwrap();
        assert_eq!(snap.status, TransferStatus::InProgress);
        assert_eq!(snap.progress, 10);
    }

    #[test]
    fn completed_forces_full_progress() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        reg.set_progress("t1", 33);
        reg.set_status("t1", TransferStatus::Completed);
        let snap = reg.get("t1").unwrap();
        assert_eq!(snap.status, TransferStatus::Completed);
        assert_eq!(snap.progress, 100);
    }

    #[test]
    fn failure_resets_progress_to_zero() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        reg.set_progress("t1", 40);
        reg.set_status("t1", TransferStatus::Failed);
        let snap = reg.get("t1").unwrap();
        assert_eq!(snap.status, TransferStatus::Failed);
        assert_eq!(snap.progress, 0);
    }

    #[test]
    fn terminal_entry_ignores_progress_reports() {
        let reg = TransferRegistry::new();
        reg.begin("t1");
        reg.set_status("t1", TransferStatus::Completed);
        reg.set_progress("t1", 10);
        assert_eq!(reg.get("t1").unwrap().progress, 100);
    }

    #[test]
    fn begin_bumps_generation_on_reuse() {
        let reg = TransferRegistry::new();
        let g1 = reg.begin("t1");
        let g2 = reg.begin("t1");
        assert!(g2 > g1);
        assert_eq!(reg.get("t1").unwrap().generation, g2);
    }

    #[test]
    fn independent_transfers_own_their_keys() {
        let reg = TransferRegistry::new();
        reg.begin("a");
        reg.begin("b");
        reg.set_progress("a", 70);
        reg.set_progress("b", 20);
        assert_eq!(reg.get("a").unwrap().progress, 70);
        assert_eq!(reg.get("b").unwrap().progress, 20);
    }

    #[test]
    fn clear_if_current_respects_generation() {
        let reg = TransferRegistry::new();
        let stale = reg.begin("t1");
        let fresh = reg.begin("t1"); // same identifier reused

        // A stale cleanup must not erase the newer transfer's state.
        reg.clear_if_current("t1", stale);
        assert!(reg.get("t1").is_some());

        reg.clear_if_current("t1", fresh);
        assert!(reg.get("t1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_clear_waits_for_grace_period() {
        let reg = Arc::new(TransferRegistry::new());
        let generation = reg.begin("t1");
        reg.set_status("t1", TransferStatus::Completed);
        reg.schedule_clear("t1", generation);

        // Still visible just before the grace period ends.
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(reg.get("t1").is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(reg.get("t1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_clear_spares_newer_transfer() {
        let reg = Arc::new(TransferRegistry::new());
        let old = reg.begin("t1");
        reg.set_status("t1", TransferStatus::Completed);
        reg.schedule_clear("t1", old);

        // The identifier is reused before the grace period elapses.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let fresh = reg.begin("t1");
        reg.set_progress("t1", 15);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        let snap = reg.get("t1").expect("newer transfer must survive");
        assert_eq!(snap.generation, fresh);
        assert_eq!(snap.progress, 15);
    }

    #[test]
    fn snapshot_all_lists_every_entry() {
        let reg = TransferRegistry::new();
        reg.begin("a");
        reg.begin("b");
        let mut ids: Vec<String> = reg.snapshot_all().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn concurrent_access() {
        use std::thread;

        let reg = Arc::new(TransferRegistry::new());
        let mut handles = vec![];

        for i in 0..10 {
            let r = Arc::clone(&reg);
            handles.push(thread::spawn(move || {
                let id = format!("t{i}");
                r.begin(&id);
                for p in 0..100 {
                    r.set_progress(&id, p);
                    let _ = r.get(&id);
                }
                r.set_status(&id, TransferStatus::Completed);
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        for i in 0..10 {
            let snap = reg.get(&format!("t{i}")).unwrap();
            assert_eq!(snap.status, TransferStatus::Completed);
            assert_eq!(snap.progress, 100);
        }
    }
}
