// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed exclusive gate around the AI backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ecosnap_config::model::GateConfig;
use ecosnap_core::{EcoSnapError, GateStatus};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::guard::GateGuard;
use crate::token::{self, GateToken, ObservedToken};

/// Age after which an abandoned reclaim marker may itself be removed.
const RECLAIM_MARKER_STALE: Duration = Duration::from_secs(30);

/// How often, and how long apart, release tries to take a busy marker.
const RELEASE_MARKER_ATTEMPTS: u32 = 20;
const RELEASE_MARKER_WAIT: Duration = Duration::from_millis(5);

/// Cross-process mutual exclusion backed by a token file.
///
/// The token is created with `O_CREAT | O_EXCL` semantics, so two processes
/// racing for a free gate cannot both succeed. A token older than
/// `stale_after` is presumed abandoned and may be removed by any waiter.
#[derive(Debug, Clone)]
pub struct FileGate {
    path: PathBuf,
    holder_id: String,
    stale_after: Duration,
    poll_interval: Duration,
}

impl FileGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let defaults = GateConfig::default();
        Self {
            path: path.into(),
            holder_id: new_holder_id(),
            stale_after: defaults.stale_after(),
            poll_interval: defaults.poll_interval(),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.lock_path)
            .with_stale_after(config.stale_after())
            .with_poll_interval(config.poll_interval())
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Identity written into tokens this gate creates.
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for the gate.
    ///
    /// Returns `Ok(false)` when the gate stayed busy for the whole wait. At
    /// least one attempt is made even with a zero timeout.
    pub async fn acquire(&self, timeout: Duration) -> Result<bool, EcoSnapError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                EcoSnapError::gate_io(format!("cannot create {}", parent.display()), e)
            })?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            if token::create_exclusive(&self.path, &GateToken::new(&self.holder_id))? {
                info!(holder = %self.holder_id, path = %self.path.display(), "gate acquired");
                return Ok(true);
            }

            if let Some(observed) = token::read(&self.path)? {
                if self.is_stale(&observed) && self.reclaim(&observed)? {
                    continue;
                }
                debug!(holder = %observed.holder, age_secs = observed.age_secs, "gate busy");
            } else {
                // Released between our create attempt and the read.
                continue;
            }

            let now = Instant::now();
            if now >= deadline {
                info!(
                    holder = %self.holder_id,
                    waited_ms = timeout.as_millis() as u64,
                    "gate acquisition timed out"
                );
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Like [`FileGate::acquire`], but hands back a guard that releases on drop.
    pub async fn acquire_guard(
        &self,
        timeout: Duration,
    ) -> Result<Option<GateGuard<'_>>, EcoSnapError> {
        Ok(self
            .acquire(timeout)
            .await?
            .then(|| GateGuard::new(self)))
    }

    /// Release the gate if this instance holds it.
    ///
    /// A release by a non-holder leaves the token untouched, is logged, and
    /// returns `false`.
    pub fn release(&self) -> bool {
        match self.try_release() {
            Ok(()) => true,
            Err(EcoSnapError::GateOwnershipMismatch { holder, requester }) => {
                warn!(%holder, %requester, "gate release refused: not the holder");
                false
            }
            Err(e) => {
                warn!(holder = %self.holder_id, error = %e, "gate release failed");
                false
            }
        }
    }

    /// Release the gate, reporting why it could not be released.
    ///
    /// The holder check and the removal happen under the reclaim marker, so a
    /// token that was reclaimed and re-acquired by someone else in between is
    /// never removed. If the marker stays busy the release goes ahead
    /// unguarded.
    pub fn try_release(&self) -> Result<(), EcoSnapError> {
        for _ in 0..RELEASE_MARKER_ATTEMPTS {
            if self.under_marker(|| self.remove_own_token())?.is_some() {
                return Ok(());
            }
            std::thread::sleep(RELEASE_MARKER_WAIT);
        }
        warn!(holder = %self.holder_id, "reclaim marker busy, releasing without it");
        self.remove_own_token()
    }

    fn remove_own_token(&self) -> Result<(), EcoSnapError> {
        let observed = token::read(&self.path)?.ok_or_else(|| EcoSnapError::GateOwnershipMismatch {
            holder: "<none>".to_string(),
            requester: self.holder_id.clone(),
        })?;
        if observed.holder != self.holder_id {
            return Err(EcoSnapError::GateOwnershipMismatch {
                holder: observed.holder,
                requester: self.holder_id.clone(),
            });
        }
        token::remove(&self.path)?;
        info!(holder = %self.holder_id, "gate released");
        Ok(())
    }

    /// Current state of the gate. Read-only.
    pub fn status(&self) -> Result<GateStatus, EcoSnapError> {
        Ok(match token::read(&self.path)? {
            None => GateStatus::Free,
            Some(observed) => GateStatus::Busy {
                age_seconds: observed.age_secs,
                holder_id: observed.holder,
            },
        })
    }

    /// Remove the token if it is stale, whether or not anyone is waiting.
    ///
    /// Returns `true` when a stale token was removed.
    pub fn reclaim_stale(&self) -> Result<bool, EcoSnapError> {
        match token::read(&self.path)? {
            Some(observed) if self.is_stale(&observed) => self.reclaim(&observed),
            _ => Ok(false),
        }
    }

    fn is_stale(&self, observed: &ObservedToken) -> bool {
        observed.age_secs > self.stale_after.as_secs()
    }

    /// Remove `observed` if it is still the current token and still stale.
    ///
    /// Runs under the reclaim marker so a token created by another waiter after
    /// `observed` was read is never deleted.
    fn reclaim(&self, observed: &ObservedToken) -> Result<bool, EcoSnapError> {
        let removed = self.under_marker(|| {
            let Some(current) = token::read(&self.path)? else {
                return Ok(false);
            };
            if current.raw != observed.raw || !self.is_stale(&current) {
                return Ok(false);
            }
            token::remove(&self.path)?;
            warn!(
                holder = %current.holder,
                age_secs = current.age_secs,
                reclaimed_by = %self.holder_id,
                "reclaimed stale gate"
            );
            Ok(true)
        })?;
        Ok(removed.unwrap_or(false))
    }

    /// Run `f` while holding the reclaim marker, `None` if someone else holds it.
    ///
    /// An abandoned marker is removed and taken over in the same call.
    fn under_marker<T>(
        &self,
        f: impl FnOnce() -> Result<T, EcoSnapError>,
    ) -> Result<Option<T>, EcoSnapError> {
        let marker = self.reclaim_marker_path();
        let marker_token = GateToken::new(&self.holder_id);
        if !token::create_exclusive(&marker, &marker_token)?
            && !(self.clear_abandoned_marker(&marker)?
                && token::create_exclusive(&marker, &marker_token)?)
        {
            return Ok(None);
        }

        let outcome = f();
        token::remove(&marker)?;
        outcome.map(Some)
    }

    /// Remove `marker` if it is abandoned. `true` when the marker is gone.
    fn clear_abandoned_marker(&self, marker: &Path) -> Result<bool, EcoSnapError> {
        let age = token::modified_age_secs(marker)
            .map_err(|e| EcoSnapError::gate_io("cannot stat reclaim marker", e))?;
        match age {
            None => Ok(true),
            Some(age) if age > RECLAIM_MARKER_STALE.as_secs() => {
                warn!(path = %marker.display(), age_secs = age, "removing abandoned reclaim marker");
                token::remove(marker)?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    fn reclaim_marker_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".reclaim");
        PathBuf::from(name)
    }
}

fn new_holder_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", std::process::id(), &suffix[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn fast_gate(path: &Path) -> FileGate {
        FileGate::new(path).with_poll_interval(Duration::from_millis(10))
    }

    fn write_token(path: &Path, holder: &str, age_secs: i64) {
        let token = GateToken {
            holder: holder.to_string(),
            pid: 4242,
            acquired_at: chrono::Utc::now().timestamp() - age_secs,
        };
        std::fs::write(path, serde_json::to_vec(&token).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn acquires_free_gate_and_reports_busy() {
        let dir = tempdir().unwrap();
        let gate = fast_gate(&dir.path().join("ai.lock"));

        assert_eq!(gate.status().unwrap(), GateStatus::Free);
        assert!(gate.acquire(Duration::from_secs(1)).await.unwrap());

        match gate.status().unwrap() {
            GateStatus::Busy { holder_id, age_seconds } => {
                assert_eq!(holder_id, gate.holder_id());
                assert!(age_seconds <= 1);
            }
            GateStatus::Free => panic!("expected busy gate"),
        }

        assert!(gate.release());
        assert_eq!(gate.status().unwrap(), GateStatus::Free);
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let gate = fast_gate(&dir.path().join("nested").join("ai.lock"));
        assert!(gate.acquire(Duration::ZERO).await.unwrap());
        assert!(gate.release());
    }

    #[tokio::test]
    async fn times_out_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let holder = fast_gate(&path);
        let waiter = fast_gate(&path);

        assert!(holder.acquire(Duration::ZERO).await.unwrap());
        let started = std::time::Instant::now();
        assert!(!waiter.acquire(Duration::from_millis(100)).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(100));

        assert!(holder.release());
    }

    #[tokio::test]
    async fn zero_timeout_still_tries_once() {
        let dir = tempdir().unwrap();
        let gate = fast_gate(&dir.path().join("ai.lock"));
        assert!(gate.acquire(Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn non_holder_release_is_refused_and_logged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let holder = fast_gate(&path);
        let intruder = fast_gate(&path);

        assert!(holder.acquire(Duration::ZERO).await.unwrap());
        let before = std::fs::read(&path).unwrap();

        assert!(!intruder.release());
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(logs_contain("gate release refused"));

        match intruder.try_release() {
            Err(EcoSnapError::GateOwnershipMismatch { holder: h, requester }) => {
                assert_eq!(h, holder.holder_id());
                assert_eq!(requester, intruder.holder_id());
            }
            other => panic!("expected ownership mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_of_free_gate_returns_false() {
        let dir = tempdir().unwrap();
        let gate = fast_gate(&dir.path().join("ai.lock"));
        assert!(!gate.release());
    }

    #[tokio::test]
    async fn stale_token_is_reclaimed_by_acquirer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        write_token(&path, "crashed-holder", 700);

        let gate = fast_gate(&path);
        assert!(gate.acquire(Duration::ZERO).await.unwrap());
        match gate.status().unwrap() {
            GateStatus::Busy { holder_id, .. } => assert_eq!(holder_id, gate.holder_id()),
            GateStatus::Free => panic!("expected busy gate"),
        }
        assert!(!dir.path().join("ai.lock.reclaim").exists());
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let gate = fast_gate(&path);

        write_token(&path, "fresh-holder", 30);
        assert!(!gate.reclaim_stale().unwrap());
        assert!(path.exists());

        write_token(&path, "crashed-holder", 601);
        assert!(gate.reclaim_stale().unwrap());
        assert!(!path.exists());

        assert!(!gate.reclaim_stale().unwrap());
    }

    #[tokio::test]
    async fn garbage_token_is_reclaimed_once_old_enough() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        std::fs::write(&path, b"{not json").unwrap();
        let gate = fast_gate(&path).with_stale_after(Duration::from_secs(60));

        assert!(!gate.reclaim_stale().unwrap());

        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(120))
            .unwrap();
        drop(file);
        assert!(gate.reclaim_stale().unwrap());
    }

    #[tokio::test]
    async fn abandoned_reclaim_marker_does_not_wedge_the_gate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let marker = dir.path().join("ai.lock.reclaim");
        write_token(&path, "crashed-holder", 700);
        std::fs::write(&marker, b"").unwrap();
        let file = std::fs::File::options().write(true).open(&marker).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(60))
            .unwrap();
        drop(file);

        let gate = fast_gate(&path);
        assert!(gate.acquire(Duration::from_millis(200)).await.unwrap());
        assert!(!marker.exists());
    }

    fn write_marker(marker: &Path, age_secs: u64) {
        std::fs::write(marker, b"").unwrap();
        let file = std::fs::File::options().write(true).open(marker).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn abandoned_marker_is_taken_over_in_the_same_sweep() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let marker = dir.path().join("ai.lock.reclaim");
        write_token(&path, "crashed-holder", 700);
        write_marker(&marker, 60);

        let gate = fast_gate(&path);
        assert!(gate.reclaim_stale().unwrap());
        assert!(!path.exists());
        assert!(!marker.exists());
    }

    #[test]
    fn fresh_marker_defers_reclaim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let marker = dir.path().join("ai.lock.reclaim");
        write_token(&path, "crashed-holder", 700);
        write_marker(&marker, 0);

        let gate = fast_gate(&path);
        assert!(!gate.reclaim_stale().unwrap());
        assert!(path.exists());
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn release_waits_for_reclaim_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let marker = dir.path().join("ai.lock.reclaim");
        let gate = fast_gate(&path);
        assert!(gate.acquire(Duration::ZERO).await.unwrap());
        write_marker(&marker, 0);

        let remover = {
            let marker = marker.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                std::fs::remove_file(marker).unwrap();
            })
        };
        let started = std::time::Instant::now();
        assert!(gate.release());
        remover.join().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(25));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn release_does_not_remove_successor_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let gate = fast_gate(&path);
        assert!(gate.acquire(Duration::ZERO).await.unwrap());

        // The token was reclaimed and someone else now holds the gate.
        std::fs::remove_file(&path).unwrap();
        let successor = fast_gate(&path);
        assert!(successor.acquire(Duration::ZERO).await.unwrap());

        assert!(!gate.release());
        match gate.status().unwrap() {
            GateStatus::Busy { holder_id, .. } => assert_eq!(holder_id, successor.holder_id()),
            GateStatus::Free => panic!("successor token was removed"),
        }
        assert!(!dir.path().join("ai.lock.reclaim").exists());
    }

    #[tokio::test]
    async fn busy_marker_does_not_leave_gate_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let marker = dir.path().join("ai.lock.reclaim");
        let gate = fast_gate(&path);
        assert!(gate.acquire(Duration::ZERO).await.unwrap());
        write_marker(&marker, 0);

        assert!(gate.release());
        assert!(!path.exists());
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn waiter_gets_gate_after_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let holder = fast_gate(&path);
        let waiter = fast_gate(&path);

        assert!(holder.acquire(Duration::ZERO).await.unwrap());
        let wait = tokio::spawn(async move { waiter.acquire(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(holder.release());

        assert!(wait.await.unwrap().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_acquirers_are_mutually_exclusive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ai.lock");
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let gate = fast_gate(&path);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            tasks.push(tokio::spawn(async move {
                let guard = gate
                    .acquire_guard(Duration::from_secs(10))
                    .await
                    .unwrap()
                    .expect("gate should be acquired within timeout");
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                assert!(guard.release());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
    }
}
