use std::sync::Arc;

use dashmap::DashMap;
use shared::{FieldValue, FormData, Step, UserId};
use tracing::debug;

use crate::domain::{Clock, SystemClock};

#[derive(Debug, Clone, Default)]
struct LockState {
    busy: bool,
    last_acquired_at: Option<i64>,
}

#[derive(Debug, Clone, Default)]
struct Session {
    step: Step,
    data: FormData,
    lock: LockState,
}

/// Per-user workflow state: current step, form data and the lock/debounce
/// record, all behind one sharded map so each user is serialized
/// independently.
pub struct WorkflowStore {
    sessions: DashMap<UserId, Session>,
    clock: Arc<dyn Clock>,
    duplicate_interval_ms: i64,
}

impl WorkflowStore {
    pub fn new(duplicate_interval_ms: u64) -> Self {
        Self::with_clock(duplicate_interval_ms, Arc::new(SystemClock))
    }

    pub fn with_clock(duplicate_interval_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
            duplicate_interval_ms: i64::try_from(duplicate_interval_ms).unwrap_or(i64::MAX),
        }
    }

    pub fn get_step(&self, user_id: &UserId) -> Step {
        self.sessions.entry(user_id.clone()).or_default().step
    }

    pub fn set_step(&self, user_id: &UserId, step: Step) {
        self.sessions.entry(user_id.clone()).or_default().step = step;
    }

    /// Moves to the fixed successor, or back to `Step::INITIAL` when the
    /// current step has none.
    pub fn advance(&self, user_id: &UserId) -> Step {
        let mut session = self.sessions.entry(user_id.clone()).or_default();
        let next = session.step.successor().unwrap_or(Step::INITIAL);
        session.step = next;
        next
    }

    pub fn is_at_step(&self, user_id: &UserId, step: Step) -> bool {
        self.get_step(user_id) == step
    }

    /// Restores the entry step and clears form data. The lock record is left
    /// alone so late duplicates of the cancelling message stay suppressed.
    pub fn reset_workflow(&self, user_id: &UserId) {
        let mut session = self.sessions.entry(user_id.clone()).or_default();
        session.step = Step::ENTRY;
        session.data = FormData::default();
        debug!(user_id = %user_id, "Workflow reset");
    }

    pub fn set_user_data(&self, user_id: &UserId, value: FieldValue) {
        self.sessions
            .entry(user_id.clone())
            .or_default()
            .data
            .apply(value);
    }

    pub fn get_user_data(&self, user_id: &UserId) -> FormData {
        self.sessions
            .get(user_id)
            .map(|session| session.data.clone())
            .unwrap_or_default()
    }

    /// Marks the user busy if nobody holds the lock and the last acquisition
    /// is older than the duplicate-suppression interval. The check and the
    /// update happen under the same shard write lock.
    pub fn try_acquire(&self, user_id: &UserId) -> bool {
        let now = self.clock.now_millis();
        let mut session = self.sessions.entry(user_id.clone()).or_default();
        let lock = &mut session.lock;

        if lock.busy {
            return false;
        }

        if let Some(last) = lock.last_acquired_at {
            if now.saturating_sub(last) < self.duplicate_interval_ms {
                return false;
            }
        }

        lock.busy = true;
        lock.last_acquired_at = Some(now);
        true
    }

    /// Clears the busy flag only; the acquisition timestamp keeps the
    /// debounce window running.
    pub fn release(&self, user_id: &UserId) {
        if let Some(mut session) = self.sessions.get_mut(user_id) {
            session.lock.busy = false;
        }
    }

    pub fn is_busy(&self, user_id: &UserId) -> bool {
        self.sessions
            .get(user_id)
            .map(|session| session.lock.busy)
            .unwrap_or(false)
    }

    pub fn remove_session(&self, user_id: &UserId) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
