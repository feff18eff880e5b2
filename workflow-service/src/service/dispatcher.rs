use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use shared::{record_counter, record_gauge, record_timing, Action, FormData, InboundEvent, Result, Step, UserId};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::{StepEngine, Transition};
use crate::service::WorkflowStore;

/// Delivers rendered replies back to the user on whatever channel the
/// event arrived from.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, user_id: &UserId, actions: &[Action]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Another delivery for the same user is in flight or landed inside the
    /// debounce window. Nothing was interpreted or sent.
    Suppressed,
    Processed {
        step: Step,
        actions: Vec<Action>,
        completed: Option<FormData>,
    },
}

/// Releases the per-user lock when dropped, so a failed or panicking reply
/// never leaves the user stuck.
struct LockGuard<'a> {
    store: &'a WorkflowStore,
    user_id: &'a UserId,
}

impl<'a> LockGuard<'a> {
    fn acquire(store: &'a WorkflowStore, user_id: &'a UserId) -> Option<Self> {
        store
            .try_acquire(user_id)
            .then(|| Self { store, user_id })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.store.release(self.user_id);
    }
}

pub struct Dispatcher {
    store: Arc<WorkflowStore>,
    engine: Arc<StepEngine>,
}

impl Dispatcher {
    pub fn new(store: Arc<WorkflowStore>, engine: Arc<StepEngine>) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &Arc<WorkflowStore> {
        &self.store
    }

    pub async fn dispatch<R>(&self, event: InboundEvent, replier: &R) -> Result<DispatchOutcome>
    where
        R: ReplySender + ?Sized,
    {
        let span = info_span!(
            "dispatch",
            request_id = %Uuid::new_v4(),
            user_id = %event.user_id,
        );
        self.dispatch_locked(event, replier).instrument(span).await
    }

    async fn dispatch_locked<R>(&self, event: InboundEvent, replier: &R) -> Result<DispatchOutcome>
    where
        R: ReplySender + ?Sized,
    {
        let started = Instant::now();
        let user_id = &event.user_id;
        record_counter("workflow_inputs_total", 1);

        let Some(guard) = LockGuard::acquire(&self.store, user_id) else {
            record_counter("workflow_duplicates_suppressed_total", 1);
            warn!("Duplicate or overlapping delivery suppressed");
            return Ok(DispatchOutcome::Suppressed);
        };

        let step = self.store.get_step(user_id);
        let form = self.store.get_user_data(user_id);
        let transition = self.engine.interpret(step, &event.text, &form);
        self.apply(user_id, &transition);

        debug!(
            from = %step,
            to = %transition.next_step,
            captures = transition.captures.len(),
            "Transition applied"
        );

        if transition.cancel {
            record_counter("workflow_cancelled_total", 1);
            info!(step = %step, "Workflow cancelled by user");
        } else if transition.reset && transition.completed.is_none() {
            warn!(step = %step, "Unrecognized step, workflow restarted");
        }

        if transition.completed.is_some() {
            record_counter("workflow_completed_total", 1);
            info!("Expense record completed");
        }

        let delivery = replier.send(user_id, &transition.actions).await;
        drop(guard);
        record_timing("workflow_dispatch_seconds", started.elapsed().as_secs_f64());
        record_gauge("workflow_sessions", self.store.session_count() as f64);

        if let Err(e) = delivery {
            if e.is_delivery_failure() {
                record_counter("workflow_reply_failures_total", 1);
                error!(error = %e, "Failed to deliver reply");
            } else {
                error!(error = %e, "Reply sender failed before delivery");
            }
            return Err(e);
        }

        Ok(DispatchOutcome::Processed {
            step: transition.next_step,
            actions: transition.actions,
            completed: transition.completed,
        })
    }

    fn apply(&self, user_id: &UserId, transition: &Transition) {
        if transition.reset {
            self.store.reset_workflow(user_id);
            return;
        }

        for value in &transition.captures {
            self.store.set_user_data(user_id, value.clone());
        }
        self.store.set_step(user_id, transition.next_step);
    }
}
