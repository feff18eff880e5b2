mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use common::{Harness, RecordingReplier};
use futures::future::join_all;
use shared::{Action, InboundEvent, Step, UserId};
use tokio::sync::Notify;
use workflow_service::{DispatchOutcome, ReplySender};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_advance_once() -> Result<()> {
    let h = Harness::new();
    let replier = Arc::new(RecordingReplier::with_delay(Duration::from_millis(20)));
    let u = UserId::new("U-burst");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let dispatcher = h.dispatcher.clone();
            let replier = replier.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch(InboundEvent::new(UserId::new("U-burst"), "開始"), replier.as_ref())
                    .await
            })
        })
        .collect();

    let mut processed = 0;
    for result in join_all(tasks).await {
        if let DispatchOutcome::Processed { .. } = result?? {
            processed += 1;
        }
    }

    assert_eq!(processed, 1);
    assert_eq!(replier.sent().len(), 1);
    assert_eq!(h.store.get_step(&u), Step::AskInitiator);
    assert!(!h.store.is_busy(&u));

    Ok(())
}

/// Holds replies for one user until released.
struct GatedReplier {
    gated_user: UserId,
    gate: Notify,
}

#[async_trait]
impl ReplySender for GatedReplier {
    async fn send(&self, user_id: &UserId, _actions: &[Action]) -> shared::Result<()> {
        if *user_id == self.gated_user {
            self.gate.notified().await;
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_user_does_not_block_others() -> Result<()> {
    let h = Harness::new();
    let slow = UserId::new("U-slow");
    let replier = Arc::new(GatedReplier {
        gated_user: slow.clone(),
        gate: Notify::new(),
    });

    let slow_task = {
        let dispatcher = h.dispatcher.clone();
        let replier = replier.clone();
        let slow = slow.clone();
        tokio::spawn(async move {
            dispatcher
                .dispatch(InboundEvent::new(slow, "開始"), replier.as_ref())
                .await
        })
    };

    while !h.store.is_busy(&slow) {
        tokio::task::yield_now().await;
    }

    let fast = h
        .dispatcher
        .dispatch(InboundEvent::new(UserId::new("U-fast"), "開始"), replier.as_ref())
        .await?;
    assert!(matches!(fast, DispatchOutcome::Processed { .. }));
    assert!(h.store.is_busy(&slow));

    replier.gate.notify_one();
    let slow_outcome = slow_task.await??;
    assert!(matches!(slow_outcome, DispatchOutcome::Processed { .. }));
    assert!(!h.store.is_busy(&slow));

    Ok(())
}
