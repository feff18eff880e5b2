#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shared::config::Account;
use shared::{
    Action, CatalogConfig, ExpenseCategory, PaymentConfig, Person, Result, ServiceError, UserId,
    WorkflowConfig,
};
use workflow_service::{Dispatcher, ManualClock, ReplySender, StepEngine, WorkflowStore};

pub const INTERVAL_MS: u64 = 5000;

pub fn test_catalog() -> CatalogConfig {
    let account = Account {
        allocation_percentage: 50.0,
        daily_meal_cost: 150.0,
        monthly_other_expenses: 800.0,
    };

    CatalogConfig {
        persons: vec![
            Person {
                username: "王大明".to_string(),
                user_id: "U1234567890abcdef1234567890abcdef".to_string(),
                account: account.clone(),
            },
            Person {
                username: "李小美".to_string(),
                user_id: "Uabcdef1234567890abcdef1234567890".to_string(),
                account,
            },
        ],
        expense_categories: vec![
            ExpenseCategory {
                name: "早餐".to_string(),
                is_meal_cost: true,
            },
            ExpenseCategory {
                name: "消夜".to_string(),
                is_meal_cost: false,
            },
        ],
        payment_configs: vec![PaymentConfig {
            name: "公費".to_string(),
            is_public_expense: true,
        }],
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<WorkflowStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(WorkflowStore::with_clock(
            config.duplicate_request_interval_ms,
            clock.clone(),
        ));
        let engine = Arc::new(StepEngine::new(Arc::new(test_catalog()), &config));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), engine));

        Self {
            dispatcher,
            store,
            clock,
        }
    }

    /// Moves past the debounce window so the next message counts as new.
    pub fn next_message(&self) {
        self.clock.advance(INTERVAL_MS as i64);
    }
}

#[derive(Default)]
pub struct RecordingReplier {
    sent: Mutex<Vec<(UserId, Vec<Action>)>>,
    delay: Option<Duration>,
}

impl RecordingReplier {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn sent(&self) -> Vec<(UserId, Vec<Action>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_actions(&self) -> Vec<Action> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, actions)| actions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReplySender for RecordingReplier {
    async fn send(&self, user_id: &UserId, actions: &[Action]) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id.clone(), actions.to_vec()));
        Ok(())
    }
}

pub struct FailingReplier;

#[async_trait]
impl ReplySender for FailingReplier {
    async fn send(&self, _user_id: &UserId, _actions: &[Action]) -> Result<()> {
        Err(ServiceError::Transport("reply token expired".to_string()))
    }
}

/// Fails on its own side without touching any channel.
pub struct BrokenReplier;

#[async_trait]
impl ReplySender for BrokenReplier {
    async fn send(&self, _user_id: &UserId, _actions: &[Action]) -> Result<()> {
        Err(ServiceError::Internal("reply buffer poisoned".to_string()))
    }
}
