use serde::{Deserialize, Serialize};

use crate::errors::{Result, ServiceError};

/// Opaque per-user key. Transports map their native identifiers onto it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Validation("User ID must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    #[default]
    Start,
    AwaitConfirmation,
    AskInitiator,
    AskMainCategory,
    AskDetail,
    AskExpenseType,
    AskAmount,
    Completed,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::Start,
        Step::AwaitConfirmation,
        Step::AskInitiator,
        Step::AskMainCategory,
        Step::AskDetail,
        Step::AskExpenseType,
        Step::AskAmount,
        Step::Completed,
    ];

    /// Step a brand-new session starts in.
    pub const INITIAL: Step = Step::Start;

    /// Step re-entered after cancel, reset or completion. The reset edge
    /// already emits the initiator prompt, so the session resumes one step
    /// past `Start`.
    pub const ENTRY: Step = Step::AskInitiator;

    /// Fixed total-order successor. `Completed` is the only step without one.
    pub fn successor(self) -> Option<Step> {
        match self {
            Step::Start => Some(Step::AskInitiator),
            Step::AskInitiator => Some(Step::AskMainCategory),
            Step::AskMainCategory => Some(Step::AskDetail),
            Step::AskDetail => Some(Step::AskExpenseType),
            Step::AskExpenseType => Some(Step::AskAmount),
            Step::AskAmount => Some(Step::Completed),
            Step::AwaitConfirmation => Some(Step::Completed),
            Step::Completed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Start => "START",
            Step::AwaitConfirmation => "AWAIT_CONFIRMATION",
            Step::AskInitiator => "ASK_INITIATOR",
            Step::AskMainCategory => "ASK_MAIN_CATEGORY",
            Step::AskDetail => "ASK_DETAIL",
            Step::AskExpenseType => "ASK_EXPENSE_TYPE",
            Step::AskAmount => "ASK_AMOUNT",
            Step::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partially filled expense record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public_expense: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl FormData {
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Initiator(v) => self.initiator = Some(v),
            FieldValue::Category(v) => self.category = Some(v),
            FieldValue::Detail(v) => self.detail = Some(v),
            FieldValue::PaymentName(v) => self.payment_name = Some(v),
            FieldValue::IsPublicExpense(v) => self.is_public_expense = Some(v),
            FieldValue::Amount(v) => self.amount = Some(v),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FormData::default()
    }
}

/// One captured form field together with its value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Initiator(String),
    Category(String),
    Detail(String),
    PaymentName(String),
    IsPublicExpense(bool),
    Amount(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Prompt,
    Notice,
    Completion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Format-agnostic reply; transports decide how to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Action {
    pub fn prompt(title: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            kind: ActionKind::Prompt,
            title: Some(title.into()),
            options,
            text: None,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Notice,
            title: None,
            options: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn completion(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Completion,
            title: Some(title.into()),
            options: Vec::new(),
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub user_id: UserId,
    pub text: String,
}

impl InboundEvent {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_blank() {
        assert!(UserId::from_string("   ").is_err());
        assert_eq!(UserId::from_string(" U123 ").unwrap().as_str(), "U123");
    }

    #[test]
    fn test_successor_chain_reaches_completed() {
        let mut step = Step::INITIAL;
        let mut visited = vec![step];
        while let Some(next) = step.successor() {
            step = next;
            visited.push(step);
        }

        assert_eq!(
            visited,
            vec![
                Step::Start,
                Step::AskInitiator,
                Step::AskMainCategory,
                Step::AskDetail,
                Step::AskExpenseType,
                Step::AskAmount,
                Step::Completed,
            ]
        );
    }

    #[test]
    fn test_step_names_match_wire_format() {
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }

    #[test]
    fn test_step_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Step::AskMainCategory).unwrap();
        assert_eq!(json, "\"ASK_MAIN_CATEGORY\"");
    }

    #[test]
    fn test_form_data_apply_and_serialize() {
        let mut data = FormData::default();
        assert!(data.is_empty());

        data.apply(FieldValue::Initiator("王大明".to_string()));
        data.apply(FieldValue::IsPublicExpense(true));
        data.apply(FieldValue::Amount(120.5));

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["initiator"], "王大明");
        assert_eq!(json["isPublicExpense"], true);
        assert_eq!(json["amount"], 120.5);
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_inbound_event_wire_shape() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"userId":"U1","text":"開始"}"#).unwrap();
        assert_eq!(event.user_id, UserId::new("U1"));
        assert_eq!(event.text, "開始");
    }

    #[test]
    fn test_action_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Action::notice("bye")).unwrap();
        assert_eq!(json["kind"], "notice");
        assert_eq!(json["text"], "bye");
        assert!(json.get("options").is_none());
        assert!(json.get("title").is_none());
    }
}
