use std::sync::Arc;

use shared::{Action, CatalogConfig, FieldValue, FormData, SelectOption, Step, WorkflowConfig};

const START_KEYWORD: &str = "開始";
const CONFIRM_KEYWORD: &str = "確認";
const SUBMIT_KEYWORD: &str = "送出";

/// Outcome of interpreting one input against the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next_step: Step,
    pub captures: Vec<FieldValue>,
    pub cancel: bool,
    /// Clear form data and return to `Step::ENTRY` instead of applying
    /// `captures`.
    pub reset: bool,
    pub actions: Vec<Action>,
    /// The finished record, set only when a submission completes.
    pub completed: Option<FormData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartReason {
    Cancelled,
    CorruptState,
}

pub struct StepEngine {
    catalog: Arc<CatalogConfig>,
    cancel_keyword: String,
    require_confirmation: bool,
}

impl StepEngine {
    pub fn new(catalog: Arc<CatalogConfig>, config: &WorkflowConfig) -> Self {
        Self {
            catalog,
            cancel_keyword: config.cancel_keyword.clone(),
            require_confirmation: config.require_confirmation,
        }
    }

    pub fn interpret(&self, step: Step, input: &str, form: &FormData) -> Transition {
        let input = input.trim();

        match step {
            Step::Start => self.proceed(step, Vec::new(), form),
            _ if input == self.cancel_keyword => self.restart(RestartReason::Cancelled),
            Step::AskInitiator => {
                self.proceed(step, vec![FieldValue::Initiator(input.to_string())], form)
            }
            Step::AskMainCategory => {
                self.proceed(step, vec![FieldValue::Category(input.to_string())], form)
            }
            Step::AskDetail => self.proceed(step, vec![FieldValue::Detail(input.to_string())], form),
            Step::AskExpenseType => {
                let mut captures = vec![FieldValue::PaymentName(input.to_string())];
                if let Some(payment) = self.catalog.find_payment(input) {
                    captures.push(FieldValue::IsPublicExpense(payment.is_public_expense));
                }
                self.proceed(step, captures, form)
            }
            Step::AskAmount => match parse_amount(input) {
                Some(amount) => self.proceed(step, vec![FieldValue::Amount(amount)], form),
                None => self.reprompt(step, "金額格式錯誤，請輸入數字", form),
            },
            Step::AwaitConfirmation if !self.require_confirmation => {
                self.restart(RestartReason::CorruptState)
            }
            Step::AwaitConfirmation => self.proceed(step, Vec::new(), form),
            Step::Completed => self.complete(form),
        }
    }

    /// The prompt a session at `Step::ENTRY` is waiting on.
    pub fn entry_prompt(&self) -> Action {
        self.prompt_for(Step::ENTRY, &FormData::default())
    }

    fn next_after(&self, step: Step) -> Option<Step> {
        match step {
            Step::AskAmount if self.require_confirmation => Some(Step::AwaitConfirmation),
            _ => step.successor(),
        }
    }

    fn proceed(&self, step: Step, captures: Vec<FieldValue>, form: &FormData) -> Transition {
        let Some(next_step) = self.next_after(step) else {
            return self.restart(RestartReason::CorruptState);
        };

        let mut preview = form.clone();
        for value in &captures {
            preview.apply(value.clone());
        }

        Transition {
            next_step,
            captures,
            cancel: false,
            reset: false,
            actions: vec![self.prompt_for(next_step, &preview)],
            completed: None,
        }
    }

    fn reprompt(&self, step: Step, notice: &str, form: &FormData) -> Transition {
        Transition {
            next_step: step,
            captures: Vec::new(),
            cancel: false,
            reset: false,
            actions: vec![Action::notice(notice), self.prompt_for(step, form)],
            completed: None,
        }
    }

    fn restart(&self, reason: RestartReason) -> Transition {
        let notice = match reason {
            RestartReason::Cancelled => "已取消本次記帳",
            RestartReason::CorruptState => "流程狀態異常，已重新開始",
        };

        Transition {
            next_step: Step::ENTRY,
            captures: Vec::new(),
            cancel: reason == RestartReason::Cancelled,
            reset: true,
            actions: vec![Action::notice(notice), self.entry_prompt()],
            completed: None,
        }
    }

    fn complete(&self, form: &FormData) -> Transition {
        Transition {
            next_step: Step::ENTRY,
            captures: Vec::new(),
            cancel: false,
            reset: true,
            actions: vec![
                Action::completion("記帳完成", summarize(form)),
                self.entry_prompt(),
            ],
            completed: Some(form.clone()),
        }
    }

    fn prompt_for(&self, step: Step, form: &FormData) -> Action {
        match step {
            Step::Start => Action::prompt(
                "輸入「開始」以新增一筆記帳",
                vec![SelectOption::new(START_KEYWORD, START_KEYWORD)],
            ),
            Step::AskInitiator => Action::prompt("請選擇申請人", self.catalog.person_options()),
            Step::AskMainCategory => {
                Action::prompt("請選擇記帳類別", self.catalog.category_options())
            }
            Step::AskDetail => Action::prompt("請輸入詳細說明", Vec::new()),
            Step::AskExpenseType => {
                Action::prompt("請選擇支出類型", self.catalog.payment_options())
            }
            Step::AskAmount => Action::prompt("請輸入金額", Vec::new()),
            Step::AwaitConfirmation => Action {
                text: Some(summarize(form)),
                ..Action::prompt("請確認以下資料", self.decision_options(CONFIRM_KEYWORD))
            },
            Step::Completed => Action {
                text: Some(summarize(form)),
                ..Action::prompt(
                    "資料已填寫完成，傳送任意訊息即可送出",
                    self.decision_options(SUBMIT_KEYWORD),
                )
            },
        }
    }

    fn decision_options(&self, accept: &str) -> Vec<SelectOption> {
        vec![
            SelectOption::new(accept, accept),
            SelectOption::new(&self.cancel_keyword, &self.cancel_keyword),
        ]
    }
}

fn parse_amount(input: &str) -> Option<f64> {
    let cleaned: String = input.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

pub(crate) fn summarize(form: &FormData) -> String {
    let field = |value: Option<&str>| value.unwrap_or("-").to_string();

    let expense_scope = match form.is_public_expense {
        Some(true) => "（公共支出）",
        Some(false) => "（個人支出）",
        None => "",
    };

    format!(
        "申請人：{}\n類別：{}\n說明：{}\n支出類型：{}{}\n金額：{}",
        field(form.initiator.as_deref()),
        field(form.category.as_deref()),
        field(form.detail.as_deref()),
        field(form.payment_name.as_deref()),
        expense_scope,
        form.amount.map(format_amount).unwrap_or_else(|| "-".to_string()),
    )
}
