use std::env;
use std::str::FromStr;

use crate::errors::{Result, ServiceError};
use crate::types::SelectOption;

pub const DEFAULT_DUPLICATE_REQUEST_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_CANCEL_KEYWORD: &str = "取消";

fn parse_var<T, F>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|e| ServiceError::Config(format!("Invalid {}: {}", key, e)))
}

fn parse_flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub duplicate_request_interval_ms: u64,
    pub cancel_keyword: String,
    pub require_confirmation: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            duplicate_request_interval_ms: DEFAULT_DUPLICATE_REQUEST_INTERVAL_MS,
            cancel_keyword: DEFAULT_CANCEL_KEYWORD.to_string(),
            require_confirmation: false,
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cancel_keyword = lookup("WORKFLOW_CANCEL_KEYWORD")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCEL_KEYWORD.to_string());

        Ok(Self {
            duplicate_request_interval_ms: parse_var(
                &lookup,
                "USER_DUPLICATE_REQUEST_INTERVAL_MS",
                "5000",
            )?,
            cancel_keyword,
            require_confirmation: parse_flag(&lookup, "WORKFLOW_REQUIRE_CONFIRMATION"),
        })
    }
}

/// Per-person accounting settings. Carried for downstream consumers only.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub allocation_percentage: f64,
    pub daily_meal_cost: f64,
    pub monthly_other_expenses: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub username: String,
    pub user_id: String,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseCategory {
    pub name: String,
    pub is_meal_cost: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    pub name: String,
    pub is_public_expense: bool,
}

/// Read-only lists used to populate step prompts.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub persons: Vec<Person>,
    pub expense_categories: Vec<ExpenseCategory>,
    pub payment_configs: Vec<PaymentConfig>,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            persons: Self::load_persons(&lookup)?,
            expense_categories: Self::load_expense_categories(&lookup)?,
            payment_configs: Self::load_payment_configs(&lookup)?,
        })
    }

    fn load_persons<F>(lookup: &F) -> Result<Vec<Person>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let count: usize = parse_var(lookup, "PERSON_COUNT", "0")?;
        (1..=count)
            .map(|i| -> Result<Person> {
                Ok(Person {
                    username: lookup(&format!("PERSON_{}_USERNAME", i)).unwrap_or_default(),
                    user_id: lookup(&format!("PERSON_{}_USERID", i)).unwrap_or_default(),
                    account: Account {
                        allocation_percentage: parse_var(
                            lookup,
                            &format!("PERSON_{}_ALLOCATION_PERCENTAGE", i),
                            "0",
                        )?,
                        daily_meal_cost: parse_var(
                            lookup,
                            &format!("PERSON_{}_DAILY_MEAL_COST", i),
                            "0",
                        )?,
                        monthly_other_expenses: parse_var(
                            lookup,
                            &format!("PERSON_{}_MONTHLY_OTHER_EXPENSES", i),
                            "0",
                        )?,
                    },
                })
            })
            .collect()
    }

    fn load_expense_categories<F>(lookup: &F) -> Result<Vec<ExpenseCategory>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let count: usize = parse_var(lookup, "EXPENSE_CATEGORY_COUNT", "0")?;
        Ok((1..=count)
            .map(|i| ExpenseCategory {
                name: lookup(&format!("EXPENSE_CATEGORY_{}_NAME", i)).unwrap_or_default(),
                is_meal_cost: parse_flag(lookup, &format!("EXPENSE_CATEGORY_{}_IS_MEAL_COST", i)),
            })
            .collect())
    }

    fn load_payment_configs<F>(lookup: &F) -> Result<Vec<PaymentConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let count: usize = parse_var(lookup, "PAYMENT_COUNT", "0")?;
        Ok((1..=count)
            .map(|i| PaymentConfig {
                name: lookup(&format!("PAYMENT_{}_NAME", i)).unwrap_or_default(),
                is_public_expense: parse_flag(
                    lookup,
                    &format!("PAYMENT_{}_IS_PUBLIC_EXPENSE", i),
                ),
            })
            .collect())
    }

    pub fn person_options(&self) -> Vec<SelectOption> {
        self.persons
            .iter()
            .map(|p| SelectOption::new(&p.username, &p.username))
            .collect()
    }

    pub fn category_options(&self) -> Vec<SelectOption> {
        self.expense_categories
            .iter()
            .map(|c| SelectOption::new(&c.name, &c.name))
            .collect()
    }

    pub fn payment_options(&self) -> Vec<SelectOption> {
        self.payment_configs
            .iter()
            .map(|p| SelectOption::new(&p.name, &p.name))
            .collect()
    }

    pub fn find_payment(&self, name: &str) -> Option<&PaymentConfig> {
        self.payment_configs.iter().find(|p| p.name == name)
    }
}
