use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::split::{resolve_split, SplitError};

pub type ParticipantId = String;

/// Absolute tolerance used for every "equal enough" comparison on amounts.
pub const TOLERANCE: f64 = 0.01;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Activities,
    Shopping,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Food,
        ExpenseCategory::Transport,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Activities,
        ExpenseCategory::Shopping,
        ExpenseCategory::Other,
    ];

    /// Position in [`ExpenseCategory::ALL`].
    pub const fn index(self) -> usize {
        match self {
            ExpenseCategory::Food => 0,
            ExpenseCategory::Transport => 1,
            ExpenseCategory::Accommodation => 2,
            ExpenseCategory::Activities => 3,
            ExpenseCategory::Shopping => 4,
            ExpenseCategory::Other => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    #[default]
    Equally,
    Percentage,
    Shares,
    Exact,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SplitEntry {
    pub participant_id: ParticipantId,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub payer: ParticipantId,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub policy: SplitPolicy,
    pub participants: Vec<ParticipantId>,
    pub splits: Vec<SplitEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn roster(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn has_participant(&self, id: &str) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub participant_id: ParticipantId,
    pub balance: f64,
}

/// `from` pays `to` the given amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: f64,
}

/// What a client submits when adding or replacing an expense.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExpenseInput {
    pub title: String,
    pub amount: f64,
    pub payer: ParticipantId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(default)]
    pub policy: SplitPolicy,
    pub participants: Vec<ParticipantId>,
    #[serde(default)]
    pub inputs: HashMap<ParticipantId, f64>,
}

impl ExpenseInput {
    /// Runs the split calculator and builds the stored record.
    pub fn resolve(self, id: String) -> Result<Expense, SplitError> {
        let splits = resolve_split(self.amount, self.policy, &self.participants, &self.inputs)?;
        // Duplicates were dropped by the calculator; keep the same set here.
        let participants = splits.iter().map(|s| s.participant_id.clone()).collect();
        Ok(Expense {
            id,
            title: self.title,
            amount: self.amount,
            payer: self.payer,
            date: self.date.unwrap_or_else(|| Utc::now().date_naive()),
            category: self.category,
            policy: self.policy,
            participants,
            splits,
        })
    }
}
