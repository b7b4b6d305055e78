use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::balance::compute_balances;
use crate::exchange::compute_settlements;
use crate::schemas::{Balance, Expense, ExpenseCategory, ParticipantId, Settlement, Trip};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantTotals {
    pub participant_id: ParticipantId,
    pub paid: f64,
    pub owed: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: String,
    pub expense_count: usize,
    pub total_spend: f64,
    pub categories: Vec<CategoryTotal>,
    pub participants: Vec<ParticipantTotals>,
    pub balances: Vec<Balance>,
    pub settlements: Vec<Settlement>,
}

impl TripSummary {
    pub fn build(trip: &Trip, range: DateRange) -> Self {
        let expenses = filter_by_date_range(&trip.expenses, range.from, range.to);
        let roster = trip.roster();
        let balances = compute_balances(expenses.iter().copied(), &roster);
        let settlements = compute_settlements(&balances);

        TripSummary {
            trip_id: trip.id.clone(),
            expense_count: expenses.len(),
            total_spend: total_spend(expenses.iter().copied()),
            categories: totals_by_category(expenses.iter().copied()),
            participants: participant_totals(expenses.iter().copied(), &roster),
            balances,
            settlements,
        }
    }
}

pub fn total_spend<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> f64 {
    expenses.into_iter().map(|e| e.amount).sum()
}

/// Totals for the categories that have at least one expense, in the fixed
/// category order.
pub fn totals_by_category<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<CategoryTotal> {
    let mut totals = [None::<f64>; ExpenseCategory::ALL.len()];
    for expense in expenses {
        *totals[expense.category.index()].get_or_insert(0.0) += expense.amount;
    }

    ExpenseCategory::ALL
        .iter()
        .zip(totals)
        .filter_map(|(category, total)| {
            total.map(|total| CategoryTotal {
                category: *category,
                total,
            })
        })
        .collect()
}

/// Paid and owed totals per participant. `paid - owed` is the balance.
pub fn participant_totals<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    roster: &[ParticipantId],
) -> Vec<ParticipantTotals> {
    let mut totals: Vec<ParticipantTotals> = Vec::with_capacity(roster.len());
    for id in roster {
        slot(&mut totals, id);
    }
    for expense in expenses {
        slot(&mut totals, &expense.payer).paid += expense.amount;
        for split in &expense.splits {
            slot(&mut totals, &split.participant_id).owed += split.amount;
        }
    }
    totals
}

fn slot<'t>(totals: &'t mut Vec<ParticipantTotals>, id: &str) -> &'t mut ParticipantTotals {
    let index = match totals.iter().position(|t| t.participant_id == id) {
        Some(index) => index,
        None => {
            totals.push(ParticipantTotals {
                participant_id: id.to_string(),
                paid: 0.0,
                owed: 0.0,
            });
            totals.len() - 1
        }
    };
    &mut totals[index]
}

/// What a single participant owes across the given expenses.
pub fn share_of<'a>(expenses: impl IntoIterator<Item = &'a Expense>, participant: &str) -> f64 {
    expenses
        .into_iter()
        .flat_map(|e| &e.splits)
        .filter(|s| s.participant_id == participant)
        .map(|s| s.amount)
        .sum()
}

/// Expenses dated within `[from, to]`; a missing bound is open.
pub fn filter_by_date_range(
    expenses: &[Expense],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<&Expense> {
    let range = DateRange { from, to };
    expenses.iter().filter(|e| range.contains(e.date)).collect()
}
