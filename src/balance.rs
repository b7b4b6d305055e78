use std::collections::HashMap;

use crate::schemas::{Balance, Expense, ParticipantId};

/// Net position of every participant: what they paid minus what they owe.
///
/// Roster members come first, in roster order. Payers or split participants
/// missing from the roster are still accounted for and appended in order of
/// first appearance, so no amount is ever dropped.
pub fn compute_balances<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    roster: &[ParticipantId],
) -> Vec<Balance> {
    let mut ledger = Ledger::new(roster);
    for expense in expenses {
        *ledger.entry(&expense.payer) += expense.amount;
        for split in &expense.splits {
            *ledger.entry(&split.participant_id) -= split.amount;
        }
    }
    ledger.into_balances()
}

/// Signed sum of the balances. Anything further than the tolerance from zero
/// points at inconsistent expense data.
pub fn balance_total(balances: &[Balance]) -> f64 {
    balances.iter().map(|b| b.balance).sum()
}

struct Ledger {
    positions: HashMap<ParticipantId, usize>,
    balances: Vec<Balance>,
}

impl Ledger {
    fn new(roster: &[ParticipantId]) -> Self {
        let mut ledger = Ledger {
            positions: HashMap::with_capacity(roster.len()),
            balances: Vec::with_capacity(roster.len()),
        };
        for id in roster {
            if !ledger.positions.contains_key(id) {
                ledger.push(id);
            }
        }
        ledger
    }

    fn push(&mut self, id: &ParticipantId) -> usize {
        let position = self.balances.len();
        self.positions.insert(id.clone(), position);
        self.balances.push(Balance {
            participant_id: id.clone(),
            balance: 0.0,
        });
        position
    }

    fn entry(&mut self, id: &ParticipantId) -> &mut f64 {
        let position = match self.positions.get(id) {
            Some(&position) => position,
            None => {
                tracing::warn!(participant = %id, "participant is not part of the roster");
                self.push(id)
            }
        };
        &mut self.balances[position].balance
    }

    fn into_balances(self) -> Vec<Balance> {
        self.balances
    }
}
