use std::collections::BTreeMap;

use crate::schemas::{Balance, Expense, ParticipantId, Settlement, TOLERANCE};

#[derive(Clone, Debug)]
struct PersonalBalance<'a> {
    id: &'a ParticipantId,
    remaining: f64,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct UserPair {
    user1: ParticipantId,
    user2: ParticipantId,
}

/// Greedy settlement plan: the biggest creditor is paired with the biggest
/// debtor until one side runs out.
///
/// Balances within the tolerance of zero are treated as settled. Transfers of
/// at most the tolerance are consumed without being emitted, so every
/// returned amount is above it. Residuals caused by balances that do not sum
/// to zero are left unsettled.
pub fn compute_settlements(balances: &[Balance]) -> Vec<Settlement> {
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();
    for balance in balances {
        let person = PersonalBalance {
            id: &balance.participant_id,
            remaining: balance.balance.abs(),
        };
        if balance.balance > TOLERANCE {
            creditors.push(person);
        } else if balance.balance < -TOLERANCE {
            debtors.push(person);
        }
    }

    // Both lists end up largest first; the sort is stable so ties keep input order.
    creditors.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));
    debtors.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));

    let mut settlements = Vec::new();
    let (mut c, mut d) = (0, 0);
    while c < creditors.len() && d < debtors.len() {
        let creditor = &mut creditors[c];
        let debtor = &mut debtors[d];

        let amount = creditor.remaining.min(debtor.remaining);
        if amount > TOLERANCE {
            settlements.push(Settlement {
                from: debtor.id.clone(),
                to: creditor.id.clone(),
                amount,
            });
        }
        creditor.remaining -= amount;
        debtor.remaining -= amount;

        if creditor.remaining < TOLERANCE {
            c += 1;
        }
        if debtor.remaining < TOLERANCE {
            d += 1;
        }
    }

    settlements
}

/// Who owes whom without any simplification: every split share is a debt
/// towards the expense's payer, netted per pair of participants.
///
/// Pairs are reported in lexicographic order of their ids.
pub fn compute_direct_debts<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<Settlement> {
    let mut balances_between_people: BTreeMap<UserPair, f64> = BTreeMap::new();

    for expense in expenses {
        for split in &expense.splits {
            if split.participant_id == expense.payer {
                continue;
            }
            // Positive means user2 owes user1. Keeping the pair in alphabetical
            // order makes both directions land on the same key.
            let (pair, amount) = if expense.payer < split.participant_id {
                (
                    UserPair {
                        user1: expense.payer.clone(),
                        user2: split.participant_id.clone(),
                    },
                    split.amount,
                )
            } else {
                (
                    UserPair {
                        user1: split.participant_id.clone(),
                        user2: expense.payer.clone(),
                    },
                    -split.amount,
                )
            };

            *balances_between_people.entry(pair).or_insert(0.0) += amount;
        }
    }

    balances_between_people
        .into_iter()
        .filter(|(_, balance)| balance.abs() > TOLERANCE)
        .map(|(pair, balance)| {
            let (from, to) = if balance > 0.0 {
                (pair.user2, pair.user1)
            } else {
                (pair.user1, pair.user2)
            };
            Settlement {
                from,
                to,
                amount: balance.abs(),
            }
        })
        .collect()
}
