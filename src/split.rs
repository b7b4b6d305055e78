use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::schemas::{ParticipantId, SplitEntry, SplitPolicy, TOLERANCE};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("invalid split: no participants")]
    NoParticipants,
    #[error("invalid split: zero total shares")]
    ZeroTotalShares,
    #[error("invalid split: total amount {0} must be a non-negative number")]
    InvalidTotal(f64),
    #[error("invalid split: percentages add up to {total}, expected 100")]
    PercentageMismatch { total: f64 },
    #[error("invalid split: amount mismatch, exact amounts add up to {actual}, expected {expected}")]
    AmountMismatch { expected: f64, actual: f64 },
    #[error("invalid split: bad value {value} for participant \"{participant}\"")]
    InvalidInput { participant: ParticipantId, value: f64 },
}

pub fn resolve_split(
    total: f64,
    policy: SplitPolicy,
    participants: &[ParticipantId],
    inputs: &HashMap<ParticipantId, f64>,
) -> Result<Vec<SplitEntry>, SplitError> {
    let participants = dedup(participants);
    if participants.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    if !total.is_finite() || total < 0.0 {
        return Err(SplitError::InvalidTotal(total));
    }

    let amounts: Vec<f64> = match policy {
        SplitPolicy::Equally => {
            let each = total / participants.len() as f64;
            vec![each; participants.len()]
        }
        SplitPolicy::Percentage => {
            let percentages = policy_values(&participants, inputs, 0.0, Some(100.0))?;
            let sum: f64 = percentages.iter().sum();
            if (sum - 100.0).abs() >= TOLERANCE {
                return Err(SplitError::PercentageMismatch { total: sum });
            }
            let mut amounts: Vec<f64> =
                percentages.iter().map(|pct| total * pct / 100.0).collect();
            absorb_remainder(&mut amounts, total);
            amounts
        }
        SplitPolicy::Shares => {
            let shares = policy_values(&participants, inputs, 1.0, None)?;
            let sum: f64 = shares.iter().sum();
            if sum <= 0.0 {
                return Err(SplitError::ZeroTotalShares);
            }
            shares.iter().map(|share| total * share / sum).collect()
        }
        SplitPolicy::Exact => {
            let exact = policy_values(&participants, inputs, 0.0, None)?;
            let sum: f64 = exact.iter().sum();
            if (sum - total).abs() >= TOLERANCE {
                return Err(SplitError::AmountMismatch {
                    expected: total,
                    actual: sum,
                });
            }
            exact
        }
    };

    Ok(participants
        .into_iter()
        .zip(amounts)
        .map(|(participant_id, amount)| SplitEntry {
            participant_id: participant_id.clone(),
            amount,
        })
        .collect())
}

// Percentages within the tolerance of 100 still leave `total * slack / 100`
// unassigned. The largest amount takes it so the splits add up to the total
// and no amount turns negative.
fn absorb_remainder(amounts: &mut [f64], total: f64) {
    let remainder = total - amounts.iter().sum::<f64>();
    let largest = amounts
        .iter_mut()
        .reduce(|largest, amount| if *amount > *largest { amount } else { largest });
    if let Some(largest) = largest {
        *largest += remainder;
    }
}

// First occurrence wins, order is kept.
fn dedup(participants: &[ParticipantId]) -> Vec<&ParticipantId> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .collect()
}

fn policy_values(
    participants: &[&ParticipantId],
    inputs: &HashMap<ParticipantId, f64>,
    missing: f64,
    max: Option<f64>,
) -> Result<Vec<f64>, SplitError> {
    participants
        .iter()
        .map(|&id| {
            let value = inputs.get(id).copied().unwrap_or(missing);
            let out_of_range = max.is_some_and(|max| value > max);
            if !value.is_finite() || value < 0.0 || out_of_range {
                Err(SplitError::InvalidInput {
                    participant: id.clone(),
                    value,
                })
            } else {
                Ok(value)
            }
        })
        .collect()
}
