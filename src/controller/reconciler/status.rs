//! # Status
//!
//! The `Ready` condition. Rewritten only when something observable changed;
//! `lastTransitionTime` moves only when the condition status flips.

use crate::crd::{Condition, ConditionStatus, ExternalSecretStatus, READY_CONDITION};

/// Status to write for an outcome, or `None` when the current one already
/// says the same thing
#[must_use]
pub fn next_status(
    current: Option<&ExternalSecretStatus>,
    generation: Option<i64>,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: &str,
) -> Option<ExternalSecretStatus> {
    let previous = current.and_then(ExternalSecretStatus::ready_condition);

    if let Some(previous) = previous {
        let unchanged = previous.status == status
            && previous.reason.as_deref() == Some(reason)
            && previous.message.as_deref().unwrap_or_default() == message
            && current.and_then(|s| s.observed_generation) == generation;
        if unchanged {
            return None;
        }
    }

    let last_transition_time = match previous {
        Some(previous) if previous.status == status => previous
            .last_transition_time
            .clone()
            .or_else(|| Some(now.to_string())),
        _ => Some(now.to_string()),
    };

    let ready = Condition {
        r#type: READY_CONDITION.to_string(),
        status,
        last_transition_time,
        reason: Some(reason.to_string()),
        message: (!message.is_empty()).then(|| message.to_string()),
    };

    let mut conditions: Vec<Condition> = current
        .map(|s| {
            s.conditions
                .iter()
                .filter(|c| c.r#type != READY_CONDITION)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    conditions.push(ready);

    Some(ExternalSecretStatus {
        conditions,
        observed_generation: generation,
    })
}
