//! Proactive suggestions: standing rules checked against live operational data.

use tracing::{debug, warn};

use crate::actors::traits::OperationalMetrics;
use crate::error::AppError;
use crate::models::{ProactiveRule, RuleType, Suggestion};

/// Window for the `Expiring Contract` rule.
pub const CONTRACT_EXPIRY_DAYS: u32 = 30;

/// Evaluates `rules` for a screen showing `entity_type`.
///
/// Rules targeting another entity type are skipped. A rule whose condition
/// cannot be evaluated counts as not fired. Fired rules are ordered by
/// priority (Critical first, unknown last); equal priorities keep rule order.
pub async fn evaluate(
    rules: &[ProactiveRule],
    entity_type: Option<&str>,
    metrics: &dyn OperationalMetrics,
) -> Vec<Suggestion> {
    let mut fired: Vec<(u8, Suggestion)> = Vec::new();

    for rule in rules.iter().filter(|r| r.is_active) {
        if let (Some(current), Some(target)) = (entity_type, rule.target_entity_type.as_deref()) {
            if !target.is_empty() && target != current {
                continue;
            }
        }

        match check_condition(rule, metrics).await {
            Ok(true) => {
                debug!(rule = %rule.name, "proactive rule fired");
                fired.push((
                    rule.priority_rank(),
                    Suggestion {
                        rule: rule.name.clone(),
                        message: rule.message.clone(),
                        message_urdu: rule.message_urdu.clone(),
                        priority: rule.priority.clone(),
                        rule_type: rule.rule_type.clone(),
                    },
                ));
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "treating rule as not fired"),
        }
    }

    fired.sort_by_key(|(rank, _)| *rank);
    fired.into_iter().map(|(_, suggestion)| suggestion).collect()
}

/// Whether `rule`'s condition currently holds. Unknown rule types never fire.
pub async fn check_condition(
    rule: &ProactiveRule,
    metrics: &dyn OperationalMetrics,
) -> Result<bool, AppError> {
    let Ok(rule_type) = rule.rule_type.parse::<RuleType>() else {
        debug!(rule = %rule.name, rule_type = %rule.rule_type, "no check for rule type");
        return Ok(false);
    };

    let count = match rule_type {
        RuleType::LowStockAlert => metrics.low_stock_bins().await,
        RuleType::OverdueInvoice => metrics.overdue_invoices().await,
        RuleType::MissingDocument => match rule.target_entity_type.as_deref() {
            Some(target) if !target.is_empty() => metrics.pending_documents(target).await,
            _ => return Ok(false),
        },
        RuleType::ExpiringContract => metrics.expiring_contracts(CONTRACT_EXPIRY_DAYS).await,
    }
    .map_err(|e| AppError::RuleEvaluation {
        rule: rule.name.clone(),
        reason: e.to_string(),
    })?;

    Ok(count > 0)
}
