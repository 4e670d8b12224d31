//! Marea profit-distribution evaluation.
//!
//! A distribution profile is an ordered list of rules ("items") evaluated in a
//! single pass over a running accumulator. Each item resolves an operand from
//! the marea's base figures (gross income, total expense, net result), a fixed
//! amount, or the recorded result of an earlier item, and combines it with the
//! accumulator through its operation. The post-operation accumulator value is
//! recorded as the item's result; items flagged `is_payout` form the labeled
//! lines of the distribution report.
//!
//! References go by `order_index` and must point strictly backwards, which
//! keeps the item graph acyclic by construction. Validation runs both when
//! items are written and again before evaluation.
//!
//! All amounts are integer cents; percentages and multiply factors are basis
//! points (1% = 100 bp). Interior arithmetic uses [`Decimal`] and rounds back
//! to cents with banker's rounding, so repeated percentage splits cannot
//! accumulate drift beyond a cent.

use crate::db::models::profiles::{ItemDBResponse, ItemOperation, ItemSource, ValueKind};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::collections::BTreeMap;
use thiserror::Error;

/// Base figures a distribution is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionInput {
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
}

impl DistributionInput {
    pub fn net_result_cents(&self) -> i64 {
        self.gross_income_cents - self.total_expense_cents
    }
}

/// One evaluated line of a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionLine {
    pub order_index: i64,
    pub label: String,
    pub amount_cents: i64,
    pub is_payout: bool,
}

/// Full evaluation result: every item's recorded value plus the base figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionOutcome {
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_result_cents: i64,
    pub lines: Vec<DistributionLine>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DistributionError {
    #[error("item {order_index} divides by zero")]
    DivisionByZero { order_index: i64 },

    #[error("item {order_index} references item {refers_to}, which does not precede it")]
    ForwardReference { order_index: i64, refers_to: i64 },

    #[error("item {order_index} has source 'item' but no reference index")]
    MissingReference { order_index: i64 },

    #[error("item {order_index}: {message}")]
    InvalidItem { order_index: i64, message: String },
}

/// Validate a single item against the set of order indices that precede it.
///
/// Shared between the write path (item create/update) and the evaluator so a
/// profile that was accepted can only fail evaluation if rows were edited
/// behind the application's back.
pub fn validate_item(
    item: &ItemDBResponse,
    preceding: &[i64],
) -> Result<(), DistributionError> {
    match item.source {
        ItemSource::Item => {
            let refers_to = item
                .ref_order_index
                .ok_or(DistributionError::MissingReference {
                    order_index: item.order_index,
                })?;
            if refers_to >= item.order_index || !preceding.contains(&refers_to) {
                return Err(DistributionError::ForwardReference {
                    order_index: item.order_index,
                    refers_to,
                });
            }
        }
        _ => {
            if item.ref_order_index.is_some() {
                return Err(DistributionError::InvalidItem {
                    order_index: item.order_index,
                    message: "reference index is only valid with source 'item'".to_string(),
                });
            }
        }
    }

    match item.operation {
        ItemOperation::Multiply => {
            if item.value_kind != ValueKind::Factor {
                return Err(DistributionError::InvalidItem {
                    order_index: item.order_index,
                    message: "multiply requires a factor value".to_string(),
                });
            }
        }
        ItemOperation::Divide => {
            if item.value_kind != ValueKind::Factor {
                return Err(DistributionError::InvalidItem {
                    order_index: item.order_index,
                    message: "divide requires a factor value".to_string(),
                });
            }
            if item.value == 0 {
                return Err(DistributionError::DivisionByZero {
                    order_index: item.order_index,
                });
            }
        }
        ItemOperation::Set | ItemOperation::Add | ItemOperation::Subtract => {
            if item.value_kind == ValueKind::Factor {
                return Err(DistributionError::InvalidItem {
                    order_index: item.order_index,
                    message: "factor values are only valid with multiply/divide".to_string(),
                });
            }
            if item.source == ItemSource::Fixed && item.value_kind != ValueKind::Amount {
                return Err(DistributionError::InvalidItem {
                    order_index: item.order_index,
                    message: "fixed source requires an amount value".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Evaluate a profile's items against the marea totals.
///
/// Items must be sorted by `order_index` ascending (the repository returns
/// them that way).
pub fn evaluate(
    items: &[ItemDBResponse],
    input: DistributionInput,
) -> Result<DistributionOutcome, DistributionError> {
    let mut results: BTreeMap<i64, i64> = BTreeMap::new();
    let mut lines = Vec::with_capacity(items.len());
    let mut accumulator: i64 = 0;

    for item in items {
        let preceding: Vec<i64> = results.keys().copied().collect();
        validate_item(item, &preceding)?;

        accumulator = apply(item, accumulator, input, &results)?;
        results.insert(item.order_index, accumulator);
        lines.push(DistributionLine {
            order_index: item.order_index,
            label: item.label.clone(),
            amount_cents: accumulator,
            is_payout: item.is_payout,
        });
    }

    Ok(DistributionOutcome {
        gross_income_cents: input.gross_income_cents,
        total_expense_cents: input.total_expense_cents,
        net_result_cents: input.net_result_cents(),
        lines,
    })
}

fn apply(
    item: &ItemDBResponse,
    accumulator: i64,
    input: DistributionInput,
    results: &BTreeMap<i64, i64>,
) -> Result<i64, DistributionError> {
    match item.operation {
        ItemOperation::Set | ItemOperation::Add | ItemOperation::Subtract => {
            let operand = resolve_operand(item, input, results)?;
            Ok(match item.operation {
                ItemOperation::Set => operand,
                ItemOperation::Add => accumulator + operand,
                ItemOperation::Subtract => accumulator - operand,
                _ => unreachable!(),
            })
        }
        ItemOperation::Multiply => Ok(scale_bp(accumulator, item.value)),
        ItemOperation::Divide => {
            // value == 0 is caught by validate_item
            let divided = Decimal::from(accumulator) / Decimal::from(item.value);
            Ok(round_cents(divided))
        }
    }
}

fn resolve_operand(
    item: &ItemDBResponse,
    input: DistributionInput,
    results: &BTreeMap<i64, i64>,
) -> Result<i64, DistributionError> {
    let base = match item.source {
        ItemSource::GrossIncome => input.gross_income_cents,
        ItemSource::TotalExpense => input.total_expense_cents,
        ItemSource::NetResult => input.net_result_cents(),
        ItemSource::Fixed => item.value,
        ItemSource::Item => {
            let refers_to = item.ref_order_index.ok_or(DistributionError::MissingReference {
                order_index: item.order_index,
            })?;
            *results
                .get(&refers_to)
                .ok_or(DistributionError::ForwardReference {
                    order_index: item.order_index,
                    refers_to,
                })?
        }
    };

    // A percent value scales the resolved amount; fixed amounts pass through.
    Ok(match (item.source, item.value_kind) {
        (ItemSource::Fixed, _) => base,
        (_, ValueKind::Percent) => scale_bp(base, item.value),
        _ => base,
    })
}

/// Scale an amount by basis points, rounding half-to-even to whole cents.
fn scale_bp(amount_cents: i64, bp: i64) -> i64 {
    let scaled = Decimal::from(amount_cents) * Decimal::from(bp) / Decimal::from(10_000);
    round_cents(scaled)
}

fn round_cents(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        // Amounts fit comfortably in i64 cents; overflow would need 9e16 euro
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(
        order_index: i64,
        operation: ItemOperation,
        source: ItemSource,
        value_kind: ValueKind,
        value: i64,
    ) -> ItemDBResponse {
        ItemDBResponse {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            order_index,
            label: format!("item {order_index}"),
            operation,
            source,
            ref_order_index: None,
            value_kind,
            value,
            is_payout: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item_ref(order_index: i64, operation: ItemOperation, refers_to: i64) -> ItemDBResponse {
        ItemDBResponse {
            ref_order_index: Some(refers_to),
            ..item(order_index, operation, ItemSource::Item, ValueKind::Amount, 0)
        }
    }

    const INPUT: DistributionInput = DistributionInput {
        gross_income_cents: 1_000_000, // 10_000.00
        total_expense_cents: 400_000,  // 4_000.00
    };

    #[test]
    fn test_empty_profile() {
        let outcome = evaluate(&[], INPUT).unwrap();
        assert!(outcome.lines.is_empty());
        assert_eq!(outcome.gross_income_cents, 1_000_000);
        assert_eq!(outcome.net_result_cents, 600_000);
    }

    #[test]
    fn test_set_from_bases() {
        let items = vec![
            item(1, ItemOperation::Set, ItemSource::GrossIncome, ValueKind::Amount, 0),
            item(2, ItemOperation::Set, ItemSource::TotalExpense, ValueKind::Amount, 0),
            item(3, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
        ];
        let outcome = evaluate(&items, INPUT).unwrap();
        assert_eq!(outcome.lines[0].amount_cents, 1_000_000);
        assert_eq!(outcome.lines[1].amount_cents, 400_000);
        assert_eq!(outcome.lines[2].amount_cents, 600_000);
    }

    #[test]
    fn test_percent_of_income() {
        // 10% of gross income
        let items = vec![item(
            1,
            ItemOperation::Set,
            ItemSource::GrossIncome,
            ValueKind::Percent,
            1_000,
        )];
        let outcome = evaluate(&items, INPUT).unwrap();
        assert_eq!(outcome.lines[0].amount_cents, 100_000);
    }

    #[test]
    fn test_add_and_subtract() {
        // net result minus a 5% of income levy plus a fixed 250.00 subsidy
        let items = vec![
            item(1, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
            item(2, ItemOperation::Subtract, ItemSource::GrossIncome, ValueKind::Percent, 500),
            item(3, ItemOperation::Add, ItemSource::Fixed, ValueKind::Amount, 25_000),
        ];
        let outcome = evaluate(&items, INPUT).unwrap();
        assert_eq!(outcome.lines[1].amount_cents, 600_000 - 50_000);
        assert_eq!(outcome.lines[2].amount_cents, 600_000 - 50_000 + 25_000);
    }

    #[test]
    fn test_multiply_and_divide() {
        // half of net, then split into 3 parts
        let items = vec![
            item(1, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
            item(2, ItemOperation::Multiply, ItemSource::NetResult, ValueKind::Factor, 5_000),
            item(3, ItemOperation::Divide, ItemSource::NetResult, ValueKind::Factor, 3),
        ];
        let outcome = evaluate(&items, INPUT).unwrap();
        assert_eq!(outcome.lines[1].amount_cents, 300_000);
        assert_eq!(outcome.lines[2].amount_cents, 100_000);
    }

    #[test]
    fn test_item_reference() {
        // crew pool = 40% of net; boat share = net - crew pool
        let items = vec![
            item(1, ItemOperation::Set, ItemSource::NetResult, ValueKind::Percent, 4_000),
            item(2, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
            item_ref(3, ItemOperation::Subtract, 1),
        ];
        let outcome = evaluate(&items, INPUT).unwrap();
        assert_eq!(outcome.lines[0].amount_cents, 240_000);
        assert_eq!(outcome.lines[2].amount_cents, 600_000 - 240_000);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let items = vec![
            item_ref(1, ItemOperation::Set, 2),
            item(2, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
        ];
        let err = evaluate(&items, INPUT).unwrap_err();
        assert_eq!(
            err,
            DistributionError::ForwardReference {
                order_index: 1,
                refers_to: 2
            }
        );
    }

    #[test]
    fn test_self_reference_rejected() {
        let items = vec![item_ref(1, ItemOperation::Set, 1)];
        let err = evaluate(&items, INPUT).unwrap_err();
        assert!(matches!(err, DistributionError::ForwardReference { .. }));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let mut bad = item(1, ItemOperation::Set, ItemSource::Item, ValueKind::Amount, 0);
        bad.ref_order_index = None;
        let err = evaluate(&[bad], INPUT).unwrap_err();
        assert_eq!(err, DistributionError::MissingReference { order_index: 1 });
    }

    #[test]
    fn test_division_by_zero_rejected() {
        let items = vec![
            item(1, ItemOperation::Set, ItemSource::NetResult, ValueKind::Amount, 0),
            item(2, ItemOperation::Divide, ItemSource::NetResult, ValueKind::Factor, 0),
        ];
        let err = evaluate(&items, INPUT).unwrap_err();
        assert_eq!(err, DistributionError::DivisionByZero { order_index: 2 });
    }

    #[test]
    fn test_factor_only_valid_for_multiply_divide() {
        let items = vec![item(
            1,
            ItemOperation::Set,
            ItemSource::NetResult,
            ValueKind::Factor,
            2,
        )];
        assert!(matches!(
            evaluate(&items, INPUT).unwrap_err(),
            DistributionError::InvalidItem { order_index: 1, .. }
        ));
    }

    #[test]
    fn test_negative_results_are_legal() {
        // expenses above income: a loss distribution still evaluates
        let input = DistributionInput {
            gross_income_cents: 100_000,
            total_expense_cents: 250_000,
        };
        let items = vec![item(
            1,
            ItemOperation::Set,
            ItemSource::NetResult,
            ValueKind::Amount,
            0,
        )];
        let outcome = evaluate(&items, input).unwrap();
        assert_eq!(outcome.lines[0].amount_cents, -150_000);
    }

    #[test]
    fn test_bankers_rounding() {
        // 0.5 cent cases round to the even cent
        assert_eq!(scale_bp(25, 5_000), 12); // 12.5 -> 12
        assert_eq!(scale_bp(35, 5_000), 18); // 17.5 -> 18
        assert_eq!(scale_bp(-25, 5_000), -12);
    }

    #[test]
    fn test_realistic_share_profile() {
        // A common "a la parte" layout: take fuel and food off the top,
        // split the remainder 50/50 between boat and crew, then divide the
        // crew pool into 6 parts.
        let mut crew_pool = item(4, ItemOperation::Multiply, ItemSource::NetResult, ValueKind::Factor, 5_000);
        crew_pool.is_payout = true;
        let mut per_part = item(5, ItemOperation::Divide, ItemSource::NetResult, ValueKind::Factor, 6);
        per_part.is_payout = true;

        let items = vec![
            item(1, ItemOperation::Set, ItemSource::GrossIncome, ValueKind::Amount, 0),
            item(2, ItemOperation::Subtract, ItemSource::TotalExpense, ValueKind::Amount, 0),
            item(3, ItemOperation::Subtract, ItemSource::Fixed, ValueKind::Amount, 60_000),
            crew_pool,
            per_part,
        ];
        let outcome = evaluate(&items, INPUT).unwrap();

        // 10_000.00 - 4_000.00 - 600.00 = 5_400.00
        assert_eq!(outcome.lines[2].amount_cents, 540_000);
        // crew pool: 2_700.00
        assert_eq!(outcome.lines[3].amount_cents, 270_000);
        // per part: 450.00
        assert_eq!(outcome.lines[4].amount_cents, 45_000);

        let payouts: Vec<_> = outcome.lines.iter().filter(|l| l.is_payout).collect();
        assert_eq!(payouts.len(), 2);
    }
}
