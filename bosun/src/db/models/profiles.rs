//! Database request/response models for distribution profiles and their items.

use crate::types::{ProfileId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How an item combines its operand with the running accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemOperation {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Where an item's operand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    GrossIncome,
    TotalExpense,
    NetResult,
    Fixed,
    Item,
}

/// Interpretation of the `value` field: a percentage in basis points, a fixed
/// amount in cents, or a scaling factor (bp for multiply, divisor for divide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Percent,
    Amount,
    Factor,
}

#[derive(Debug, Clone)]
pub struct ProfileCreateDBRequest {
    pub vessel_id: VesselId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileDBResponse {
    pub id: ProfileId,
    pub vessel_id: VesselId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ItemCreateDBRequest {
    pub profile_id: ProfileId,
    pub order_index: i64,
    pub label: String,
    pub operation: ItemOperation,
    pub source: ItemSource,
    pub ref_order_index: Option<i64>,
    pub value_kind: ValueKind,
    pub value: i64,
    pub is_payout: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ItemUpdateDBRequest {
    pub label: Option<String>,
    pub operation: Option<ItemOperation>,
    pub source: Option<ItemSource>,
    pub ref_order_index: Option<Option<i64>>,
    pub value_kind: Option<ValueKind>,
    pub value: Option<i64>,
    pub is_payout: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ItemDBResponse {
    pub id: Uuid,
    pub profile_id: ProfileId,
    pub order_index: i64,
    pub label: String,
    pub operation: ItemOperation,
    pub source: ItemSource,
    pub ref_order_index: Option<i64>,
    pub value_kind: ValueKind,
    pub value: i64,
    pub is_payout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
