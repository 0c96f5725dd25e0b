//! ClusterOperator status conditions
//!
//! Typed view of the `status.conditions` list reported by cluster operators.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OPERATOR_AVAILABLE: &str = "Available";
pub const OPERATOR_PROGRESSING: &str = "Progressing";
pub const OPERATOR_DEGRADED: &str = "Degraded";

/// Conditions every operator must report once its status is initialized
pub const CORE_CONDITIONS: [&str; 3] = [
    OPERATOR_AVAILABLE,
    OPERATOR_PROGRESSING,
    OPERATOR_DEGRADED,
];

/// Condition status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single operator status condition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default)]
    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl OperatorCondition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is(&self, type_: &str, status: ConditionStatus) -> bool {
        self.type_ == type_ && self.status == status
    }
}

/// Find a condition by type
pub fn find_condition<'a>(
    conditions: &'a [OperatorCondition],
    type_: &str,
) -> Option<&'a OperatorCondition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Whether Available, Progressing and Degraded are all reported with a known status
pub fn core_conditions_set(conditions: &[OperatorCondition]) -> bool {
    CORE_CONDITIONS.iter().all(|t| {
        find_condition(conditions, t)
            .map(|c| c.status != ConditionStatus::Unknown)
            .unwrap_or(false)
    })
}

/// Operator health derived from its conditions
///
/// Progressing is assumed until the operator explicitly reports
/// `Progressing=False`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatorHealth {
    pub available: bool,
    pub progressing: bool,
    pub degraded: bool,
}

impl OperatorHealth {
    pub fn from_conditions(conditions: &[OperatorCondition]) -> Self {
        let mut health = Self {
            available: false,
            progressing: true,
            degraded: false,
        };

        for c in conditions {
            if c.is(OPERATOR_AVAILABLE, ConditionStatus::True) {
                health.available = true;
            }
            if c.is(OPERATOR_PROGRESSING, ConditionStatus::False) {
                health.progressing = false;
            }
            if c.is(OPERATOR_DEGRADED, ConditionStatus::True) {
                health.degraded = true;
            }
        }

        health
    }

    /// Available and done progressing
    pub fn is_settled(&self) -> bool {
        self.available && !self.progressing
    }
}

impl fmt::Display for OperatorHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "available={}, progressing={}, degraded={}",
            self.available, self.progressing, self.degraded
        )
    }
}
