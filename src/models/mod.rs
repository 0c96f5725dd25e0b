//! Data models
//!
//! Status conditions, TLS profiles, observed configuration and test results.

pub mod conditions;
pub mod observed;
pub mod tls;
mod test_result;

pub use conditions::{ConditionStatus, OperatorCondition, OperatorHealth};
pub use observed::{FieldError, ObservedConfig, ServingInfo};
pub use test_result::{RunSummary, TestCase, TestResult, TestStatus};
pub use tls::{TlsProfileType, TlsSecurityProfile};
