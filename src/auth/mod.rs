//! Authorization: permission decisions and credential checks.

pub mod evaluator;
pub mod throttle;

pub use evaluator::{Decision, MISSING_USER_WARN_WINDOW_SECS, PermissionEvaluator};
pub use throttle::{Clock, ManualClock, SystemClock, WarnThrottle};
