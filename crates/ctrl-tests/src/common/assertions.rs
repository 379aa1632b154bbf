// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Domain-specific assertion helpers with informative failure messages.

use std::time::Duration;

use chrono::Utc;

use ctrl_core::{DataValue, ServerError, ServerResult, StatusCode};

// =============================================================================
// DataValue Assertions
// =============================================================================

/// Assertion extensions for [`DataValue`].
pub trait DataValueAssertions {
    /// Assert that the value has good status.
    fn assert_good(&self);

    /// Assert that the value is within a tolerance (for numeric values).
    fn assert_value_approx(&self, expected: f64, tolerance: f64);

    /// Assert that the timestamp is recent (within the given duration).
    fn assert_recent(&self, max_age: Duration);

    /// Assert that this value is strictly newer than `earlier`.
    fn assert_newer_than(&self, earlier: &DataValue);
}

impl DataValueAssertions for DataValue {
    fn assert_good(&self) {
        assert!(
            self.status.is_good(),
            "Expected Good status, but got {} for {:?}",
            self.status,
            self.value
        );
    }

    fn assert_value_approx(&self, expected: f64, tolerance: f64) {
        let actual = self
            .value
            .as_f64()
            .unwrap_or_else(|| panic!("Value {:?} is not numeric", self.value));
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "Expected value {} ± {}, but got {} (diff: {})",
            expected,
            tolerance,
            actual,
            diff
        );
    }

    fn assert_recent(&self, max_age: Duration) {
        let age = Utc::now() - self.source_timestamp;
        let max_age = chrono::Duration::from_std(max_age).expect("max_age fits");
        assert!(
            age <= max_age,
            "Expected timestamp within {:?}, but it is {:?} old",
            max_age,
            age
        );
    }

    fn assert_newer_than(&self, earlier: &DataValue) {
        assert!(
            self.source_timestamp > earlier.source_timestamp,
            "Expected timestamp after {}, got {}",
            earlier.source_timestamp,
            self.source_timestamp
        );
    }
}

// =============================================================================
// Result Assertions
// =============================================================================

/// Assert that `result` failed with the given status code.
pub fn assert_status<T: std::fmt::Debug>(result: ServerResult<T>, expected: StatusCode) -> ServerError {
    match result {
        Ok(value) => panic!("Expected {}, but the call succeeded with {:?}", expected, value),
        Err(error) => {
            assert_eq!(
                error.status_code(),
                expected,
                "Expected {}, but got {} ({})",
                expected,
                error.status_code(),
                error
            );
            error
        }
    }
}

// =============================================================================
// Sequence Assertions
// =============================================================================

/// Assert that timestamps strictly increase across `values`.
pub fn assert_strictly_increasing(values: &[DataValue]) {
    for pair in values.windows(2) {
        pair[1].assert_newer_than(&pair[0]);
    }
}

/// Assert that consecutive numeric values never differ by more than `bound`.
pub fn assert_steps_within(values: &[DataValue], bound: f64) {
    for (i, pair) in values.windows(2).enumerate() {
        let (a, b) = match (pair[0].value.as_f64(), pair[1].value.as_f64()) {
            (Some(a), Some(b)) => (a, b),
            _ => panic!("Non-numeric value at step {}", i),
        };
        assert!(
            (b - a).abs() <= bound + 1e-9,
            "Step {} moved {} -> {} (limit {})",
            i,
            a,
            b,
            bound
        );
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
