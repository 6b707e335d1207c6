//! Inclusion score ("alpha")
//!
//! Balances an item's declared value against how often it already made it
//! into a volume:
//! - value 1 items are kept once: 0.1 until included, 0 afterwards
//! - value 10 items are always included: alpha is 1
//! - before any volume exists alpha is `value / 10`
//! - otherwise alpha is `value / 10 - n_volumes / total_volumes`
//!
//! Over-represented items get a lower, possibly negative, score. The result
//! is not clamped.

use crate::models::Value;
use jmc_common::{Error, Result};

pub fn alpha(value: Value, n_volumes: usize, total_volumes: usize) -> Result<f64> {
    if n_volumes > total_volumes {
        return Err(Error::PreconditionViolation(format!(
            "Item is in {} volumes but only {} were issued",
            n_volumes, total_volumes
        )));
    }

    let value = value.get();
    if value == Value::MIN && n_volumes > 0 {
        return Ok(0.0);
    }
    if value == Value::MAX {
        return Ok(1.0);
    }

    let optimal = f64::from(value) / 10.0;
    if total_volumes == 0 {
        return Ok(optimal);
    }
    let state = n_volumes as f64 / total_volumes as f64;
    Ok(optimal - state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(value: u8) -> Value {
        Value::new(value).unwrap()
    }

    #[test]
    fn test_always_10() {
        for n in 0..=10 {
            assert_eq!(alpha(v(10), n, n).unwrap(), 1.0);
        }
        assert_eq!(alpha(v(10), 5, 10).unwrap(), 1.0);
        assert_eq!(alpha(v(10), 0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_only_1() {
        assert_eq!(alpha(v(1), 0, 0).unwrap(), 0.1);
        assert_eq!(alpha(v(1), 0, 5).unwrap(), 0.1);
        assert_eq!(alpha(v(1), 1, 5).unwrap(), 0.0);
        assert_eq!(alpha(v(1), 2, 5).unwrap(), 0.0);
    }

    #[test]
    fn test_order() {
        assert!(alpha(v(10), 0, 0).unwrap() > alpha(v(1), 0, 0).unwrap());
        assert!(alpha(v(5), 2, 5).unwrap() > alpha(v(5), 3, 5).unwrap());
        assert!(alpha(v(7), 3, 5).unwrap() > alpha(v(5), 3, 5).unwrap());
    }

    #[test]
    fn test_monotonic_in_history() {
        for value in 2..10 {
            for n in 0..8 {
                assert!(alpha(v(value), n, 8).unwrap() > alpha(v(value), n + 1, 8).unwrap());
            }
        }
    }

    #[test]
    fn test_negative_scores_are_kept() {
        assert_eq!(alpha(v(5), 1, 1).unwrap(), -0.5);
    }

    #[test]
    fn test_history_longer_than_volumes() {
        let err = alpha(v(5), 3, 2).unwrap_err();
        assert!(err.is_precondition());
    }
}
