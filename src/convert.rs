//! Value converters between display and model representations.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Converts between a display representation and a model value.
///
/// `convert_input` never fails: display values that cannot be converted map
/// to a converter-defined default.
///
/// `D` is the display type, `T` the model type.
pub trait ValueConverter<D, T> {
    fn convert_output(&self, data: &T) -> D;
    fn convert_input(&self, display: &D) -> T;
}

/// Passes values through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: Clone> ValueConverter<T, T> for Identity {
    fn convert_output(&self, data: &T) -> T {
        data.clone()
    }

    fn convert_input(&self, display: &T) -> T {
        display.clone()
    }
}

/// Text ⇄ any parseable value. Unparseable text converts to `T::default()`.
pub struct ParseText<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> ParseText<T> {
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for ParseText<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ParseText<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParseText<T> {}

impl<T> ValueConverter<String, T> for ParseText<T>
where
    T: FromStr + fmt::Display + Default,
{
    fn convert_output(&self, data: &T) -> String {
        data.to_string()
    }

    fn convert_input(&self, display: &String) -> T {
        display.trim().parse().unwrap_or_default()
    }
}

/// Stepper-style `f64` ⇄ `i32`: input truncates toward zero, saturating at
/// the `i32` bounds. NaN converts to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Truncate;

impl ValueConverter<f64, i32> for Truncate {
    fn convert_output(&self, data: &i32) -> f64 {
        f64::from(*data)
    }

    fn convert_input(&self, display: &f64) -> i32 {
        *display as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity() {
        assert_eq!(Identity.convert_output(&String::from("x")), "x");
        assert_eq!(Identity.convert_input(&3.5f64), 3.5);
    }

    #[test]
    fn test_invalid_text_falls_back_to_default() {
        let converter = ParseText::<i32>::new();
        assert_eq!(converter.convert_input(&"twelve".to_string()), 0);
        assert_eq!(converter.convert_input(&String::new()), 0);
        assert_eq!(converter.convert_input(&" 42 ".to_string()), 42);
    }

    #[test]
    fn test_truncate_toward_zero() {
        assert_eq!(Truncate.convert_input(&2.9), 2);
        assert_eq!(Truncate.convert_input(&-2.9), -2);
        assert_eq!(Truncate.convert_input(&f64::NAN), 0);
        assert_eq!(Truncate.convert_input(&1e12), i32::MAX);
    }

    proptest! {
        #[test]
        fn prop_int_text_round_trip(x in any::<i64>()) {
            let converter = ParseText::<i64>::new();
            prop_assert_eq!(converter.convert_input(&converter.convert_output(&x)), x);
        }

        #[test]
        fn prop_float_text_round_trip(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
            let converter = ParseText::<f64>::new();
            prop_assert_eq!(converter.convert_input(&converter.convert_output(&x)), x);
        }

        #[test]
        fn prop_truncate_round_trip(x in any::<i32>()) {
            prop_assert_eq!(Truncate.convert_input(&Truncate.convert_output(&x)), x);
        }

        #[test]
        fn prop_garbage_text_never_panics(text in "\\PC*") {
            let _ = ParseText::<u16>::new().convert_input(&text);
        }
    }
}
