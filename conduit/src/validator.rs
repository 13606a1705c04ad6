//! Input validators.
//!
//! A validator is a plain function over the raw input and the session. It
//! returns `Ok(())` when the input is acceptable and `Err(message)` with a
//! human readable message otherwise. Built-ins and custom closures share the
//! same [`Validator`] type, so they can be mixed freely on a state.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::session::Session;

pub type ValidationResult = std::result::Result<(), String>;

/// Shared validator function
pub type Validator = Arc<dyn Fn(&str, &Session) -> ValidationResult + Send + Sync>;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("static pattern compiles"));

/// Wrap a closure as a [`Validator`]
pub fn custom<F>(f: F) -> Validator
where
    F: Fn(&str, &Session) -> ValidationResult + Send + Sync + 'static,
{
    Arc::new(f)
}

fn parse_number(input: &str) -> Option<f64> {
    if NUMBER.is_match(input) {
        input.parse().ok()
    } else {
        None
    }
}

pub fn numeric() -> Validator {
    custom(|input, _| {
        if NUMBER.is_match(input) {
            Ok(())
        } else {
            Err("Please enter a valid number".to_string())
        }
    })
}

pub fn greater_than(value: impl Into<f64>) -> Validator {
    let value = value.into();
    custom(move |input, _| match parse_number(input) {
        Some(n) if n > value => Ok(()),
        _ => Err(format!("Must be greater than {value}")),
    })
}

pub fn less_than(value: impl Into<f64>) -> Validator {
    let value = value.into();
    custom(move |input, _| match parse_number(input) {
        Some(n) if n < value => Ok(()),
        _ => Err(format!("Must be less than {value}")),
    })
}

pub fn in_range(min: impl Into<f64>, max: impl Into<f64>) -> Validator {
    let (min, max) = (min.into(), max.into());
    custom(move |input, _| match parse_number(input) {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(format!("Must be between {min} and {max}")),
    })
}

pub fn min_length(length: usize) -> Validator {
    custom(move |input, _| {
        if input.chars().count() >= length {
            Ok(())
        } else {
            Err(format!("Must be at least {length} characters"))
        }
    })
}

pub fn max_length(length: usize) -> Validator {
    custom(move |input, _| {
        if input.chars().count() <= length {
            Ok(())
        } else {
            Err(format!("Must be at most {length} characters"))
        }
    })
}

/// Accept input matching `pattern`, otherwise fail with `message`
pub fn matches(pattern: Regex, message: impl Into<String>) -> Validator {
    let message = message.into();
    custom(move |input, _| {
        if pattern.is_match(input) {
            Ok(())
        } else {
            Err(message.clone())
        }
    })
}

/// Run validators in order and return the first failure
pub fn run_all(validators: &[Validator], input: &str, session: &Session) -> ValidationResult {
    validators.iter().try_for_each(|validate| validate(input, session))
}
