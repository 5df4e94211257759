//! Request binding and declared field constraints.
//!
//! Request types implement [`Validate`] by running their fields through a
//! [`Validator`]:
//!
//! ```rust
//! use horizon_core::{Validate, ValidationErrors, Validator};
//!
//! struct Signup {
//!     email: String,
//!     plan: String,
//! }
//!
//! impl Validate for Signup {
//!     fn validate(&self) -> Result<(), ValidationErrors> {
//!         let mut v = Validator::new();
//!         v.required("email", &self.email).email("email", &self.email);
//!         v.one_of("plan", &self.plan, &["free", "pro"]);
//!         v.finish()
//!     }
//! }
//!
//! let bad = Signup { email: "nope".into(), plan: "gold".into() };
//! assert_eq!(bad.validate().unwrap_err().len(), 2);
//! ```

use serde::de::DeserializeOwned;
use std::fmt;

/// A request type with declared constraints.
pub trait Validate {
    /// Checks every constraint, reporting all violations at once.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as it appears in the request body. Empty for body-level
    /// failures.
    pub field: String,
    /// Rule that failed, e.g. `required` or `email`.
    pub rule: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Every constraint a request violated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an error for a body that could not be parsed at all.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: String::new(),
                rule: "json",
                message: message.into(),
            }],
        }
    }

    /// Returns the individual violations.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if `field` violated `rule`.
    #[must_use]
    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.errors.iter().any(|e| e.field == field && e.rule == rule)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates constraint violations.
///
/// Every rule except [`required`](Self::required) passes on an empty value,
/// so optional fields only need the rules for their content.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    /// Creates an empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, rule: &'static str, message: String) -> &mut Self {
        self.errors.push(FieldError {
            field: field.to_string(),
            rule,
            message,
        });
        self
    }

    /// The value must not be blank.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.fail(field, "required", "is required".into());
        }
        self
    }

    /// The value must look like an email address.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() || is_email(value) {
            return self;
        }
        self.fail(field, "email", "must be a valid email address".into())
    }

    /// The value must be between `min` and `max` characters long.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if value.is_empty() || (min..=max).contains(&len) {
            return self;
        }
        self.fail(
            field,
            "length",
            format!("must be between {min} and {max} characters, got {len}"),
        )
    }

    /// The value must be one of `options`.
    pub fn one_of(&mut self, field: &str, value: &str, options: &[&str]) -> &mut Self {
        if value.is_empty() || options.contains(&value) {
            return self;
        }
        self.fail(
            field,
            "one_of",
            format!("must be one of [{}]", options.join(" ")),
        )
    }

    /// The value must be an absolute http(s) URL.
    pub fn url(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() || is_url(value) {
            return self;
        }
        self.fail(field, "url", "must be a valid URL".into())
    }

    /// The number must be at least `min`.
    pub fn min(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        if value >= min {
            return self;
        }
        self.fail(field, "min", format!("must be at least {min}"))
    }

    /// Returns every violation recorded so far, if any.
    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Parses a JSON body into `Q` and checks its constraints.
pub fn bind<Q>(body: &[u8]) -> Result<Q, ValidationErrors>
where
    Q: DeserializeOwned + Validate,
{
    let request: Q =
        serde_json::from_slice(body).map_err(|e| ValidationErrors::malformed(e.to_string()))?;
    request.validate()?;
    Ok(request)
}
