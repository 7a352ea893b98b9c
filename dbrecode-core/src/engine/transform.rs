//! Injectable text transforms.

use crate::{Result, error::RecodeError};
use std::sync::Arc;

/// A named, pure `&str -> String` function applied to every text value.
///
/// Transforms must be deterministic and must not touch the database. The
/// engine never assumes a transform is its own inverse.
///
/// # Example
/// ```rust
/// use dbrecode_core::engine::Transform;
///
/// let upper = Transform::new("upper", |s: &str| s.to_uppercase());
/// assert_eq!(upper.apply("rome"), "ROME");
/// assert_eq!(Transform::reverse().apply("Rome"), "emoR");
/// ```
#[derive(Clone)]
pub struct Transform {
    name: String,
    func: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl Transform {
    /// Wraps `func` under `name`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Reverses the characters of the input. Applying it twice restores the
    /// original, which makes it a safe default for trial runs.
    pub fn reverse() -> Self {
        Self::new("reverse", |s: &str| s.chars().rev().collect())
    }

    /// Returns the input unchanged.
    pub fn identity() -> Self {
        Self::new("identity", str::to_string)
    }

    /// Looks up a built-in transform by name.
    ///
    /// # Errors
    /// Returns a configuration error for unknown names.
    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "reverse" => Ok(Self::reverse()),
            "identity" => Ok(Self::identity()),
            other => Err(RecodeError::configuration(format!(
                "unknown transform '{}' (available: {})",
                other,
                Self::BUILTINS.join(", ")
            ))),
        }
    }

    /// Names accepted by `builtin`.
    pub const BUILTINS: &'static [&'static str] = &["reverse", "identity"];

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the transform.
    pub fn apply(&self, input: &str) -> String {
        (self.func)(input)
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_is_self_inverse() {
        let reverse = Transform::reverse();
        for input in ["", "a", "Milan", "città", "日本語", "ab cd"] {
            assert_eq!(reverse.apply(&reverse.apply(input)), input);
        }
        assert_eq!(reverse.apply("città"), "àttic");
    }

    #[test]
    fn test_identity() {
        assert_eq!(Transform::identity().apply("Rome"), "Rome");
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Transform::builtin("reverse").unwrap().name(), "reverse");
        assert_eq!(Transform::builtin("identity").unwrap().name(), "identity");
        assert!(matches!(
            Transform::builtin("rot13"),
            Err(RecodeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_debug_shows_name() {
        assert!(format!("{:?}", Transform::reverse()).contains("reverse"));
    }
}
