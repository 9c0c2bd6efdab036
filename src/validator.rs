use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Sanity check for the shape of an email address.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern must compile")
});

/// Validation errors collected while checking a single submitted form.
///
/// Field errors keep the first message recorded for each key; later failures
/// on the same field are dropped. Non-field errors accumulate in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Validator {
    pub field_errors: HashMap<String, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn add_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(key.into())
            .or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Records `message` under `key` when `ok` is false.
    pub fn check_field(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Counts Unicode scalar values, not bytes.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

pub fn equal<T: PartialEq + ?Sized>(value: &T, other: &T) -> bool {
    value == other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_validator_is_valid() {
        assert!(Validator::default().valid());
    }

    #[test]
    fn test_field_error_first_write_wins() {
        let mut validator = Validator::default();
        validator.add_field_error("email", "first");
        validator.add_field_error("email", "second");

        assert_eq!(validator.field_errors.len(), 1);
        assert_eq!(validator.field_errors["email"], "first");
        assert!(!validator.valid());
    }

    #[test]
    fn test_check_field_only_records_failures() {
        let mut validator = Validator::default();
        validator.check_field(true, "title", "should not appear");
        assert!(validator.valid());

        validator.check_field(false, "title", "This field cannot be blank");
        validator.check_field(false, "title", "too long");
        assert_eq!(validator.field_errors["title"], "This field cannot be blank");
    }

    #[test]
    fn test_non_field_errors_invalidate() {
        let mut validator = Validator::default();
        validator.add_non_field_error("Email or password is incorrect");
        validator.add_non_field_error("again");

        assert!(!validator.valid());
        assert!(validator.field_errors.is_empty());
        assert_eq!(validator.non_field_errors.len(), 2);
    }

    #[test]
    fn test_not_blank() {
        assert!(!not_blank(""));
        assert!(!not_blank("   "));
        assert!(!not_blank("\t\n"));
        assert!(not_blank("a"));
        assert!(not_blank("  a  "));
    }

    #[test]
    fn test_char_limits_count_code_points() {
        assert!(max_chars("hello", 5));
        assert!(!max_chars("hello!", 5));
        // five characters, ten bytes
        assert!(max_chars("héllö", 5));
        assert!(max_chars("日本語です", 5));
        assert!(!min_chars("日本語", 4));
        assert!(min_chars("pa$$word", 8));
        assert!(!min_chars("short", 8));
    }

    #[test]
    fn test_permitted_value() {
        let permitted = [1, 7, 31, 365];
        assert!(!permitted_value(&3, &permitted));
        assert!(permitted_value(&7, &permitted));
        assert!(!permitted_value(&0, &permitted));
    }

    #[test]
    fn test_equal() {
        assert!(equal("secret-pass", "secret-pass"));
        assert!(!equal("secret-pass", "secret-pasS"));
        assert!(equal(&7, &7));
    }

    #[test]
    fn test_email_pattern() {
        assert!(matches("bob@example.com", &EMAIL_RX));
        assert!(matches("first.last+tag@sub.example.co.uk", &EMAIL_RX));
        assert!(!matches("bob", &EMAIL_RX));
        assert!(!matches("bob@", &EMAIL_RX));
        assert!(!matches("@example.com", &EMAIL_RX));
        assert!(!matches("bob@-example.com", &EMAIL_RX));
        assert!(!matches("bob smith@example.com", &EMAIL_RX));
    }
}
