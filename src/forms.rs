//! Submitted form payloads and the checks applied to each of them.
//!
//! Every form carries its own [`Validator`]. Decoding fills the fields,
//! `validate` runs the checks in order, and a failed form is serialized back
//! into the page so the template can echo input and show inline errors.
//! Password fields are never serialized.

use serde::{Deserialize, Serialize};

use crate::security::form::empty_as_zero;
use crate::validator::{
    EMAIL_RX, Validator, equal, matches, max_chars, min_chars, not_blank, permitted_value,
};

const BLANK: &str = "This field cannot be blank";
const MIN_PASSWORD_CHARS: usize = 8;
const SHORT_PASSWORD: &str = "This field must be at least 8 characters long";
const INVALID_EMAIL: &str = "This field must be a valid email address";
const MAX_USER_FIELD_CHARS: usize = 255;
const LONG_USER_FIELD: &str = "This field cannot be more than 255 characters long";

pub const PERMITTED_EXPIRY_DAYS: [i32; 4] = [1, 7, 31, 365];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    #[serde(deserialize_with = "empty_as_zero")]
    pub expires: i32,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl SnippetCreateForm {
    /// The blank form shown on first visit.
    pub fn blank() -> Self {
        Self {
            expires: 365,
            ..Self::default()
        }
    }

    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", BLANK);
        v.check_field(
            max_chars(&self.title, 100),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", BLANK);
        v.check_field(
            permitted_value(&self.expires, &PERMITTED_EXPIRY_DAYS),
            "expires",
            "This field must equal 1, 7, 31 or 365",
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserSignupForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserSignupForm {
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.name), "name", BLANK);
        v.check_field(
            max_chars(&self.name, MAX_USER_FIELD_CHARS),
            "name",
            LONG_USER_FIELD,
        );
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(
            max_chars(&self.email, MAX_USER_FIELD_CHARS),
            "email",
            LONG_USER_FIELD,
        );
        v.check_field(matches(&self.email, &EMAIL_RX), "email", INVALID_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
        v.check_field(
            min_chars(&self.password, MIN_PASSWORD_CHARS),
            "password",
            SHORT_PASSWORD,
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserLoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserLoginForm {
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(matches(&self.email, &EMAIL_RX), "email", INVALID_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordUpdateForm {
    #[serde(skip_serializing)]
    pub current_password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub new_password_confirmation: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl PasswordUpdateForm {
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.current_password), "currentPassword", BLANK);

        v.check_field(not_blank(&self.new_password), "newPassword", BLANK);
        v.check_field(
            min_chars(&self.new_password, MIN_PASSWORD_CHARS),
            "newPassword",
            SHORT_PASSWORD,
        );

        v.check_field(
            not_blank(&self.new_password_confirmation),
            "newPasswordConfirmation",
            BLANK,
        );
        v.check_field(
            equal(
                self.new_password.as_str(),
                self.new_password_confirmation.as_str(),
            ),
            "newPasswordConfirmation",
            "Passwords do not match",
        );
    }
}
