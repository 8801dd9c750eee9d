//! Submitted HTML forms and their validation rules

use common::validator::{
    Validator, email_regex, matches, max_chars, min_chars, not_blank, permitted_value,
};
use serde::{Deserialize, Serialize};

pub const BLANK_MESSAGE: &str = "This field cannot be blank";
pub const EMAIL_MESSAGE: &str = "This field must be a valid email address";
pub const TITLE_LENGTH_MESSAGE: &str = "This field cannot be more than 100 characters long";
pub const FIELD_LENGTH_MESSAGE: &str = "This field cannot be more than 255 characters long";
pub const PASSWORD_LENGTH_MESSAGE: &str = "This field must be at least 8 characters long";
pub const EXPIRES_MESSAGE: &str = "This field must be either 1, 7 or 365";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email address is already in use";
pub const BAD_CREDENTIALS_MESSAGE: &str = "Email or password is incorrect";

const TITLE_MAX_CHARS: usize = 100;
const PASSWORD_MIN_CHARS: usize = 8;
/// Width of the `users.name` and `users.email` columns
const USER_FIELD_MAX_CHARS: usize = 255;
const DEFAULT_EXPIRES_DAYS: i32 = 365;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: i32,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: DEFAULT_EXPIRES_DAYS,
            validator: Validator::default(),
        }
    }
}

impl SnippetCreateForm {
    /// Run every check; returns true when the form is valid
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(), self.title.as_str(), "title", BLANK_MESSAGE);
        v.check_field(max_chars(TITLE_MAX_CHARS), self.title.as_str(), "title", TITLE_LENGTH_MESSAGE);
        v.check_field(not_blank(), self.content.as_str(), "content", BLANK_MESSAGE);
        v.check_field(
            permitted_value(vec![1, 7, 365]),
            &self.expires,
            "expires",
            EXPIRES_MESSAGE,
        );
        v.valid()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserSignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserSignupForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(), self.name.as_str(), "name", BLANK_MESSAGE);
        v.check_field(
            max_chars(USER_FIELD_MAX_CHARS),
            self.name.as_str(),
            "name",
            FIELD_LENGTH_MESSAGE,
        );
        v.check_field(not_blank(), self.email.as_str(), "email", BLANK_MESSAGE);
        v.check_field(
            max_chars(USER_FIELD_MAX_CHARS),
            self.email.as_str(),
            "email",
            FIELD_LENGTH_MESSAGE,
        );
        v.check_field(matches(email_regex()), self.email.as_str(), "email", EMAIL_MESSAGE);
        v.check_field(not_blank(), self.password.as_str(), "password", BLANK_MESSAGE);
        v.check_field(
            min_chars(PASSWORD_MIN_CHARS),
            self.password.as_str(),
            "password",
            PASSWORD_LENGTH_MESSAGE,
        );
        v.valid()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserLoginForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(), self.email.as_str(), "email", BLANK_MESSAGE);
        v.check_field(matches(email_regex()), self.email.as_str(), "email", EMAIL_MESSAGE);
        v.check_field(not_blank(), self.password.as_str(), "password", BLANK_MESSAGE);
        v.valid()
    }
}
