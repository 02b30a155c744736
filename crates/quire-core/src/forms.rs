//! Form validation.
//!
//! Each form has a raw input type (every field a string, missing fields
//! default to empty) and a cleaned data type. `validate` returns either the
//! cleaned data or the field-level messages to show next to the inputs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{ValidateEmail, ValidateLength};

use crate::domain::{PostStatus, parse_tag_names, slugify};
use crate::publish::parse_submitted;

/// Messages per field name. Form-wide messages use the `__all__` key.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "__all__";

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

const MAX_EMAIL_LEN: u64 = 254;

/// Quoted local part, e.g. `"john doe"`.
static QUOTED_LOCAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"([\x01-\x08\x0b\x0c\x0e-\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*"$"#)
        .expect("quoted local part pattern is valid")
});

/// E-mail check. Internationalized domains and single-label hosts such as
/// `localhost` pass; a quoted local part is accepted when the domain is valid.
fn is_valid_email(value: &str) -> bool {
    if !value.validate_length(None, Some(MAX_EMAIL_LEN), None) {
        return false;
    }
    if value.validate_email() {
        return true;
    }
    match value.rsplit_once('@') {
        Some((local, domain)) if QUOTED_LOCAL_RE.is_match(local) => {
            format!("quoted@{domain}").validate_email()
        }
        _ => false,
    }
}

/// Outcome of validating a form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormResult<T> {
    Valid(T),
    Invalid(FieldErrors),
}

impl<T> FormResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, FormResult::Valid(_))
    }
}

/// Collects cleaned values and errors while walking a form's fields.
#[derive(Default)]
struct Cleaner {
    errors: FieldErrors,
}

impl Cleaner {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn optional_text(&mut self, field: &str, value: &str, max_len: Option<usize>) -> String {
        let value = value.trim();
        if let Some(max) = max_len {
            if !value.validate_length(None, Some(max as u64), None) {
                let len = value.chars().count();
                self.add(
                    field,
                    format!("Ensure this value has at most {max} characters (it has {len})."),
                );
            }
        }
        value.to_string()
    }

    fn required_text(&mut self, field: &str, value: &str, max_len: Option<usize>) -> String {
        if value.trim().is_empty() {
            self.add(field, REQUIRED);
            return String::new();
        }
        self.optional_text(field, value, max_len)
    }

    fn email(&mut self, field: &str, value: &str) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, REQUIRED);
        } else if !is_valid_email(value) {
            self.add(field, INVALID_EMAIL);
        }
        value.to_string()
    }

    fn finish<T>(self, data: T) -> FormResult<T> {
        if self.errors.is_empty() {
            FormResult::Valid(data)
        } else {
            FormResult::Invalid(self.errors)
        }
    }
}

/// "Email this post" form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPostInput {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

/// Cleaned "email this post" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPostData {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

impl EmailPostInput {
    pub fn validate(&self) -> FormResult<EmailPostData> {
        let mut c = Cleaner::default();
        let data = EmailPostData {
            name: c.required_text("name", &self.name, Some(25)),
            email: c.email("email", &self.email),
            to: c.email("to", &self.to),
            comments: c.optional_text("comments", &self.comments, None),
        };
        c.finish(data)
    }
}

/// Comment form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentInput {
    pub name: String,
    pub email: String,
    pub body: String,
}

/// Cleaned comment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentData {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl CommentInput {
    pub fn validate(&self) -> FormResult<CommentData> {
        let mut c = Cleaner::default();
        let data = CommentData {
            name: c.required_text("name", &self.name, Some(80)),
            email: c.email("email", &self.email),
            body: c.required_text("body", &self.body, None),
        };
        c.finish(data)
    }
}

/// Post editing form as submitted from the admin surface.
///
/// The publish moment arrives split into a date field (`publish_0`) and a
/// time field (`publish_1`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub status: String,
    pub publish_0: String,
    pub publish_1: String,
    /// Comma-separated tag names.
    pub tags: String,
}

/// Cleaned post editing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostData {
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub status: PostStatus,
    /// Whole-second publish moment as entered.
    pub publish: NaiveDateTime,
    pub tags: Vec<String>,
}

impl PostInput {
    pub fn validate(&self) -> FormResult<PostData> {
        let mut c = Cleaner::default();

        let title = c.required_text("title", &self.title, Some(250));
        if !title.is_empty() && slugify(&title).is_empty() {
            c.add("title", "Enter a title containing at least one letter or number.");
        }
        let body = c.required_text("body", &self.body, None);

        let author_id = match self.author_id.trim() {
            "" => {
                c.add("author_id", REQUIRED);
                Uuid::nil()
            }
            raw => Uuid::parse_str(raw).unwrap_or_else(|_| {
                c.add("author_id", "Enter a valid UUID.");
                Uuid::nil()
            }),
        };

        let status = match self.status.trim() {
            "" => PostStatus::default(),
            raw => raw.parse().unwrap_or_else(|_| {
                c.add(
                    "status",
                    format!("Select a valid choice. {raw} is not one of the available choices."),
                );
                PostStatus::default()
            }),
        };

        let publish = if self.publish_0.trim().is_empty() || self.publish_1.trim().is_empty() {
            c.add("publish", REQUIRED);
            NaiveDateTime::default()
        } else {
            parse_submitted(&self.publish_0, &self.publish_1).unwrap_or_else(|err| {
                c.add("publish", validation_message(err));
                NaiveDateTime::default()
            })
        };

        let data = PostData {
            title,
            body,
            author_id,
            status,
            publish,
            tags: parse_tag_names(&self.tags),
        };
        c.finish(data)
    }
}

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Author registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorInput {
    pub username: String,
    pub email: String,
}

/// Cleaned author registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorData {
    pub username: String,
    pub email: String,
}

impl AuthorInput {
    pub fn validate(&self) -> FormResult<AuthorData> {
        let mut c = Cleaner::default();
        let username = c.required_text("username", &self.username, Some(150));
        if !username.is_empty() && !USERNAME_RE.is_match(&username) {
            c.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        let data = AuthorData {
            username,
            email: c.email("email", &self.email),
        };
        c.finish(data)
    }
}

fn validation_message(err: crate::error::DomainError) -> String {
    let crate::error::DomainError::Validation(msg) = err;
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors<T: std::fmt::Debug>(result: FormResult<T>) -> FieldErrors {
        match result {
            FormResult::Invalid(errors) => errors,
            FormResult::Valid(data) => panic!("expected errors, got {data:?}"),
        }
    }

    #[test]
    fn test_email_post_valid() {
        let input = EmailPostInput {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            to: "grace@example.org".to_string(),
            comments: String::new(),
        };
        match input.validate() {
            FormResult::Valid(data) => {
                assert_eq!(data.name, "Ada");
                assert_eq!(data.to, "grace@example.org");
                assert!(data.comments.is_empty());
            }
            FormResult::Invalid(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    #[test]
    fn test_email_post_field_errors() {
        let input = EmailPostInput {
            name: "x".repeat(26),
            email: "not-an-address".to_string(),
            to: String::new(),
            comments: String::new(),
        };
        let errors = errors(input.validate());
        assert_eq!(
            errors["name"],
            vec!["Ensure this value has at most 25 characters (it has 26)."]
        );
        assert_eq!(errors["email"], vec![INVALID_EMAIL]);
        assert_eq!(errors["to"], vec![REQUIRED]);
        assert!(!errors.contains_key("comments"));
    }

    #[test]
    fn test_email_accepts_idn_local_host_and_quoted_addresses() {
        for address in [
            "friend@bücher.de",
            "admin@localhost",
            "\"john doe\"@example.com",
        ] {
            assert!(is_valid_email(address), "{address} should be accepted");
        }
        for address in [
            "not-an-email",
            "@example.com",
            "john doe@example.com",
            "\"unterminated@example.com",
        ] {
            assert!(!is_valid_email(address), "{address} should be rejected");
        }
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(!is_valid_email(&too_long));
    }

    #[test]
    fn test_comment_requires_all_fields() {
        let errors = errors(CommentInput::default().validate());
        assert_eq!(errors.len(), 3);
        for field in ["name", "email", "body"] {
            assert_eq!(errors[field], vec![REQUIRED]);
        }
    }

    #[test]
    fn test_comment_whitespace_body_is_missing() {
        let input = CommentInput {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            body: "   ".to_string(),
        };
        let errors = errors(input.validate());
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["body"]);
    }

    #[test]
    fn test_post_input_valid() {
        let author = Uuid::new_v4();
        let input = PostInput {
            title: "Hello World".to_string(),
            body: "text".to_string(),
            author_id: author.to_string(),
            status: "PB".to_string(),
            publish_0: "2024-01-02".to_string(),
            publish_1: "03:04:05".to_string(),
            tags: "rust, web".to_string(),
        };
        match input.validate() {
            FormResult::Valid(data) => {
                assert_eq!(data.author_id, author);
                assert_eq!(data.status, PostStatus::Published);
                assert_eq!(data.publish.to_string(), "2024-01-02 03:04:05");
                assert_eq!(data.tags, vec!["rust", "web"]);
            }
            FormResult::Invalid(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    #[test]
    fn test_post_input_errors() {
        let input = PostInput {
            title: "???".to_string(),
            author_id: "nope".to_string(),
            status: "archived".to_string(),
            publish_0: "2024-13-01".to_string(),
            publish_1: "03:04:05".to_string(),
            ..Default::default()
        };
        let errors = errors(input.validate());
        for field in ["title", "body", "author_id", "status", "publish"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
        assert_eq!(errors["publish"], vec!["Enter a valid date."]);
    }

    #[test]
    fn test_post_input_defaults_to_draft() {
        let input = PostInput {
            title: "Draft".to_string(),
            body: "text".to_string(),
            author_id: Uuid::new_v4().to_string(),
            publish_0: "2024-01-02".to_string(),
            publish_1: "03:04".to_string(),
            ..Default::default()
        };
        match input.validate() {
            FormResult::Valid(data) => assert_eq!(data.status, PostStatus::Draft),
            FormResult::Invalid(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    #[test]
    fn test_author_username_characters() {
        let input = AuthorInput {
            username: "ada lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };
        let errs = errors(input.validate());
        assert_eq!(errs.len(), 1);
        assert!(errs["username"][0].starts_with("Enter a valid username."));

        let ok = AuthorInput {
            username: "ada.l+blog@home".to_string(),
            email: "ada@example.com".to_string(),
        };
        assert!(ok.validate().is_valid());
    }
}
