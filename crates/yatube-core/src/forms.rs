//! Explicit input schemas for every form-accepting route.
//!
//! Raw payloads arrive as string maps. Each schema trims its fields, converts
//! them to typed values and runs its `validator` rules before any entity is
//! built. Failures come back as [`FormErrors`], keyed by field name.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Raw urlencoded form payload.
pub type FormData = HashMap<String, String>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str = "Select a valid choice.";

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// An input schema parsed from a raw form payload.
pub trait InputSchema: Sized {
    fn parse(data: &FormData) -> Result<Self, FormErrors>;
}

fn field(data: &FormData, name: &str) -> String {
    data.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional_field(data: &FormData, name: &str) -> Option<String> {
    Some(field(data, name)).filter(|v| !v.is_empty())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(REQUIRED_MESSAGE.into());
        return Err(err);
    }
    Ok(())
}

fn username_chars(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        let mut err = ValidationError::new("invalid_username");
        err.message =
            Some("Enter a valid username: letters, digits and @/./+/-/_ only.".into());
        return Err(err);
    }
    Ok(())
}

/// Post create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
pub struct PostForm {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    /// Group id; existence is checked by the caller against the store.
    pub group: Option<Uuid>,
    #[validate(length(max = 255, message = "Image path is too long."))]
    pub image: Option<String>,
}

impl InputSchema for PostForm {
    fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let group = match optional_field(data, "group") {
            None => None,
            Some(raw) => match Uuid::parse_str(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        let form = PostForm {
            text: field(data, "text"),
            group,
            image: optional_field(data, "image"),
        };

        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }

        if errors.is_empty() { Ok(form) } else { Err(errors) }
    }
}

/// Comment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
pub struct CommentForm {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl InputSchema for CommentForm {
    fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let form = CommentForm {
            text: field(data, "text"),
        };
        form.validate()?;
        Ok(form)
    }
}

/// Account registration form.
#[derive(Debug, Clone, Validate)]
pub struct SignupForm {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        custom(function = "username_chars")
    )]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
}

impl InputSchema for SignupForm {
    fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let form = SignupForm {
            username: field(data, "username"),
            password: data.get("password").cloned().unwrap_or_default(),
        };
        form.validate()?;
        Ok(form)
    }
}

/// Login form. `next` is where to go after a successful login.
#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    /// Local redirect target, or `/` when `next` is absent or points off-site.
    pub fn redirect_target(&self) -> &str {
        safe_next(self.next.as_deref()).unwrap_or("/")
    }
}

impl InputSchema for LoginForm {
    fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let form = LoginForm {
            username: field(data, "username"),
            password: data.get("password").cloned().unwrap_or_default(),
            next: optional_field(data, "next"),
        };
        form.validate()?;
        Ok(form)
    }
}

/// Accept only same-site absolute paths as redirect targets.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_post_form_accepts_text_only() {
        let form = PostForm::parse(&data(&[("text", "  hello  "), ("group", "")])).unwrap();
        assert_eq!(form.text, "hello");
        assert_eq!(form.group, None);
        assert_eq!(form.image, None);
    }

    #[test]
    fn test_post_form_rejects_blank_text() {
        let errors = PostForm::parse(&data(&[("text", "   ")])).unwrap_err();
        assert_eq!(errors.get("text"), Some(&[REQUIRED_MESSAGE.to_string()][..]));
    }

    #[test]
    fn test_post_form_rejects_malformed_group() {
        let errors = PostForm::parse(&data(&[("text", "hi"), ("group", "nope")])).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["group"]);
    }

    #[test]
    fn test_post_form_collects_every_field_error() {
        let errors = PostForm::parse(&data(&[("group", "nope")])).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["group", "text"]);
    }

    #[test]
    fn test_comment_form_requires_text() {
        assert!(CommentForm::parse(&data(&[("text", "")])).is_err());
        assert!(CommentForm::parse(&FormData::new()).is_err());
        assert_eq!(
            CommentForm::parse(&data(&[("text", "nice")])).unwrap().text,
            "nice"
        );
    }

    #[test]
    fn test_signup_form_rules() {
        assert!(SignupForm::parse(&data(&[("username", "leo"), ("password", "long-enough")])).is_ok());

        let errors =
            SignupForm::parse(&data(&[("username", "bad name"), ("password", "short")])).unwrap_err();
        assert!(errors.get("username").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_login_redirect_target_stays_local() {
        let form = LoginForm::parse(&data(&[
            ("username", "leo"),
            ("password", "secret"),
            ("next", "/create/"),
        ]))
        .unwrap();
        assert_eq!(form.redirect_target(), "/create/");

        let offsite = LoginForm {
            next: Some("//evil.example".to_string()),
            ..form
        };
        assert_eq!(offsite.redirect_target(), "/");
    }
}
