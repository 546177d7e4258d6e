//! Field-level validation rules shared by audio, playlist and account commands.

use std::collections::BTreeMap;

use serde::Serialize;
use slug::slugify;

pub const TITLE_MAX_CHARS: usize = 30;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const TAGS_MAX: usize = 10;
pub const TAG_MIN_CHARS: usize = 3;
pub const TAG_MAX_CHARS: usize = 15;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const EMAIL_MAX_CHARS: usize = 254;

/// Field name → messages, reported before any side effect takes place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trim and check a required title. Returns the trimmed value.
pub fn check_title(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "title is required");
    } else if trimmed.chars().count() > TITLE_MAX_CHARS {
        errors.add(
            field,
            format!("title must be at most {TITLE_MAX_CHARS} characters"),
        );
    }
    trimmed.to_string()
}

/// Trim an optional description; blank input clears it.
pub fn check_description(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    if trimmed.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.add(
            field,
            format!("description must be at most {DESCRIPTION_MAX_CHARS} characters"),
        );
    }
    Some(trimmed.to_string())
}

/// Normalize tags to lowercase slugs, dropping blanks and duplicates while
/// keeping first-seen order, then check count and per-tag length.
pub fn normalize_tags(errors: &mut ValidationErrors, field: &str, tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let slug = slugify(tag);
        if slug.is_empty() || normalized.contains(&slug) {
            continue;
        }
        normalized.push(slug);
    }

    if normalized.len() > TAGS_MAX {
        errors.add(field, format!("at most {TAGS_MAX} tags are allowed"));
    }
    for tag in &normalized {
        let len = tag.chars().count();
        if !(TAG_MIN_CHARS..=TAG_MAX_CHARS).contains(&len) {
            errors.add(
                field,
                format!(
                    "tag `{tag}` must be between {TAG_MIN_CHARS} and {TAG_MAX_CHARS} characters"
                ),
            );
        }
    }
    normalized
}

/// Usernames are stored lowercase: `[a-z0-9_-]`, 3 to 20 characters.
pub fn check_username(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let normalized = value.trim().to_ascii_lowercase();
    let len = normalized.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        errors.add(
            field,
            format!(
                "username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
            ),
        );
    }
    if !normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        errors.add(
            field,
            "username may only contain letters, digits, `_` and `-`",
        );
    }
    normalized
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim().to_string();
    let well_formed = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !well_formed || trimmed.chars().any(char::is_whitespace) {
        errors.add(field, "email address is not valid");
    } else if trimmed.len() > EMAIL_MAX_CHARS {
        errors.add(field, "email address is too long");
    }
    trimmed
}
