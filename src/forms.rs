use axum::extract::Multipart;
use serde::Deserialize;

use crate::db::models::Difficulty;
use crate::error::AppError;

/// Field-level validation failures, in the order the rules ran. Templates
/// look errors up by field name to render them inline next to the input.
#[derive(Debug, Clone, Default)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.entries.push((field.to_string(), message.into()));
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == field)
    }

    pub fn get(&self, field: &str) -> String {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One declarative validation rule: if `ok` is false, `message` is recorded
/// against `field`. Per-form schemas are lists of these, evaluated uniformly.
pub struct Rule<'a> {
    pub field: &'a str,
    pub ok: bool,
    pub message: &'a str,
}

pub fn run_rules(rules: &[Rule]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for rule in rules {
        // First failure per field wins; later rules often assume earlier ones
        if !rule.ok && !errors.has(rule.field) {
            errors.add(rule.field, rule.message);
        }
    }
    errors
}

fn valid_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !s.contains(char::is_whitespace)
}

// -- Registration --

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let username = self.username.trim();
        let email = self.email.trim();
        run_rules(&[
            Rule {
                field: "username",
                ok: (2..=40).contains(&username.chars().count()),
                message: "Username must be between 2 and 40 characters.",
            },
            Rule {
                field: "email",
                ok: !email.is_empty() && email.len() <= 120 && valid_email(email),
                message: "Enter a valid email address.",
            },
            Rule {
                field: "password",
                ok: (6..=64).contains(&self.password.chars().count()),
                message: "Password must be between 6 and 64 characters.",
            },
            Rule {
                field: "confirm_password",
                ok: self.password == self.confirm_password,
                message: "Passwords must match.",
            },
        ])
    }
}

// -- Login --

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn remember_me(&self) -> bool {
        self.remember.is_some()
    }
}

// -- Comments --

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CommentForm {
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> FieldErrors {
        let body = self.body.trim();
        run_rules(&[Rule {
            field: "body",
            ok: (2..=500).contains(&body.chars().count()),
            message: "Comments must be between 2 and 500 characters.",
        }])
    }
}

// -- Multipart helpers --

/// A multipart form reduced to its text fields plus at most one uploaded
/// file. The recipe and account forms are the only multipart consumers.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) if !filename.is_empty() => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Upload failed: {e}")))?
                        .to_vec();
                    if !bytes.is_empty() {
                        form.file = Some(UploadedFile { filename, bytes });
                    }
                }
                _ => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {e}")))?;
                    form.fields.push((name, text));
                }
            }
        }
        Ok(form)
    }

    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

// -- Recipes --

/// Raw recipe form values as submitted, kept stringly so a failed
/// validation can re-render the form exactly as the user left it.
#[derive(Debug, Clone, Default)]
pub struct RecipeForm {
    pub title: String,
    pub summary: String,
    pub cuisine: String,
    pub difficulty: String,
    pub cook_time_mins: String,
    pub ingredients: String,
    pub instructions: String,
    pub video_url: String,
    pub tags: String,
}

impl RecipeForm {
    pub fn from_multipart(form: &MultipartForm) -> Self {
        RecipeForm {
            title: form.get("title").trim().to_string(),
            summary: form.get("summary").trim().to_string(),
            cuisine: form.get("cuisine").trim().to_string(),
            difficulty: form.get("difficulty").trim().to_string(),
            cook_time_mins: form.get("cook_time_mins").trim().to_string(),
            ingredients: form.get("ingredients").trim().to_string(),
            instructions: form.get("instructions").trim().to_string(),
            video_url: form.get("video_url").trim().to_string(),
            tags: form.get("tags").trim().to_string(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        run_rules(&[
            Rule {
                field: "title",
                ok: !self.title.is_empty() && self.title.chars().count() <= 120,
                message: "Title is required (max 120 characters).",
            },
            Rule {
                field: "summary",
                ok: self.summary.chars().count() <= 240,
                message: "Summary must be at most 240 characters.",
            },
            Rule {
                field: "cuisine",
                ok: self.cuisine.chars().count() <= 50,
                message: "Cuisine must be at most 50 characters.",
            },
            Rule {
                field: "difficulty",
                ok: self.difficulty.is_empty() || Difficulty::parse(&self.difficulty).is_some(),
                message: "Difficulty must be Easy, Medium, or Hard.",
            },
            Rule {
                field: "cook_time_mins",
                ok: self.cook_time_mins.is_empty()
                    || matches!(self.cook_time_mins.parse::<i64>(), Ok(n) if (1..=999).contains(&n)),
                message: "Cook time must be a number between 1 and 999.",
            },
            Rule {
                field: "ingredients",
                ok: self.ingredients.chars().count() >= 10,
                message: "Ingredients are required (at least 10 characters).",
            },
            Rule {
                field: "instructions",
                ok: self.instructions.chars().count() >= 10,
                message: "Instructions are required (at least 10 characters).",
            },
            Rule {
                field: "video_url",
                ok: self.video_url.is_empty()
                    || (self.video_url.len() <= 255
                        && (self.video_url.starts_with("http://")
                            || self.video_url.starts_with("https://"))),
                message: "Video URL must be a valid http(s) link (max 255 characters).",
            },
            Rule {
                field: "tags",
                ok: self.tags.chars().count() <= 200,
                message: "Tags must be at most 200 characters.",
            },
        ])
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        Difficulty::parse(&self.difficulty)
    }

    pub fn cook_time(&self) -> Option<i64> {
        self.cook_time_mins.parse().ok()
    }

    pub fn summary_opt(&self) -> Option<String> {
        non_empty(&self.summary)
    }

    pub fn cuisine_opt(&self) -> Option<String> {
        non_empty(&self.cuisine)
    }

    pub fn video_url_opt(&self) -> Option<String> {
        non_empty(&self.video_url)
    }
}

// -- Account --

#[derive(Debug, Clone, Default)]
pub struct AccountForm {
    pub username: String,
    pub email: String,
}

impl AccountForm {
    pub fn from_multipart(form: &MultipartForm) -> Self {
        AccountForm {
            username: form.get("username").trim().to_string(),
            email: form.get("email").trim().to_string(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        run_rules(&[
            Rule {
                field: "username",
                ok: (2..=40).contains(&self.username.chars().count()),
                message: "Username must be between 2 and 40 characters.",
            },
            Rule {
                field: "email",
                ok: !self.email.is_empty() && self.email.len() <= 120 && valid_email(&self.email),
                message: "Enter a valid email address.",
            },
        ])
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_rules_collects_first_failure_per_field() {
        let errors = run_rules(&[
            Rule {
                field: "a",
                ok: false,
                message: "first",
            },
            Rule {
                field: "a",
                ok: false,
                message: "second",
            },
            Rule {
                field: "b",
                ok: true,
                message: "unused",
            },
        ]);
        assert_eq!(errors.get("a"), "first");
        assert!(!errors.has("b"));
        assert!(!errors.is_empty());
    }

    #[test]
    fn register_form_accepts_sensible_input() {
        let form = RegisterForm {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "hunter2!".into(),
            confirm_password: "hunter2!".into(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn register_form_flags_each_bad_field() {
        let form = RegisterForm {
            username: "a".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            confirm_password: "different".into(),
        };
        let errors = form.validate();
        for field in ["username", "email", "password", "confirm_password"] {
            assert!(errors.has(field), "expected error on {field}");
        }
    }

    #[test]
    fn comment_form_enforces_length_bounds() {
        assert!(!CommentForm { body: "x".into() }.validate().is_empty());
        assert!(CommentForm { body: "ok".into() }.validate().is_empty());
        assert!(!CommentForm {
            body: "y".repeat(501)
        }
        .validate()
        .is_empty());
    }

    fn valid_recipe_form() -> RecipeForm {
        RecipeForm {
            title: "Carbonara".into(),
            summary: "Roman pasta".into(),
            cuisine: "Italian".into(),
            difficulty: "Easy".into(),
            cook_time_mins: "25".into(),
            ingredients: "pasta\neggs\nguanciale".into(),
            instructions: "boil pasta\nmix eggs\ncombine".into(),
            video_url: "https://example.com/carbonara".into(),
            tags: "dinner, pasta".into(),
        }
    }

    #[test]
    fn recipe_form_accepts_complete_input() {
        let form = valid_recipe_form();
        assert!(form.validate().is_empty());
        assert_eq!(form.difficulty(), Some(Difficulty::Easy));
        assert_eq!(form.cook_time(), Some(25));
        assert_eq!(form.summary_opt().as_deref(), Some("Roman pasta"));
    }

    #[test]
    fn recipe_form_optional_fields_may_be_empty() {
        let mut form = valid_recipe_form();
        form.summary = String::new();
        form.cuisine = String::new();
        form.difficulty = String::new();
        form.cook_time_mins = String::new();
        form.video_url = String::new();
        form.tags = String::new();
        assert!(form.validate().is_empty());
        assert_eq!(form.difficulty(), None);
        assert_eq!(form.cook_time(), None);
        assert_eq!(form.summary_opt(), None);
    }

    #[test]
    fn recipe_form_rejects_bad_values() {
        let mut form = valid_recipe_form();
        form.title = String::new();
        form.difficulty = "Impossible".into();
        form.cook_time_mins = "0".into();
        form.video_url = "ftp://example.com".into();
        let errors = form.validate();
        for field in ["title", "difficulty", "cook_time_mins", "video_url"] {
            assert!(errors.has(field), "expected error on {field}");
        }
    }

    #[test]
    fn login_form_remember_flag() {
        assert!(!LoginForm::default().remember_me());
        let form = LoginForm {
            remember: Some("on".into()),
            ..Default::default()
        };
        assert!(form.remember_me());
    }

    #[test]
    fn email_validation_is_strict_enough() {
        assert!(valid_email("a@b.co"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("@b.co"));
        assert!(!valid_email("a b@c.co"));
        assert!(!valid_email("plain"));
    }
}
