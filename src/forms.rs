use email_address::EmailAddress;
use serde::{Deserialize, Deserializer, Serialize};

use entity::{activity, post};

/// One failed check on a submitted form, keyed by field for the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{field} is required")));
    }
}

// Browsers submit an empty string for the blank <option>; treat anything
// that is not a number as no selection.
fn optional_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub category_id: Option<i32>,
}

impl PostForm {
    pub fn from_model(post: &post::Model) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            body: post.body.clone(),
            img_url: post.img_url.clone(),
            category_id: post.category_id,
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "subtitle", &self.subtitle);
        require(&mut errors, "body", &self.body);
        require(&mut errors, "img_url", &self.img_url);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ActivityForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub img_url: String,
}

impl ActivityForm {
    pub fn from_model(activity: &activity::Model) -> Self {
        Self {
            title: activity.title.clone(),
            summary: activity.summary.clone(),
            body: activity.body.clone(),
            img_url: activity.img_url.clone(),
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "summary", &self.summary);
        require(&mut errors, "body", &self.body);
        require(&mut errors, "img_url", &self.img_url);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        require(&mut errors, "name", &self.name);
        require(&mut errors, "password", &self.password);
        if !self.email.trim().is_empty() && !EmailAddress::is_valid(self.email.trim()) {
            errors.push(FieldError::new("email", "email is not a valid address"));
        }
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        require(&mut errors, "password", &self.password);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "body", &self.body);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct AboutForm {
    #[serde(default)]
    pub body: String,
}

impl AboutForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "body", &self.body);
        errors
    }
}
