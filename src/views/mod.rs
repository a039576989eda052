//! Server-rendered pages
//!
//! Templates are compiled into the binary and rendered with Tera. Every page
//! receives two standard variables:
//! - `current_user`: the signed-in user, or null
//! - `toasts`: a list of `{text, kind}` notices, built from the errors the
//!   handler passes in

use serde::Serialize;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::errors::public_message_or_generic;
use crate::models::User;

mod error;

pub use error::ViewError;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("article.html", include_str!("../../templates/article.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
    ("users/register.html", include_str!("../../templates/users/register.html")),
    ("users/login.html", include_str!("../../templates/users/login.html")),
    ("users/forgot.html", include_str!("../../templates/users/forgot.html")),
    ("users/reset.html", include_str!("../../templates/users/reset.html")),
    ("users/me.html", include_str!("../../templates/users/me.html")),
    ("admin/article_form.html", include_str!("../../templates/admin/article_form.html")),
];

/// A notice shown at the top of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub text: String,
    pub kind: &'static str,
}

impl Toast {
    /// Error notice for a failed action. Only public messages are shown.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            text: public_message_or_generic(err).to_string(),
            kind: "error",
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: "success",
        }
    }
}

/// Page renderer over the embedded templates
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Parse all embedded templates
    pub fn new() -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    /// Render a page with the standard variables added to `context`
    pub fn render(
        &self,
        template: &str,
        mut context: TeraContext,
        current_user: Option<&User>,
        toasts: &[Toast],
    ) -> Result<String, ViewError> {
        context.insert("current_user", &current_user);
        context.insert("toasts", toasts);

        self.tera.render(template, &context).map_err(|e| {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(s) = source {
                message.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ViewError::Render {
                template: template.to_string(),
                message,
            }
        })
    }
}
