//! Article editor pages
//!
//! The form posts urlencoded fields. `vocabulary` may repeat, so the body is
//! read as a list of pairs rather than a struct.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, CurrentUser};
use crate::errors::PublicError;
use crate::models::{Article, ArticleInput, User, Vocabulary};
use crate::services::ArticleServiceError;
use crate::views::{Toast, ViewError};
use crate::web::{failure_toast, not_found, render};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values shown in the editor form
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ArticleForm {
    pub headline: String,
    pub content: String,
    pub date: String,
    pub published: bool,
    pub source_author: String,
    pub source_url: String,
    pub source_publication: String,
    /// Comma separated tag names
    pub tags: String,
    #[serde(skip)]
    pub vocabulary: Vec<i64>,
}

impl ArticleForm {
    /// Collect form fields. Unparsable vocabulary IDs are skipped.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "headline" => form.headline = value,
                "content" => form.content = value,
                "date" => form.date = value,
                "published" => form.published = value == "on",
                "source_author" => form.source_author = value,
                "source_url" => form.source_url = value,
                "source_publication" => form.source_publication = value,
                "tags" => form.tags = value,
                "vocabulary" => {
                    if let Ok(id) = value.trim().parse::<i64>() {
                        form.vocabulary.push(id);
                    }
                }
                _ => {}
            }
        }
        form
    }

    fn from_article(article: &Article) -> Self {
        Self {
            headline: article.headline.clone(),
            content: article.content.clone(),
            date: article.accessed_at.format(DATE_FORMAT).to_string(),
            published: article.published,
            source_author: article.source_author.clone().unwrap_or_default(),
            source_url: article.source_url.clone().unwrap_or_default(),
            source_publication: article.source_publication.clone().unwrap_or_default(),
            tags: article.tags.join(", "),
            vocabulary: article.vocabulary.iter().map(|v| v.id).collect(),
        }
    }

    fn blank() -> Self {
        Self {
            date: Utc::now().format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// The form's date at midnight UTC
    pub fn parse_date(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }

    fn to_input(&self, accessed_at: DateTime<Utc>) -> ArticleInput {
        ArticleInput {
            headline: self.headline.clone(),
            content: self.content.clone(),
            published: self.published,
            source_url: Some(self.source_url.clone()),
            source_author: Some(self.source_author.clone()),
            source_publication: Some(self.source_publication.clone()),
            accessed_at: Some(accessed_at),
            tags: Some(self.tags.split(',').map(str::to_string).collect()),
            ..ArticleInput::default()
        }
    }
}

/// Where the form posts and which article it edits
struct Editor<'a> {
    action: String,
    article: Option<&'a Article>,
}

impl Editor<'_> {
    fn new_article() -> Self {
        Editor {
            action: "/admin/articles/new".to_string(),
            article: None,
        }
    }
}

fn render_form(
    state: &AppState,
    user: &User,
    editor: Editor<'_>,
    form: &ArticleForm,
    vocabulary: &[Vocabulary],
    toasts: &[Toast],
) -> Result<Response, ViewError> {
    let mut context = TeraContext::new();
    context.insert("action", &editor.action);
    context.insert("article_id", &editor.article.map(|a| a.id));
    context.insert("article_path", &editor.article.map(Article::path));
    context.insert("form", form);
    context.insert("vocabulary", vocabulary);
    Ok(render(state, "admin/article_form.html", context, Some(user), toasts)?.into_response())
}

fn invalid_date() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid date").into_response()
}

fn article_failure(err: ArticleServiceError) -> anyhow::Error {
    match err {
        ArticleServiceError::Internal(e) => e,
        ArticleServiceError::Validation(msg) => PublicError::message_only(msg).into(),
        other => PublicError::new(other.to_string(), other).into(),
    }
}

/// GET /admin/articles/new
pub async fn new_article(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ViewError> {
    render_form(&state, &user, Editor::new_article(), &ArticleForm::blank(), &[], &[])
}

/// POST /admin/articles/new
///
/// On success the form is cleared for the next article.
pub async fn create_article(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ViewError> {
    let form = ArticleForm::from_pairs(pairs);
    let Some(accessed_at) = form.parse_date() else {
        return Ok(invalid_date());
    };

    let created = match state.article_service.create(form.to_input(accessed_at)).await {
        Ok(article) => article,
        Err(e) => {
            let toasts = [failure_toast(article_failure(e))];
            return render_form(&state, &user, Editor::new_article(), &form, &[], &toasts);
        }
    };

    if !form.vocabulary.is_empty() {
        if let Err(e) = state
            .article_service
            .set_vocabulary(created.id, &form.vocabulary)
            .await
        {
            let editor = Editor {
                action: format!("/admin/articles/{}", created.id),
                article: Some(&created),
            };
            let toasts = [failure_toast(article_failure(e))];
            return render_form(&state, &user, editor, &form, &[], &toasts);
        }
    }

    let toasts = [Toast::success(format!(
        "Saved \"{}\" at {}",
        created.headline,
        created.path()
    ))];
    render_form(&state, &user, Editor::new_article(), &ArticleForm::blank(), &[], &toasts)
}

/// Load an article with its associations, or the response to send instead
async fn load_article(
    state: &AppState,
    user: &User,
    id: i64,
) -> Result<Result<Article, Response>, ViewError> {
    let article = match state.article_service.get(id).await {
        Ok(article) => article,
        Err(ArticleServiceError::NotFound(_)) => return Ok(Err(not_found(state, Some(user))?)),
        Err(e) => {
            let toasts = [failure_toast(article_failure(e))];
            let page = render(state, "not_found.html", TeraContext::new(), Some(user), &toasts)?;
            return Ok(Err((StatusCode::INTERNAL_SERVER_ERROR, page).into_response()));
        }
    };
    match state.article_service.hydrate(article).await {
        Ok(article) => Ok(Ok(article)),
        Err(e) => {
            let toasts = [failure_toast(article_failure(e))];
            let page = render(state, "not_found.html", TeraContext::new(), Some(user), &toasts)?;
            Ok(Err((StatusCode::INTERNAL_SERVER_ERROR, page).into_response()))
        }
    }
}

fn edit_editor(article: &Article) -> Editor<'_> {
    Editor {
        action: format!("/admin/articles/{}", article.id),
        article: Some(article),
    }
}

/// GET /admin/articles/{id}
pub async fn edit_article(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ViewError> {
    let article = match load_article(&state, &user, id).await? {
        Ok(article) => article,
        Err(response) => return Ok(response),
    };
    let form = ArticleForm::from_article(&article);
    render_form(&state, &user, edit_editor(&article), &form, &article.vocabulary, &[])
}

/// POST /admin/articles/{id}
///
/// Replaces the article's columns, tags and vocabulary with the form's.
pub async fn update_article(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ViewError> {
    let article = match load_article(&state, &user, id).await? {
        Ok(article) => article,
        Err(response) => return Ok(response),
    };

    let form = ArticleForm::from_pairs(pairs);
    let Some(accessed_at) = form.parse_date() else {
        return Ok(invalid_date());
    };

    let saved = async {
        state.article_service.update(id, form.to_input(accessed_at)).await?;
        state.article_service.set_vocabulary(id, &form.vocabulary).await?;
        Ok::<_, ArticleServiceError>(())
    }
    .await;

    if let Err(e) = saved {
        let toasts = [failure_toast(article_failure(e))];
        return render_form(&state, &user, edit_editor(&article), &form, &article.vocabulary, &toasts);
    }

    let article = match load_article(&state, &user, id).await? {
        Ok(article) => article,
        Err(response) => return Ok(response),
    };
    let form = ArticleForm::from_article(&article);
    let toasts = [Toast::success("Article saved")];
    render_form(&state, &user, edit_editor(&article), &form, &article.vocabulary, &toasts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_pairs_collects_repeated_vocabulary() {
        let form = ArticleForm::from_pairs(pairs(&[
            ("headline", "대박"),
            ("published", "on"),
            ("vocabulary", "3"),
            ("vocabulary", ""),
            ("vocabulary", "x"),
            ("vocabulary", "5"),
            ("tags", "news, culture"),
        ]));
        assert_eq!(form.headline, "대박");
        assert!(form.published);
        assert_eq!(form.vocabulary, vec![3, 5]);
        assert_eq!(form.tags, "news, culture");
    }

    #[test]
    fn test_published_requires_on() {
        let form = ArticleForm::from_pairs(pairs(&[("published", "yes")]));
        assert!(!form.published);
    }

    #[test]
    fn test_parse_date() {
        let mut form = ArticleForm {
            date: "2024-03-09".to_string(),
            ..ArticleForm::default()
        };
        let date = form.parse_date().unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-09T00:00:00+00:00");

        form.date = "03/09/2024".to_string();
        assert!(form.parse_date().is_none());
        form.date = String::new();
        assert!(form.parse_date().is_none());
    }

    #[test]
    fn test_to_input_splits_tags() {
        let form = ArticleForm {
            headline: "h".to_string(),
            tags: "a, b,,".to_string(),
            ..ArticleForm::default()
        };
        let input = form.to_input(Utc::now());
        assert_eq!(
            input.tags,
            Some(vec!["a".to_string(), " b".to_string(), String::new(), String::new()])
        );
        assert!(input.slug.is_none());
        assert!(input.uuid.is_none());
    }
}
