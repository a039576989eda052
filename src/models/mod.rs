//! Data models
//!
//! This module contains the data structures used throughout daebak.
//! Models represent:
//! - Database entities (User, Session, PasswordReset, ApiToken, Article,
//!   Vocabulary, Tag, Grammar)
//! - Input types accepted by services
//! - The pagination envelope shared by list endpoints

mod article;
mod grammar;
mod pagination;
mod password_reset;
mod session;
mod tag;
mod token;
mod user;
mod vocabulary;

pub use article::{Article, ArticleInput};
pub use grammar::{ArticleGrammar, Grammar, GrammarInput};
pub use pagination::{ListParams, PagedResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use password_reset::PasswordReset;
pub use session::Session;
pub use tag::Tag;
pub use token::ApiToken;
pub use user::{normalize_email, User};
pub use vocabulary::{Vocabulary, VocabularyInput, VOCABULARY_PLACEHOLDER_DEFINITION};
