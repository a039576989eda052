//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity and its link tables.

pub mod article;
pub mod grammar;
pub mod password_reset;
pub mod session;
pub mod tag;
pub mod token;
pub mod user;
pub mod vocabulary;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use grammar::{GrammarRepository, SqlxGrammarRepository};
pub use password_reset::{PasswordResetRepository, SqlxPasswordResetRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{clean_tag_names, SqlxTagRepository, TagRepository};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use vocabulary::{SqlxVocabularyRepository, VocabularyRepository};
