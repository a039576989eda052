//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - validating input and enforcing invariants
//! - generating secrets, slugs and identifiers
//! - translating repository failures into typed errors

pub mod api_token;
pub mod article;
pub mod password;
pub mod password_reset;
pub mod secrets;
pub mod session;
pub mod user;
pub mod vocabulary;

pub use api_token::{ApiTokenService, ApiTokenServiceError};
pub use article::{generate_slug, ArticleService, ArticleServiceError};
pub use password::{hash_password, verify_password};
pub use password_reset::{PasswordResetError, PasswordResetService};
pub use session::{SessionService, SessionServiceError};
pub use user::{UserService, UserServiceError};
pub use vocabulary::{VocabularyService, VocabularyServiceError};
