use salvo::http::StatusError;
use salvo::writing::Redirect;
use salvo::{Depot, Request, Response, Writer, async_trait};
use thiserror::Error;

/// Application failure taxonomy. Form validation failures are not errors;
/// they re-render the submitted form with field messages.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("template error: {0}")]
    Render(#[from] tera::Error),

    #[error("password hash error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("session error: {0}")]
    Session(String),

    #[error("missing application state")]
    State,

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type AppResult<T> = Result<T, AppError>;

/// True when the database rejected a write because of a unique index,
/// e.g. a duplicate email or title.
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        match self {
            Self::NotFound(what) => {
                tracing::debug!(what, "lookup missed");
                res.render(StatusError::not_found());
            }
            Self::Unauthenticated => {
                res.render(Redirect::other("/login"));
            }
            err => {
                tracing::error!(error = %err, "request failed");
                res.render(StatusError::internal_server_error());
            }
        }
    }
}
