use salvo::prelude::*;
use salvo::session::SessionDepotExt;
use sea_orm::{DatabaseConnection, EntityTrait};

use entity::prelude::User;
use entity::user;

use crate::error::AppResult;

/// Session key holding the logged-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";

const CURRENT_USER_KEY: &str = "::quill::current_user";

pub trait CurrentUserDepotExt {
    fn set_current_user(&mut self, user: user::Model) -> &mut Self;
    fn current_user(&self) -> Option<&user::Model>;
}

impl CurrentUserDepotExt for Depot {
    fn set_current_user(&mut self, user: user::Model) -> &mut Self {
        self.insert(CURRENT_USER_KEY, user);
        self
    }

    fn current_user(&self) -> Option<&user::Model> {
        self.get(CURRENT_USER_KEY).ok()
    }
}

/// Resolves the session's user id to a user row so handlers and templates
/// can read the authenticated identity from the depot.
pub struct CurrentUserHandler {
    conn: DatabaseConnection,
}

impl CurrentUserHandler {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Handler for CurrentUserHandler {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let user_id = depot
            .session()
            .and_then(|session| session.get::<i32>(SESSION_USER_KEY));
        if let Some(user_id) = user_id {
            match User::find_by_id(user_id).one(&self.conn).await {
                Ok(Some(user)) => {
                    depot.set_current_user(user);
                }
                // Stale session; the request continues anonymously.
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "current user lookup failed"),
            }
        }
        ctrl.call_next(req, depot, res).await;
    }
}

/// Gate for admin routes: anyone without the admin role gets 403.
pub struct RequireAdmin;

#[async_trait]
impl Handler for RequireAdmin {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if depot.current_user().is_some_and(user::Model::is_admin) {
            ctrl.call_next(req, depot, res).await;
        } else {
            res.render(StatusError::forbidden());
            ctrl.skip_rest();
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
