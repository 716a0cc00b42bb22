use salvo::Depot;
use salvo::flash::FlashDepotExt;
use salvo::writing::Text;
use sea_orm::DatabaseConnection;
use tera::{Context, Tera};

use crate::auth::CurrentUserDepotExt;
use crate::error::{AppError, AppResult};

/// Shared application state, injected into every request via affix-state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub conn: DatabaseConnection,
    pub templates: Tera,
}

impl AppState {
    pub fn render(&self, name: &str, ctx: &Context) -> AppResult<Text<String>> {
        Ok(Text::Html(self.templates.render(name, ctx)?))
    }
}

pub fn app_state(depot: &Depot) -> AppResult<&AppState> {
    depot.obtain::<AppState>().map_err(|_| AppError::State)
}

/// Context pre-loaded with what the base layout expects on every page:
/// the current user and flash messages carried over a redirect.
pub fn base_context(depot: &mut Depot) -> Context {
    let mut ctx = Context::new();
    ctx.insert("current_user", &depot.current_user());
    let flash: Vec<String> = depot
        .incoming_flash()
        .map(|flash| flash.iter().map(|message| message.value.clone()).collect())
        .unwrap_or_default();
    ctx.insert("flash_messages", &flash);
    ctx
}
