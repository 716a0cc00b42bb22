use salvo::affix_state;
use salvo::catch_panic::CatchPanic;
use salvo::flash::SessionStore;
use salvo::logging::Logger;
use salvo::prelude::*;
use salvo::session::{CookieStore, SessionHandler};

use crate::auth::{CurrentUserHandler, RequireAdmin};
use crate::config::Config;
use crate::state::AppState;

pub mod accounts;
pub mod activities;
pub mod categories;
pub mod pages;
pub mod posts;

/// Creation-date stamp shown on posts and activities.
pub(crate) fn date_stamp() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

/// Builds the full HTTP service: the middleware chain plus every route.
pub fn service(state: AppState, config: &Config) -> Service {
    let session_handler = SessionHandler::builder(
        CookieStore::new(),
        config.session_secret.as_bytes(),
    )
    .build()
    .expect("session handler");
    let current_user = CurrentUserHandler::new(state.conn.clone());

    let router = Router::new()
        .hoop(Logger)
        .hoop(CatchPanic::new())
        .hoop(affix_state::inject(state))
        .hoop(session_handler)
        .hoop(SessionStore::new().into_handler())
        .hoop(current_user)
        .get(pages::home)
        .push(Router::with_path("blog").get(posts::list).post(posts::list))
        .push(
            Router::with_path("search")
                .get(posts::search)
                .post(posts::search),
        )
        .push(
            Router::with_path("post/{id}")
                .get(posts::show)
                .post(posts::add_comment),
        )
        .push(
            Router::with_path("new-post")
                .hoop(RequireAdmin)
                .get(posts::new_form)
                .post(posts::create),
        )
        .push(
            Router::with_path("edit-post/{id}")
                .hoop(RequireAdmin)
                .get(posts::edit_form)
                .post(posts::update),
        )
        .push(
            Router::with_path("delete/{id}")
                .hoop(RequireAdmin)
                .get(posts::delete),
        )
        .push(Router::with_path("allactivities").get(activities::list))
        .push(
            Router::with_path("activities/{id}")
                .get(activities::show)
                .post(activities::show),
        )
        .push(
            Router::with_path("new-activity")
                .hoop(RequireAdmin)
                .get(activities::new_form)
                .post(activities::create),
        )
        .push(
            Router::with_path("edit-activity/{id}")
                .hoop(RequireAdmin)
                .get(activities::edit_form)
                .post(activities::update),
        )
        .push(
            Router::with_path("delete-activity/{id}")
                .hoop(RequireAdmin)
                .get(activities::delete),
        )
        .push(
            Router::with_path("category/{id}")
                .get(categories::show)
                .post(categories::show),
        )
        .push(
            Router::with_path("register")
                .get(accounts::register_form)
                .post(accounts::register),
        )
        .push(
            Router::with_path("login")
                .get(accounts::login_form)
                .post(accounts::login),
        )
        .push(Router::with_path("logout").get(accounts::logout))
        .push(Router::with_path("about").get(pages::about))
        .push(
            Router::with_path("edit-about")
                .hoop(RequireAdmin)
                .get(pages::edit_about_form)
                .post(pages::update_about),
        )
        .push(Router::with_path("contact").get(pages::contact));

    Service::new(router)
}
