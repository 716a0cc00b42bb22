use salvo::prelude::*;
use salvo::writing::Redirect;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};

use entity::prelude::{About, Activity, Category};
use entity::{about, activity};

use crate::error::AppResult;
use crate::forms::{AboutForm, FieldError};
use crate::state::{app_state, base_context};

// What the about page shows before an admin has written anything.
const DEFAULT_ABOUT: &str = "Hi";

#[handler]
pub async fn home(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;

    let categories = Category::find().all(&state.conn).await?;
    let recent = Activity::find()
        .order_by_desc(activity::Column::Id)
        .limit(3)
        .all(&state.conn)
        .await?;

    ctx.insert("categories", &categories);
    ctx.insert("activities", &recent);
    res.render(state.render("home.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn about(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    let content = About::find()
        .one(&state.conn)
        .await?
        .map_or_else(|| DEFAULT_ABOUT.to_owned(), |row| row.body);
    ctx.insert("content", &content);
    res.render(state.render("about.html.tera", &ctx)?);
    Ok(())
}

async fn render_about_editor(
    depot: &mut Depot,
    res: &mut Response,
    form: &AboutForm,
    errors: &[FieldError],
) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    res.render(state.render("make-about.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn edit_about_form(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let conn = app_state(depot)?.conn.clone();
    let body = About::find()
        .one(&conn)
        .await?
        .map(|row| row.body)
        .unwrap_or_default();
    render_about_editor(depot, res, &AboutForm { body }, &[]).await
}

#[handler]
pub async fn update_about(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let form = req.parse_form::<AboutForm>().await.unwrap_or_default();
    let errors = form.validate();
    if !errors.is_empty() {
        return render_about_editor(depot, res, &form, &errors).await;
    }

    let conn = app_state(depot)?.conn.clone();
    // Single-row table: overwrite the row if it exists.
    match About::find().one(&conn).await? {
        Some(existing) => {
            let mut active: about::ActiveModel = existing.into();
            active.body = Set(form.body.clone());
            active.update(&conn).await?;
        }
        None => {
            about::ActiveModel {
                body: Set(form.body.clone()),
                ..Default::default()
            }
            .insert(&conn)
            .await?;
        }
    }
    res.render(Redirect::other("/about"));
    Ok(())
}

#[handler]
pub async fn contact(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let ctx = base_context(depot);
    let state = app_state(depot)?;
    res.render(state.render("contact.html.tera", &ctx)?);
    Ok(())
}
