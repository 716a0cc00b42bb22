use salvo::prelude::*;
use salvo::writing::Redirect;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set};
use tera::Context;

use entity::activity;
use entity::prelude::Activity;

use crate::error::{AppError, AppResult, is_unique_violation};
use crate::forms::{ActivityForm, FieldError};
use crate::pagination::{PER_PAGE, PageInfo, page_param};
use crate::routes::date_stamp;
use crate::state::{app_state, base_context};

#[handler]
pub async fn list(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let page = page_param(req);
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;

    let paginator = Activity::find()
        .order_by_desc(activity::Column::Id)
        .paginate(&state.conn, PER_PAGE);
    let pages = PageInfo::new(page, paginator.num_items_and_pages().await?);
    let activities = paginator.fetch_page(page - 1).await?;

    ctx.insert("activities", &activities);
    ctx.insert("pages", &pages);
    res.render(state.render("all_activities.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn show(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("activity"))?;
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    let activity = Activity::find_by_id(id)
        .one(&state.conn)
        .await?
        .ok_or(AppError::NotFound("activity"))?;
    ctx.insert("activity", &activity);
    res.render(state.render("activity.html.tera", &ctx)?);
    Ok(())
}

async fn render_editor(
    depot: &mut Depot,
    res: &mut Response,
    form: &ActivityForm,
    errors: &[FieldError],
    action: &str,
) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("action", action);
    res.render(state.render("make-activity.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn new_form(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_editor(depot, res, &ActivityForm::default(), &[], "/new-activity").await
}

#[handler]
pub async fn create(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<ActivityForm>().await.unwrap_or_default();
    let mut errors = form.validate();
    if !errors.is_empty() {
        return render_editor(depot, res, &form, &errors, "/new-activity").await;
    }

    let conn = app_state(depot)?.conn.clone();
    let new_activity = activity::ActiveModel {
        title: Set(form.title.trim().to_owned()),
        summary: Set(form.summary.trim().to_owned()),
        body: Set(form.body.clone()),
        img_url: Set(form.img_url.trim().to_owned()),
        date: Set(date_stamp()),
        ..Default::default()
    };
    match new_activity.insert(&conn).await {
        Ok(_) => {
            res.render(Redirect::other("/allactivities"));
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            errors.push(FieldError::new(
                "title",
                "an activity with this title already exists",
            ));
            render_editor(depot, res, &form, &errors, "/new-activity").await
        }
        Err(err) => Err(err.into()),
    }
}

#[handler]
pub async fn edit_form(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("activity"))?;
    let conn = app_state(depot)?.conn.clone();
    let activity = Activity::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("activity"))?;
    let form = ActivityForm::from_model(&activity);
    render_editor(depot, res, &form, &[], &format!("/edit-activity/{id}")).await
}

#[handler]
pub async fn update(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("activity"))?;
    let form = req.parse_form::<ActivityForm>().await.unwrap_or_default();
    let action = format!("/edit-activity/{id}");
    let mut errors = form.validate();
    if !errors.is_empty() {
        return render_editor(depot, res, &form, &errors, &action).await;
    }

    let conn = app_state(depot)?.conn.clone();
    let activity = Activity::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("activity"))?;
    let mut active: activity::ActiveModel = activity.into();
    active.title = Set(form.title.trim().to_owned());
    active.summary = Set(form.summary.trim().to_owned());
    active.body = Set(form.body.clone());
    active.img_url = Set(form.img_url.trim().to_owned());
    // The creation date is deliberately left alone.
    match active.update(&conn).await {
        Ok(updated) => {
            res.render(Redirect::other(format!("/activities/{}", updated.id)));
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            errors.push(FieldError::new(
                "title",
                "an activity with this title already exists",
            ));
            render_editor(depot, res, &form, &errors, &action).await
        }
        Err(err) => Err(err.into()),
    }
}

#[handler]
pub async fn delete(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("activity"))?;
    let conn = app_state(depot)?.conn.clone();
    let activity = Activity::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("activity"))?;
    activity.delete(&conn).await?;
    res.render(Redirect::other("/allactivities"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use salvo::http::header::{COOKIE, LOCATION};
    use salvo::test::{ResponseExt, TestClient};
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    use entity::activity;
    use entity::prelude::Activity;

    use crate::test_support::{admin_cookie, test_service};

    const BASE: &str = "http://127.0.0.1:5800";

    async fn seed_activities(conn: &sea_orm::DatabaseConnection, count: u32) {
        for i in 1..=count {
            activity::ActiveModel {
                title: Set(format!("Outing {i:02}")),
                summary: Set("a short day out".to_owned()),
                body: Set("details to follow".to_owned()),
                img_url: Set("http://img.example/outing.png".to_owned()),
                date: Set("August 01, 2025".to_owned()),
                ..Default::default()
            }
            .insert(conn)
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn seventeen_records_paginate_into_three_pages() {
        let (service, state) = test_service().await;
        seed_activities(&state.conn, 17).await;

        let mut response = TestClient::get(format!("{BASE}/allactivities"))
            .send(&service)
            .await;
        let body = response.take_string().await.unwrap();
        assert!(body.contains("Page 1 of 3"));
        assert!(body.contains("Outing 17"));
        assert!(body.contains("Outing 10"));
        assert!(!body.contains("Outing 09"));

        let mut response = TestClient::get(format!("{BASE}/allactivities?page=2"))
            .send(&service)
            .await;
        let body = response.take_string().await.unwrap();
        assert!(body.contains("Outing 09"));
        assert!(body.contains("Outing 02"));
        assert!(!body.contains("Outing 01"));

        let mut response = TestClient::get(format!("{BASE}/allactivities?page=3"))
            .send(&service)
            .await;
        let body = response.take_string().await.unwrap();
        assert!(body.contains("Page 3 of 3"));
        assert!(body.contains("Outing 01"));
        assert!(!body.contains("Outing 02"));
    }

    #[tokio::test]
    async fn activity_crud_over_routes() {
        let (service, _state) = test_service().await;
        let admin = admin_cookie(&service).await;

        let response = TestClient::post(format!("{BASE}/new-activity"))
            .add_header(COOKIE, &admin, true)
            .raw_form(
                "title=Spring+hike&summary=Up+the+ridge&body=Bring+water\
                 &img_url=http://img.example/hike.png",
            )
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/allactivities");

        let mut response = TestClient::get(format!("{BASE}/activities/1"))
            .send(&service)
            .await;
        let body = response.take_string().await.unwrap();
        assert!(body.contains("Spring hike"));

        let response = TestClient::post(format!("{BASE}/edit-activity/1"))
            .add_header(COOKIE, &admin, true)
            .raw_form(
                "title=Spring+hike&summary=Rescheduled&body=Bring+water\
                 &img_url=http://img.example/hike.png",
            )
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));

        let mut response = TestClient::get(format!("{BASE}/activities/1"))
            .send(&service)
            .await;
        let body = response.take_string().await.unwrap();
        assert!(body.contains("Rescheduled"));

        let response = TestClient::get(format!("{BASE}/delete-activity/1"))
            .add_header(COOKIE, &admin, true)
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));

        let response = TestClient::get(format!("{BASE}/activities/1"))
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn duplicate_activity_title_rerenders_the_form() {
        let (service, state) = test_service().await;
        let admin = admin_cookie(&service).await;
        seed_activities(&state.conn, 1).await;

        let response = TestClient::post(format!("{BASE}/new-activity"))
            .add_header(COOKIE, &admin, true)
            .raw_form(
                "title=Outing+01&summary=again&body=again\
                 &img_url=http://img.example/outing.png",
            )
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::OK));
        assert_eq!(Activity::find().count(&state.conn).await.unwrap(), 1);
    }
}
