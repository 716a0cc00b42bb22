use salvo::flash::FlashDepotExt;
use salvo::prelude::*;
use salvo::writing::{Redirect, Text};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tera::Context;

use entity::prelude::{Category, Comment, Post, User};
use entity::{comment, post};

use crate::auth::CurrentUserDepotExt;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::forms::{CommentForm, FieldError, PostForm};
use crate::pagination::{PER_PAGE, PageInfo, page_param};
use crate::routes::date_stamp;
use crate::state::{AppState, app_state, base_context};

#[derive(Debug, Serialize)]
struct CommentView {
    body: String,
    author_name: String,
}

#[handler]
pub async fn list(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let page = page_param(req);
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;

    let paginator = Post::find()
        .order_by_desc(post::Column::Id)
        .paginate(&state.conn, PER_PAGE);
    let pages = PageInfo::new(page, paginator.num_items_and_pages().await?);
    let posts = paginator.fetch_page(page - 1).await?;

    ctx.insert("posts", &posts);
    ctx.insert("pages", &pages);
    res.render(state.render("index.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn search(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let query = match req.form::<String>("query").await {
        Some(query) => query,
        None => req.query::<String>("q").unwrap_or_default(),
    };
    let query = query.trim().to_owned();
    let page = page_param(req);
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;

    let (posts, pages) = if query.is_empty() {
        (Vec::new(), PageInfo::empty())
    } else {
        let paginator = Post::find()
            .filter(
                Condition::any()
                    .add(post::Column::Title.contains(query.as_str()))
                    .add(post::Column::Body.contains(query.as_str())),
            )
            .order_by_desc(post::Column::Id)
            .paginate(&state.conn, PER_PAGE);
        let pages = PageInfo::new(page, paginator.num_items_and_pages().await?);
        (paginator.fetch_page(page - 1).await?, pages)
    };

    ctx.insert("posts", &posts);
    ctx.insert("pages", &pages);
    ctx.insert("query", &query);
    res.render(state.render("index.html.tera", &ctx)?);
    Ok(())
}

async fn render_post(
    state: &AppState,
    mut ctx: Context,
    id: i32,
    form: &CommentForm,
    errors: &[FieldError],
) -> AppResult<Text<String>> {
    let post = Post::find_by_id(id)
        .one(&state.conn)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    let author = post.find_related(User).one(&state.conn).await?;
    let category = post.find_related(Category).one(&state.conn).await?;
    let comments: Vec<CommentView> = Comment::find()
        .filter(comment::Column::PostId.eq(post.id))
        .find_also_related(User)
        .order_by_asc(comment::Column::Id)
        .all(&state.conn)
        .await?
        .into_iter()
        .map(|(comment, author)| CommentView {
            body: comment.body,
            author_name: author.map_or_else(|| "unknown".to_owned(), |user| user.name),
        })
        .collect();

    ctx.insert("post", &post);
    ctx.insert("author", &author);
    ctx.insert("category", &category);
    ctx.insert("comments", &comments);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    state.render("post.html.tera", &ctx)
}

#[handler]
pub async fn show(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("post"))?;
    let ctx = base_context(depot);
    let state = app_state(depot)?;
    res.render(render_post(state, ctx, id, &CommentForm::default(), &[]).await?);
    Ok(())
}

#[handler]
pub async fn add_comment(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("post"))?;
    let form = req.parse_form::<CommentForm>().await.unwrap_or_default();

    let Some(user) = depot.current_user().cloned() else {
        depot
            .outgoing_flash_mut()
            .info("You need to login or register to comment.");
        res.render(Redirect::other("/login"));
        return Ok(());
    };

    let errors = form.validate();
    if !errors.is_empty() {
        let ctx = base_context(depot);
        let state = app_state(depot)?;
        res.render(render_post(state, ctx, id, &form, &errors).await?);
        return Ok(());
    }

    let conn = app_state(depot)?.conn.clone();
    let post = Post::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    comment::ActiveModel {
        body: Set(form.body.trim().to_owned()),
        author_id: Set(user.id),
        post_id: Set(post.id),
        ..Default::default()
    }
    .insert(&conn)
    .await?;

    res.render(Redirect::other(format!("/post/{id}")));
    Ok(())
}

async fn render_editor(
    depot: &mut Depot,
    res: &mut Response,
    form: &PostForm,
    errors: &[FieldError],
    action: &str,
) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    let categories = Category::find().all(&state.conn).await?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("action", action);
    ctx.insert("categories", &categories);
    res.render(state.render("make-post.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn new_form(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_editor(depot, res, &PostForm::default(), &[], "/new-post").await
}

#[handler]
pub async fn create(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<PostForm>().await.unwrap_or_default();
    let mut errors = form.validate();
    if !errors.is_empty() {
        return render_editor(depot, res, &form, &errors, "/new-post").await;
    }

    let author = depot
        .current_user()
        .cloned()
        .ok_or(AppError::Unauthenticated)?;
    let conn = app_state(depot)?.conn.clone();
    let new_post = post::ActiveModel {
        title: Set(form.title.trim().to_owned()),
        subtitle: Set(form.subtitle.trim().to_owned()),
        date: Set(date_stamp()),
        body: Set(form.body.clone()),
        img_url: Set(form.img_url.trim().to_owned()),
        author_id: Set(author.id),
        category_id: Set(form.category_id),
        ..Default::default()
    };
    match new_post.insert(&conn).await {
        Ok(created) => {
            res.render(Redirect::other(format!("/post/{}", created.id)));
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            errors.push(FieldError::new(
                "title",
                "a post with this title already exists",
            ));
            render_editor(depot, res, &form, &errors, "/new-post").await
        }
        Err(err) => Err(err.into()),
    }
}

#[handler]
pub async fn edit_form(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("post"))?;
    let conn = app_state(depot)?.conn.clone();
    let post = Post::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    let form = PostForm::from_model(&post);
    render_editor(depot, res, &form, &[], &format!("/edit-post/{id}")).await
}

#[handler]
pub async fn update(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("post"))?;
    let form = req.parse_form::<PostForm>().await.unwrap_or_default();
    let action = format!("/edit-post/{id}");
    let mut errors = form.validate();
    if !errors.is_empty() {
        return render_editor(depot, res, &form, &errors, &action).await;
    }

    let conn = app_state(depot)?.conn.clone();
    let post = Post::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    let mut active: post::ActiveModel = post.into();
    active.title = Set(form.title.trim().to_owned());
    active.subtitle = Set(form.subtitle.trim().to_owned());
    active.body = Set(form.body.clone());
    active.img_url = Set(form.img_url.trim().to_owned());
    active.category_id = Set(form.category_id);
    // The creation date is deliberately left alone.
    match active.update(&conn).await {
        Ok(updated) => {
            res.render(Redirect::other(format!("/post/{}", updated.id)));
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            errors.push(FieldError::new(
                "title",
                "a post with this title already exists",
            ));
            render_editor(depot, res, &form, &errors, &action).await
        }
        Err(err) => Err(err.into()),
    }
}

#[handler]
pub async fn delete(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("post"))?;
    let conn = app_state(depot)?.conn.clone();
    let post = Post::find_by_id(id)
        .one(&conn)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    post.delete(&conn).await?;
    res.render(Redirect::other("/blog"));
    Ok(())
}
