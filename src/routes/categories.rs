use salvo::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use entity::post;
use entity::prelude::{Category, Post};

use crate::error::{AppError, AppResult};
use crate::pagination::{PER_PAGE, PageInfo, page_param};
use crate::state::{app_state, base_context};

#[handler]
pub async fn show(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<i32>("id").ok_or(AppError::NotFound("category"))?;
    let page = page_param(req);
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;

    let category = Category::find_by_id(id)
        .one(&state.conn)
        .await?
        .ok_or(AppError::NotFound("category"))?;
    let paginator = Post::find()
        .filter(post::Column::CategoryId.eq(category.id))
        .order_by_desc(post::Column::Id)
        .paginate(&state.conn, PER_PAGE);
    let pages = PageInfo::new(page, paginator.num_items_and_pages().await?);
    let posts = paginator.fetch_page(page - 1).await?;

    ctx.insert("category", &category);
    ctx.insert("posts", &posts);
    ctx.insert("pages", &pages);
    res.render(state.render("catposts.html.tera", &ctx)?);
    Ok(())
}
