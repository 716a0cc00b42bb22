use salvo::flash::FlashDepotExt;
use salvo::prelude::*;
use salvo::session::{Session, SessionDepotExt};
use salvo::writing::Redirect;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use entity::prelude::User;
use entity::user;

use crate::auth::{SESSION_USER_KEY, hash_password, verify_password};
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::forms::{FieldError, LoginForm, RegisterForm};
use crate::state::{app_state, base_context};

async fn render_register(
    depot: &mut Depot,
    res: &mut Response,
    form: &RegisterForm,
    errors: &[FieldError],
) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    res.render(state.render("register.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn register_form(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_register(depot, res, &RegisterForm::default(), &[]).await
}

#[handler]
pub async fn register(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<RegisterForm>().await.unwrap_or_default();
    let mut errors = form.validate();
    if !errors.is_empty() {
        return render_register(depot, res, &form, &errors).await;
    }

    let conn = app_state(depot)?.conn.clone();
    // The very first account gets the admin role.
    let role = if User::find().count(&conn).await? == 0 {
        user::ROLE_ADMIN
    } else {
        user::ROLE_USER
    };
    let password = hash_password(&form.password)?;
    let new_user = user::ActiveModel {
        email: Set(form.email.trim().to_owned()),
        password: Set(password),
        name: Set(form.name.trim().to_owned()),
        role: Set(role.to_owned()),
        ..Default::default()
    };
    match new_user.insert(&conn).await {
        Ok(_) => {
            // No session is started; the new user logs in themselves.
            res.render(Redirect::other("/blog"));
            Ok(())
        }
        Err(err) if is_unique_violation(&err) => {
            errors.push(FieldError::new(
                "email",
                "an account with this email already exists",
            ));
            render_register(depot, res, &form, &errors).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn render_login(
    depot: &mut Depot,
    res: &mut Response,
    form: &LoginForm,
    errors: &[FieldError],
) -> AppResult<()> {
    let mut ctx = base_context(depot);
    let state = app_state(depot)?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    res.render(state.render("login.html.tera", &ctx)?);
    Ok(())
}

#[handler]
pub async fn login_form(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_login(depot, res, &LoginForm::default(), &[]).await
}

#[handler]
pub async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<LoginForm>().await.unwrap_or_default();
    let errors = form.validate();
    if !errors.is_empty() {
        return render_login(depot, res, &form, &errors).await;
    }

    let conn = app_state(depot)?.conn.clone();
    let user = User::find()
        .filter(user::Column::Email.eq(form.email.trim()))
        .one(&conn)
        .await?;
    let Some(user) = user else {
        depot
            .outgoing_flash_mut()
            .error("That email does not exist, please try again.");
        res.render(Redirect::other("/login"));
        return Ok(());
    };
    if !verify_password(&form.password, &user.password) {
        depot
            .outgoing_flash_mut()
            .error("Password incorrect, please try again.");
        res.render(Redirect::other("/login"));
        return Ok(());
    }

    let mut session = Session::new();
    session
        .insert(SESSION_USER_KEY, user.id)
        .map_err(|err| AppError::Session(err.to_string()))?;
    depot.set_session(session);
    res.render(Redirect::other("/blog"));
    Ok(())
}

#[handler]
pub async fn logout(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    if let Some(session) = depot.session_mut() {
        session.remove(SESSION_USER_KEY);
    }
    res.render(Redirect::other("/blog"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use salvo::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use salvo::test::TestClient;
    use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder};

    use entity::prelude::User;
    use entity::user;

    use crate::test_support::{admin_cookie, register, test_service};

    const BASE: &str = "http://127.0.0.1:5800";

    #[tokio::test]
    async fn duplicate_email_does_not_create_a_second_row() {
        let (service, state) = test_service().await;
        register(&service, "someone@example.com", "One", "firstpass").await;

        let response = TestClient::post(format!("{BASE}/register"))
            .raw_form("email=someone@example.com&name=Two&password=secondpass")
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::OK));
        assert_eq!(User::find().count(&state.conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn first_account_is_admin_and_later_ones_are_not() {
        let (service, state) = test_service().await;
        register(&service, "first@example.com", "First", "firstpass").await;
        register(&service, "second@example.com", "Second", "secondpass").await;

        let users = User::find()
            .order_by_asc(user::Column::Id)
            .all(&state.conn)
            .await
            .unwrap();
        assert_eq!(users[0].role, user::ROLE_ADMIN);
        assert_eq!(users[1].role, user::ROLE_USER);
    }

    #[tokio::test]
    async fn register_stores_a_hash_not_the_password() {
        let (service, state) = test_service().await;
        register(&service, "careful@example.com", "Careful", "plaintextpw").await;
        let user = User::find().one(&state.conn).await.unwrap().unwrap();
        assert_ne!(user.password, "plaintextpw");
    }

    #[tokio::test]
    async fn register_rejects_a_malformed_email() {
        let (service, state) = test_service().await;
        let response = TestClient::post(format!("{BASE}/register"))
            .raw_form("email=not-an-email&name=Odd&password=whatever1")
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::OK));
        assert_eq!(User::find().count(&state.conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (service, _state) = test_service().await;
        register(&service, "known@example.com", "Known", "rightpass").await;

        let response = TestClient::post(format!("{BASE}/login"))
            .raw_form("email=known@example.com&password=wrongpass")
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/login");

        let response = TestClient::post(format!("{BASE}/login"))
            .raw_form("email=unknown@example.com&password=rightpass")
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/login");
    }

    #[tokio::test]
    async fn login_establishes_a_session() {
        let (service, _state) = test_service().await;
        register(&service, "known@example.com", "Known", "rightpass").await;

        let response = TestClient::post(format!("{BASE}/login"))
            .raw_form("email=known@example.com&password=rightpass")
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/blog");
        assert!(response.headers().get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn logout_drops_the_authenticated_session() {
        let (service, _state) = test_service().await;
        let admin = admin_cookie(&service).await;

        let response = TestClient::get(format!("{BASE}/new-post"))
            .add_header(COOKIE, &admin, true)
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::OK));

        let response = TestClient::get(format!("{BASE}/logout"))
            .add_header(COOKIE, &admin, true)
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::SEE_OTHER));
        let cleared = response.headers().get(SET_COOKIE).unwrap().clone();

        let response = TestClient::get(format!("{BASE}/new-post"))
            .add_header(COOKIE, &cleared, true)
            .send(&service)
            .await;
        assert_eq!(response.status_code, Some(StatusCode::FORBIDDEN));
    }
}
