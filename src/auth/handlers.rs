use axum::{
    extract::{FromRef, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        password::{hash_password, verify_password},
        repo::User,
        session::{take_flash, SessionKeys, SessionUser},
    },
    error::AppError,
    state::AppState,
    views,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/dashboard", get(dashboard))
        .route("/logout", get(logout))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn register_form() -> Html<String> {
    Html(views::register_page(None))
}

#[instrument(skip(state, form))]
async fn register(
    State(state): State<AppState>,
    Form(mut form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    form.email = form.email.trim().to_lowercase();
    form.name = form.name.trim().to_string();

    if form.name.is_empty() || form.password.is_empty() {
        warn!("registration with empty name or password");
        return Ok(Html(views::register_page(Some("All fields are required"))).into_response());
    }
    if !is_valid_email(&form.email) {
        warn!(email = %form.email, "invalid email");
        return Ok(Html(views::register_page(Some("Invalid email address"))).into_response());
    }

    let hash = hash_password(&form.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        AppError::Internal(e)
    })?;

    match User::create(&state.db, &form.name, &form.email, &hash).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "user registered");
            Ok(Redirect::to("/login").into_response())
        }
        Err(AppError::DuplicateEmail) => {
            warn!(email = %form.email, "email already registered");
            Ok(Html(views::register_page(Some("Email already registered"))).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn login_form() -> Html<String> {
    Html(views::login_page(None))
}

#[instrument(skip(state, jar, form))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, AppError> {
    form.email = form.email.trim().to_lowercase();

    let rejected =
        || Html(views::login_page(Some(&AppError::InvalidCredentials.user_message())));

    let user = match User::find_by_email(&state.db, &form.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %form.email, "login unknown email");
            return Ok(rejected().into_response());
        }
    };

    let ok = verify_password(&form.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        AppError::Internal(e)
    })?;
    if !ok {
        warn!(email = %form.email, user_id = user.id, "login invalid password");
        return Ok(rejected().into_response());
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&user.email).map_err(|e| {
        error!(error = %e, "session sign failed");
        AppError::Internal(e)
    })?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    let jar = jar.add(keys.cookie(token));
    Ok((jar, Redirect::to("/dashboard")).into_response())
}

#[instrument(skip(state, jar))]
async fn dashboard(
    State(state): State<AppState>,
    SessionUser(email): SessionUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            // session refers to a user that no longer exists
            warn!(email = %email, "session user not found");
            return Ok(Redirect::to("/login").into_response());
        }
    };

    let (jar, flash) = take_flash(jar);
    Ok((
        jar,
        Html(views::dashboard_page(&user.name, &user.email, flash.as_deref())),
    )
        .into_response())
}

#[instrument(skip(state, jar))]
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let keys = SessionKeys::from_ref(&state);
    let jar = jar.add(keys.removal_cookie());
    (jar, Redirect::to("/login")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }
}
