//! HTTP handlers

use axum::{
    extract::{Form, Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use common::error::ModelError;
use tracing::{debug, info};

use crate::{
    context::{AUTHENTICATED_USER_KEY, FLASH_KEY, PageContext},
    error::{AppError, AppResult},
    forms::{
        BAD_CREDENTIALS_MESSAGE, DUPLICATE_EMAIL_MESSAGE, SnippetCreateForm, UserLoginForm,
        UserSignupForm,
    },
    state::AppState,
    templates::{CREATE_PAGE, HOME_PAGE, LOGIN_PAGE, SIGNUP_PAGE, VIEW_PAGE},
};

/// Unwrap a decoded form; bodies that do not decode are a 400
fn decode<T>(form: Result<Form<T>, FormRejection>) -> AppResult<T> {
    form.map(|Form(form)| form).map_err(|rejection| {
        debug!(error = %rejection, "failed to decode form");
        AppError::Client(StatusCode::BAD_REQUEST)
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn home(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let snippets = state.repositories.snippet.latest().await?;

    let mut data = ctx.template_data().await;
    data.snippets = snippets;
    state.render(StatusCode::OK, HOME_PAGE, data)
}

pub async fn snippet_view(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = match id.parse::<i64>() {
        Ok(id) if id >= 1 => id,
        _ => return Err(AppError::NotFound),
    };

    let snippet = match state.repositories.snippet.get(id).await {
        Ok(snippet) => snippet,
        Err(ModelError::NoRecord) => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let mut data = ctx.template_data().await;
    data.snippet = Some(snippet);
    state.render(StatusCode::OK, VIEW_PAGE, data)
}

pub async fn snippet_create(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let data = ctx
        .template_data()
        .await
        .with_form(&SnippetCreateForm::default());
    state.render(StatusCode::OK, CREATE_PAGE, data)
}

pub async fn snippet_create_post(
    State(state): State<AppState>,
    ctx: PageContext,
    form: Result<Form<SnippetCreateForm>, FormRejection>,
) -> AppResult<Response> {
    let mut form = decode(form)?;

    if !form.validate() {
        let data = ctx.template_data().await.with_form(&form);
        return state.render(StatusCode::UNPROCESSABLE_ENTITY, CREATE_PAGE, data);
    }

    let id = state
        .repositories
        .snippet
        .insert(&form.title, &form.content, form.expires)
        .await?;
    info!(id, "snippet created");

    ctx.session.put(FLASH_KEY, "Snippet successfully created!").await;
    Ok(Redirect::to(&format!("/snippet/view/{}", id)).into_response())
}

pub async fn user_signup(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let data = ctx.template_data().await.with_form(&UserSignupForm::default());
    state.render(StatusCode::OK, SIGNUP_PAGE, data)
}

pub async fn user_signup_post(
    State(state): State<AppState>,
    ctx: PageContext,
    form: Result<Form<UserSignupForm>, FormRejection>,
) -> AppResult<Response> {
    let mut form = decode(form)?;

    if form.validate() {
        match state
            .repositories
            .user
            .insert(&form.name, &form.email, &form.password)
            .await
        {
            Ok(()) => {
                info!("user signed up");
                ctx.session
                    .put(FLASH_KEY, "Your signup was successful. Please log in.")
                    .await;
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(ModelError::DuplicateEmail) => {
                form.validator.add_field_error("email", DUPLICATE_EMAIL_MESSAGE);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = ctx.template_data().await.with_form(&form);
    state.render(StatusCode::UNPROCESSABLE_ENTITY, SIGNUP_PAGE, data)
}

pub async fn user_login(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let data = ctx.template_data().await.with_form(&UserLoginForm::default());
    state.render(StatusCode::OK, LOGIN_PAGE, data)
}

pub async fn user_login_post(
    State(state): State<AppState>,
    ctx: PageContext,
    form: Result<Form<UserLoginForm>, FormRejection>,
) -> AppResult<Response> {
    let mut form = decode(form)?;

    if form.validate() {
        match state
            .repositories
            .user
            .authenticate(&form.email, &form.password)
            .await
        {
            Ok(user_id) => {
                info!(user_id, "user logged in");
                ctx.session.renew_token().await;
                ctx.session.put(AUTHENTICATED_USER_KEY, user_id).await;
                return Ok(Redirect::to("/snippet/create").into_response());
            }
            Err(ModelError::InvalidCredentials) => {
                form.validator.add_non_field_error(BAD_CREDENTIALS_MESSAGE);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = ctx.template_data().await.with_form(&form);
    state.render(StatusCode::UNPROCESSABLE_ENTITY, LOGIN_PAGE, data)
}

pub async fn user_logout_post(ctx: PageContext) -> Response {
    ctx.session.renew_token().await;
    ctx.session.remove(AUTHENTICATED_USER_KEY).await;
    ctx.session
        .put(FLASH_KEY, "You've been logged out successfully!")
        .await;
    Redirect::to("/").into_response()
}
