use crate::error::{ApiError, ApiResult};
use crate::helper::account_helpers::{self, PasswordReset, Registration};
use crate::middleware::{end_session, start_session, SessionUser};
use crate::models::PublicUser;
use crate::routes::success;
use crate::AppState;
use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password", web::post().to(reset_password)),
    );
}

async fn register(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let user = account_helpers::register(
        state.users.as_ref(),
        Registration {
            email: &body.email,
            password: &body.password,
            confirm_password: &body.confirm_password,
        },
        state.settings.password_hash_cost,
        Utc::now(),
        &mut rand::thread_rng(),
    )?;
    start_session(&session, &user)?;
    Ok(success(json!({
        "user": PublicUser::from(user),
        "message": "Account created successfully",
    })))
}

async fn login(state: web::Data<AppState>, session: Session, body: web::Json<LoginRequest>) -> ApiResult<HttpResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }
    let user = account_helpers::login(state.users.as_ref(), &body.email, &body.password, Utc::now())?;
    start_session(&session, &user)?;
    Ok(success(json!({ "user": PublicUser::from(user) })))
}

async fn logout(session: Session) -> HttpResponse {
    end_session(&session);
    success(json!({ "message": "Logged out" }))
}

async fn me(state: web::Data<AppState>, user: SessionUser) -> ApiResult<HttpResponse> {
    let found = state
        .users
        .find_user_by_id(&user.user_id)?
        .ok_or(ApiError::Unauthorized)?;
    Ok(success(json!({ "user": PublicUser::from(found) })))
}

async fn forgot_password(state: web::Data<AppState>, body: web::Json<ForgotPasswordRequest>) -> ApiResult<HttpResponse> {
    account_helpers::forgot_password(
        state.users.as_ref(),
        &body.email,
        state.settings.reset_token_ttl,
        &state.settings.public_base_url,
        Utc::now(),
        &mut rand::thread_rng(),
    )?;
    Ok(success(json!({
        "message": "If an account with this email exists, password reset instructions have been sent."
    })))
}

async fn reset_password(state: web::Data<AppState>, body: web::Json<ResetPasswordRequest>) -> ApiResult<HttpResponse> {
    account_helpers::reset_password(
        state.users.as_ref(),
        PasswordReset {
            token: &body.token,
            new_password: &body.new_password,
            confirm_password: &body.confirm_password,
        },
        state.settings.password_hash_cost,
        Utc::now(),
    )?;
    Ok(success(json!({
        "message": "Password has been reset successfully. You can now log in with your new password."
    })))
}
