use crate::helper::anonymous_names::generate_anonymous_name;
use crate::helper::sanitization_helpers::is_valid_email;
use crate::models::db_operations::{at_db_precision, DbError};
use crate::models::repository::UserRepository;
use crate::models::{PasswordResetToken, User};
use bcrypt::BcryptError;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub const MIN_PASSWORD_CHARS: usize = 6;
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    Deactivated,
    #[error("Invalid or expired reset token")]
    InvalidToken,
    #[error("Reset token has expired")]
    ExpiredToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] BcryptError),
    #[error(transparent)]
    Storage(#[from] DbError),
}

fn validate_new_password(password: &str, confirm_password: &str) -> Result<(), AccountError> {
    if password != confirm_password {
        return Err(AccountError::Validation("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AccountError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AccountError::Validation("Email address is required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(AccountError::Validation("Please enter a valid email address".to_string()));
    }
    Ok(email.to_lowercase())
}

/// Creates an account without the confirm-password step. Used by
/// registration and by the setup CLI for admin accounts.
pub fn create_account<R: Rng + ?Sized>(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
    is_admin: bool,
    hash_cost: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<User, AccountError> {
    let email = validate_email(email)?;
    validate_new_password(password, password)?;
    if users.find_user_by_email(&email)?.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: bcrypt::hash(password, hash_cost)?,
        anonymous_id: generate_anonymous_name(rng),
        join_date: now,
        last_login: None,
        is_admin,
        is_active: true,
        posts: Vec::new(),
        comments: Vec::new(),
        reactions: Vec::new(),
    };
    match users.insert_user(&user) {
        Ok(()) => {}
        Err(DbError::Duplicate(_)) => return Err(AccountError::EmailTaken),
        Err(e) => return Err(e.into()),
    }
    log::info!("Account {} registered (admin: {})", user.id, user.is_admin);
    Ok(user)
}

pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

pub fn register<R: Rng + ?Sized>(
    users: &dyn UserRepository,
    input: Registration<'_>,
    hash_cost: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<User, AccountError> {
    if input.email.trim().is_empty() || input.password.is_empty() || input.confirm_password.is_empty() {
        return Err(AccountError::Validation(
            "Email, password and password confirmation are required".to_string(),
        ));
    }
    validate_new_password(input.password, input.confirm_password)?;
    create_account(users, input.email, input.password, false, hash_cost, now, rng)
}

pub fn login(users: &dyn UserRepository, email: &str, password: &str, now: DateTime<Utc>) -> Result<User, AccountError> {
    let user = users
        .find_user_by_email(email.trim())?
        .ok_or(AccountError::InvalidCredentials)?;
    if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        log::warn!("Failed login attempt for account {}", user.id);
        return Err(AccountError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AccountError::Deactivated);
    }
    users.update_last_login(&user.id, now)?;
    Ok(User {
        last_login: Some(now),
        ..user
    })
}

pub fn reset_link(public_base_url: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut link = Url::parse(public_base_url)?.join("/auth/reset-password")?;
    link.query_pairs_mut().append_pair("token", token);
    Ok(link)
}

/// Issues a reset token when the account exists. Callers answer the same
/// way whether or not it exists.
pub fn forgot_password<R: RngCore + ?Sized>(
    users: &dyn UserRepository,
    email: &str,
    token_ttl: Duration,
    public_base_url: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Option<PasswordResetToken>, AccountError> {
    let email = validate_email(email)?;
    let Some(user) = users.find_user_by_email(&email)? else {
        return Ok(None);
    };

    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    let token = PasswordResetToken {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        token: hex::encode(bytes),
        expires: at_db_precision(now + token_ttl),
        used: false,
    };
    users.insert_reset_token(&token)?;

    // No mail transport: the link goes to the log.
    match reset_link(public_base_url, &token.token) {
        Ok(link) => log::info!("Password reset requested for {}. Reset link: {}", user.email, link),
        Err(e) => log::error!("Could not build reset link from '{}': {}", public_base_url, e),
    }
    Ok(Some(token))
}

pub struct PasswordReset<'a> {
    pub token: &'a str,
    pub new_password: &'a str,
    pub confirm_password: &'a str,
}

pub fn reset_password(
    users: &dyn UserRepository,
    input: PasswordReset<'_>,
    hash_cost: u32,
    now: DateTime<Utc>,
) -> Result<(), AccountError> {
    if input.token.trim().is_empty() || input.new_password.is_empty() || input.confirm_password.is_empty() {
        return Err(AccountError::Validation(
            "Token, new password and password confirmation are required".to_string(),
        ));
    }
    validate_new_password(input.new_password, input.confirm_password)?;

    let token = users
        .find_unused_reset_token(input.token.trim())?
        .ok_or(AccountError::InvalidToken)?;
    if token.is_expired_at(now) {
        return Err(AccountError::ExpiredToken);
    }

    let new_hash = bcrypt::hash(input.new_password, hash_cost)?;
    if !users.consume_reset_token(&token.id, &token.user_id, &new_hash)? {
        return Err(AccountError::InvalidToken);
    }
    log::info!("Password reset completed for account {}", token.user_id);
    Ok(())
}

pub fn change_password(users: &dyn UserRepository, email: &str, new_password: &str, hash_cost: u32) -> Result<(), AccountError> {
    validate_new_password(new_password, new_password)?;
    let user = users.find_user_by_email(email.trim())?.ok_or(AccountError::UserNotFound)?;
    let new_hash = bcrypt::hash(new_password, hash_cost)?;
    if !users.update_password_hash(&user.id, &new_hash)? {
        return Err(AccountError::UserNotFound);
    }
    Ok(())
}
