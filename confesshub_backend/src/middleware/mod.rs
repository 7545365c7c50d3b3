use crate::error::ApiError;
use crate::models::User;
use crate::AppState;
use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use actix_session::{Session, SessionExt};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::future::{ready, Ready as StdReady};

const SESSION_USER_ID: &str = "user_id";
const SESSION_IS_ADMIN: &str = "is_admin";

/// Stores the signed-in user in the cookie session.
pub fn start_session(session: &Session, user: &User) -> Result<(), ApiError> {
    session.renew();
    session.insert(SESSION_USER_ID, &user.id)?;
    session.insert(SESSION_IS_ADMIN, user.is_admin)?;
    Ok(())
}

pub fn end_session(session: &Session) {
    session.purge();
}

#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub is_admin: bool,
}

/// Looks the session's user up again so deactivated or deleted accounts
/// lose access immediately. A stale session is purged.
fn resolve_session_user(session: &Session, state: Option<&web::Data<AppState>>) -> Result<Option<SessionUser>, ApiError> {
    let Ok(Some(user_id)) = session.get::<String>(SESSION_USER_ID) else {
        return Ok(None);
    };
    let state = state.ok_or_else(|| ApiError::Internal("application state missing".to_string()))?;

    match state.users.find_user_by_id(&user_id)? {
        Some(user) if user.is_active => Ok(Some(SessionUser {
            user_id: user.id,
            is_admin: user.is_admin,
        })),
        _ => {
            log::warn!("Dropping session for missing or deactivated account {}", user_id);
            session.purge();
            Ok(None)
        }
    }
}

fn session_user_from(req: &HttpRequest) -> Result<Option<SessionUser>, ApiError> {
    resolve_session_user(&req.get_session(), req.app_data::<web::Data<AppState>>())
}

impl FromRequest for SessionUser {
    type Error = ApiError;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(session_user_from(req).and_then(|user| user.ok_or(ApiError::Unauthorized)))
    }
}

/// Signed-in user when there is one. Never rejects the request.
#[derive(Debug, Clone)]
pub struct MaybeSessionUser(pub Option<SessionUser>);

impl MaybeSessionUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.user_id.as_str())
    }
}

impl FromRequest for MaybeSessionUser {
    type Error = ApiError;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(session_user_from(req).map(MaybeSessionUser))
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
}

fn require_admin(user: Option<SessionUser>) -> Result<AdminUser, ApiError> {
    match user {
        Some(u) if u.is_admin => Ok(AdminUser { user_id: u.user_id }),
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::Unauthorized),
    }
}

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        // Set by AdminSessionValidation when the route sits behind it.
        if let Some(admin) = req.extensions().get::<AdminUser>().cloned() {
            return ready(Ok(admin));
        }
        ready(session_user_from(req).and_then(require_admin))
    }
}

/// Rejects every request in the wrapped scope unless the session belongs to
/// an active administrator.
pub struct AdminSessionValidation;

impl<S, B> Transform<S, ServiceRequest> for AdminSessionValidation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminSessionValidationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminSessionValidationMiddleware { service })
    }
}

pub struct AdminSessionValidationMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminSessionValidationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let checked = resolve_session_user(&req.get_session(), req.app_data::<web::Data<AppState>>())
            .and_then(require_admin);

        match checked {
            Ok(admin) => {
                req.extensions_mut().insert(admin);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(err) => Box::pin(async move {
                if matches!(err, ApiError::Forbidden) {
                    log::warn!("Non-admin session tried to reach {}", req.path());
                }
                let (http_req, _payload) = req.into_parts();
                let res = err.error_response().map_into_right_body();
                Ok(ServiceResponse::new(http_req, res))
            }),
        }
    }
}
