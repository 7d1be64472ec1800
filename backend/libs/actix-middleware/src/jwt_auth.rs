use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use uuid::Uuid;

use crate::error::AuthError;

/// User ID extracted from JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// Pull the bearer token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Validate a raw token and return the subject.
pub fn authenticate_token(token: &str) -> Result<UserId, AuthError> {
    let user_id = crypto_core::jwt::get_user_id_from_token(token).map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        AuthError::from(e)
    })?;
    Ok(UserId(user_id))
}

fn authenticate_header(header: Option<&str>) -> Result<UserId, AuthError> {
    bearer_token(header).and_then(authenticate_token)
}

/// JWT Authentication Middleware
///
/// Rejects the request with 401 unless it carries a valid bearer token.
pub struct JwtAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok());
            let user_id = authenticate_header(header)?;

            req.extensions_mut().insert(user_id);

            service.call(req).await
        })
    }
}

/// Uses the id stored by `JwtAuthMiddleware` when present, otherwise
/// validates the `Authorization` header itself. Wrap in `Option` for
/// routes where authentication is optional.
impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(user_id) = req.extensions().get::<UserId>() {
            return ready(Ok(*user_id));
        }

        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        ready(authenticate_header(header).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use chrono::Duration;
    use crypto_core::jwt;

    async fn whoami(user: UserId) -> HttpResponse {
        HttpResponse::Ok().body(user.0.to_string())
    }

    async fn maybe_whoami(user: Option<UserId>) -> HttpResponse {
        match user {
            Some(user) => HttpResponse::Ok().body(user.0.to_string()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    #[::core::prelude::v1::test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            bearer_token(Some("Basic abc")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer   ")),
            Err(AuthError::MissingToken)
        ));
    }

    #[actix_web::test]
    async fn test_middleware_rejects_missing_token() {
        jwt::init_test_secret();
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(JwtAuthMiddleware)
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_middleware_accepts_valid_token() {
        jwt::init_test_secret();
        let user_id = Uuid::new_v4();
        let token = jwt::generate_access_token(user_id, "a@example.com", "alice").unwrap();

        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(JwtAuthMiddleware)
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, user_id.to_string());
    }

    #[actix_web::test]
    async fn test_expired_token_is_unauthorized() {
        jwt::init_test_secret();
        let token = jwt::generate_token_with_ttl(
            Uuid::new_v4(),
            "a@example.com",
            "alice",
            Duration::hours(-2),
        )
        .unwrap();

        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Not authorized, token expired");
    }

    #[actix_web::test]
    async fn test_optional_extractor_falls_back_to_anonymous() {
        jwt::init_test_secret();
        let app = test::init_service(App::new().route("/feed", web::get().to(maybe_whoami))).await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/feed").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "anonymous");
    }
}
