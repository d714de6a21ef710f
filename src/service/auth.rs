use std::{
    future::{ready, Ready},
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use log::debug;
use uuid::Uuid;

use crate::errors::ApiError;

use self::jwt::JwtKeys;

/// Identity decoded from a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuthData {
    pub user_id: Uuid,
}

/// What the middleware learned about the request's credentials.
/// Absent from the extensions when no bearer token was sent.
#[derive(Debug, Clone)]
enum AuthOutcome {
    Authenticated(UserAuthData),
    Rejected,
}

/// Decodes `Authorization: Bearer <jwt>` on every request. It never
/// short-circuits: routes that need an identity extract [`UserAuthData`],
/// which fails with 401/403, while public routes may take
/// `Option<UserAuthData>`.
pub struct AuthMiddleware {
    pub keys: Arc<JwtKeys>,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = jwt::parse_request(&req, "Bearer") {
            let outcome = match jwt::decode_claims(&self.keys, &token) {
                Ok(claims) => AuthOutcome::Authenticated(UserAuthData {
                    user_id: claims.user_id,
                }),
                Err(err) => {
                    debug!("rejected bearer token on {}: {}", req.path(), err);
                    AuthOutcome::Rejected
                }
            };
            req.extensions_mut().insert(outcome);
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

impl FromRequest for UserAuthData {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let outcome = req.extensions().get::<AuthOutcome>().cloned();
        ready(match outcome {
            Some(AuthOutcome::Authenticated(data)) => Ok(data),
            Some(AuthOutcome::Rejected) => Err(ApiError::forbidden("Invalid or expired token")),
            None => Err(ApiError::Unauthorized("Access token missing".into())),
        })
    }
}

pub mod jwt {
    use std::time::Duration;

    use actix_web::dev::ServiceRequest;
    use chrono::Utc;
    use jsonwebtoken::{
        decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation,
    };
    use uuid::Uuid;

    use crate::dto::Claims;

    /// HS256 keys derived from the shared `JWT_SECRET`.
    pub struct JwtKeys {
        encoding: EncodingKey,
        decoding: DecodingKey,
        ttl: Duration,
    }

    impl JwtKeys {
        pub fn new(secret: &str, ttl: Duration) -> Self {
            Self {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl,
            }
        }
    }

    pub fn create(keys: &JwtKeys, user_id: &Uuid, username: &str) -> Result<String, Error> {
        let iat = Utc::now().timestamp() as usize;
        let claims = Claims::new(user_id, username, iat, iat + keys.ttl.as_secs() as usize);
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
    }

    /// Verifies signature and expiry.
    pub fn decode_claims(keys: &JwtKeys, token: &str) -> Result<Claims, Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &keys.decoding, &validation).map(|data| data.claims)
    }

    /// Token after `prefix` in the `Authorization` header; `None` when
    /// the header is missing, malformed or carries an empty token.
    pub fn parse_request(req: &ServiceRequest, prefix: &str) -> Option<String> {
        let auth_value = req.headers().get("Authorization")?.to_str().ok()?;
        let token = auth_value.strip_prefix(prefix)?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use actix_web::test::TestRequest;

        fn keys() -> JwtKeys {
            JwtKeys::new("test-secret", Duration::from_secs(3600))
        }

        #[test]
        fn token_round_trips_identity() {
            let keys = keys();
            let id = Uuid::new_v4();
            let token = create(&keys, &id, "alice").unwrap();

            let claims = decode_claims(&keys, &token).unwrap();
            assert_eq!(claims.user_id, id);
            assert_eq!(claims.username, "alice");
            assert_eq!(claims.exp - claims.iat, 3600);
        }

        #[test]
        fn foreign_signature_is_rejected() {
            let token = create(&keys(), &Uuid::new_v4(), "alice").unwrap();
            let other = JwtKeys::new("another-secret", Duration::from_secs(3600));
            assert!(decode_claims(&other, &token).is_err());
        }

        #[test]
        fn expired_token_is_rejected() {
            let keys = keys();
            let past = (Utc::now().timestamp() - 7200) as usize;
            let claims = Claims::new(&Uuid::new_v4(), "alice", past, past + 60);
            let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
            assert!(decode_claims(&keys, &token).is_err());
        }

        #[test]
        fn bearer_prefix_is_required() {
            let req = TestRequest::default()
                .insert_header(("Authorization", "Bearer abc.def.ghi"))
                .to_srv_request();
            assert_eq!(parse_request(&req, "Bearer").as_deref(), Some("abc.def.ghi"));

            let req = TestRequest::default()
                .insert_header(("Authorization", "Bearer "))
                .to_srv_request();
            assert!(parse_request(&req, "Bearer").is_none());

            let req = TestRequest::default()
                .insert_header(("Authorization", "Basic Zm9vOmJhcg=="))
                .to_srv_request();
            assert!(parse_request(&req, "Bearer").is_none());

            assert!(parse_request(&TestRequest::default().to_srv_request(), "Bearer").is_none());
        }
    }
}
