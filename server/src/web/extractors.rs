// storefront/src/web/extractors.rs

//! Principal extraction.
//!
//! Authentication happens upstream; the service only turns the already-authenticated identity
//! into a `Principal` through the injected `PrincipalResolver`.

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  User,
  Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
  pub user_id: i64,
  pub role: Role,
}

pub trait PrincipalResolver: Send + Sync {
  /// `AppError::Auth` when the request carries no valid identity.
  fn resolve(&self, req: &HttpRequest) -> Result<Principal, AppError>;
}

/// Trusts the identity headers set by the authenticating gateway.
#[derive(Debug, Clone, Default)]
pub struct GatewayPrincipalResolver;

impl GatewayPrincipalResolver {
  pub const USER_ID_HEADER: &'static str = "X-User-ID";
  pub const ROLE_HEADER: &'static str = "X-User-Role";
}

impl PrincipalResolver for GatewayPrincipalResolver {
  fn resolve(&self, req: &HttpRequest) -> Result<Principal, AppError> {
    let user_id = req
      .headers()
      .get(Self::USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
      .filter(|id| *id > 0)
      .ok_or_else(|| AppError::Auth(format!("Missing or invalid {} header", Self::USER_ID_HEADER)))?;

    let role = match req.headers().get(Self::ROLE_HEADER).map(|v| v.to_str()) {
      None => Role::User,
      Some(Ok(raw)) if raw.eq_ignore_ascii_case("admin") => Role::Admin,
      Some(Ok(raw)) if raw.eq_ignore_ascii_case("user") => Role::User,
      Some(_) => return Err(AppError::Auth(format!("Invalid {} header", Self::ROLE_HEADER))),
    };
    Ok(Principal { user_id, role })
  }
}

fn principal_of(req: &HttpRequest) -> Result<Principal, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))?;
  state.principals.resolve(req).inspect_err(|e| {
    warn!(path = %req.path(), error = %e, "Request rejected: no valid principal.");
  })
}

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: i64,
  pub role: Role,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(principal_of(req).map(|p| AuthenticatedUser {
      user_id: p.user_id,
      role: p.role,
    }))
  }
}

/// An authenticated caller with the admin role; others get 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
  pub user_id: i64,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = principal_of(req).and_then(|p| match p.role {
      Role::Admin => Ok(AdminUser { user_id: p.user_id }),
      Role::User => {
        warn!(user_id = p.user_id, path = %req.path(), "Admin route requested by non-admin.");
        Err(AppError::Forbidden("Admin access required".to_string()))
      }
    });
    ready(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  fn resolve(req: TestRequest) -> Result<Principal, AppError> {
    GatewayPrincipalResolver.resolve(&req.to_http_request())
  }

  #[test]
  fn reads_identity_headers() {
    let user = resolve(TestRequest::default().insert_header(("X-User-ID", "12"))).unwrap();
    assert_eq!(user, Principal { user_id: 12, role: Role::User });

    let admin = resolve(
      TestRequest::default()
        .insert_header(("X-User-ID", "3"))
        .insert_header(("X-User-Role", "Admin")),
    )
    .unwrap();
    assert_eq!(admin.role, Role::Admin);
  }

  #[test]
  fn rejects_missing_or_malformed_identity() {
    assert!(matches!(resolve(TestRequest::default()), Err(AppError::Auth(_))));
    assert!(matches!(
      resolve(TestRequest::default().insert_header(("X-User-ID", "abc"))),
      Err(AppError::Auth(_))
    ));
    assert!(matches!(
      resolve(TestRequest::default().insert_header(("X-User-ID", "0"))),
      Err(AppError::Auth(_))
    ));
    assert!(matches!(
      resolve(
        TestRequest::default()
          .insert_header(("X-User-ID", "5"))
          .insert_header(("X-User-Role", "root"))
      ),
      Err(AppError::Auth(_))
    ));
  }
}
