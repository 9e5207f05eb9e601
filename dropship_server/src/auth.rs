//! Caller identity.
//!
//! The server sits behind a gateway that has already authenticated the caller. The gateway forwards the caller's
//! identity in two headers, which are trusted as-is:
//! * `x-dsp-user-id`: the caller's user id, a positive integer.
//! * `x-dsp-roles`: a comma separated list of roles (`dropshipper`, `supplier`, `manager`). May be empty.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use dropship_engine::db_types::Role;
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "x-dsp-user-id";
pub const ROLES_HEADER: &str = "x-dsp-roles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .ok_or(AuthError::MissingHeader(USER_ID_HEADER))?
            .to_str()
            .map_err(|e| AuthError::InvalidHeader { header: USER_ID_HEADER, reason: e.to_string() })?
            .trim()
            .parse::<i64>()
            .map_err(|e| AuthError::InvalidHeader { header: USER_ID_HEADER, reason: e.to_string() })?;
        if user_id <= 0 {
            return Err(AuthError::InvalidHeader {
                header: USER_ID_HEADER,
                reason: format!("{user_id} is not a valid user id"),
            });
        }
        let roles = match headers.get(ROLES_HEADER) {
            None => Vec::new(),
            Some(v) => {
                let s = v
                    .to_str()
                    .map_err(|e| AuthError::InvalidHeader { header: ROLES_HEADER, reason: e.to_string() })?;
                s.split(',')
                    .filter(|r| !r.trim().is_empty())
                    .map(|r| r.parse::<Role>())
                    .collect::<Result<Vec<Role>, _>>()
                    .map_err(|e| AuthError::InvalidHeader { header: ROLES_HEADER, reason: e.to_string() })?
            },
        };
        Ok(Self { user_id, roles })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already parsed by the ACL middleware on role-guarded routes
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            return ready(Ok(user.clone()));
        }
        let result = AuthenticatedUser::from_headers(req.headers()).map_err(|e| {
            debug!("💻️ Rejecting unauthenticated request to {}. {e}", req.path());
            ServerError::AuthenticationError(e)
        });
        ready(result)
    }
}
