//! Access control list middleware for the dropship server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's identity from the gateway headers and checks the caller's roles against the required roles
//! for the route. If the caller has every required role, the request continues. A request without a valid identity is
//! rejected with 401 Unauthorized, and one with missing roles with 403 Forbidden.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use dropship_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{auth::AuthenticatedUser, errors::ServerError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let user = AuthenticatedUser::from_headers(req.headers()).map_err(|e| {
                log::debug!("💻️ ACL rejected request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            if let Some(missing) = required_roles.iter().find(|role| !user.has_role(**role)) {
                log::debug!("💻️ User #{} does not have the {missing} role needed for {}", user.user_id, req.path());
                return Err(ServerError::InsufficientPermissions(format!("The {missing} role is required.")).into());
            }
            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}
