use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use super::decision::Decision;
use super::engine::{AuthEngine, AuthRequest};
use super::error::GuardError;
use super::identity::Identity;
use super::resolver::SessionStore;
use crate::axum_integration::authorization_header;

/// The caller's session, placed in request extensions by an upstream layer
///
/// Only read when the engine runs the session scheme.
#[derive(Clone)]
pub struct SessionHandle(pub Arc<dyn SessionStore>);

impl SessionHandle {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self(store)
    }
}

/// Middleware layer running the [`AuthEngine`] on every request
///
/// On success the resolved [`Identity`] (if any) is inserted into request
/// extensions; rejections short-circuit with the configured response.
#[derive(Clone)]
pub struct AuthLayer {
    engine: Arc<AuthEngine>,
}

impl AuthLayer {
    pub fn new(engine: Arc<AuthEngine>) -> Self {
        Self { engine }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    engine: Arc<AuthEngine>,
}

impl<S> Service<Request> for AuthService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let not_ready_inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, not_ready_inner);
        let engine = self.engine.clone();

        Box::pin(async move {
            // Owned copies: the request body is not Sync, so no borrow of the
            // request may live across the await below.
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let authorization = authorization_header(request.headers()).map(str::to_string);
            let session = request.extensions().get::<SessionHandle>().cloned();

            let mut auth_request =
                AuthRequest::new(&method, &path).with_authorization(authorization.as_deref());
            if let Some(handle) = &session {
                auth_request = auth_request.with_session(handle.0.as_ref());
            }

            match engine.evaluate(&auth_request).await {
                Decision::Allow { identity, .. } => {
                    if let Some(identity) = identity {
                        request.extensions_mut().insert(identity);
                    }
                    inner.call(request).await
                }
                Decision::Unauthorized(rejection) | Decision::Forbidden(rejection) => {
                    Ok(rejection.into_response())
                }
            }
        })
    }
}

/// Middleware layer that requires one of the specified roles
#[derive(Clone)]
pub struct RequireRole {
    required_roles: Arc<Vec<String>>,
}

impl RequireRole {
    /// Create a new RequireRole middleware requiring at least one of the specified roles
    pub fn new(required_roles: Vec<String>) -> Self {
        Self {
            required_roles: Arc::new(required_roles),
        }
    }
}

impl<S> Layer<S> for RequireRole {
    type Service = RequireRoleMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRoleMiddleware {
            inner,
            required_roles: self.required_roles.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequireRoleMiddleware<S> {
    inner: S,
    required_roles: Arc<Vec<String>>,
}

impl<S> Service<Request> for RequireRoleMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let not_ready_inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, not_ready_inner);
        let required_roles = self.required_roles.clone();

        Box::pin(async move {
            match request.extensions().get::<Identity>() {
                Some(identity) if identity.has_any_role(required_roles.as_slice()) => {}
                Some(_) => {
                    return Ok(
                        GuardError::InsufficientRole(required_roles.to_vec()).into_response()
                    );
                }
                None => return Ok(GuardError::Unauthenticated.into_response()),
            }

            inner.call(request).await
        })
    }
}

/// Middleware layer that requires one of the specified permissions
#[derive(Clone)]
pub struct RequirePermission {
    required_permissions: Arc<Vec<String>>,
}

impl RequirePermission {
    /// Create a new RequirePermission middleware requiring at least one of the specified permissions
    pub fn new(required_permissions: Vec<String>) -> Self {
        Self {
            required_permissions: Arc::new(required_permissions),
        }
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionMiddleware {
            inner,
            required_permissions: self.required_permissions.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequirePermissionMiddleware<S> {
    inner: S,
    required_permissions: Arc<Vec<String>>,
}

impl<S> Service<Request> for RequirePermissionMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let not_ready_inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, not_ready_inner);
        let required_permissions = self.required_permissions.clone();

        Box::pin(async move {
            match request.extensions().get::<Identity>() {
                Some(identity) if identity.has_any_permission(required_permissions.as_slice()) => {}
                Some(_) => {
                    return Ok(GuardError::InsufficientPermission(
                        required_permissions.to_vec(),
                    )
                    .into_response());
                }
                None => return Ok(GuardError::Unauthenticated.into_response()),
            }

            inner.call(request).await
        })
    }
}
