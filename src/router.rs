use crate::error::ServerResult;
use crate::http::{Method, Request, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A handler capability for processing HTTP requests
pub type HandlerFn =
    Arc<dyn Fn(Request) -> BoxFuture<'static, ServerResult<Response>> + Send + Sync>;

/// Lookup key: lower-cased path plus method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    path: String,
    method: Method,
}

impl RouteKey {
    fn new(path: &str, method: Method) -> Self {
        Self {
            path: path.to_lowercase(),
            method,
        }
    }
}

/// A registry mapping (path, method) to handlers.
///
/// Routes are registered through the fluent builder methods before the
/// server starts; the router is then moved into the server, so the mapping
/// is immutable while serving. Lookup is exact-match on the lower-cased
/// path; a miss is reported as `None` and turned into a 404 by the caller.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<RouteKey, HandlerFn>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    /// Create a new empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the router
    pub fn route<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.routes.insert(
            RouteKey::new(path, method),
            Arc::new(move |request| handler(request).boxed()),
        );
        self
    }

    /// Add a GET route
    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.route(Method::Get, path, handler)
    }

    /// Add a POST route
    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.route(Method::Post, path, handler)
    }

    /// Add a PUT route
    pub fn put<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.route(Method::Put, path, handler)
    }

    /// Add a DELETE route
    pub fn delete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.route(Method::Delete, path, handler)
    }

    /// Find the handler registered for this path and method
    pub fn lookup(&self, path: &str, method: Method) -> Option<HandlerFn> {
        self.routes.get(&RouteKey::new(path, method)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, url: &str) -> Request {
        Request {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_router_exact_match() {
        let mut router = Router::new();
        router.get("/test", |_| async { Ok(Response::ok().with_body("ok")) });

        let handler = router.lookup("/test", Method::Get).unwrap();
        let response = handler(request(Method::Get, "/test")).await.unwrap();
        assert_eq!(response.status.code, 200);

        assert!(router.lookup("/other", Method::Get).is_none());
    }

    #[test]
    fn test_router_path_case_insensitive() {
        let mut router = Router::new();
        router.get("/test", |_| async { Ok(Response::ok()) });

        for path in ["/test", "/TEST", "/Test", "/tEsT"] {
            assert!(router.lookup(path, Method::Get).is_some());
        }
    }

    #[test]
    fn test_router_method_matching() {
        let mut router = Router::new();
        router
            .get("/api", |_| async { Ok(Response::ok()) })
            .post("/api", |_| async { Ok(Response::ok()) });

        assert!(router.lookup("/api", Method::Get).is_some());
        assert!(router.lookup("/api", Method::Post).is_some());
        assert!(router.lookup("/api", Method::Put).is_none());
        assert!(router.lookup("/api", Method::Delete).is_none());
    }
}
