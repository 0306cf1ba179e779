use std::collections::HashMap;

use crate::request::Request;
use crate::response::Response;


/// A handler is any capability turning a request into a response.
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// A group of routes registered together, e.g. one resource's CRUD set.
pub trait RouteSet {
    fn routes(self) -> Vec<(Route, Handler)>;
}


/// Lookup key for the route table. Equality and hashing are structural:
/// two routes with the same path and method are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    path: String,
    method: String,
}

impl Route {
    pub fn new(path: &str, method: &str) -> Route {
        Route { path: path.to_string(), method: method.to_string() }
    }

    /// Method defaults to GET when omitted.
    pub fn get(path: &str) -> Route {
        Route::new(path, "GET")
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}


/// Exact-match (path, method) routing. Built once during configuration,
/// read-only while serving. No prefix or wildcard matching, and no
/// method-agnostic fallback: a GET registration does not answer POST.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<Route, Handler>,
}

impl RouteTable {
    pub fn new() -> RouteTable {
        RouteTable { routes: HashMap::new() }
    }

    /// Insert or replace; the last registration for an identical key wins.
    pub fn register(&mut self, route: Route, handler: Handler) {
        self.routes.insert(route, handler);
    }

    pub fn lookup(&self, path: &str, method: &str) -> Option<&Handler> {
        self.routes.get(&Route::new(path, method))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{Response, HTTP_200, HTTP_201};

    fn ok_handler() -> Handler {
        Box::new(|_| Response::new(HTTP_200))
    }

    #[test]
    fn lookup_is_exact_on_path_and_method() {
        let mut table = RouteTable::new();
        table.register(Route::get("/books"), ok_handler());

        assert!(table.lookup("/books", "GET").is_some());
        assert!(table.lookup("/books/", "GET").is_none());
        assert!(table.lookup("/books", "POST").is_none());
        assert!(table.lookup("/books", "HEAD").is_none());
        assert!(table.lookup("/book", "GET").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut table = RouteTable::new();
        table.register(Route::get("/x"), ok_handler());
        table.register(Route::get("/x"), Box::new(|_| Response::new(HTTP_201)));

        let handler = table.lookup("/x", "GET").unwrap();
        let request = crate::request::Request {
            http_version: "HTTP/1.1".to_string(),
            method: "GET".to_string(),
            path: "/x".to_string(),
            query_params: Default::default(),
            headers: Default::default(),
            body: None,
        };
        assert_eq!(handler(&request).status_code, HTTP_201);
    }

    #[test]
    fn route_equality_is_structural() {
        assert_eq!(Route::new("/a", "GET"), Route::get("/a"));
        assert_ne!(Route::new("/a", "GET"), Route::new("/a", "POST"));
    }
}
