use std::sync::{Arc, Mutex};

use serde_derive::{Deserialize, Serialize};

use crate::request::Request;
use crate::response::{Response, HTTP_200, HTTP_201, HTTP_400, HTTP_404};
use crate::router::{Handler, Route, RouteSet};


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<String>,
    pub title: String,
}

#[derive(Deserialize)]
struct CreateBookRequest {
    title: String,
}


/// In-memory catalog. The mutex is what makes it safe to share with the
/// worker pool; the server itself offers no locking of its own.
#[derive(Default)]
pub struct BookStore {
    books: Mutex<Vec<Book>>,
}

impl BookStore {
    pub fn new() -> BookStore {
        BookStore { books: Mutex::new(Vec::new()) }
    }

    pub fn list(&self) -> Vec<Book> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Book> {
        self.lock()
            .iter()
            .find(|b| b.id.as_deref() == Some(id))
            .cloned()
    }

    /// Ids are sequential strings starting at "1".
    pub fn add(&self, title: &str) -> Book {
        let mut books = self.lock();
        let next_id = books
            .last()
            .and_then(|b| b.id.as_deref())
            .and_then(|id| id.parse::<u64>().ok())
            .map(|n| n + 1)
            .unwrap_or(1);
        let book = Book { id: Some(next_id.to_string()), title: title.to_string() };
        books.push(book.clone());
        book
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Book>> {
        self.books.lock().unwrap_or_else(|e| e.into_inner())
    }
}


pub struct BookRoutes {
    store: Arc<BookStore>,
}

impl BookRoutes {
    pub fn new(store: Arc<BookStore>) -> BookRoutes {
        BookRoutes { store }
    }
}

impl RouteSet for BookRoutes {
    fn routes(self) -> Vec<(Route, Handler)> {
        let get_store = Arc::clone(&self.store);
        let post_store = self.store;
        vec![
            (
                Route::new("/books", "GET"),
                Box::new(move |r: &Request| get_books(r, &get_store)) as Handler,
            ),
            (
                Route::new("/books", "POST"),
                Box::new(move |r: &Request| post_book(r, &post_store)) as Handler,
            ),
        ]
    }
}


fn get_books(request: &Request, store: &BookStore) -> Response {
    if let Some(id) = request.query_param("id") {
        return match store.get(id) {
            Some(book) => Response::new(HTTP_200).with_json(&book),
            None => Response::new(HTTP_404).with_body("Book not found"),
        };
    }

    Response::new(HTTP_200).with_json(&store.list())
}

fn post_book(request: &Request, store: &BookStore) -> Response {
    let create: CreateBookRequest = match request.body_as() {
        Some(c) => c,
        None => return Response::new(HTTP_400).with_body("Invalid request body."),
    };

    if create.title.trim().is_empty() {
        return Response::new(HTTP_400).with_body("Title is required.");
    }

    let saved = store.add(&create.title);
    Response::new(HTTP_201).with_json(&saved)
}
