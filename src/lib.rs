#[macro_use]
extern crate log;

pub mod books;
pub mod config;
pub mod context;
pub mod logger;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;
pub mod utils;

pub use request::Request;
pub use response::Response;
pub use router::{Handler, Route, RouteSet, RouteTable};
pub use server::HttpServer;
