#[macro_use]
extern crate log;

use std::sync::Arc;

use clap::Parser;

use tinyserv::books::{BookRoutes, BookStore};
use tinyserv::config::Config;
use tinyserv::logger;
use tinyserv::response::{Response, HTTP_200};
use tinyserv::server::HttpServer;
use tinyserv::utils::ResultV;


const MODULE: &str = "MAIN";

/// Minimal HTTP/1.x server with a demo book catalog and static file serving
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the configurational file
    config_fn: String,
}

fn main() -> ResultV {
    let args = Args::parse();
    let cfg = Config::load(&args.config_fn)?;
    logger::init_logger(cfg.log.as_ref())?;

    let store = Arc::new(BookStore::new());

    let mut server = HttpServer::new()
        .workers(cfg.server.workers)
        .routes(BookRoutes::new(store))
        .get("/", |_| {
            Response::new(HTTP_200)
                .with_content_type("text/html")
                .with_body("<h1>Welcome to the Home Page</h1>\n")
        });

    for mount in &cfg.static_mounts {
        server = server.static_files(&mount.url_prefix, &mount.directory);
    }

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let bound = server.bind(&addr)?;

    info!("[{}] Starting tinyserv at {}", MODULE, addr);
    info!("[{}] Config loaded from {}", MODULE, args.config_fn);

    bound.serve();
    Ok(())
}
