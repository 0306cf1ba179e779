use std::fs;

use crate::response::{Response, HTTP_200, HTTP_404};


const MODULE: &str = "STATIC";


/// Static file serving: an ordered list of (URL prefix → base directory)
/// mounts. Mounts are matched in registration order and the first match
/// wins; overlapping mounts are allowed and not detected, so the earliest
/// registration shadows later ones.
#[derive(Default)]
pub struct StaticFiles {
    mounts: Vec<(String, String)>,
}

impl StaticFiles {
    pub fn new() -> StaticFiles {
        StaticFiles { mounts: Vec::new() }
    }

    /// Register a mount. Both the URL prefix and the directory are
    /// normalized to end with a slash.
    pub fn mount(&mut self, url_prefix: &str, directory: &str) {
        let prefix = ensure_trailing_slash(url_prefix);
        let dir = ensure_trailing_slash(directory);
        self.mounts.push((prefix, dir));
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Map a request path to a filesystem path through the first matching
    /// mount. A resolved path ending in `/` gets `index.html` appended.
    /// Returns `None` when no mount matches.
    pub fn resolve_path(&self, request_path: &str) -> Option<String> {
        for (prefix, dir) in &self.mounts {
            let prefix_no_slash = &prefix[..prefix.len() - 1];
            let matches_root = request_path == prefix_no_slash;
            let matches_prefix = request_path.starts_with(prefix.as_str());
            if matches_root || matches_prefix {
                let relative = if matches_prefix {
                    &request_path[prefix.len()..]
                } else {
                    ""
                };
                let mut file_path = format!("{}{}", dir, relative);
                if file_path.ends_with('/') {
                    file_path.push_str("index.html");
                }
                return Some(file_path);
            }
        }
        None
    }

    /// Serve a request path from the mounts, or `None` when no mount
    /// matches. A matching mount whose file is missing yields a 404.
    pub fn serve(&self, request_path: &str) -> Option<Response> {
        let file_path = self.resolve_path(request_path)?;
        match fs::read(&file_path) {
            Ok(bytes) => {
                debug!("[{}] Serving {} from {}", MODULE, request_path, file_path);
                Some(
                    Response::new(HTTP_200)
                        .with_content_type(content_type_for(&file_path))
                        .with_body_bytes(bytes),
                )
            }
            Err(e) => {
                info!("[{}] File {} not readable: {}", MODULE, file_path, e);
                Some(Response::new(HTTP_404).with_body("File Not Found"))
            }
        }
    }
}

fn ensure_trailing_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{}/", s)
    }
}

/// Content type from the file extension; anything unknown is text/plain.
pub fn content_type_for(file_path: &str) -> &'static str {
    let extension = file_path
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "text/plain",
    }
}
