//! Loopback HTTP file server.
//!
//! Serves a fixed set of paths on `127.0.0.1` through `tiny_http` so that
//! download and install code can be exercised without network access.
//! Unknown paths answer `404`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Route {
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

/// A running file server. The serving thread stops when this is dropped.
#[derive(Debug)]
pub struct FileServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    total: Arc<AtomicUsize>,
    stop: mpsc::Sender<()>,
}

/// Builder collecting routes before the server starts.
#[derive(Debug, Default)]
pub struct FileServerBuilder {
    routes: HashMap<String, Route>,
}

impl FileServerBuilder {
    /// Serve `body` at `path` (which must start with `/`).
    pub fn file(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                body: body.into(),
                headers: Vec::new(),
            },
        );
        self
    }

    /// Serve `body` at `path` with an extra response header.
    pub fn file_with_header(
        mut self,
        path: &str,
        body: impl Into<Vec<u8>>,
        header: (&str, &str),
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                body: body.into(),
                headers: vec![(header.0.to_string(), header.1.to_string())],
            },
        );
        self
    }

    /// Bind to an ephemeral loopback port and start serving.
    ///
    /// # Panics
    /// Panics if the server cannot be started.
    pub fn start(self) -> FileServer {
        let server = tiny_http::Server::http("127.0.0.1:0")
            .unwrap_or_else(|e| panic!("FileServer: failed to start: {e}"));
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or_else(|| panic!("FileServer: not bound to an IP address"));

        let routes = self.routes;
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let total = Arc::new(AtomicUsize::new(0));
        let (stop, stop_rx) = mpsc::channel::<()>();

        let thread_hits = Arc::clone(&hits);
        let thread_total = Arc::clone(&total);
        thread::spawn(move || {
            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }
                match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(request)) => {
                        respond(request, &routes, &thread_hits, &thread_total);
                    }
                    Ok(None) => {}
                    Err(_) => break,
                }
            }
        });

        FileServer {
            base_url: format!("http://127.0.0.1:{port}"),
            hits,
            total,
            stop,
        }
    }
}

fn respond(
    request: tiny_http::Request,
    routes: &HashMap<String, Route>,
    hits: &Mutex<HashMap<String, usize>>,
    total: &AtomicUsize,
) {
    // Query strings are not part of a route
    let path = request
        .url()
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    total.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut hits) = hits.lock() {
        *hits.entry(path.clone()).or_insert(0) += 1;
    }

    let result = match routes.get(&path) {
        Some(route) => {
            let mut response = tiny_http::Response::from_data(route.body.clone());
            for (name, value) in &route.headers {
                if let Ok(header) = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes())
                {
                    response.add_header(header);
                }
            }
            request.respond(response)
        }
        None => request.respond(tiny_http::Response::empty(404)),
    };
    let _ = result;
}

impl FileServer {
    pub fn builder() -> FileServerBuilder {
        FileServerBuilder::default()
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|hits| hits.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of requests received in total.
    pub fn total_hits(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        let _ = self.stop.send(());
    }
}
