//! Webtrail RPC server — the query surface, JSON over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"getTopVisitedDomains", "params":{"days":7,"limit":10}}
//! Response: {"id":1, "success":true, "data":[...], "stats":{"elapsed_ms":3,"rows":10}}
//!       or: {"id":1, "success":false, "error":"..."}

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use webtrail::app::App;
use webtrail::rpc_handler::handle_method;

/// Simple rate limiter: max requests per second across all methods.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Absolute path for the DB — prefer WEBTRAIL_DATA_DIR, fall back to the
    // executable's directory.
    let db_path = if let Ok(dir) = std::env::var("WEBTRAIL_DATA_DIR") {
        std::path::PathBuf::from(dir).join("webtrail.db")
    } else if let Ok(exe) = std::env::current_exe() {
        exe.parent()
            .unwrap_or(std::path::Path::new("."))
            .join("webtrail.db")
    } else {
        std::path::PathBuf::from("webtrail.db")
    };
    let app = Mutex::new(
        App::new(db_path.to_str().unwrap_or("webtrail.db")).expect("Failed to initialize webtrail"),
    );
    info!(db = %db_path.display(), "query surface ready");

    // Signal ready
    let ready = json!({"event":"ready","version":env!("CARGO_PKG_VERSION")});
    println!("{}", ready);
    io::stdout().flush().unwrap();

    // Max 200 requests per second to keep a runaway client from pinning the store.
    let mut rate_limiter = RateLimiter::new(200);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let err = json!({"id":null,"success":false,"error":format!("parse error: {}", e)});
                println!("{}", err);
                io::stdout().flush().unwrap();
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let response = json!({"id": id, "success": false, "error": "rate limit exceeded"});
            println!("{}", response);
            io::stdout().flush().unwrap();
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let started = Instant::now();
        let response = match handle_method(&app, method, &params) {
            Ok((data, rows)) => json!({
                "id": id,
                "success": true,
                "data": data,
                "stats": {
                    "elapsed_ms": started.elapsed().as_millis() as u64,
                    "rows": rows,
                },
            }),
            Err(err) => json!({"id": id, "success": false, "error": err}),
        };
        println!("{}", response);
        io::stdout().flush().unwrap();
    }
}
