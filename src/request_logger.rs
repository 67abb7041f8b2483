use std::time::Instant;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};

/// One log line per request, with latency. Server errors are promoted to
/// `warn` so they stand out at the default filter level.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed = request.local_cache(Instant::now).elapsed();
        let status = response.status();

        let level = if status.code >= 500 {
            log::Level::Warn
        } else {
            log::Level::Info
        };
        log::log!(
            level,
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            status.code,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}
