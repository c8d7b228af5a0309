//! A first-match HTTP router with request-scoped hooks, built on hyper.
//!
//! ```no_run
//! use switchyard::{params, query, Request, RouterBuilder, Server};
//!
//! async fn hello(req: Request) -> anyhow::Result<String> {
//! 	let name = params(&req).and_then(|p| p.get("name").map(str::to_owned));
//! 	let greeting = query(&req).get("greeting").unwrap_or("Hello").to_owned();
//! 	Ok(format!("{} {}", greeting, name.unwrap_or_default()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! 	let addr = ([127, 0, 0, 1], 3000).into();
//!
//! 	let mut api = RouterBuilder::default();
//! 	api.get("/:name", hello);
//!
//! 	let mut app = RouterBuilder::default();
//! 	app.middleware(|req, next| async move {
//! 		println!("{} {}", req.method(), req.path());
//! 		next.run().await
//! 	})
//! 	.get("/", |_req| async { anyhow::Ok("home") })
//! 	.mount("/api", api);
//!
//! 	let server = Server::bind(&addr).serve(app.build()?);
//! 	println!("Listening on http://{}", addr);
//!
//! 	server.await?;
//! 	Ok(())
//! }
//! ```
//!
//! Routes are tried in registration order and the first one whose method and
//! pattern match handles the request; later routes are never consulted, even
//! when they are more specific. Patterns name dynamic segments with a leading
//! `:` and the captured values are available through [`params`]. Requests
//! nothing matches get the not-found response.
//!
//! Middleware receives a [`Next`]: `next.run()` continues with the following
//! routes, `next.fail(err)` aborts the request. Handler errors are returned
//! from [`Router::dispatch`] untouched; served through hyper they are turned
//! into responses by the router's internal error handler.
//!
//! Mounting a router copies its routes under the mount prefix at the time of
//! the call. [`base_path`] reports the prefix a matched route was mounted
//! under.
//!
//! [`Hook`] and [`AsyncHook`] memoize per-request values: the computation runs
//! at most once per request and the value is dropped with the request.

/// Errors raised while building a router.
pub mod error;

/// Handler traits, the tagged handler variant and the middleware continuation.
pub mod handler;

/// Request-scoped memoization and the built-in accessors.
pub mod hook;

mod http;

/// Compiled path patterns.
pub mod pattern;

/// The request handle shared by handlers and hooks.
pub mod request;

/// Contains the core structs of the router.
///
/// Use the RouterBuilder to create a Router: pass the router to hyper as the service.
pub mod router;

pub use error::Error;
pub use handler::{Endpoint, Handler, HandlerFuture, IntoResponse, Middleware, Next};
pub use hook::{base_path, params, query, AsyncHook, Hook, Query};
pub use http::RouteHandler;
pub use pattern::{MatchOptions, Matcher, Params};
pub use request::{Request, RequestId};
pub use router::{InternalErrorHandler, NotFoundHandler, Router, RouterBuilder};

pub use hyper;
pub use hyper::http::response::Builder as ResponseBuilder;
pub use hyper::{Body, Method, Server, StatusCode};
