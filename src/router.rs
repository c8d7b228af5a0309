use crate::{
	handler::{Endpoint, Handler, HandlerFuture, IntoResponse, Middleware, Next},
	pattern::{MatchOptions, Matcher},
	request::Request,
	Error,
};
use anyhow::Result;
use hyper::{body::Body, http::Method, Response, StatusCode};
use std::{
	fmt::{self, Debug, Formatter},
	future::Future,
	sync::Arc,
};
use tracing::{debug, debug_span, trace, Instrument};

pub type InternalErrorHandler = fn(e: anyhow::Error) -> Response<Body>;
fn default_error_handler(e: anyhow::Error) -> Response<Body> {
	(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

pub type NotFoundHandler = fn(req: &Request) -> Response<Body>;
fn default_not_found_handler(_req: &Request) -> Response<Body> {
	StatusCode::NOT_FOUND.into_response()
}

#[derive(Clone)]
enum Target {
	Endpoint(Arc<dyn Endpoint>),
	Middleware(Arc<dyn Middleware>),
}

impl Debug for Target {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Target::Endpoint(_) => f.write_str("Endpoint"),
			Target::Middleware(_) => f.write_str("Middleware"),
		}
	}
}

/// A route as registered, before its pattern is compiled.
#[derive(Debug, Clone)]
struct Registration {
	method: Option<Method>,
	pattern: String,
	end: bool,
	base: Option<String>,
	target: Target,
}

pub(crate) struct Route {
	method: Option<Method>,
	base: Option<Arc<str>>,
	target: Target,
	matcher: Matcher,
}

impl Debug for Route {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("method", &self.method)
			.field("pattern", &self.matcher.pattern())
			.field("base", &self.base)
			.field("target", &self.target)
			.finish()
	}
}

macro_rules! methods {
	($($name:ident => $method:ident),* $(,)?) => {
		$(
			#[doc = concat!("Registers an endpoint for `", stringify!($method), "` requests to `pattern`.")]
			pub fn $name<F, Fut, R>(&mut self, pattern: &str, endpoint: F) -> &mut Self
			where
				F: Fn(Request) -> Fut + Send + Sync + 'static,
				Fut: Future<Output = Result<R>> + Send + 'static,
				R: IntoResponse,
			{
				self.register(Some(Method::$method), pattern, Handler::endpoint(endpoint))
			}
		)*
	};
}

/// Collects routes in registration order.
///
/// Matching options and the error handlers are read when [`build`] compiles
/// the table, so they apply to every route, mounted ones included.
///
/// [`build`]: RouterBuilder::build
#[derive(Debug, Clone)]
pub struct RouterBuilder {
	routes: Vec<Registration>,
	pub internal_error_handler: Option<InternalErrorHandler>,
	pub not_found_handler: Option<NotFoundHandler>,
	pub case_sensitive: bool,
	pub strict: bool,
}

impl Default for RouterBuilder {
	fn default() -> Self {
		Self {
			routes: vec![],
			internal_error_handler: None,
			not_found_handler: None,
			case_sensitive: false,
			strict: false,
		}
	}
}

impl RouterBuilder {
	/// Appends a route matching the whole path against `pattern`.
	///
	/// `method: None` matches any method. A [`Handler::Router`] is flattened
	/// as if mounted at `pattern`, with `method` narrowing its routes that have
	/// none of their own.
	pub fn register(&mut self, method: Option<Method>, pattern: &str, handler: impl Into<Handler>) -> &mut Self {
		self.add(method, pattern, handler.into(), true)
	}

	/// Mounts `handler` under `prefix`; the path only has to start with it.
	///
	/// Mounting a router copies its routes into this one with `prefix` joined
	/// onto their patterns and recorded as their base path. The mounted router
	/// is consumed, so nothing can be added to it afterwards; mounting a clone
	/// elsewhere mounts an independent copy.
	pub fn mount(&mut self, prefix: &str, handler: impl Into<Handler>) -> &mut Self {
		self.add(None, prefix, handler.into(), false)
	}

	/// Adds middleware that sees every request reaching this point of the table.
	pub fn middleware<F, Fut, R>(&mut self, middleware: F) -> &mut Self
	where
		F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R>> + Send + 'static,
		R: IntoResponse,
	{
		self.mount("/", Handler::middleware(middleware))
	}

	methods! {
		get => GET,
		head => HEAD,
		post => POST,
		put => PUT,
		delete => DELETE,
		connect => CONNECT,
		options => OPTIONS,
		trace => TRACE,
		patch => PATCH,
	}

	/// The registered routes as `(method, pattern)`, in matching order.
	pub fn routes(&self) -> impl Iterator<Item = (Option<&Method>, &str)> {
		self.routes
			.iter()
			.map(|route| (route.method.as_ref(), route.pattern.as_str()))
	}

	fn add(&mut self, method: Option<Method>, pattern: &str, handler: Handler, end: bool) -> &mut Self {
		let target = match handler {
			Handler::Endpoint(endpoint) => Target::Endpoint(endpoint),
			Handler::Middleware(middleware) => Target::Middleware(middleware),
			Handler::Router(router) => {
				let before = self.routes.len();
				self.routes.extend(router.into_routes(pattern, method));
				debug!(prefix = pattern, routes = self.routes.len() - before, "mounted router");
				return self;
			}
		};

		self.routes.push(Registration {
			method,
			pattern: pattern.to_owned(),
			end,
			base: None,
			target,
		});
		self
	}

	fn into_routes(self, prefix: &str, method: Option<Method>) -> impl Iterator<Item = Registration> {
		let prefix = prefix.to_owned();
		self.routes.into_iter().map(move |route| Registration {
			method: route.method.or_else(|| method.clone()),
			pattern: join(&prefix, &route.pattern),
			end: route.end,
			base: Some(join_base(&prefix, route.base.as_deref())),
			target: route.target,
		})
	}

	/// Compiles every pattern and freezes the table.
	pub fn build(self) -> Result<Router, Error> {
		let options = MatchOptions {
			case_sensitive: self.case_sensitive,
			strict: self.strict,
			end: true,
		};

		let routes = self
			.routes
			.into_iter()
			.map(|route| -> Result<Route, Error> {
				let matcher = Matcher::compile(&route.pattern, MatchOptions { end: route.end, ..options })?;
				Ok(Route {
					method: route.method,
					base: route.base.map(Arc::from),
					target: route.target,
					matcher,
				})
			})
			.collect::<Result<Vec<_>, Error>>()?;

		Ok(Router {
			table: Arc::new(Table {
				routes,
				not_found: self.not_found_handler.unwrap_or(default_not_found_handler),
			}),
			internal_error: self.internal_error_handler.unwrap_or(default_error_handler),
		})
	}
}

fn join(prefix: &str, pattern: &str) -> String {
	let prefix = prefix.trim_end_matches('/');
	match pattern.trim_start_matches('/') {
		"" if prefix.is_empty() => "/".to_owned(),
		"" => prefix.to_owned(),
		rest => format!("{}/{}", prefix, rest),
	}
}

fn join_base(prefix: &str, base: Option<&str>) -> String {
	let base = base.filter(|base| *base != "/").unwrap_or_default();
	let joined = format!("{}{}", prefix.trim_end_matches('/'), base);
	if joined.is_empty() {
		"/".to_owned()
	} else {
		joined
	}
}

#[derive(Debug)]
pub(crate) struct Table {
	routes: Vec<Route>,
	not_found: NotFoundHandler,
}

impl Table {
	/// Walks the routes from `start` and runs the first one that matches.
	pub(crate) fn scan(self: Arc<Self>, start: usize, req: Request) -> HandlerFuture {
		Box::pin(async move {
			for (index, route) in self.routes.iter().enumerate().skip(start) {
				if route.method.as_ref().map_or(false, |method| method != req.method()) {
					continue;
				}

				let params = match route.matcher.matches(req.path()) {
					Some(params) => params,
					None => continue,
				};

				trace!(index, pattern = route.matcher.pattern(), "route matched");
				req.set_params(params);
				req.set_base_path(route.base.clone());

				return match &route.target {
					Target::Endpoint(endpoint) => endpoint.call(req).await,
					Target::Middleware(middleware) => {
						let next = Next::new(Arc::clone(&self), index + 1, req.clone());
						middleware.call(req, next).await
					}
				};
			}

			debug!("no route matched");
			Ok((self.not_found)(&req))
		})
	}
}

/// An immutable, cheaply cloned route table.
#[derive(Debug, Clone)]
pub struct Router {
	table: Arc<Table>,
	internal_error: InternalErrorHandler,
}

impl Router {
	pub fn builder() -> RouterBuilder {
		RouterBuilder::default()
	}

	/// Routes `req` to the first matching route.
	///
	/// Unmatched requests resolve to the not-found response. Errors from
	/// handlers, including [`Next::fail`], are returned as-is.
	pub fn dispatch(&self, req: impl Into<Request>) -> HandlerFuture {
		let req = req.into();
		let span = debug_span!("dispatch", id = %req.id(), method = %req.method(), path = req.path());
		Box::pin(Arc::clone(&self.table).scan(0, req).instrument(span))
	}

	pub(crate) fn internal_error(&self) -> InternalErrorHandler {
		self.internal_error
	}

	pub fn len(&self) -> usize {
		self.table.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.table.routes.is_empty()
	}
}
