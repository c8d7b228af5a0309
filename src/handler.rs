use crate::{request::Request, router::Table, RouterBuilder};
use anyhow::Result;
use futures::future::BoxFuture;
use hyper::{Body, Response, StatusCode};
use std::{
	fmt::{self, Debug, Formatter},
	future::Future,
	sync::Arc,
};

/// The future every handler is erased to.
pub type HandlerFuture = BoxFuture<'static, Result<Response<Body>>>;

/// Conversion of a handler's return value into a response.
pub trait IntoResponse {
	fn into_response(self) -> Response<Body>;
}

impl IntoResponse for Response<Body> {
	fn into_response(self) -> Response<Body> {
		self
	}
}

/// An empty `200 OK`.
impl IntoResponse for () {
	fn into_response(self) -> Response<Body> {
		Response::new(Body::empty())
	}
}

impl IntoResponse for String {
	fn into_response(self) -> Response<Body> {
		Response::new(self.into())
	}
}

impl IntoResponse for &'static str {
	fn into_response(self) -> Response<Body> {
		Response::new(self.into())
	}
}

impl IntoResponse for Vec<u8> {
	fn into_response(self) -> Response<Body> {
		Response::new(self.into())
	}
}

impl IntoResponse for StatusCode {
	fn into_response(self) -> Response<Body> {
		let mut res = Response::new(Body::empty());
		*res.status_mut() = self;
		res
	}
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
	fn into_response(self) -> Response<Body> {
		let mut res = self.1.into_response();
		*res.status_mut() = self.0;
		res
	}
}

/// A handler that always produces the response.
pub trait Endpoint: Send + Sync + 'static {
	fn call(&self, req: Request) -> HandlerFuture;
}

impl<F, Fut, R> Endpoint for F
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<R>> + Send + 'static,
	R: IntoResponse,
{
	fn call(&self, req: Request) -> HandlerFuture {
		let fut = self(req);
		Box::pin(async move { fut.await.map(IntoResponse::into_response) })
	}
}

/// A handler that may pass the request on to the routes after it.
pub trait Middleware: Send + Sync + 'static {
	fn call(&self, req: Request, next: Next) -> HandlerFuture;
}

impl<F, Fut, R> Middleware for F
where
	F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<R>> + Send + 'static,
	R: IntoResponse,
{
	fn call(&self, req: Request, next: Next) -> HandlerFuture {
		let fut = self(req, next);
		Box::pin(async move { fut.await.map(IntoResponse::into_response) })
	}
}

/// The continuation handed to a [`Middleware`].
///
/// Dropping it without calling either method ends the scan; the middleware's
/// own return value becomes the response.
pub struct Next {
	table: Arc<Table>,
	index: usize,
	request: Request,
}

impl Next {
	pub(crate) fn new(table: Arc<Table>, index: usize, request: Request) -> Self {
		Self {
			table,
			index,
			request,
		}
	}

	/// Resumes routing with the route after the current one and resolves to
	/// whatever that produces, the not-found response included.
	pub fn run(self) -> HandlerFuture {
		self.table.scan(self.index, self.request)
	}

	/// Aborts the request. The error leaves the router unchanged.
	pub fn fail<E: Into<anyhow::Error>>(self, err: E) -> Result<Response<Body>> {
		Err(err.into())
	}

	/// `run` when `err` is `None`, `fail` otherwise.
	pub async fn call(self, err: Option<anyhow::Error>) -> Result<Response<Body>> {
		match err {
			Some(err) => self.fail(err),
			None => self.run().await,
		}
	}
}

impl Debug for Next {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Next")
			.field("index", &self.index)
			.field("request", &self.request)
			.finish()
	}
}

/// Anything that can be registered on a router.
#[derive(Clone)]
pub enum Handler {
	Endpoint(Arc<dyn Endpoint>),
	Middleware(Arc<dyn Middleware>),
	/// A nested router, flattened into the parent on registration.
	Router(RouterBuilder),
}

impl Handler {
	pub fn endpoint<F, Fut, R>(endpoint: F) -> Self
	where
		F: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R>> + Send + 'static,
		R: IntoResponse,
	{
		Handler::Endpoint(Arc::new(endpoint))
	}

	pub fn middleware<F, Fut, R>(middleware: F) -> Self
	where
		F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R>> + Send + 'static,
		R: IntoResponse,
	{
		Handler::Middleware(Arc::new(middleware))
	}
}

impl From<RouterBuilder> for Handler {
	fn from(router: RouterBuilder) -> Self {
		Handler::Router(router)
	}
}

impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Handler::Endpoint(_) => f.write_str("Endpoint"),
			Handler::Middleware(_) => f.write_str("Middleware"),
			Handler::Router(router) => f.debug_tuple("Router").field(router).finish(),
		}
	}
}

#[cfg(test)]
mod test {
	use super::IntoResponse;
	use hyper::{body, StatusCode};

	#[tokio::test]
	async fn converts_return_values() {
		let res = "hello".into_response();
		assert_eq!(res.status(), StatusCode::OK);
		assert_eq!(body::to_bytes(res.into_body()).await.unwrap(), "hello");

		let res = ().into_response();
		assert_eq!(res.status(), StatusCode::OK);
		assert!(body::to_bytes(res.into_body()).await.unwrap().is_empty());

		let res = (StatusCode::CREATED, String::from("made")).into_response();
		assert_eq!(res.status(), StatusCode::CREATED);
		assert_eq!(body::to_bytes(res.into_body()).await.unwrap(), "made");

		assert_eq!(StatusCode::NO_CONTENT.into_response().status(), StatusCode::NO_CONTENT);
	}
}
