use crate::{router::InternalErrorHandler, Router};
use hyper::{body::Body, service::Service, Response};
use std::{
	convert::Infallible,
	future::{ready, Future, Ready},
	pin::Pin,
	task::{Context, Poll},
};
use tracing::error;

impl<T> Service<T> for Router {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(RouteHandler {
			internal_error: self.internal_error(),
			router: self.clone(),
		}))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
///
/// Failed requests are logged and answered by the router's internal error
/// handler.
#[derive(Debug, Clone)]
pub struct RouteHandler {
	router: Router,
	internal_error: InternalErrorHandler,
}

impl Service<hyper::Request<Body>> for RouteHandler {
	type Response = Response<Body>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
		let fut = self.router.dispatch(req);
		let internal_error = self.internal_error;
		Box::pin(async move {
			Ok(fut.await.unwrap_or_else(|e| {
				error!(error = %e, "request failed");
				internal_error(e)
			}))
		})
	}
}

#[cfg(test)]
mod test {
	use crate::{Request, RouterBuilder};
	use hyper::{body, service::Service, Body, StatusCode};

	#[tokio::test]
	async fn maps_failures_to_internal_errors() {
		let mut builder = RouterBuilder::default();
		builder.get("/boom", |_req: Request| async { Err::<(), _>(anyhow::anyhow!("boom")) });
		let mut router = builder.build().unwrap();

		let mut handler = router.call(()).await.unwrap();
		let res = handler
			.call(hyper::Request::get("/boom").body(Body::empty()).unwrap())
			.await
			.unwrap();

		assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body::to_bytes(res.into_body()).await.unwrap(), "boom");
	}

	#[tokio::test]
	async fn uses_configured_handlers() {
		let mut builder = RouterBuilder::default();
		builder.not_found_handler = Some(|_req| {
			let mut res = hyper::Response::new(Body::from("nothing here"));
			*res.status_mut() = StatusCode::NOT_FOUND;
			res
		});
		builder.internal_error_handler = Some(|_e| hyper::Response::new(Body::from("sorry")));
		builder.get("/boom", |_req: Request| async { Err::<(), _>(anyhow::anyhow!("boom")) });
		let mut router = builder.build().unwrap();
		let mut handler = router.call(()).await.unwrap();

		let res = handler
			.call(hyper::Request::get("/missing").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(res.status(), StatusCode::NOT_FOUND);
		assert_eq!(body::to_bytes(res.into_body()).await.unwrap(), "nothing here");

		let res = handler
			.call(hyper::Request::get("/boom").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(body::to_bytes(res.into_body()).await.unwrap(), "sorry");
	}
}
