use crate::{hook::Slots, pattern::Params};
use hyper::{
	http::{request::Parts, Extensions, HeaderMap, Method, Uri, Version},
	Body,
};
use std::{
	fmt::{self, Debug, Display, Formatter},
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, Mutex, MutexGuard, PoisonError,
	},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
	fn next() -> Self {
		Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for RequestId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A handle to an incoming request.
///
/// Clones share one identity. Everything the router and hooks associate with
/// the request lives behind the handle and is released with the last clone;
/// no hook keeps a request alive.
#[derive(Clone)]
pub struct Request {
	inner: Arc<Inner>,
}

struct Inner {
	id: RequestId,
	head: Parts,
	body: Mutex<Option<Body>>,
	params: Mutex<Option<Arc<Params>>>,
	base_path: Mutex<Option<Arc<str>>>,
	hooks: Mutex<Slots>,
}

impl Request {
	pub fn new(req: hyper::Request<Body>) -> Self {
		let (head, body) = req.into_parts();
		Self {
			inner: Arc::new(Inner {
				id: RequestId::next(),
				head,
				body: Mutex::new(Some(body)),
				params: Mutex::default(),
				base_path: Mutex::default(),
				hooks: Mutex::default(),
			}),
		}
	}

	pub fn id(&self) -> RequestId {
		self.inner.id
	}

	pub fn method(&self) -> &Method {
		&self.inner.head.method
	}

	pub fn uri(&self) -> &Uri {
		&self.inner.head.uri
	}

	pub fn path(&self) -> &str {
		self.inner.head.uri.path()
	}

	pub fn version(&self) -> Version {
		self.inner.head.version
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.inner.head.headers
	}

	pub fn extensions(&self) -> &Extensions {
		&self.inner.head.extensions
	}

	/// Takes the request body. Only the first caller receives it.
	pub fn take_body(&self) -> Option<Body> {
		lock(&self.inner.body).take()
	}

	/// Whether both handles refer to the same request.
	pub fn ptr_eq(this: &Self, other: &Self) -> bool {
		Arc::ptr_eq(&this.inner, &other.inner)
	}

	pub(crate) fn params(&self) -> Option<Arc<Params>> {
		lock(&self.inner.params).clone()
	}

	pub(crate) fn set_params(&self, params: Params) {
		*lock(&self.inner.params) = Some(Arc::new(params));
	}

	pub(crate) fn base_path(&self) -> Option<Arc<str>> {
		lock(&self.inner.base_path).clone()
	}

	pub(crate) fn set_base_path(&self, base: Option<Arc<str>>) {
		*lock(&self.inner.base_path) = base;
	}

	pub(crate) fn hook_slots(&self) -> MutexGuard<'_, Slots> {
		lock(&self.inner.hooks)
	}
}

impl From<hyper::Request<Body>> for Request {
	fn from(req: hyper::Request<Body>) -> Self {
		Self::new(req)
	}
}

impl Debug for Request {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("id", &self.inner.id)
			.field("method", self.method())
			.field("uri", self.uri())
			.finish()
	}
}

// Locks are never held across user code, so a poisoned lock still guards
// consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
