//! Request-scoped memoization.
//!
//! A hook pairs a computation with a private slot on every request it is
//! asked about. The computation runs at most once per request; later calls
//! return the stored value. Slots live on the [`Request`] itself, so they
//! disappear together with it.

use crate::{pattern::Params, request::Request};
use futures::future::{self, BoxFuture, Either, FutureExt, Shared, WeakShared};
use std::{
	any::Any,
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	future::Future,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, OnceLock,
	},
};
use url::form_urlencoded;

static NEXT_HOOK: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HookId(u64);

impl HookId {
	fn next() -> Self {
		Self(NEXT_HOOK.fetch_add(1, Ordering::Relaxed))
	}
}

pub(crate) type Slots = HashMap<HookId, Box<dyn Any + Send + Sync>>;

/// A memoized, synchronously computed value per request.
///
/// ```
/// use switchyard::{Body, Hook, Request};
///
/// let user_agent = Hook::new(|req: &Request| {
/// 	req.headers()
/// 		.get("user-agent")
/// 		.and_then(|v| v.to_str().ok())
/// 		.map(str::to_owned)
/// });
///
/// let req = Request::new(switchyard::hyper::Request::new(Body::empty()));
/// assert!(user_agent.get(&req).is_none());
/// ```
pub struct Hook<T> {
	id: HookId,
	compute: Box<dyn Fn(&Request) -> T + Send + Sync>,
}

impl<T: Send + Sync + 'static> Hook<T> {
	pub fn new<F>(compute: F) -> Self
	where
		F: Fn(&Request) -> T + Send + Sync + 'static,
	{
		Self {
			id: HookId::next(),
			compute: Box::new(compute),
		}
	}

	/// Returns the value for `req`, computing it on first use.
	///
	/// Every call for the same request yields the same `Arc`. The slot lock is
	/// not held while computing, so a hook may call other hooks; if two threads
	/// race on one request, the first stored value wins.
	pub fn get(&self, req: &Request) -> Arc<T> {
		if let Some(value) = self.peek(req) {
			return value;
		}

		let value = Arc::new((self.compute)(req));
		let mut slots = req.hook_slots();
		let slot = slots
			.entry(self.id)
			.or_insert_with(|| Box::new(Arc::clone(&value)));
		slot.downcast_ref::<Arc<T>>().map(Arc::clone).unwrap_or(value)
	}

	/// Returns the stored value without computing it.
	pub fn peek(&self, req: &Request) -> Option<Arc<T>> {
		req.hook_slots()
			.get(&self.id)
			.and_then(|slot| slot.downcast_ref::<Arc<T>>())
			.map(Arc::clone)
	}
}

impl<T> Debug for Hook<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hook").field("id", &self.id).finish()
	}
}

type Computation<T> = BoxFuture<'static, Arc<T>>;
type Pending<T> = Shared<Computation<T>>;

enum AsyncSlot<T> {
	// The computation captures the request, so the slot only holds it weakly;
	// its waiters own it.
	Pending(WeakShared<Computation<T>>),
	Ready(Arc<T>),
}

/// A memoized, asynchronously computed value per request.
///
/// The in-flight computation is stored before it is first polled, so callers
/// that ask while it is pending all await the same future and the computation
/// runs once. Once it resolves the slot holds the plain value. If every caller
/// drops its future first, the computation is dropped with them and the next
/// call starts a new one.
pub struct AsyncHook<T> {
	id: HookId,
	compute: Box<dyn Fn(Request) -> Computation<T> + Send + Sync>,
}

impl<T: Send + Sync + 'static> AsyncHook<T> {
	pub fn new<F, Fut>(compute: F) -> Self
	where
		F: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = T> + Send + 'static,
	{
		Self {
			id: HookId::next(),
			compute: Box::new(move |req: Request| -> Computation<T> { compute(req).map(Arc::new).boxed() }),
		}
	}

	pub fn get(&self, req: &Request) -> impl Future<Output = Arc<T>> + Send + 'static {
		let pending = match self.lookup(req) {
			Some(AsyncLookup::Ready(value)) => return Either::Left(future::ready(value)),
			Some(AsyncLookup::Pending(pending)) => pending,
			None => self.start(req),
		};

		let req = req.clone();
		let id = self.id;
		Either::Right(async move {
			let value = pending.await;
			req.hook_slots()
				.insert(id, Box::new(AsyncSlot::Ready(Arc::clone(&value))));
			value
		})
	}

	/// Returns the resolved value without starting or awaiting a computation.
	pub fn peek(&self, req: &Request) -> Option<Arc<T>> {
		match self.lookup(req) {
			Some(AsyncLookup::Ready(value)) => Some(value),
			_ => None,
		}
	}

	fn lookup(&self, req: &Request) -> Option<AsyncLookup<T>> {
		let slots = req.hook_slots();
		match slots.get(&self.id)?.downcast_ref::<AsyncSlot<T>>()? {
			AsyncSlot::Ready(value) => Some(AsyncLookup::Ready(Arc::clone(value))),
			AsyncSlot::Pending(weak) => weak.upgrade().map(AsyncLookup::Pending),
		}
	}

	fn start(&self, req: &Request) -> Pending<T> {
		// The closure runs without the slot lock so it can consult other hooks.
		// Threads racing on one request may each run the closure, but only the
		// future stored first is ever polled.
		let fresh = (self.compute)(req.clone()).shared();

		let mut slots = req.hook_slots();
		if let Some(slot) = slots.get(&self.id).and_then(|slot| slot.downcast_ref::<AsyncSlot<T>>()) {
			match slot {
				AsyncSlot::Ready(value) => return future::ready(Arc::clone(value)).boxed().shared(),
				AsyncSlot::Pending(weak) => {
					if let Some(pending) = weak.upgrade() {
						return pending;
					}
				}
			}
		}

		if let Some(weak) = fresh.downgrade() {
			slots.insert(self.id, Box::new(AsyncSlot::Pending(weak)));
		}
		fresh
	}
}

enum AsyncLookup<T> {
	Pending(Pending<T>),
	Ready(Arc<T>),
}

impl<T> Debug for AsyncHook<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("AsyncHook").field("id", &self.id).finish()
	}
}

/// Key/value pairs of a query string, in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
	pairs: Vec<(String, String)>,
}

impl Query {
	/// Parses a raw query string without its leading `?`. Parsing is lossy
	/// and never fails.
	pub fn parse(raw: &str) -> Self {
		Self {
			pairs: form_urlencoded::parse(raw.as_bytes()).into_owned().collect(),
		}
	}

	/// The first value for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.pairs
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + 'k
	where
		'a: 'k,
	{
		self.pairs
			.iter()
			.filter(move |(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}
}

static QUERY: OnceLock<Hook<Query>> = OnceLock::new();

/// The parsed query string of `req`, memoized per request.
pub fn query(req: &Request) -> Arc<Query> {
	QUERY
		.get_or_init(|| Hook::new(|req: &Request| Query::parse(req.uri().query().unwrap_or_default())))
		.get(req)
}

/// The parameters captured by the route that matched `req`, if any.
pub fn params(req: &Request) -> Option<Arc<Params>> {
	req.params()
}

/// The mount prefix through which the matched route was reached, if it was
/// registered on a mounted router.
pub fn base_path(req: &Request) -> Option<Arc<str>> {
	req.base_path()
}
