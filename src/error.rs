use thiserror::Error;

/// Errors raised while building a router.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// A `:` segment without a name.
	#[error("route pattern `{pattern}` has an unnamed parameter")]
	EmptyParameter { pattern: String },

	/// The same parameter name appears twice in one pattern.
	#[error("route pattern `{pattern}` declares parameter `{name}` more than once")]
	DuplicateParameter { pattern: String, name: String },
}
