use crate::Error;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Options a pattern is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
	/// Compare static segments case-sensitively.
	pub case_sensitive: bool,
	/// Require the trailing slash of the path to agree with the pattern's.
	pub strict: bool,
	/// Anchor the pattern to the end of the path. When unset the pattern only
	/// needs to match the leading segments (mount semantics).
	pub end: bool,
}

impl Default for MatchOptions {
	fn default() -> Self {
		Self {
			case_sensitive: false,
			strict: false,
			end: true,
		}
	}
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum PathSegment {
	Static(String),
	Dynamic(String),
}

/// Values captured by the dynamic segments of a matched pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}

/// A compiled path pattern such as `/users/:id`.
#[derive(Debug, Clone)]
pub struct Matcher {
	pattern: String,
	segments: Vec<PathSegment>,
	trailing_slash: bool,
	options: MatchOptions,
}

impl Matcher {
	pub fn compile(pattern: &str, options: MatchOptions) -> Result<Self, Error> {
		let mut segments: Vec<PathSegment> = vec![];

		for segment in pattern.split('/').filter(|s| !s.is_empty()) {
			let compiled = match segment.strip_prefix(':') {
				Some("") => {
					return Err(Error::EmptyParameter {
						pattern: pattern.to_owned(),
					})
				}
				Some(name) => {
					let duplicate = segments
						.iter()
						.any(|s| matches!(s, PathSegment::Dynamic(existing) if existing == name));
					if duplicate {
						return Err(Error::DuplicateParameter {
							pattern: pattern.to_owned(),
							name: name.to_owned(),
						});
					}
					PathSegment::Dynamic(name.to_owned())
				}
				None if options.case_sensitive => PathSegment::Static(segment.to_owned()),
				None => PathSegment::Static(segment.to_lowercase()),
			};
			segments.push(compiled);
		}

		Ok(Self {
			pattern: pattern.to_owned(),
			segments,
			trailing_slash: has_trailing_slash(pattern),
			options,
		})
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn options(&self) -> MatchOptions {
		self.options
	}

	/// Matches `path`, returning the captured parameters.
	pub fn matches(&self, path: &str) -> Option<Params> {
		if self.options.strict && self.options.end && has_trailing_slash(path) != self.trailing_slash {
			return None;
		}

		let mut parts = path.split('/').filter(|s| !s.is_empty());
		let mut params = HashMap::new();

		for segment in &self.segments {
			let part = parts.next()?;
			match segment {
				PathSegment::Static(expected) => {
					let equal = if self.options.case_sensitive {
						part == expected
					} else {
						part.to_lowercase() == *expected
					};
					if !equal {
						return None;
					}
				}
				PathSegment::Dynamic(name) => {
					params.insert(name.clone(), decode(part));
				}
			}
		}

		if self.options.end && parts.next().is_some() {
			return None;
		}

		Some(Params(params))
	}
}

fn has_trailing_slash(path: &str) -> bool {
	path.len() > 1 && path.ends_with('/')
}

// Undecodable segments are passed through untouched.
fn decode(segment: &str) -> String {
	percent_decode_str(segment)
		.decode_utf8()
		.map(|s| s.into_owned())
		.unwrap_or_else(|_| segment.to_owned())
}
