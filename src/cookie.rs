use std::collections::HashMap;

use cookie::{time::Duration, Cookie, Expiration, SameSite};

/// Attributes attached to a `Set-Cookie` value.
#[derive(Clone, Debug)]
pub struct Attributes {
	pub path: &'static str,
	pub http_only: bool,
	pub secure: bool,
	pub same_site: SameSite,
	/// `None` produces a browser-session cookie.
	pub max_age: Option<Duration>,
	/// Forces an `Expires` in the past, so the cookie is dropped immediately.
	pub expired: bool,
}

/// Serializes and parses cookie headers.
///
/// The session layer only ever deals in names, values and [`Attributes`],
/// never in raw header syntax.
pub trait CookieCodec: Send + Sync {
	/// Produces a `Set-Cookie` header value.
	fn encode(&self, name: &str, value: &str, attributes: &Attributes) -> String;

	/// Parses a `Cookie` header value into name/value pairs.
	///
	/// Malformed pairs are skipped. When a name repeats, the first value wins.
	fn decode(&self, header: &str) -> HashMap<String, String>;
}

/// [`CookieCodec`] backed by the `cookie` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rfc6265;

impl CookieCodec for Rfc6265 {
	fn encode(&self, name: &str, value: &str, attributes: &Attributes) -> String {
		let mut builder = Cookie::build((name.to_owned(), value.to_owned()))
			.path(attributes.path)
			.http_only(attributes.http_only)
			.secure(attributes.secure)
			.same_site(attributes.same_site);

		if let Some(max_age) = attributes.max_age {
			builder = builder.max_age(max_age);
		}

		if attributes.expired {
			builder = builder.expires(Expiration::DateTime(
				cookie::time::OffsetDateTime::UNIX_EPOCH,
			));
		}

		builder.build().to_string()
	}

	fn decode(&self, header: &str) -> HashMap<String, String> {
		let mut cookies = HashMap::new();

		for cookie in Cookie::split_parse(header).filter_map(Result::ok) {
			cookies
				.entry(cookie.name().to_owned())
				.or_insert_with(|| cookie.value().to_owned());
		}

		cookies
	}
}
