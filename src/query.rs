//! Filtering, sorting and pagination shared by every list endpoint.
//!
//! A [`ListQuery`] is turned into a single [`Filter`], which is then rendered
//! both into the page query and the count query (or evaluated directly by the
//! in-memory store), so `total` is always computed with the same criteria
//! as `data`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use validator::Validate;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
	Asc,
	Desc,
}

/// Query string accepted by list endpoints.
#[derive(Clone, Debug, Deserialize, Validate, JsonSchema)]
pub struct ListQuery {
	/// Orders by date. Without it, rows come back in insertion order.
	pub sort: Option<Sort>,
	/// Case-insensitive substring to look for in the content.
	#[validate(length(max = 256))]
	pub search: Option<String>,
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 10000))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "ten")]
	pub limit: i64,
}

impl Default for ListQuery {
	fn default() -> Self {
		Self {
			sort: None,
			search: None,
			page: one(),
			limit: ten(),
		}
	}
}

impl ListQuery {
	pub fn offset(&self) -> i64 {
		(self.page - 1) * self.limit
	}

	/// The row filter for this query, optionally scoped to a parent post.
	pub fn filter(&self, post_id: Option<i64>) -> Filter {
		Filter {
			post_id,
			search: self
				.search
				.as_deref()
				.filter(|search| !search.is_empty())
				.map(str::to_owned),
		}
	}

	/// Appends `ORDER BY`, `LIMIT` and `OFFSET`.
	pub fn push_window(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		builder.push(match self.sort {
			Some(Sort::Asc) => " ORDER BY date ASC, id ASC",
			Some(Sort::Desc) => " ORDER BY date DESC, id DESC",
			None => " ORDER BY id ASC",
		});

		builder
			.push(" LIMIT ")
			.push_bind(self.limit)
			.push(" OFFSET ")
			.push_bind(self.offset());
	}

	/// Filters, orders and windows in-memory rows.
	pub fn apply<'a, T, I>(&self, filter: &Filter, rows: I) -> Page<T>
	where
		T: Listable + Clone + 'a,
		I: IntoIterator<Item = &'a T>,
	{
		let mut matching = rows
			.into_iter()
			.filter(|row| filter.matches(*row))
			.collect::<Vec<_>>();

		match self.sort {
			Some(Sort::Asc) => matching.sort_by_key(|row| (row.date(), row.id())),
			Some(Sort::Desc) => {
				matching.sort_by_key(|row| std::cmp::Reverse((row.date(), row.id())));
			}
			None => matching.sort_by_key(|row| row.id()),
		}

		let total = matching.len();
		let data = matching
			.into_iter()
			.skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
			.take(usize::try_from(self.limit).unwrap_or(0))
			.cloned()
			.collect();

		self.page(data, i64::try_from(total).unwrap_or(i64::MAX))
	}

	pub fn page<T>(&self, data: Vec<T>, total: i64) -> Page<T> {
		Page {
			data,
			page: self.page,
			limit: self.limit,
			total,
		}
	}
}

/// Row predicate: an optional parent scope ANDed with an optional search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
	pub post_id: Option<i64>,
	pub search: Option<String>,
}

impl Filter {
	/// Appends the `WHERE` clause, if any.
	pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		let mut keyword = " WHERE ";

		if let Some(post_id) = self.post_id {
			builder.push(keyword).push("post_id = ").push_bind(post_id);
			keyword = " AND ";
		}

		if let Some(search) = &self.search {
			builder
				.push(keyword)
				.push("content ILIKE ")
				.push_bind(format!("%{}%", escape_like(search)))
				.push(r" ESCAPE '\'");
		}
	}

	pub fn matches<T: Listable>(&self, row: &T) -> bool {
		if self.post_id.is_some() && row.post_id() != self.post_id {
			return false;
		}

		self.search.as_ref().map_or(true, |search| {
			row.content()
				.to_lowercase()
				.contains(&search.to_lowercase())
		})
	}
}

/// Escapes `LIKE` metacharacters so the text matches literally.
pub fn escape_like(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());

	for c in text.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}

		escaped.push(c);
	}

	escaped
}

/// A resource that can be listed.
pub trait Listable {
	fn id(&self) -> i64;
	fn content(&self) -> &str;
	fn date(&self) -> DateTime<Utc>;

	/// The parent post, for scoped resources.
	fn post_id(&self) -> Option<i64> {
		None
	}
}

/// One page of a listing.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub page: i64,
	pub limit: i64,
	/// The number of rows matching the filter, across all pages.
	pub total: i64,
}

#[cfg(test)]
mod test {
	use std::collections::HashSet;

	use chrono::TimeZone;

	use super::*;

	#[derive(Clone, Debug)]
	struct Row {
		id: i64,
		post_id: i64,
		content: String,
		date: DateTime<Utc>,
	}

	impl Listable for Row {
		fn id(&self) -> i64 {
			self.id
		}

		fn content(&self) -> &str {
			&self.content
		}

		fn date(&self) -> DateTime<Utc> {
			self.date
		}

		fn post_id(&self) -> Option<i64> {
			Some(self.post_id)
		}
	}

	fn rows() -> Vec<Row> {
		// dates deliberately collide and run against id order
		(1..=23)
			.map(|id| Row {
				id,
				post_id: id % 2,
				content: if id % 3 == 0 {
					format!("Hello world #{id}")
				} else {
					format!("goodbye #{id}")
				},
				date: Utc.timestamp_opt(1_700_000_000 - (id / 2) * 60, 0).unwrap(),
			})
			.collect()
	}

	fn query(sort: Option<Sort>, search: Option<&str>, page: i64, limit: i64) -> ListQuery {
		ListQuery {
			sort,
			search: search.map(str::to_owned),
			page,
			limit,
		}
	}

	#[test]
	fn test_offset() {
		let mut query = ListQuery::default();

		assert_eq!(query.offset(), 0);

		query.page = 2;

		assert_eq!(query.offset(), 10);

		query.limit = 5;

		assert_eq!(query.offset(), 5);

		query.page = 3;

		assert_eq!(query.offset(), 10);
	}

	#[test]
	fn test_empty_search_disables_filter() {
		assert_eq!(query(None, Some(""), 1, 10).filter(None).search, None);
		assert_eq!(query(None, None, 1, 10).filter(None).search, None);
	}

	#[test]
	fn test_search_keeps_whitespace() {
		assert_eq!(
			query(None, Some("   "), 1, 10).filter(None).search.as_deref(),
			Some("   ")
		);
		assert_eq!(
			query(None, Some(" hi "), 1, 10).filter(Some(4)),
			Filter {
				post_id: Some(4),
				search: Some(" hi ".into()),
			}
		);
	}

	#[test]
	fn test_pages_partition_matches() {
		let rows = rows();

		for sort in [None, Some(Sort::Asc), Some(Sort::Desc)] {
			for search in [None, Some("hello"), Some("#1")] {
				for post_id in [None, Some(0), Some(1)] {
					for limit in [1, 4, 10, 100] {
						let first = query(sort, search, 1, limit);
						let filter = first.filter(post_id);
						let total = first.apply(&filter, &rows).total;

						let mut seen = HashSet::new();
						let mut count = 0;
						let pages = (total + limit - 1) / limit;

						for page in 1..=pages {
							let page = query(sort, search, page, limit).apply(&filter, &rows);

							assert_eq!(page.total, total);
							assert!(page.data.len() as i64 <= limit);

							for row in page.data {
								assert!(seen.insert(row.id), "row {} on two pages", row.id);
								count += 1;
							}
						}

						assert_eq!(count, total);
					}
				}
			}
		}
	}

	#[test]
	fn test_search_is_case_insensitive_substring() {
		let page = query(None, Some("HELLO"), 1, 100).apply(&Filter::default(), &rows());
		let filter = query(None, Some("HELLO"), 1, 100).filter(None);
		let filtered = query(None, Some("HELLO"), 1, 100).apply(&filter, &rows());

		assert_eq!(page.total, 23);
		assert_eq!(filtered.total, 7);
		assert!(filtered
			.data
			.iter()
			.all(|row| row.content.starts_with("Hello world")));
	}

	#[test]
	fn test_no_match() {
		let query = query(None, Some("zzz-nonexistent"), 1, 10);
		let page = query.apply(&query.filter(None), &rows());

		assert!(page.data.is_empty());
		assert_eq!(page.total, 0);
	}

	#[test]
	fn test_page_past_end() {
		let query = query(None, None, 50, 10);
		let page = query.apply(&query.filter(None), &rows());

		assert!(page.data.is_empty());
		assert_eq!(page.total, 23);
		assert_eq!(page.page, 50);
		assert_eq!(page.limit, 10);
	}

	#[test]
	fn test_ordering() {
		let rows = rows();

		let asc = query(Some(Sort::Asc), None, 1, 100).apply(&Filter::default(), &rows);
		assert!(asc
			.data
			.windows(2)
			.all(|w| (w[0].date, w[0].id) < (w[1].date, w[1].id)));

		let desc = query(Some(Sort::Desc), None, 1, 100).apply(&Filter::default(), &rows);
		assert!(desc
			.data
			.windows(2)
			.all(|w| (w[0].date, w[0].id) > (w[1].date, w[1].id)));

		let none = query(None, None, 1, 100).apply(&Filter::default(), &rows);
		assert!(none.data.windows(2).all(|w| w[0].id < w[1].id));
	}

	#[test]
	fn test_escape_like() {
		assert_eq!(escape_like("plain"), "plain");
		assert_eq!(escape_like("100%_off\\"), r"100\%\_off\\");
	}

	#[test]
	fn test_sql_shares_filter() {
		let query = query(Some(Sort::Desc), Some("hello"), 3, 5);
		let filter = query.filter(Some(7));

		let mut page = QueryBuilder::<Postgres>::new("SELECT * FROM comment");
		filter.push_where(&mut page);
		query.push_window(&mut page);

		let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM comment");
		filter.push_where(&mut count);

		let clause = r" WHERE post_id = $1 AND content ILIKE $2 ESCAPE '\'";

		assert_eq!(
			page.sql(),
			format!("SELECT * FROM comment{clause} ORDER BY date DESC, id DESC LIMIT $3 OFFSET $4")
		);
		assert_eq!(count.sql(), format!("SELECT COUNT(*) FROM comment{clause}"));
	}

	#[test]
	fn test_sql_without_filter() {
		let query = ListQuery::default();
		let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM post");

		query.filter(None).push_where(&mut builder);
		query.push_window(&mut builder);

		assert_eq!(
			builder.sql(),
			"SELECT * FROM post ORDER BY id ASC LIMIT $1 OFFSET $2"
		);
	}
}
