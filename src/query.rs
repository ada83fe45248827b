//! GROQ query assembly.
//!
//! Builds the filter, ordering, slice and projection parts of a content
//! store query from typed inputs. User-supplied text never appears in the
//! query string itself; it is always passed as a `$parameter`.
//!
//! ```text
//! *[_type == "product" && (title match $search || ...) && collection->slug.current == $category]
//!   | order(order asc, _createdAt desc) [0...24] { _id, title, ... }
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Excludes unpublished drafts, which authenticated reads also return.
pub const PUBLISHED_ONLY: &str = r#"!(_id in path("drafts.**"))"#;

/// AND-ed filter conditions plus the parameters they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<String>,
    params: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw condition. Callers must only pass trusted GROQ.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// `field == $name`, binding `value` to `$name`.
    pub fn eq(self, field: &str, name: &str, value: impl Into<Value>) -> Self {
        self.condition(format!("{} == ${}", field, name))
            .param(name, value)
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conditions joined with `&&`, or `None` when there are none.
    pub fn clause(&self) -> Option<String> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(self.conditions.join(" && "))
        }
    }

    /// Merges another filter into this one.
    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self.params.extend(other.params);
        self
    }
}

/// Fields a document type is searched and categorised by.
#[derive(Debug, Clone, Copy)]
pub struct SearchFields {
    pub text: &'static [&'static str],
    /// Path to the category slug, e.g. `collection->slug.current`.
    /// Paths containing `[]` are treated as arrays.
    pub category: &'static str,
}

pub const PRODUCT_SEARCH: SearchFields = SearchFields {
    text: &["title", "description", "features[]"],
    category: "collection->slug.current",
};

pub const POST_SEARCH: SearchFields = SearchFields {
    text: &["title", "excerpt"],
    category: "categories[]->slug.current",
};

/// Splits a comma-separated slug list, trimming whitespace and dropping blanks.
pub fn parse_categories(category: &str) -> Vec<String> {
    category
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds the search/category filter used by listing pages.
pub fn build_search_filter(
    search: Option<&str>,
    category: Option<&str>,
    fields: &SearchFields,
) -> Filter {
    let mut filter = Filter::new();

    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let matches: Vec<String> = fields
            .text
            .iter()
            .map(|f| format!("{} match $search", f))
            .collect();
        filter = filter
            .condition(format!("({})", matches.join(" || ")))
            .param("search", format!("{}*", term));
    }

    let slugs = category.map(parse_categories).unwrap_or_default();
    let is_array = fields.category.contains("[]");

    match slugs.as_slice() {
        [] => {}
        [single] => {
            let cond = if is_array {
                format!("$category in {}", fields.category)
            } else {
                format!("{} == $category", fields.category)
            };
            filter = filter.condition(cond).param("category", single.clone());
        }
        many => {
            let names: Vec<String> = (0..many.len()).map(|i| format!("category{}", i)).collect();
            let set = names
                .iter()
                .map(|n| format!("${}", n))
                .collect::<Vec<_>>()
                .join(", ");
            let cond = if is_array {
                format!("count(({})[@ in [{}]]) > 0", fields.category, set)
            } else {
                format!("{} in [{}]", fields.category, set)
            };
            filter = filter.condition(cond);
            for (name, slug) in names.into_iter().zip(many) {
                filter = filter.param(name, slug.clone());
            }
        }
    }

    filter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: Direction,
}

impl SortKey {
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{} {}", self.field, dir)
    }
}

/// `order(a asc, b desc)`, or an empty string for no keys.
pub fn order_clause(keys: &[SortKey]) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    format!("order({})", parts.join(", "))
}

#[derive(Debug, Clone, PartialEq)]
enum Slice {
    All,
    Range(usize, usize),
    First,
}

/// A complete query against one document type.
#[derive(Debug, Clone, PartialEq)]
pub struct GroqQuery {
    doc_type: String,
    filter: Filter,
    order: Vec<SortKey>,
    slice: Slice,
    projection: Option<String>,
}

impl GroqQuery {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            filter: Filter::new(),
            order: Vec::new(),
            slice: Slice::All,
            projection: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    pub fn order(mut self, keys: &[SortKey]) -> Self {
        self.order = keys.to_vec();
        self
    }

    /// Half-open range `[start, end)`.
    pub fn range(mut self, start: usize, end: usize) -> Self {
        self.slice = Slice::Range(start, end.max(start));
        self
    }

    /// Return only the first match (a single document or `null`).
    pub fn first(mut self) -> Self {
        self.slice = Slice::First;
        self
    }

    pub fn projection(mut self, projection: &str) -> Self {
        self.projection = Some(projection.trim().to_string());
        self
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        self.filter.params()
    }

    pub fn is_single(&self) -> bool {
        self.slice == Slice::First
    }

    pub fn render(&self) -> String {
        let mut out = format!("*[_type == {}", Value::String(self.doc_type.clone()));
        if let Some(clause) = self.filter.clause() {
            out.push_str(" && ");
            out.push_str(&clause);
        }
        out.push(']');

        let order = order_clause(&self.order);
        if !order.is_empty() {
            out.push_str(" | ");
            out.push_str(&order);
        }

        match self.slice {
            Slice::All => {}
            Slice::Range(start, end) => out.push_str(&format!(" [{}...{}]", start, end)),
            Slice::First => out.push_str("[0]"),
        }

        if let Some(ref projection) = self.projection {
            out.push_str(" { ");
            out.push_str(projection);
            out.push_str(" }");
        }
        out
    }
}

impl fmt::Display for GroqQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_no_conditions() {
        let f = build_search_filter(None, None, &PRODUCT_SEARCH);
        assert!(f.is_empty());
        assert!(f.params().is_empty());
        assert_eq!(f.clause(), None);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        for term in ["", "   ", "\t\n"] {
            let f = build_search_filter(Some(term), None, &PRODUCT_SEARCH);
            assert!(f.is_empty(), "term {:?} should not add a condition", term);
        }
    }

    #[test]
    fn test_search_adds_match_over_all_fields() {
        let f = build_search_filter(Some("  solar "), None, &PRODUCT_SEARCH);
        assert_eq!(f.conditions().len(), 1);
        assert_eq!(
            f.conditions()[0],
            "(title match $search || description match $search || features[] match $search)"
        );
        assert_eq!(f.params()["search"], "solar*");
    }

    #[test]
    fn test_single_category_uses_equality() {
        let f = build_search_filter(None, Some("panels"), &PRODUCT_SEARCH);
        assert_eq!(f.conditions(), ["collection->slug.current == $category"]);
        assert_eq!(f.params()["category"], "panels");
    }

    #[test]
    fn test_multiple_categories_use_membership() {
        let f = build_search_filter(None, Some("panels, inverters,batteries"), &PRODUCT_SEARCH);
        assert_eq!(
            f.conditions(),
            ["collection->slug.current in [$category0, $category1, $category2]"]
        );
        assert_eq!(f.params().len(), 3);
        assert_eq!(f.params()["category0"], "panels");
        assert_eq!(f.params()["category1"], "inverters");
        assert_eq!(f.params()["category2"], "batteries");
    }

    #[test]
    fn test_trailing_commas_collapse_to_single() {
        let f = build_search_filter(None, Some(",panels, ,"), &PRODUCT_SEARCH);
        assert_eq!(f.conditions(), ["collection->slug.current == $category"]);
    }

    #[test]
    fn test_array_category_path() {
        let one = build_search_filter(None, Some("news"), &POST_SEARCH);
        assert_eq!(one.conditions(), ["$category in categories[]->slug.current"]);

        let two = build_search_filter(None, Some("news,guides"), &POST_SEARCH);
        assert_eq!(
            two.conditions(),
            ["count((categories[]->slug.current)[@ in [$category0, $category1]]) > 0"]
        );
    }

    #[test]
    fn test_search_and_category_are_anded() {
        let f = build_search_filter(Some("x"), Some("a"), &PRODUCT_SEARCH);
        let clause = f.clause().unwrap();
        assert!(clause.contains(") && collection->slug.current == $category"));
    }

    #[test]
    fn test_order_clause() {
        assert_eq!(order_clause(&[]), "");
        assert_eq!(
            order_clause(&[SortKey::asc("order"), SortKey::desc("_createdAt")]),
            "order(order asc, _createdAt desc)"
        );
    }

    #[test]
    fn test_render_full_query() {
        let q = GroqQuery::new("product")
            .filter(build_search_filter(Some("pump"), None, &PRODUCT_SEARCH))
            .order(&[SortKey::asc("order")])
            .range(0, 24)
            .projection("_id, title");
        assert_eq!(
            q.render(),
            "*[_type == \"product\" && (title match $search || description match $search || features[] match $search)] | order(order asc) [0...24] { _id, title }"
        );
        assert_eq!(q.params()["search"], "pump*");
    }

    #[test]
    fn test_render_single_document() {
        let q = GroqQuery::new("post")
            .filter(Filter::new().eq("slug.current", "slug", "hello"))
            .first()
            .projection("_id");
        assert_eq!(
            q.render(),
            "*[_type == \"post\" && slug.current == $slug][0] { _id }"
        );
        assert!(q.is_single());
    }

    #[test]
    fn test_search_term_is_never_inlined() {
        let q = GroqQuery::new("product").filter(build_search_filter(
            Some("\"] | *[_type == \"secret"),
            None,
            &PRODUCT_SEARCH,
        ));
        assert!(!q.render().contains("secret"));
    }
}
