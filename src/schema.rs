//! Content schemas for every document type authors manage.
//!
//! These definitions mirror what the admin interface enforces: field types,
//! validation rules, list previews and the orderings offered to editors.
//! [`DocumentSchema::validate`] applies the same rules to a raw document so
//! imports and migrations can be checked before they are written.
//!
//! | Schema | Title |
//! |--------|-------|
//! | `product` | Product |
//! | `productCollection` | Product collection |
//! | `teamMember` | Team member |
//! | `event` | Event |
//! | `achievement` | Achievement |
//! | `certification` | Certification |
//! | `installation` | Installation |
//! | `client` | Client |
//! | `post` | Blog post |
//! | `category` | Blog category |
//! | `contactSubmission` | Contact submission |

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::contact::is_valid_email;
use crate::models::SubmissionStatus;
use crate::query::SortKey;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    String,
    Text,
    Slug { source: &'static str },
    Number,
    Boolean,
    Date,
    Datetime,
    Url,
    Email,
    Image,
    Array { of: Box<FieldType> },
    Reference { to: &'static str },
    Block,
}

impl FieldType {
    pub fn array_of(inner: FieldType) -> Self {
        FieldType::Array { of: Box::new(inner) }
    }

    /// Checks the JSON shape of a present, non-null value.
    fn check_shape(&self, value: &Value) -> Result<(), String> {
        let ok = match self {
            FieldType::String | FieldType::Text | FieldType::Email | FieldType::Url => {
                value.is_string()
            }
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value
                .as_str()
                .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            FieldType::Datetime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            FieldType::Slug { .. } => value["current"].is_string(),
            FieldType::Image => value.is_object(),
            FieldType::Reference { .. } => value["_ref"].is_string(),
            FieldType::Block => value.is_array(),
            FieldType::Array { of } => {
                let Some(items) = value.as_array() else {
                    return Err("must be an array".into());
                };
                for (i, item) in items.iter().enumerate() {
                    of.check_shape(item)
                        .map_err(|e| format!("item {}: {}", i, e))?;
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!("must be of type {}", self.label()))
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Slug { .. } => "slug",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date (YYYY-MM-DD)",
            FieldType::Datetime => "datetime (RFC 3339)",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Image => "image",
            FieldType::Array { .. } => "array",
            FieldType::Reference { .. } => "reference",
            FieldType::Block => "block content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "camelCase")]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    NonNegativeInteger,
    Email,
    Url,
    OneOf(&'static [&'static str]),
}

impl Rule {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Rule::Required => Ok(()),
            Rule::MinLength(min) => match text_len(value) {
                Some(n) if n < *min => Err(format!("must be at least {} characters", min)),
                _ => Ok(()),
            },
            Rule::MaxLength(max) => match text_len(value) {
                Some(n) if n > *max => Err(format!("must be at most {} characters", max)),
                _ => Ok(()),
            },
            Rule::NonNegativeInteger => {
                if value.as_u64().is_some() {
                    Ok(())
                } else {
                    Err("must be a non-negative integer".into())
                }
            }
            Rule::Email => match value.as_str() {
                Some(s) if is_valid_email(s) => Ok(()),
                _ => Err("must be a valid email address".into()),
            },
            Rule::Url => match value.as_str() {
                Some(s) if s.starts_with("https://") || s.starts_with("http://") => Ok(()),
                _ => Err("must be an http(s) URL".into()),
            },
            Rule::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(format!("must be one of: {}", allowed.join(", "))),
            },
        }
    }
}

fn text_len(value: &Value) -> Option<usize> {
    value
        .as_str()
        .or_else(|| value["current"].as_str())
        .map(|s| s.chars().count())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl FieldDef {
    pub fn new(name: &'static str, title: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            title,
            field_type,
            rules: Vec::new(),
            description: None,
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::MaxLength(max))
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }
}

/// How a document is summarised in admin lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ordering {
    pub name: &'static str,
    pub title: &'static str,
    pub by: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSchema {
    pub name: &'static str,
    pub title: &'static str,
    pub fields: Vec<FieldDef>,
    pub preview: Preview,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orderings: Vec<Ordering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewValue {
    pub title: String,
    pub subtitle: Option<String>,
}

impl DocumentSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All rule and type violations in `doc`. Empty means valid.
    pub fn validate(&self, doc: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if !doc.is_object() {
            errors.push(FieldError {
                field: "_root".into(),
                message: "document must be a JSON object".into(),
            });
            return errors;
        }

        if let Some(t) = doc["_type"].as_str() {
            if t != self.name {
                errors.push(FieldError {
                    field: "_type".into(),
                    message: format!("expected '{}', found '{}'", self.name, t),
                });
            }
        }

        for field in &self.fields {
            let value = &doc[field.name];
            if is_blank(value) {
                if field.is_required() {
                    errors.push(FieldError {
                        field: field.name.into(),
                        message: "is required".into(),
                    });
                }
                continue;
            }

            if let Err(message) = field.field_type.check_shape(value) {
                errors.push(FieldError {
                    field: field.name.into(),
                    message,
                });
                continue;
            }

            for rule in &field.rules {
                if let Err(message) = rule.check(value) {
                    errors.push(FieldError {
                        field: field.name.into(),
                        message,
                    });
                }
            }
        }

        errors
    }

    /// Title/subtitle for an admin list row.
    pub fn preview_of(&self, doc: &Value) -> PreviewValue {
        let title = lookup(doc, self.preview.title)
            .and_then(display_value)
            .unwrap_or_else(|| "Untitled".to_string());
        let subtitle = self
            .preview
            .subtitle
            .and_then(|path| lookup(doc, path))
            .and_then(display_value);
        PreviewValue { title, subtitle }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) if o.contains_key("current") => {
            o["current"].as_str().map_or(true, |s| s.trim().is_empty())
        }
        _ => false,
    }
}

/// Follows a dotted path such as `collection.title` or `images.0`.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |v, key| match key.parse::<usize>() {
            Ok(i) if v.is_array() => v.get(i),
            _ => v.get(key),
        })
        .filter(|v| !v.is_null())
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn order_field() -> FieldDef {
    FieldDef::new("order", "Display order", FieldType::Number)
        .rule(Rule::NonNegativeInteger)
        .describe("Lower numbers are shown first")
}

fn display_orderings() -> Vec<Ordering> {
    vec![Ordering {
        name: "displayOrder",
        title: "Display order",
        by: vec![SortKey::asc("order"), SortKey::desc("_createdAt")],
    }]
}

fn slug_field(source: &'static str) -> FieldDef {
    FieldDef::new("slug", "Slug", FieldType::Slug { source })
        .required()
        .max_length(96)
}

pub fn product() -> DocumentSchema {
    DocumentSchema {
        name: "product",
        title: "Product",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String)
                .required()
                .max_length(120),
            slug_field("title"),
            FieldDef::new("description", "Description", FieldType::Text),
            FieldDef::new("features", "Features", FieldType::array_of(FieldType::String)),
            FieldDef::new("images", "Images", FieldType::array_of(FieldType::Image))
                .describe("The first image is used as the cover"),
            FieldDef::new(
                "collection",
                "Collection",
                FieldType::Reference {
                    to: "productCollection",
                },
            )
            .required(),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("collection.title"),
            media: Some("images.0"),
        },
        orderings: display_orderings(),
    }
}

pub fn product_collection() -> DocumentSchema {
    DocumentSchema {
        name: "productCollection",
        title: "Product collection",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            slug_field("title"),
            FieldDef::new("description", "Description", FieldType::Text),
            FieldDef::new("image", "Image", FieldType::Image),
            FieldDef::new("featured", "Featured on home page", FieldType::Boolean),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: None,
            media: Some("image"),
        },
        orderings: display_orderings(),
    }
}

pub fn team_member() -> DocumentSchema {
    DocumentSchema {
        name: "teamMember",
        title: "Team member",
        fields: vec![
            FieldDef::new("name", "Name", FieldType::String).required(),
            FieldDef::new("role", "Role", FieldType::String).required(),
            FieldDef::new("bio", "Bio", FieldType::Text).max_length(1000),
            FieldDef::new("image", "Photo", FieldType::Image),
            FieldDef::new("isDirector", "Director", FieldType::Boolean),
            order_field(),
        ],
        preview: Preview {
            title: "name",
            subtitle: Some("role"),
            media: Some("image"),
        },
        orderings: display_orderings(),
    }
}

pub fn event() -> DocumentSchema {
    DocumentSchema {
        name: "event",
        title: "Event",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            slug_field("title"),
            FieldDef::new("date", "Date", FieldType::Date),
            FieldDef::new("location", "Location", FieldType::String),
            FieldDef::new("description", "Description", FieldType::Text),
            FieldDef::new("image", "Image", FieldType::Image),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("date"),
            media: Some("image"),
        },
        orderings: vec![Ordering {
            name: "dateDesc",
            title: "Date, newest first",
            by: vec![SortKey::desc("date")],
        }],
    }
}

pub fn achievement() -> DocumentSchema {
    DocumentSchema {
        name: "achievement",
        title: "Achievement",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            FieldDef::new("description", "Description", FieldType::Text),
            FieldDef::new("year", "Year", FieldType::Number).rule(Rule::NonNegativeInteger),
            FieldDef::new("image", "Image", FieldType::Image),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("year"),
            media: Some("image"),
        },
        orderings: display_orderings(),
    }
}

pub fn certification() -> DocumentSchema {
    DocumentSchema {
        name: "certification",
        title: "Certification",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            FieldDef::new("issuer", "Issuer", FieldType::String),
            FieldDef::new("image", "Certificate or logo", FieldType::Image),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("issuer"),
            media: Some("image"),
        },
        orderings: display_orderings(),
    }
}

pub fn installation() -> DocumentSchema {
    DocumentSchema {
        name: "installation",
        title: "Installation",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            FieldDef::new("slug", "Slug", FieldType::Slug { source: "title" }).max_length(96),
            FieldDef::new("location", "Location", FieldType::String),
            FieldDef::new("description", "Description", FieldType::Text),
            FieldDef::new("images", "Images", FieldType::array_of(FieldType::Image)),
            FieldDef::new("client", "Client", FieldType::Reference { to: "client" }),
            FieldDef::new("completedAt", "Completed", FieldType::Date),
            order_field(),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("location"),
            media: Some("images.0"),
        },
        orderings: display_orderings(),
    }
}

pub fn client() -> DocumentSchema {
    DocumentSchema {
        name: "client",
        title: "Client",
        fields: vec![
            FieldDef::new("name", "Name", FieldType::String).required(),
            FieldDef::new("logo", "Logo", FieldType::Image),
            FieldDef::new("website", "Website", FieldType::Url).rule(Rule::Url),
            order_field(),
        ],
        preview: Preview {
            title: "name",
            subtitle: Some("website"),
            media: Some("logo"),
        },
        orderings: display_orderings(),
    }
}

pub fn post() -> DocumentSchema {
    DocumentSchema {
        name: "post",
        title: "Blog post",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String)
                .required()
                .max_length(120),
            slug_field("title"),
            FieldDef::new("excerpt", "Excerpt", FieldType::Text).max_length(300),
            FieldDef::new("publishedAt", "Published at", FieldType::Datetime).required(),
            FieldDef::new("mainImage", "Main image", FieldType::Image),
            FieldDef::new(
                "categories",
                "Categories",
                FieldType::array_of(FieldType::Reference { to: "category" }),
            ),
            FieldDef::new("author", "Author", FieldType::Reference { to: "teamMember" }),
            FieldDef::new("body", "Body", FieldType::Block),
        ],
        preview: Preview {
            title: "title",
            subtitle: Some("publishedAt"),
            media: Some("mainImage"),
        },
        orderings: vec![Ordering {
            name: "publishedDesc",
            title: "Newest first",
            by: vec![SortKey::desc("publishedAt")],
        }],
    }
}

pub fn category() -> DocumentSchema {
    DocumentSchema {
        name: "category",
        title: "Blog category",
        fields: vec![
            FieldDef::new("title", "Title", FieldType::String).required(),
            slug_field("title"),
        ],
        preview: Preview {
            title: "title",
            subtitle: None,
            media: None,
        },
        orderings: Vec::new(),
    }
}

pub fn contact_submission() -> DocumentSchema {
    DocumentSchema {
        name: "contactSubmission",
        title: "Contact submission",
        fields: vec![
            FieldDef::new("name", "Name", FieldType::String).required(),
            FieldDef::new("email", "Email", FieldType::Email)
                .required()
                .rule(Rule::Email),
            FieldDef::new("phone", "Phone", FieldType::String),
            FieldDef::new("message", "Message", FieldType::Text)
                .required()
                .rule(Rule::MinLength(1)),
            FieldDef::new("submittedAt", "Submitted at", FieldType::Datetime).required(),
            FieldDef::new("status", "Status", FieldType::String)
                .required()
                .rule(Rule::OneOf(&SubmissionStatus::ALL)),
        ],
        preview: Preview {
            title: "name",
            subtitle: Some("email"),
            media: None,
        },
        orderings: vec![Ordering {
            name: "submittedDesc",
            title: "Newest first",
            by: vec![SortKey::desc("submittedAt")],
        }],
    }
}

pub fn all() -> Vec<DocumentSchema> {
    vec![
        product(),
        product_collection(),
        team_member(),
        event(),
        achievement(),
        certification(),
        installation(),
        client(),
        post(),
        category(),
        contact_submission(),
    ]
}

pub fn find(name: &str) -> Option<DocumentSchema> {
    all().into_iter().find(|s| s.name == name)
}

pub fn run_schema_list() {
    for schema in all() {
        let required = schema.fields.iter().filter(|f| f.is_required()).count();
        println!(
            "{:<20} {:<22} {} fields ({} required)",
            schema.name,
            schema.title,
            schema.fields.len(),
            required
        );
    }
}

pub fn run_schema_show(name: &str) -> Result<()> {
    let schema = find(name).with_context(|| format!("unknown schema: {}", name))?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Validates a JSON file holding one document or an array of documents.
pub fn run_schema_validate(name: &str, path: &Path) -> Result<()> {
    let schema = find(name).with_context(|| format!("unknown schema: {}", name))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let docs = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut invalid = 0;
    for (i, doc) in docs.iter().enumerate() {
        let preview = schema.preview_of(doc);
        let errors = schema.validate(doc);
        if errors.is_empty() {
            println!("ok    [{}] {}", i, preview.title);
            continue;
        }
        invalid += 1;
        println!("error [{}] {}", i, preview.title);
        for e in &errors {
            println!("        {}: {}", e.field, e.message);
        }
    }

    println!();
    println!("{} documents, {} invalid", docs.len(), invalid);
    if invalid > 0 {
        bail!("{} of {} documents failed validation", invalid, docs.len());
    }
    Ok(())
}
