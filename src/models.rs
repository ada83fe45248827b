//! Content records as they come back from the store.
//!
//! Queries project store documents into these shapes: `_id` becomes `id`,
//! slug objects are flattened to their `current` string, and referenced
//! documents are expanded into small summaries. Field names follow the
//! store's camelCase convention on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to an uploaded image asset, with optional alt text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetPointer>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPointer {
    #[serde(rename = "_ref")]
    pub reference: String,
}

impl ImageRef {
    pub fn from_ref(reference: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetPointer {
                reference: reference.into(),
            }),
            alt: None,
        }
    }

    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.reference.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub collection: Option<CollectionSummary>,
    #[serde(default)]
    pub order: Option<u32>,
}

impl Product {
    /// First image in display order.
    pub fn cover(&self) -> Option<&ImageRef> {
        self.images.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCollection {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub is_director: bool,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// A completed installation, shown on the projects page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: Option<ImageRef>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Portable-text blocks, only present on detail queries.
    #[serde(default)]
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCategory {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    New,
    Read,
    Responded,
    Archived,
}

impl SubmissionStatus {
    pub const ALL: [&'static str; 4] = ["new", "read", "responded", "archived"];
}

/// A contact-form submission, created once and then only edited by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub status: SubmissionStatus,
}

impl ContactSubmission {
    /// Store document for this submission.
    pub fn to_document(&self, id: &str) -> serde_json::Value {
        serde_json::json!({
            "_id": id,
            "_type": "contactSubmission",
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "message": self.message,
            "submittedAt": self.submitted_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "status": self.status,
        })
    }
}

/// Arrays the store never wrote come back as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_from_projection() {
        let p: Product = serde_json::from_value(json!({
            "_id": "p1",
            "title": "Solar Panel",
            "slug": "solar-panel",
            "features": null,
            "images": [{ "asset": { "_ref": "image-abc-800x600-jpg" }, "alt": "Panel" }],
            "collection": { "_id": "c1", "title": "Panels", "slug": "panels" },
            "order": 2
        }))
        .unwrap();

        assert!(p.features.is_empty());
        assert_eq!(p.cover().and_then(|i| i.asset_ref()), Some("image-abc-800x600-jpg"));
        assert_eq!(p.collection.unwrap().slug.as_deref(), Some("panels"));
        assert_eq!(p.order, Some(2));
    }

    #[test]
    fn test_team_member_director_flag() {
        let m: TeamMember = serde_json::from_value(json!({
            "_id": "t1", "name": "Ada", "role": "CEO", "isDirector": true
        }))
        .unwrap();
        assert!(m.is_director);
        assert!(m.image.is_none());
    }

    #[test]
    fn test_contact_submission_document_shape() {
        let sub = ContactSubmission {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
            message: "Hello".into(),
            submitted_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            status: SubmissionStatus::New,
        };
        let doc = sub.to_document("contactSubmission.x");
        assert_eq!(doc["_type"], "contactSubmission");
        assert_eq!(doc["status"], "new");
        assert_eq!(doc["submittedAt"], "2026-01-02T03:04:05Z");
        assert!(doc["phone"].is_null());
    }
}
