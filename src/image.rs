//! Image URL resolution for the asset CDN.
//!
//! Image fields hold a reference of the form `image-<id>-<W>x<H>-<format>`.
//! A reference that does not match that shape is never turned into a URL;
//! callers get [`ImageSource::Unavailable`] and render a placeholder.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{ImagesConfig, StoreConfig};
use crate::models::ImageRef;

static ASSET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^image-([A-Za-z0-9]+)-([1-9][0-9]*)x([1-9][0-9]*)-([a-z]+)$")
        .expect("asset reference pattern is valid")
});

/// A parsed, validated image asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl AssetRef {
    /// Parses `image-<id>-<W>x<H>-<format>`; `None` for anything else.
    pub fn parse(reference: &str) -> Option<Self> {
        let caps = ASSET_REF.captures(reference)?;
        Some(Self {
            id: caps[1].to_string(),
            width: caps[2].parse().ok()?,
            height: caps[3].parse().ok()?,
            format: caps[4].to_string(),
        })
    }

    /// File name on the CDN, e.g. `abc-800x600.jpg`.
    pub fn file_name(&self) -> String {
        format!("{}-{}x{}.{}", self.id, self.width, self.height, self.format)
    }

    pub fn is_vector(&self) -> bool {
        self.format == "svg"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Available { url: String, width: u32, height: u32 },
    Unavailable,
}

impl ImageSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSource::Available { url, .. } => Some(url.as_str()),
            ImageSource::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ImageSource::Available { .. })
    }
}

/// Builds sized CDN URLs for image references.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    cdn_host: String,
    project_id: String,
    dataset: String,
    placeholder: String,
}

impl ImageResolver {
    pub fn new(store: &StoreConfig, images: &ImagesConfig) -> Self {
        Self {
            cdn_host: images.cdn_host.trim_end_matches('/').to_string(),
            project_id: store.project_id.clone(),
            dataset: store.dataset.clone(),
            placeholder: images.placeholder.clone(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Resolves an optional image to a URL sized `width` x `height`.
    pub fn resolve(&self, image: Option<&ImageRef>, width: u32, height: u32) -> ImageSource {
        if width == 0 || height == 0 {
            return ImageSource::Unavailable;
        }
        let Some(asset) = image.and_then(ImageRef::asset_ref).and_then(AssetRef::parse) else {
            return ImageSource::Unavailable;
        };

        let base = format!(
            "{}/images/{}/{}/{}",
            self.cdn_host,
            self.project_id,
            self.dataset,
            asset.file_name()
        );
        let url = if asset.is_vector() {
            base
        } else {
            format!("{}?w={}&h={}&fit=crop&auto=format", base, width, height)
        };

        ImageSource::Available { url, width, height }
    }

    pub fn url_or_placeholder(&self, image: Option<&ImageRef>, width: u32, height: u32) -> String {
        match self.resolve(image, width, height) {
            ImageSource::Available { url, .. } => url,
            ImageSource::Unavailable => self.placeholder.clone(),
        }
    }
}

/// Alt text from the image, else `fallback`.
pub fn alt_text<'a>(image: Option<&'a ImageRef>, fallback: &'a str) -> &'a str {
    image
        .and_then(|i| i.alt.as_deref())
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ImageResolver {
        ImageResolver {
            cdn_host: "https://cdn.sanity.io".into(),
            project_id: "abc123".into(),
            dataset: "production".into(),
            placeholder: "/static/placeholder.svg".into(),
        }
    }

    #[test]
    fn test_parse_valid_reference() {
        let a = AssetRef::parse("image-9f2c1e-1200x800-jpg").unwrap();
        assert_eq!(a.id, "9f2c1e");
        assert_eq!((a.width, a.height), (1200, 800));
        assert_eq!(a.format, "jpg");
        assert_eq!(a.file_name(), "9f2c1e-1200x800.jpg");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "image-abc",
            "file-abc-10x10-pdf",
            "image-abc-10-jpg",
            "image-abc-0x10-jpg",
            "image-ab c-10x10-jpg",
            "image-abc-10x10-JPG",
            "https://example.com/a.jpg",
        ] {
            assert!(AssetRef::parse(bad).is_none(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_resolve_builds_sized_url() {
        let img = ImageRef::from_ref("image-9f2c1e-1200x800-jpg");
        let src = resolver().resolve(Some(&img), 400, 300);
        assert_eq!(
            src,
            ImageSource::Available {
                url: "https://cdn.sanity.io/images/abc123/production/9f2c1e-1200x800.jpg?w=400&h=300&fit=crop&auto=format".into(),
                width: 400,
                height: 300,
            }
        );
        // Deterministic.
        assert_eq!(src, resolver().resolve(Some(&img), 400, 300));
    }

    #[test]
    fn test_resolve_unavailable_cases() {
        let r = resolver();
        assert_eq!(r.resolve(None, 400, 300), ImageSource::Unavailable);
        assert_eq!(r.resolve(Some(&ImageRef::default()), 400, 300), ImageSource::Unavailable);
        assert_eq!(
            r.resolve(Some(&ImageRef::from_ref("not-an-image")), 400, 300),
            ImageSource::Unavailable
        );
        assert_eq!(
            r.resolve(Some(&ImageRef::from_ref("image-abc-10x10-png")), 0, 300),
            ImageSource::Unavailable
        );
    }

    #[test]
    fn test_svg_has_no_size_params() {
        let img = ImageRef::from_ref("image-logo-64x64-svg");
        let url = resolver().url_or_placeholder(Some(&img), 100, 100);
        assert_eq!(url, "https://cdn.sanity.io/images/abc123/production/logo-64x64.svg");
    }

    #[test]
    fn test_placeholder_fallback() {
        assert_eq!(resolver().url_or_placeholder(None, 10, 10), "/static/placeholder.svg");
    }

    #[test]
    fn test_alt_text() {
        let mut img = ImageRef::from_ref("image-a-1x1-png");
        assert_eq!(alt_text(Some(&img), "Product"), "Product");
        img.alt = Some("Front view".into());
        assert_eq!(alt_text(Some(&img), "Product"), "Front view");
        assert_eq!(alt_text(None, "Product"), "Product");
    }
}
