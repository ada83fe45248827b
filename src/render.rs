//! Server-side HTML fragments for the public pages.
//!
//! Markup only carries class names; styling lives outside this crate. All
//! text and attribute values pass through [`escape`].

use serde_json::Value;

use crate::image::{alt_text, ImageResolver};
use crate::models::{
    Achievement, Certification, Client, Event, Installation, Post, PostCategory, Product,
    ProductCollection, TeamMember,
};

const CARD_W: u32 = 600;
const CARD_H: u32 = 400;
const PORTRAIT_W: u32 = 400;
const PORTRAIT_H: u32 = 500;
const LOGO_W: u32 = 240;
const LOGO_H: u32 = 120;
const HERO_W: u32 = 1600;
const HERO_H: u32 = 900;

/// Escapes `& < > " '` for use in text and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn img(src: &str, alt: &str, width: u32, height: u32) -> String {
    format!(
        r#"<img src="{}" alt="{}" width="{}" height="{}" loading="lazy">"#,
        escape(src),
        escape(alt),
        width,
        height
    )
}

fn opt_p(class: &str, text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!(r#"<p class="{}">{}</p>"#, class, escape(t)),
        None => String::new(),
    }
}

/// Anything that renders as a card in a grid.
pub trait Card {
    fn render_card(&self, images: &ImageResolver) -> String;
}

/// Shown in place of a grid with no items.
#[derive(Debug, Clone)]
pub struct EmptyState {
    pub title: String,
    pub message: String,
}

impl EmptyState {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            r#"<div class="empty-state"><h3>{}</h3><p>{}</p></div>"#,
            escape(&self.title),
            escape(&self.message)
        )
    }

    pub fn products() -> Self {
        Self::new(
            "No products found",
            "Try a different search term or clear the category filter.",
        )
    }

    pub fn posts() -> Self {
        Self::new("No articles yet", "Check back soon for news and updates.")
    }

    pub fn events() -> Self {
        Self::new("No events scheduled", "New events will be announced here.")
    }

    pub fn projects() -> Self {
        Self::new("No projects to show", "Our latest installations will appear here.")
    }

    pub fn team() -> Self {
        Self::new("Team coming soon", "Meet the people behind our work shortly.")
    }
}

/// A grid of cards, or the empty state when `items` is empty.
pub fn grid<T: Card>(items: &[T], images: &ImageResolver, empty: &EmptyState) -> String {
    if items.is_empty() {
        return empty.render();
    }
    let cards: String = items.iter().map(|i| i.render_card(images)).collect();
    format!(r#"<div class="grid">{}</div>"#, cards)
}

/// Loading placeholder with `count` blank cards.
pub fn skeleton_grid(count: usize) -> String {
    let card = r#"<div class="card skeleton" aria-hidden="true"><div class="skeleton-image"></div><div class="skeleton-line"></div><div class="skeleton-line short"></div></div>"#;
    format!(
        r#"<div class="grid" aria-busy="true">{}</div>"#,
        card.repeat(count)
    )
}

impl Card for Product {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.cover(), CARD_W, CARD_H);
        let collection = self
            .collection
            .as_ref()
            .map(|c| format!(r#"<span class="badge">{}</span>"#, escape(&c.title)))
            .unwrap_or_default();
        format!(
            r#"<article class="card product-card"><a href="/products/{}">{}<h3>{}</h3></a>{}{}</article>"#,
            escape(&self.slug),
            img(&src, alt_text(self.cover(), &self.title), CARD_W, CARD_H),
            escape(&self.title),
            collection,
            opt_p("summary", self.description.as_deref()),
        )
    }
}

impl Card for ProductCollection {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.image.as_ref(), CARD_W, CARD_H);
        format!(
            r#"<article class="card collection-card"><a href="/products?category={}">{}<h3>{}</h3></a>{}</article>"#,
            escape(&self.slug),
            img(&src, alt_text(self.image.as_ref(), &self.title), CARD_W, CARD_H),
            escape(&self.title),
            opt_p("summary", self.description.as_deref()),
        )
    }
}

impl Card for TeamMember {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.image.as_ref(), PORTRAIT_W, PORTRAIT_H);
        format!(
            r#"<article class="card team-card">{}<h3>{}</h3><p class="role">{}</p>{}</article>"#,
            img(&src, alt_text(self.image.as_ref(), &self.name), PORTRAIT_W, PORTRAIT_H),
            escape(&self.name),
            escape(&self.role),
            opt_p("bio", self.bio.as_deref()),
        )
    }
}

impl Card for Event {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.image.as_ref(), CARD_W, CARD_H);
        let when = self
            .date
            .as_deref()
            .map(|d| format!(r#"<time datetime="{0}">{0}</time>"#, escape(d)))
            .unwrap_or_default();
        format!(
            r#"<article class="card event-card"><a href="/events/{}">{}<h3>{}</h3></a>{}{}</article>"#,
            escape(&self.slug),
            img(&src, alt_text(self.image.as_ref(), &self.title), CARD_W, CARD_H),
            escape(&self.title),
            when,
            opt_p("location", self.location.as_deref()),
        )
    }
}

impl Card for Achievement {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.image.as_ref(), CARD_W, CARD_H);
        let year = self
            .year
            .map(|y| format!(r#"<span class="year">{}</span>"#, y))
            .unwrap_or_default();
        format!(
            r#"<article class="card achievement-card">{}<h3>{}</h3>{}{}</article>"#,
            img(&src, alt_text(self.image.as_ref(), &self.title), CARD_W, CARD_H),
            escape(&self.title),
            year,
            opt_p("summary", self.description.as_deref()),
        )
    }
}

impl Card for Certification {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.image.as_ref(), LOGO_W, LOGO_H);
        format!(
            r#"<article class="card certification-card">{}<h3>{}</h3>{}</article>"#,
            img(&src, alt_text(self.image.as_ref(), &self.title), LOGO_W, LOGO_H),
            escape(&self.title),
            opt_p("issuer", self.issuer.as_deref()),
        )
    }
}

impl Card for Installation {
    fn render_card(&self, images: &ImageResolver) -> String {
        let cover = self.images.first();
        let src = images.url_or_placeholder(cover, CARD_W, CARD_H);
        format!(
            r#"<article class="card project-card">{}<h3>{}</h3>{}{}{}</article>"#,
            img(&src, alt_text(cover, &self.title), CARD_W, CARD_H),
            escape(&self.title),
            opt_p("client", self.client.as_deref()),
            opt_p("location", self.location.as_deref()),
            opt_p("summary", self.description.as_deref()),
        )
    }
}

impl Card for Client {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.logo.as_ref(), LOGO_W, LOGO_H);
        let logo = img(&src, alt_text(self.logo.as_ref(), &self.name), LOGO_W, LOGO_H);
        match self.website.as_deref() {
            Some(site) => format!(
                r#"<div class="client-logo"><a href="{}" rel="noopener">{}</a></div>"#,
                escape(site),
                logo
            ),
            None => format!(r#"<div class="client-logo">{}</div>"#, logo),
        }
    }
}

impl Card for Post {
    fn render_card(&self, images: &ImageResolver) -> String {
        let src = images.url_or_placeholder(self.main_image.as_ref(), CARD_W, CARD_H);
        let date = self
            .published_at
            .map(|d| {
                format!(
                    r#"<time datetime="{}">{}</time>"#,
                    d.to_rfc3339(),
                    d.format("%B %-d, %Y")
                )
            })
            .unwrap_or_default();
        format!(
            r#"<article class="card post-card"><a href="/blog/{}">{}<h3>{}</h3></a>{}{}</article>"#,
            escape(&self.slug),
            img(&src, alt_text(self.main_image.as_ref(), &self.title), CARD_W, CARD_H),
            escape(&self.title),
            date,
            opt_p("summary", self.excerpt.as_deref()),
        )
    }
}

/// Category links for a listing page; `active` is the current filter value.
pub fn category_filter(base: &str, categories: &[(String, String)], active: Option<&str>) -> String {
    if categories.is_empty() {
        return String::new();
    }
    let active: Vec<String> = active.map(crate::query::parse_categories).unwrap_or_default();
    let mut links = format!(
        r#"<a href="{}"{}>All</a>"#,
        base,
        if active.is_empty() { r#" class="active""# } else { "" }
    );
    for (slug, title) in categories {
        let class = if active.iter().any(|a| a == slug) {
            r#" class="active""#
        } else {
            ""
        };
        links.push_str(&format!(
            r#"<a href="{}?category={}"{}>{}</a>"#,
            base,
            escape(slug),
            class,
            escape(title)
        ));
    }
    format!(r#"<nav class="filters">{}</nav>"#, links)
}

pub fn collection_links(collections: &[ProductCollection]) -> Vec<(String, String)> {
    collections
        .iter()
        .map(|c| (c.slug.clone(), c.title.clone()))
        .collect()
}

pub fn category_links(categories: &[PostCategory]) -> Vec<(String, String)> {
    categories
        .iter()
        .map(|c| (c.slug.clone(), c.title.clone()))
        .collect()
}

pub fn search_form(action: &str, search: Option<&str>, category: Option<&str>) -> String {
    let hidden = category
        .map(|c| format!(r#"<input type="hidden" name="category" value="{}">"#, escape(c)))
        .unwrap_or_default();
    format!(
        r#"<form class="search" method="get" action="{}"><input type="search" name="search" value="{}" placeholder="Search">{}<button type="submit">Search</button></form>"#,
        action,
        escape(search.unwrap_or("")),
        hidden
    )
}

pub fn product_detail(product: &Product, images: &ImageResolver) -> String {
    let gallery: String = product
        .images
        .iter()
        .filter_map(|i| {
            images
                .resolve(Some(i), HERO_W, HERO_H)
                .url()
                .map(|u| img(u, alt_text(Some(i), &product.title), HERO_W, HERO_H))
        })
        .collect();
    let gallery = if gallery.is_empty() {
        img(images.placeholder(), &product.title, HERO_W, HERO_H)
    } else {
        gallery
    };
    let features = if product.features.is_empty() {
        String::new()
    } else {
        let items: String = product
            .features
            .iter()
            .map(|f| format!("<li>{}</li>", escape(f)))
            .collect();
        format!(r#"<ul class="features">{}</ul>"#, items)
    };
    let back = product
        .collection
        .as_ref()
        .and_then(|c| {
            c.slug.as_deref().map(|s| {
                format!(
                    r#"<a class="back" href="/products?category={}">{}</a>"#,
                    escape(s),
                    escape(&c.title)
                )
            })
        })
        .unwrap_or_else(|| r#"<a class="back" href="/products">All products</a>"#.to_string());
    format!(
        r#"<article class="product-detail">{}<div class="gallery">{}</div><h1>{}</h1>{}{}</article>"#,
        back,
        gallery,
        escape(&product.title),
        opt_p("description", product.description.as_deref()),
        features
    )
}

pub fn event_detail(event: &Event, images: &ImageResolver) -> String {
    let src = images.url_or_placeholder(event.image.as_ref(), HERO_W, HERO_H);
    format!(
        r#"<article class="event-detail">{}<h1>{}</h1>{}{}{}</article>"#,
        img(&src, alt_text(event.image.as_ref(), &event.title), HERO_W, HERO_H),
        escape(&event.title),
        opt_p("date", event.date.as_deref()),
        opt_p("location", event.location.as_deref()),
        opt_p("description", event.description.as_deref()),
    )
}

pub fn post_detail(post: &Post, images: &ImageResolver) -> String {
    let hero = match images.resolve(post.main_image.as_ref(), HERO_W, HERO_H).url() {
        Some(url) => img(url, alt_text(post.main_image.as_ref(), &post.title), HERO_W, HERO_H),
        None => String::new(),
    };
    let byline = match (&post.author, post.published_at) {
        (Some(a), Some(d)) => format!("By {} on {}", a, d.format("%B %-d, %Y")),
        (Some(a), None) => format!("By {}", a),
        (None, Some(d)) => d.format("%B %-d, %Y").to_string(),
        (None, None) => String::new(),
    };
    format!(
        r#"<article class="post-detail">{}<h1>{}</h1>{}<div class="body">{}</div></article>"#,
        hero,
        escape(&post.title),
        opt_p("byline", Some(byline.as_str())),
        portable_text(&post.body)
    )
}

/// Flattens portable-text blocks to paragraphs, headings and list items.
/// Marks and annotations are dropped; only span text is kept.
pub fn portable_text(body: &Value) -> String {
    let Some(blocks) = body.as_array() else {
        return String::new();
    };
    let mut out = String::new();
    let mut in_list = false;
    for block in blocks {
        if block["_type"] != "block" {
            continue;
        }
        let text: String = block["children"]
            .as_array()
            .map(|spans| {
                spans
                    .iter()
                    .filter_map(|s| s["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let is_item = block.get("listItem").is_some_and(|l| !l.is_null());

        if is_item && !in_list {
            out.push_str("<ul>");
            in_list = true;
        } else if !is_item && in_list {
            out.push_str("</ul>");
            in_list = false;
        }

        let tag = if is_item {
            "li"
        } else {
            match block["style"].as_str().unwrap_or("normal") {
                "h2" => "h2",
                "h3" => "h3",
                "h4" => "h4",
                "blockquote" => "blockquote",
                _ => "p",
            }
        };
        out.push_str(&format!("<{0}>{1}</{0}>", tag, escape(&text)));
    }
    if in_list {
        out.push_str("</ul>");
    }
    out
}

pub fn contact_form() -> String {
    r#"<form class="contact-form" method="post" action="/api/contact">
<label>Name <input name="name" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Phone <input name="phone" type="tel"></label>
<label>Message <textarea name="message" required></textarea></label>
<button type="submit">Send</button>
</form>"#
        .to_string()
}

/// Page-level SEO metadata.
#[derive(Debug, Clone, Default)]
pub struct SeoMeta {
    pub title: String,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub image: Option<String>,
}

impl SeoMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| truncate_chars(d, 160));
        self
    }

    pub fn canonical(mut self, base_url: Option<&str>, path: &str) -> Self {
        self.canonical = base_url.map(|b| format!("{}{}", b.trim_end_matches('/'), path));
        self
    }

    pub fn image(mut self, url: Option<String>) -> Self {
        self.image = url;
        self
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Full HTML document around `body`.
pub fn page(site_name: &str, meta: &SeoMeta, body: &str) -> String {
    let title = if meta.title.is_empty() {
        site_name.to_string()
    } else {
        format!("{} | {}", meta.title, site_name)
    };
    let mut head = format!(
        r#"<meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{0}</title><meta property="og:title" content="{0}"><meta property="og:site_name" content="{1}">"#,
        escape(&title),
        escape(site_name)
    );
    if let Some(ref d) = meta.description {
        head.push_str(&format!(
            r#"<meta name="description" content="{0}"><meta property="og:description" content="{0}">"#,
            escape(d)
        ));
    }
    if let Some(ref c) = meta.canonical {
        head.push_str(&format!(
            r#"<link rel="canonical" href="{0}"><meta property="og:url" content="{0}">"#,
            escape(c)
        ));
    }
    if let Some(ref i) = meta.image {
        head.push_str(&format!(r#"<meta property="og:image" content="{}">"#, escape(i)));
    }
    format!(
        r#"<!DOCTYPE html><html lang="en"><head>{}</head><body><header><nav class="site-nav"><a href="/">Home</a><a href="/products">Products</a><a href="/projects">Projects</a><a href="/blog">Blog</a><a href="/events">Events</a><a href="/team">Team</a><a href="/contact">Contact</a></nav></header><main>{}</main></body></html>"#,
        head, body
    )
}
