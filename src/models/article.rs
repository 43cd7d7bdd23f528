// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::utils::format_date;

/// A news article as stored by the aggregation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub sentiment_confidence: Option<f64>,
    pub published_at: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub save_count: i64,
    /// Present only when the request was authenticated.
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_saved: bool,
}

impl NewsArticle {
    pub fn title_display(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Sentiment label with confidence, e.g. "positive (92%)"
    pub fn sentiment_display(&self) -> String {
        match (&self.sentiment, self.sentiment_confidence) {
            (Some(label), Some(conf)) => format!("{} ({:.0}%)", label, conf * 100.0),
            (Some(label), None) => label.clone(),
            _ => "-".to_string(),
        }
    }

    pub fn published_display(&self) -> String {
        self.published_at
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "-".to_string())
    }
}

/// One page of a news listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsPage {
    pub results: Vec<NewsArticle>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

/// A selectable news category from `GET /news/categories/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub value: String,
    pub label: String,
}

/// Listing sort order accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    PublishedAt,
    ViewCount,
    LikeCount,
}

impl SortField {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::PublishedAt => "published_at",
            SortField::ViewCount => "view_count",
            SortField::LikeCount => "like_count",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "published_at" | "published" => Some(SortField::PublishedAt),
            "view_count" | "views" => Some(SortField::ViewCount),
            "like_count" | "likes" => Some(SortField::LikeCount),
            _ => None,
        }
    }
}

/// Filter and paging parameters for the news listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct NewsQuery {
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<SortField>,
}

impl NewsQuery {
    /// Render as query parameters, skipping unset filters.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref v) = self.category {
            params.push(("category", v.clone()));
        }
        if let Some(ref v) = self.sentiment {
            params.push(("sentiment", v.clone()));
        }
        if let Some(ref v) = self.search {
            params.push(("search", v.clone()));
        }
        if let Some(ref v) = self.date_from {
            params.push(("date_from", v.clone()));
        }
        if let Some(ref v) = self.date_to {
            params.push(("date_to", v.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("page_size", size.to_string()));
        }
        if let Some(sort) = self.sort_by {
            params.push(("sort_by", sort.as_param().to_string()));
        }
        params
    }
}
