// Data structures shared by the listing engine, the API client and the pages

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// Which marketplace listing a view shows; selects the API endpoint path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Vehicles,
    Motorcycles,
    Containers,
}

impl ListingKind {
    pub const ALL: [ListingKind; 3] = [
        ListingKind::Vehicles,
        ListingKind::Motorcycles,
        ListingKind::Containers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListingKind::Vehicles => "vehicles",
            ListingKind::Motorcycles => "motorcycles",
            ListingKind::Containers => "containers",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ListingKind::Vehicles => "Vehicles for export",
            ListingKind::Motorcycles => "Motorcycles for export",
            ListingKind::Containers => "Shipping containers",
        }
    }
}

impl FromStr for ListingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("listing kind '{s}'"))
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MAX_PRICE: f64 = 1e12;

// A vehicle, motorcycle or container record from the search API.
// Only `id` matters to the listing engine; everything else is kept as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ListingItem {
    pub id: i64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ListingItem {
    pub fn text(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    // Non-finite or absurd prices are treated as missing
    pub fn price(&self) -> Option<f64> {
        let price = match self.attributes.get("price")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        (price.is_finite() && price.abs() <= MAX_PRICE).then_some(price)
    }

    pub fn image_urls(&self) -> Vec<&str> {
        self.attributes
            .get("imageUrls")
            .and_then(Value::as_array)
            .map(|urls| urls.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    // Containers carry a title/name, vehicles and motorcycles are named by year, brand and model
    pub fn display_title(&self) -> String {
        if let Some(title) = self.text("title").or_else(|| self.text("name")) {
            return title;
        }
        let parts: Vec<String> = ["year", "brand", "model"]
            .iter()
            .filter_map(|key| self.text(key))
            .collect();
        if parts.is_empty() {
            format!("Listing #{}", self.id)
        } else {
            parts.join(" ")
        }
    }
}

// One page of search results as returned by the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    #[serde(default)]
    pub content: Vec<ListingItem>,
    #[serde(default)]
    pub total_pages: u32,
}
