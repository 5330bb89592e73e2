//! Free-text product recommendations: a model ranks a catalogue snapshot and a
//! keyword scorer takes over when the model cannot be used.

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::ai::{generate_with_fallback, AiError, GenerativeModel, Part, RECOMMENDATION_MODELS};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::services::catalog::json_list;

/// Upper bound on products sent to the model.
pub const CATALOGUE_SNAPSHOT: u64 = 100;

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*?\]").unwrap());

/// What the model sees for each product.
#[derive(Clone, Debug, Serialize)]
pub struct CatalogueEntry {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
    pub description: String,
    pub color: Value,
    pub tags: Value,
}

impl CatalogueEntry {
    pub fn new(product: product::Model) -> Self {
        let image = product.primary_image().unwrap_or_default();
        Self {
            id: product.id.to_string(),
            name: product.name,
            price: product.price,
            image,
            category: product.category.unwrap_or_default(),
            description: product.description,
            color: product.color,
            tags: product.tags,
        }
    }

    fn summary(&self) -> Recommended {
        Recommended {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            category: self.category.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommended {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
}

/// Outcome of a recommendation run. Both arms carry the same product shape.
#[derive(Debug, PartialEq)]
pub enum Recommendations {
    Model(Vec<Recommended>),
    Keyword(Vec<Recommended>),
}

impl Recommendations {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Recommendations::Keyword(_))
    }

    pub fn into_products(self) -> Vec<Recommended> {
        match self {
            Recommendations::Model(products) | Recommendations::Keyword(products) => products,
        }
    }
}

pub async fn load_catalogue<C>(db: &C) -> Result<Vec<CatalogueEntry>, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    Ok(ProductEntity::find()
        .limit(CATALOGUE_SNAPSHOT)
        .all(db)
        .await?
        .into_iter()
        .map(CatalogueEntry::new)
        .collect())
}

pub fn build_prompt(query: &str, catalogue: &[CatalogueEntry], limit: usize) -> String {
    let products = serde_json::to_string_pretty(catalogue).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"You are a fashion recommendation assistant. Based on the user's request: "{query}"

Here are the available products:
{products}

Analyze the user's request and recommend the most relevant products. Consider:
- Product category and type
- Description and features
- Price range
- Tags and colors
- User's intent and preferences

Return ONLY a JSON array of product IDs that best match the user's request. Return maximum {limit} products.
Format: ["product_id_1", "product_id_2", ...]

Do not include any explanation, only the JSON array."#
    )
}

/// Pulls the id array out of model text, tolerating markdown fences and prose
/// around the array. Ids may be strings or numbers.
pub fn parse_ids(text: &str) -> Result<Vec<String>, AiError> {
    let mut text = text.trim();
    if let Some(fenced) = text.strip_prefix("```") {
        text = fenced.split("```").next().unwrap_or_default();
        text = text.strip_prefix("json").unwrap_or(text).trim();
    }
    let array = JSON_ARRAY.find(text).map_or(text, |m| m.as_str());

    let values: Vec<Value> =
        serde_json::from_str(array).map_err(|err| AiError::Parse(err.to_string()))?;
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(id) => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
        .collect())
}

/// Resolves ids against the snapshot in the order the model gave them.
pub fn resolve(ids: &[String], catalogue: &[CatalogueEntry], limit: usize) -> Vec<Recommended> {
    ids.iter()
        .take(limit)
        .filter_map(|id| catalogue.iter().find(|entry| &entry.id == id))
        .map(CatalogueEntry::summary)
        .collect()
}

/// Keeps products where any whitespace-separated keyword appears in the name,
/// category, description or a tag. Catalogue order, capped at `limit`.
pub fn keyword_match(query: &str, catalogue: &[CatalogueEntry], limit: usize) -> Vec<Recommended> {
    let query = query.to_lowercase();
    let keywords: Vec<&str> = query.split_whitespace().collect();
    let mentions = |field: &str| {
        let field = field.to_lowercase();
        keywords.iter().any(|kw| field.contains(kw))
    };

    catalogue
        .iter()
        .filter(|entry| {
            mentions(entry.name.as_str())
                || mentions(entry.category.as_str())
                || mentions(entry.description.as_str())
                || json_list(&entry.tags).iter().any(|tag| mentions(tag.as_str()))
        })
        .take(limit)
        .map(CatalogueEntry::summary)
        .collect()
}

async fn ask_model(
    ai: &dyn GenerativeModel,
    query: &str,
    catalogue: &[CatalogueEntry],
    limit: usize,
) -> Result<Vec<Recommended>, AiError> {
    let prompt = build_prompt(query, catalogue, limit);
    let generation =
        generate_with_fallback(ai, &RECOMMENDATION_MODELS, vec![Part::Text(prompt)]).await?;
    let text = generation
        .text
        .ok_or_else(|| AiError::EmptyResponse("recommendation".to_string()))?;
    let ids = parse_ids(&text)?;
    Ok(resolve(&ids, catalogue, limit))
}

/// Asks the model first; any failure there switches to keyword matching.
pub async fn recommend(
    ai: &dyn GenerativeModel,
    query: &str,
    catalogue: &[CatalogueEntry],
    limit: usize,
) -> Recommendations {
    match ask_model(ai, query, catalogue, limit).await {
        Ok(products) => Recommendations::Model(products),
        Err(err) => {
            warn!(error = %err, "Recommendation model unavailable, using keyword match");
            Recommendations::Keyword(keyword_match(query, catalogue, limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, name: &str, category: &str, tags: Value) -> CatalogueEntry {
        CatalogueEntry {
            id: id.into(),
            name: name.into(),
            price: 20.0,
            image: format!("/{id}.png"),
            category: category.into(),
            description: String::new(),
            color: json!([]),
            tags,
        }
    }

    #[test]
    fn parses_fenced_output() {
        let text = "```json\n[\"a\", \"b\"]\n```";
        assert_eq!(parse_ids(text).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn parses_array_inside_prose_and_numeric_ids() {
        let text = "Sure! Here you go: [3, \"7\"] hope that helps";
        assert_eq!(parse_ids(text).unwrap(), vec!["3", "7"]);
    }

    #[test]
    fn rejects_text_without_an_array() {
        assert!(matches!(parse_ids("no idea"), Err(AiError::Parse(_))));
    }

    #[test]
    fn resolve_skips_unknown_ids_and_keeps_model_order() {
        let catalogue = [entry("a", "A", "", json!([])), entry("b", "B", "", json!([]))];
        let ids = vec!["b".to_string(), "zzz".to_string(), "a".to_string()];
        let names: Vec<String> = resolve(&ids, &catalogue, 10).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn keyword_match_checks_name_category_and_tags() {
        let catalogue = [
            entry("1", "Linen Shirt", "Shirts", json!([])),
            entry("2", "Denim", "Jeans", json!(["Summer Sale"])),
            entry("3", "Boots", "Shoes", json!([])),
        ];
        let ids: Vec<String> = keyword_match("summer SHIRT", &catalogue, 10)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        assert_eq!(keyword_match("summer shirt", &catalogue, 1).len(), 1);
    }

    #[test]
    fn prompt_embeds_query_and_limit() {
        let prompt = build_prompt("beach wear", &[entry("1", "Hat", "", json!([]))], 5);
        assert!(prompt.contains(r#"Based on the user's request: "beach wear""#));
        assert!(prompt.contains("Return maximum 5 products."));
        assert!(prompt.contains("\"name\": \"Hat\""));
    }
}
