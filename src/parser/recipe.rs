//! HTML parser for recipe pages
//!
//! A recipe page must carry an `<h1>` title and an embedded JSON-LD recipe
//! block; pages without them are rejected. The remaining fields are pulled
//! out on a best-effort basis and left empty when the markup lacks them.

use crate::parser::{PageParser, ParseError, Record};
use crate::portal::identifier_from_url;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

/// Extracts recipe records from the portal's recipe pages
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipePageParser;

impl PageParser for RecipePageParser {
    fn parse(&self, id: &str, document: &str) -> Result<Record, ParseError> {
        let html = Html::parse_document(document);

        let title = extract_title(&html).ok_or(ParseError::MissingField("title"))?;
        let metadata =
            extract_recipe_metadata(&html).ok_or(ParseError::MissingField("recipe metadata"))?;

        tracing::debug!("Parsed title of {}: {}", id, title);

        let related = extract_related_ids(&html);

        Ok(Record::new(id, related)
            .with_field("title", title)
            .with_field("author", author_name(&metadata))
            .with_field("images", extract_images(&html))
            .with_field("keywords", keywords(&metadata))
            .with_field(
                "category",
                metadata
                    .get("recipeCategory")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            )
            .with_field("category_breadcrumbs", extract_breadcrumbs(&html))
            .with_field("ingredients", extract_ingredients(&html))
            .with_field("text", extract_preparation(&html).unwrap_or_default()))
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Collapses internal runs of whitespace into single spaces
fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_title(html: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;

    html.select(&selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Finds the first JSON-LD object that describes the recipe (carries an author)
fn extract_recipe_metadata(html: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    html.select(&selector)
        .filter_map(|script| {
            serde_json::from_str::<Value>(&script.text().collect::<String>()).ok()
        })
        .find_map(|value| match value {
            Value::Array(items) => items.into_iter().find(|item| item.get("author").is_some()),
            other if other.get("author").is_some() => Some(other),
            _ => None,
        })
}

fn author_name(metadata: &Value) -> String {
    match metadata.get("author") {
        Some(Value::String(name)) => name.clone(),
        Some(author) => author
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    }
}

fn keywords(metadata: &Value) -> Vec<String> {
    match metadata.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Full-size recipe images only
fn extract_images(html: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("amp-img[src], img[src]") else {
        return Vec::new();
    };

    let mut images: Vec<String> = Vec::new();
    for src in html
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
    {
        let is_recipe_image =
            src.contains("rezepte") && src.contains("bilder") && src.contains("960x640");
        if is_recipe_image && !images.iter().any(|known| known == src) {
            images.push(src.to_string());
        }
    }
    images
}

/// Navigation breadcrumbs without the leading home entry
fn extract_breadcrumbs(html: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("div.ds-container ol li") else {
        return Vec::new();
    };

    html.select(&selector)
        .map(|item| squash_whitespace(&element_text(item)))
        .filter(|crumb| !crumb.is_empty())
        .skip(1)
        .collect()
}

/// First `<h2>` whose text satisfies `matches`
fn find_heading<'a>(html: &'a Html, matches: impl Fn(&str) -> bool) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("h2").ok()?;
    html.select(&selector)
        .find(|heading| matches(&element_text(*heading)))
}

/// The `<div>` following a heading at the same level
fn following_div(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "div")
}

fn extract_ingredients(html: &Html) -> Vec<Value> {
    let Some(heading) = find_heading(html, |text| text == "Zutaten") else {
        return Vec::new();
    };
    let Some(container) = heading.parent().and_then(ElementRef::wrap) else {
        return Vec::new();
    };
    let (Ok(row_selector), Ok(cell_selector)) = (Selector::parse("tr"), Selector::parse("td"))
    else {
        return Vec::new();
    };

    // Each row holds the amount in its first cell and the name in its second
    container
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
            let (amount, name) = match cells.as_slice() {
                [amount, name, ..] => (*amount, *name),
                _ => return None,
            };
            let name = element_text(name);
            if name.is_empty() {
                return None;
            }
            Some(json!({
                "name": name,
                "amount": squash_whitespace(&element_text(amount)),
            }))
        })
        .collect()
}

fn extract_preparation(html: &Html) -> Option<String> {
    let heading = find_heading(html, |text| text == "Zubereitung")?;
    following_div(heading).map(element_text)
}

/// Identifiers linked from the "Weitere Rezepte" block, in page order
fn extract_related_ids(html: &Html) -> Vec<String> {
    let Some(block) =
        find_heading(html, |text| text.starts_with("Weitere Rezepte")).and_then(following_div)
    else {
        return Vec::new();
    };
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut related: Vec<String> = Vec::new();
    for id in block
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(identifier_from_url)
    {
        if !related.contains(&id) {
            related.push(id);
        }
    }
    related
}
