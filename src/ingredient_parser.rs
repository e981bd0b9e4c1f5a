//! Ingredient annotations embedded in meal text.
//!
//! Two forms are recognised:
//! - `{150g of {Bananas, raw}}`: a prefix, optionally `of` and filler words,
//!   then the ingredient in inner braces. Only a prefix starting with
//!   `<number>g` (space optional) carries a quantity; `{pinch of {salt}}` or
//!   `{2 1/4 teaspoons of {yeast}}` yield a mention without one.
//! - `{{thyme}}`: shorthand, never a quantity.
//!
//! Ingredient names are kept verbatim apart from trimming, commas included.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::ParseError;

static ANNOTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^{}]*)\}\}|\{([^{}]*)\{([^{}]*?)\}\s*\}").expect("annotation regex")
});

static GRAM_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*g\b").expect("gram prefix regex"));

/// One ingredient annotation found in meal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMention {
    /// `None` when the annotation gives no gram quantity.
    pub quantity_grams: Option<f64>,
    pub ingredient_name: String,
    /// Exact annotation text, for substitution by a presentation layer.
    pub raw_span: String,
    /// Byte range of `raw_span` in the parsed text.
    pub span: Range<usize>,
}

fn gram_quantity(prefix: &str) -> Option<f64> {
    GRAM_PREFIX_REGEX
        .captures(prefix)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn classify(caps: &Captures<'_>) -> Result<IngredientMention, ParseError> {
    let Some(full) = caps.get(0) else {
        return Err(ParseError::MalformedAnnotation {
            raw: String::new(),
            reason: "empty match",
        });
    };

    let (quantity_grams, name) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(shorthand), _, _) => (None, shorthand.as_str()),
        (None, Some(prefix), Some(inner)) => (gram_quantity(prefix.as_str()), inner.as_str()),
        _ => {
            return Err(ParseError::MalformedAnnotation {
                raw: full.as_str().to_string(),
                reason: "unrecognised annotation form",
            })
        }
    };

    let ingredient_name = name.trim();
    if ingredient_name.is_empty() {
        return Err(ParseError::MalformedAnnotation {
            raw: full.as_str().to_string(),
            reason: "empty ingredient name",
        });
    }

    Ok(IngredientMention {
        quantity_grams,
        ingredient_name: ingredient_name.to_string(),
        raw_span: full.as_str().to_string(),
        span: full.range(),
    })
}

/// Every annotation in `text`, left to right, as parse results. Malformed
/// annotations appear as errors; callers usually want [`parse_ingredients`].
pub fn scan_annotations(text: &str) -> impl Iterator<Item = Result<IngredientMention, ParseError>> + '_ {
    ANNOTATION_REGEX.captures_iter(text).map(|caps| classify(&caps))
}

/// Ingredient mentions in `text`. Malformed annotations are skipped.
pub fn parse_ingredients(text: &str) -> Vec<IngredientMention> {
    scan_annotations(text)
        .filter_map(|result| match result {
            Ok(mention) => Some(mention),
            Err(e) => {
                debug!("skipping annotation: {}", e);
                None
            }
        })
        .collect()
}

/// Parses a single annotation such as `{150g of {salt}}`. The whole input
/// (ignoring surrounding whitespace) must be one annotation.
pub fn parse_mention(raw: &str) -> Result<IngredientMention, ParseError> {
    let trimmed = raw.trim();
    let malformed = |reason| ParseError::MalformedAnnotation {
        raw: raw.to_string(),
        reason,
    };
    let caps = ANNOTATION_REGEX
        .captures(trimmed)
        .ok_or_else(|| malformed("not an ingredient annotation"))?;
    if caps.get(0).map(|m| m.range()) != Some(0..trimmed.len()) {
        return Err(malformed("trailing text around annotation"));
    }
    classify(&caps)
}

/// Rewrites every well-formed annotation with `replace`, leaving the rest of
/// the text (including malformed annotations) untouched.
pub fn replace_mentions(text: &str, mut replace: impl FnMut(&IngredientMention) -> String) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for mention in parse_ingredients(text) {
        output.push_str(&text[last..mention.span.start]);
        output.push_str(&replace(&mention));
        last = mention.span.end;
    }
    output.push_str(&text[last..]);
    output
}
