//! Record selectors.
//!
//! A selector is a small JSONPath subset that locates the records inside a
//! response body: a `$` root followed by `.field` steps and `[*]` wildcards,
//! e.g. `$.plugins[*]` or `$[*]`.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::Value;
use std::fmt;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Descend into an object field.
    Field(String),
    /// Fan out over every array element or object value.
    Wildcard,
}

/// A parsed record-selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSelector {
    segments: Vec<Segment>,
}

impl RecordSelector {
    /// Creates a selector from already-parsed segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// `$.<field>[*]`: every element of a top-level array field.
    pub fn items_of(field: &str) -> Self {
        Self::new(vec![Segment::Field(field.to_string()), Segment::Wildcard])
    }

    /// `$[*]`: every element (or value) of the root.
    pub fn root_items() -> Self {
        Self::new(vec![Segment::Wildcard])
    }

    /// Parses an expression such as `$.plugins[*]`.
    pub fn parse(expression: &str) -> ProtocolResult<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidSelector {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = expression
            .strip_prefix('$')
            .ok_or_else(|| invalid("must start with '$'"))?;
        let mut segments = Vec::new();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("[*]") {
                segments.push(Segment::Wildcard);
                rest = after;
            } else if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let name = &after[..end];
                if name.is_empty() {
                    return Err(invalid("empty field name"));
                }
                segments.push(Segment::Field(name.to_string()));
                rest = &after[end..];
            } else {
                return Err(invalid("expected '.field' or '[*]'"));
            }
        }

        Ok(Self { segments })
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Evaluates the selector against `body`.
    ///
    /// Missing fields and type mismatches yield no matches rather than an
    /// error.
    pub fn select<'a>(&self, body: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![body];
        for segment in &self.segments {
            current = match segment {
                Segment::Field(name) => current.into_iter().filter_map(|v| v.get(name)).collect(),
                Segment::Wildcard => current
                    .into_iter()
                    .flat_map(|v| -> Box<dyn Iterator<Item = &'a Value> + 'a> {
                        match v {
                            Value::Array(items) => Box::new(items.iter()),
                            Value::Object(map) => Box::new(map.values()),
                            _ => Box::new(std::iter::empty()),
                        }
                    })
                    .collect(),
            };
        }
        current
    }
}

impl fmt::Display for RecordSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Wildcard => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn parse_and_display() {
        for expr in ["$.plugins[*]", "$[*]", "$.data.items[*]", "$"] {
            assert_eq!(RecordSelector::parse(expr).unwrap().to_string(), expr);
        }
        assert_eq!(RecordSelector::items_of("themes").to_string(), "$.themes[*]");
        assert_eq!(RecordSelector::root_items().to_string(), "$[*]");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(RecordSelector::parse("plugins[*]").is_err());
        assert!(RecordSelector::parse("$..plugins").is_err());
        assert!(RecordSelector::parse("$[0]").is_err());
    }

    #[test]
    fn selects_array_items() {
        let body = json!({
            "info": {"page": 1, "pages": 3},
            "plugins": [{"slug": "a"}, {"slug": "b"}]
        });
        let selected = RecordSelector::items_of("plugins").select(&body);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1]["slug"], "b");
    }

    #[test]
    fn missing_field_selects_nothing() {
        let body = json!({"info": {}});
        assert!(RecordSelector::items_of("plugins").select(&body).is_empty());

        let body = json!({"plugins": "not-a-list"});
        assert!(RecordSelector::items_of("plugins").select(&body).is_empty());
    }

    #[test]
    fn wildcard_over_object_yields_values() {
        let body = json!({"6.4": "10", "6.3": "20"});
        let selected = RecordSelector::root_items().select(&body);
        assert_eq!(selected, vec![&json!("10"), &json!("20")]);
    }

    proptest! {
        #[test]
        fn parse_display_roundtrip(
            fields in proptest::collection::vec(("[a-z_][a-z0-9_]{0,12}", any::<bool>()), 0..5)
        ) {
            let expression: String = std::iter::once("$".to_string())
                .chain(fields.iter().map(|(name, wildcard)| {
                    if *wildcard { format!(".{name}[*]") } else { format!(".{name}") }
                }))
                .collect();
            let selector = RecordSelector::parse(&expression).unwrap();
            prop_assert_eq!(selector.to_string(), expression);
            let expected = fields.iter().map(|(_, w)| if *w { 2 } else { 1 }).sum::<usize>();
            prop_assert_eq!(selector.segments().len(), expected);
        }

        #[test]
        fn items_of_selects_every_element(name in "[a-z]{1,10}", count in 0usize..50) {
            let mut map = serde_json::Map::new();
            map.insert(name.clone(), json!(vec![json!({"id": 1}); count]));
            let body = Value::Object(map);
            prop_assert_eq!(RecordSelector::items_of(&name).select(&body).len(), count);
        }
    }
}
