//! Score extraction: mapping an item to its sorted-set score.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::time::parse_item_time;
use crate::{CacheItem, Direction, ScoreError};

/// Where an item's sorted-set score comes from.
///
/// Scores are monotone doubles; re-ingesting the same rid may update its
/// score but never its identity. `ByField` inspects the item's serialized
/// body and accepts the value shapes the body can carry: timestamp
/// strings, integers, floats.
#[derive(Clone)]
pub enum ScoreSource<T> {
    /// Creation instant, epoch millis.
    ByCreatedAt,
    /// Update instant, epoch millis.
    ByUpdatedAt,
    /// A named field of the serialized body.
    ByField(String),
    /// A caller-supplied extractor.
    Computed(Arc<dyn Fn(&T) -> f64 + Send + Sync>),
}

impl<T> fmt::Debug for ScoreSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByCreatedAt => write!(f, "ByCreatedAt"),
            Self::ByUpdatedAt => write!(f, "ByUpdatedAt"),
            Self::ByField(name) => f.debug_tuple("ByField").field(name).finish(),
            Self::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

impl<T: CacheItem> ScoreSource<T> {
    /// Descending engines order live writes by creation time, ascending
    /// ones by update time.
    pub fn default_for(direction: Direction) -> Self {
        match direction {
            Direction::Descending => Self::ByCreatedAt,
            Direction::Ascending => Self::ByUpdatedAt,
        }
    }

    /// Resolve a field-name string the way callers configure it: the empty
    /// string and the creation-time aliases mean `ByCreatedAt`.
    pub fn by_field_name(name: &str) -> Self {
        match name {
            "" | "createdat" | "createdAt" => Self::ByCreatedAt,
            "updatedat" | "updatedAt" => Self::ByUpdatedAt,
            other => Self::ByField(other.to_string()),
        }
    }

    /// Extract the score for `item`.
    pub fn extract(&self, item: &T) -> Result<f64, ScoreError> {
        match self {
            Self::ByCreatedAt => Ok(item.created_at().timestamp_millis() as f64),
            Self::ByUpdatedAt => Ok(item.updated_at().timestamp_millis() as f64),
            Self::Computed(extractor) => Ok(extractor(item)),
            Self::ByField(field) => extract_field(item, field),
        }
    }
}

fn extract_field<T: CacheItem>(item: &T, field: &str) -> Result<f64, ScoreError> {
    let body = serde_json::to_value(item).map_err(|_| ScoreError::UnsupportedField {
        field: field.to_string(),
    })?;

    let value = body.get(field).ok_or_else(|| ScoreError::FieldNotFound {
        field: field.to_string(),
    })?;

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| ScoreError::UnsupportedField {
            field: field.to_string(),
        }),
        Value::String(s) => {
            // Timestamp fields serialize as strings; accept both the item
            // body layout and plain RFC-3339.
            if let Ok(t) = parse_item_time(s) {
                return Ok(t.timestamp_millis() as f64);
            }
            if let Ok(t) = chrono::DateTime::parse_from_rfc3339(s) {
                return Ok(t.timestamp_millis() as f64);
            }
            Err(ScoreError::UnsupportedField {
                field: field.to_string(),
            })
        }
        _ => Err(ScoreError::UnsupportedField {
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemBase;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ranked {
        #[serde(flatten)]
        base: ItemBase,
        views: i64,
        rating: f64,
        label: String,
    }

    impl CacheItem for Ranked {
        fn base(&self) -> &ItemBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ItemBase {
            &mut self.base
        }
    }

    fn ranked() -> Ranked {
        Ranked {
            base: ItemBase::new(),
            views: 42,
            rating: 4.5,
            label: "not a score".to_string(),
        }
    }

    #[test]
    fn test_created_at_score_is_epoch_millis() {
        let item = ranked();
        let score = ScoreSource::ByCreatedAt.extract(&item).unwrap();
        assert_eq!(score, item.created_at().timestamp_millis() as f64);
    }

    #[test]
    fn test_integer_field_widens() {
        let item = ranked();
        let score = ScoreSource::ByField("views".to_string())
            .extract(&item)
            .unwrap();
        assert_eq!(score, 42.0);
    }

    #[test]
    fn test_float_field_direct() {
        let item = ranked();
        let score = ScoreSource::ByField("rating".to_string())
            .extract(&item)
            .unwrap();
        assert_eq!(score, 4.5);
    }

    #[test]
    fn test_timestamp_string_field() {
        let item = ranked();
        let score = ScoreSource::ByField("createdat".to_string());
        // "createdat" resolves through by_field_name, but a raw ByField
        // still finds the serialized string and parses it.
        let score = score.extract(&item).unwrap();
        assert_eq!(score, item.created_at().timestamp_millis() as f64);
    }

    #[test]
    fn test_missing_field() {
        let item = ranked();
        let err = ScoreSource::ByField("nope".to_string())
            .extract(&item)
            .unwrap_err();
        assert_eq!(
            err,
            ScoreError::FieldNotFound {
                field: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_unsupported_field_type() {
        let item = ranked();
        let err = ScoreSource::ByField("label".to_string())
            .extract(&item)
            .unwrap_err();
        assert_eq!(
            err,
            ScoreError::UnsupportedField {
                field: "label".to_string()
            }
        );
    }

    #[test]
    fn test_by_field_name_aliases() {
        assert!(matches!(
            ScoreSource::<Ranked>::by_field_name(""),
            ScoreSource::ByCreatedAt
        ));
        assert!(matches!(
            ScoreSource::<Ranked>::by_field_name("createdAt"),
            ScoreSource::ByCreatedAt
        ));
        assert!(matches!(
            ScoreSource::<Ranked>::by_field_name("views"),
            ScoreSource::ByField(_)
        ));
    }

    #[test]
    fn test_computed() {
        let item = ranked();
        let source = ScoreSource::Computed(Arc::new(|r: &Ranked| r.views as f64 * 2.0));
        assert_eq!(source.extract(&item).unwrap(), 84.0);
    }

    #[test]
    fn test_default_for_direction() {
        assert!(matches!(
            ScoreSource::<Ranked>::default_for(Direction::Descending),
            ScoreSource::ByCreatedAt
        ));
        assert!(matches!(
            ScoreSource::<Ranked>::default_for(Direction::Ascending),
            ScoreSource::ByUpdatedAt
        ));
    }
}
