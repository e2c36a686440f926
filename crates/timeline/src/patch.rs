use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Frame, Layer, Position, Size, TimelineError};

/// Keys a patch can never overwrite.
const PROTECTED_KEYS: [&str; 2] = ["id", "type"];

/// Partial update for a layer, in the layer's wire form (camelCase keys).
///
/// Applied as a shallow merge: each top-level key replaces the layer's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerPatch(Map<String, Value>);

impl LayerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts any JSON object; anything else is an empty patch.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.set("name", name.into())
    }

    pub fn frames(self, start: Frame, end: Frame) -> Self {
        self.set("startFrame", start).set("endFrame", end)
    }

    pub fn visible(self, visible: bool) -> Self {
        self.set("visible", visible)
    }

    pub fn locked(self, locked: bool) -> Self {
        self.set("locked", locked)
    }

    pub fn opacity(self, opacity: f32) -> Self {
        self.set("opacity", f64::from(opacity))
    }

    pub fn position(self, position: Position) -> Self {
        self.set(
            "position",
            serde_json::json!({ "x": position.x, "y": position.y }),
        )
    }

    pub fn size(self, size: Size) -> Self {
        self.set(
            "size",
            serde_json::json!({ "width": size.width, "height": size.height }),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merges the patch onto a copy of `layer`. The result must still be a
    /// valid layer of the same variant.
    pub fn apply_to(&self, layer: &Layer) -> Result<Layer, TimelineError> {
        let mut value = serde_json::to_value(layer)?;
        if let Value::Object(fields) = &mut value {
            for (key, patch_value) in &self.0 {
                if PROTECTED_KEYS.contains(&key.as_str()) {
                    tracing::debug!(layer = %layer.id, key = %key, "ignoring protected patch key");
                    continue;
                }
                fields.insert(key.clone(), patch_value.clone());
            }
        }
        serde_json::from_value(value).map_err(|source| TimelineError::InvalidPatch {
            id: layer.id.clone(),
            source,
        })
    }
}
