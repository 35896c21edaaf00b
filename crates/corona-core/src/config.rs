use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::map::Entry;

/// Loosely typed chart option bag.
///
/// Option fragments (library defaults, caller overrides) are layered as plain JSON and only
/// deserialized into a typed options struct once every layer is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig(Value);

impl ChartConfig {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(Self(serde_json::from_str(text)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Layers `overrides` on top. Objects merge per key; arrays, scalars and `null` replace.
    pub fn merged(mut self, overrides: &Value) -> Self {
        overlay(&mut self.0, overrides);
        self
    }

    /// Deserializes the bag into a typed options struct.
    pub fn parse<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(T::deserialize(&self.0)?)
    }
}

fn overlay(target: &mut Value, overrides: &Value) {
    let (Value::Object(slots), Value::Object(fields)) = (&mut *target, overrides) else {
        *target = overrides.clone();
        return;
    };
    for (name, value) in fields {
        match slots.entry(name.as_str()) {
            Entry::Occupied(mut slot) => overlay(slot.get_mut(), value),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_keep_untouched_keys() {
        let cfg = ChartConfig::from_value(json!({
            "transition": { "duration": 320, "delay": 0 },
            "navigation": { "rootLabel": "All" }
        }))
        .merged(&json!({ "transition": { "duration": 100 } }));
        assert_eq!(
            cfg.as_value(),
            &json!({
                "transition": { "duration": 100, "delay": 0 },
                "navigation": { "rootLabel": "All" }
            })
        );
    }

    #[test]
    fn scalars_and_arrays_replace() {
        let cfg = ChartConfig::from_value(json!({
            "transition": { "duration": 320 },
            "navigation": { "layers": ["inner", "outer"] }
        }))
        .merged(&json!({ "transition": false, "navigation": { "layers": ["outer"] } }));
        assert_eq!(
            cfg.as_value(),
            &json!({ "transition": false, "navigation": { "layers": ["outer"] } })
        );
    }

    #[test]
    fn objects_replace_non_object_bases() {
        let cfg = ChartConfig::from_value(json!(42)).merged(&json!({ "transition": true }));
        assert_eq!(cfg.as_value(), &json!({ "transition": true }));
    }
}
