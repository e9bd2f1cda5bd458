//! Entity states read by `set_state_field`.
//!
//! The automation host owns entity storage; this module only defines the
//! lookup seam ([`EntityStates`]) plus an in-memory [`EntitySnapshot`]
//! that can be loaded from a JSON export.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Current state of one host entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Read access to host entity states.
pub trait EntityStates {
    fn get(&self, entity_id: &str) -> Option<EntityState>;
}

impl EntityStates for HashMap<String, EntityState> {
    fn get(&self, entity_id: &str) -> Option<EntityState> {
        HashMap::get(self, entity_id).cloned()
    }
}

/// Point-in-time copy of entity states.
#[derive(Debug, Clone, Default)]
pub struct EntitySnapshot {
    states: HashMap<String, EntityState>,
}

impl EntitySnapshot {
    pub fn new(states: impl IntoIterator<Item = EntityState>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.entity_id.clone(), s))
                .collect(),
        }
    }

    /// Accepts either a list of state objects (the host's `/api/states`
    /// shape) or a map of entity id to state object.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_array() {
            let states: Vec<EntityState> = serde_json::from_value(value)?;
            return Ok(Self::new(states));
        }

        #[derive(Deserialize)]
        struct Partial {
            state: String,
            #[serde(default)]
            attributes: Map<String, Value>,
        }

        let map: HashMap<String, Partial> = serde_json::from_value(value)?;
        Ok(Self::new(map.into_iter().map(|(entity_id, p)| EntityState {
            entity_id,
            state: p.state,
            attributes: p.attributes,
        })))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl EntityStates for EntitySnapshot {
    fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).cloned()
    }
}

/// `domain.object_id`, lowercase letters, digits and underscores.
pub fn is_valid_entity_id(entity_id: &str) -> bool {
    let Some((domain, object_id)) = entity_id.split_once('.') else {
        return false;
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    };
    valid_part(domain) && valid_part(object_id)
}

/// How a raw entity value is turned into the field sent to Dashino.
#[derive(Debug, Clone, Default)]
pub struct FieldTransform<'a> {
    /// Replacement table applied when the value is a string key in it.
    pub map: Option<&'a Map<String, Value>>,
    /// Coerce to a float.
    pub as_number: bool,
    /// Round numeric values to this many decimal digits (may be negative).
    pub round: Option<i32>,
}

/// Pick the entity's state or a named attribute and apply `transform`.
pub fn extract_field_value(
    entity: &EntityState,
    attribute: Option<&str>,
    transform: &FieldTransform<'_>,
) -> Result<Value, CoreError> {
    let mut value = match attribute.filter(|a| !a.is_empty()) {
        Some(name) => entity
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::AttributeNotFound {
                entity_id: entity.entity_id.clone(),
                attribute: name.into(),
            })?,
        None => Value::String(entity.state.clone()),
    };

    if let (Some(map), Value::String(key)) = (transform.map, &value) {
        if let Some(mapped) = map.get(key) {
            value = mapped.clone();
        }
    }

    if transform.as_number {
        let not_numeric = || CoreError::NotNumeric {
            entity_id: entity.entity_id.clone(),
        };
        let mut number = to_float(&value).ok_or_else(not_numeric)?;
        if let Some(digits) = transform.round {
            number = round_to(number, digits);
        }
        value = Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(not_numeric)?;
    }

    Ok(value)
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Round half to even at `digits` decimal places.
fn round_to(value: f64, digits: i32) -> f64 {
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        (value * factor).round_ties_even() / factor
    } else {
        let factor = 10f64.powi(-digits);
        (value / factor).round_ties_even() * factor
    }
}
