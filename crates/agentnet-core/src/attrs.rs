//! Attribute sets and the ranges that constrain them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SimError};
use crate::rng::Prg;
use crate::value::Value;

/// Ordered collection of named values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: IndexMap<String, Value>,
}

impl Attributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an attribute set with capacity for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            values: IndexMap::with_capacity(n),
        }
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no attribute is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inserts or replaces a value, keeping the original position on replace.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder flavour of [`Attributes::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Mutable value stored under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Value at insertion position `index`.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get_index(index).map(|(_, value)| value)
    }

    /// Position of `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.values.get_index_of(name)
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Domain of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RangeKind {
    /// `true` or `false`.
    Bool,
    /// Integers in `[min, max]`.
    IntRange {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// Doubles in `[min, max]`.
    DoubleRange {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// One of an explicit list of integers.
    IntSet {
        /// Allowed values.
        values: Vec<i64>,
    },
    /// One of an explicit list of doubles.
    DoubleSet {
        /// Allowed values.
        values: Vec<f64>,
    },
    /// One of an explicit list of strings.
    StringSet {
        /// Allowed values.
        values: Vec<String>,
    },
}

/// Named attribute domain, used to generate and validate attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRange {
    /// Attribute name.
    pub name: String,
    /// Attribute domain.
    #[serde(flatten)]
    pub kind: RangeKind,
}

impl AttributeRange {
    /// Boolean attribute.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::Bool,
        }
    }

    /// Integer attribute in `[min, max]`.
    pub fn int(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::IntRange { min, max },
        }
    }

    /// Double attribute in `[min, max]`.
    pub fn double(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::DoubleRange { min, max },
        }
    }

    /// Integer attribute restricted to `values`.
    pub fn int_set(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::IntSet { values },
        }
    }

    /// Double attribute restricted to `values`.
    pub fn double_set(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::DoubleSet { values },
        }
    }

    /// String attribute restricted to `values`.
    pub fn string_set(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: RangeKind::StringSet { values },
        }
    }

    /// Checks that the domain is non-empty.
    pub fn check(&self) -> Result<(), SimError> {
        let empty = match &self.kind {
            RangeKind::Bool => false,
            RangeKind::IntRange { min, max } => min > max,
            RangeKind::DoubleRange { min, max } => !(min <= max),
            RangeKind::IntSet { values } => values.is_empty(),
            RangeKind::DoubleSet { values } => values.is_empty(),
            RangeKind::StringSet { values } => values.is_empty(),
        };
        if empty {
            return Err(SimError::Config(
                ErrorInfo::new("empty-range", "attribute range admits no value")
                    .with_context("attribute", self.name.clone()),
            ));
        }
        Ok(())
    }

    /// Smallest admissible value (first entry for string sets).
    pub fn min(&self) -> Value {
        match &self.kind {
            RangeKind::Bool => Value::Bool(false),
            RangeKind::IntRange { min, .. } => Value::Int(*min),
            RangeKind::DoubleRange { min, .. } => Value::Double(*min),
            RangeKind::IntSet { values } => values.iter().min().copied().map_or(Value::Invalid, Value::Int),
            RangeKind::DoubleSet { values } => fold_f64(values, f64::min),
            RangeKind::StringSet { values } => values.first().cloned().map_or(Value::Invalid, Value::Str),
        }
    }

    /// Largest admissible value (last entry for string sets).
    pub fn max(&self) -> Value {
        match &self.kind {
            RangeKind::Bool => Value::Bool(true),
            RangeKind::IntRange { max, .. } => Value::Int(*max),
            RangeKind::DoubleRange { max, .. } => Value::Double(*max),
            RangeKind::IntSet { values } => values.iter().max().copied().map_or(Value::Invalid, Value::Int),
            RangeKind::DoubleSet { values } => fold_f64(values, f64::max),
            RangeKind::StringSet { values } => values.last().cloned().map_or(Value::Invalid, Value::Str),
        }
    }

    /// Uniformly drawn admissible value.
    pub fn rand(&self, prg: &mut Prg) -> Value {
        match &self.kind {
            RangeKind::Bool => Value::Bool(prg.bernoulli(0.5)),
            RangeKind::IntRange { min, max } => Value::Int(prg.int_range(*min, *max)),
            RangeKind::DoubleRange { min, max } => Value::Double(prg.uniform_range(*min, *max)),
            RangeKind::IntSet { values } if !values.is_empty() => {
                Value::Int(values[prg.index(values.len())])
            }
            RangeKind::DoubleSet { values } if !values.is_empty() => {
                Value::Double(values[prg.index(values.len())])
            }
            RangeKind::StringSet { values } if !values.is_empty() => {
                Value::Str(values[prg.index(values.len())].clone())
            }
            _ => Value::Invalid,
        }
    }

    /// Parses `text` and checks it against the domain.
    pub fn validate(&self, text: &str) -> Result<Value, SimError> {
        let text = text.trim();
        let value = match &self.kind {
            RangeKind::Bool => match text {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            RangeKind::IntRange { min, max } => text
                .parse::<i64>()
                .ok()
                .filter(|v| v >= min && v <= max)
                .map(Value::Int),
            RangeKind::DoubleRange { min, max } => text
                .parse::<f64>()
                .ok()
                .filter(|v| v >= min && v <= max)
                .map(Value::Double),
            RangeKind::IntSet { values } => text
                .parse::<i64>()
                .ok()
                .filter(|v| values.contains(v))
                .map(Value::Int),
            RangeKind::DoubleSet { values } => text
                .parse::<f64>()
                .ok()
                .filter(|v| values.contains(v))
                .map(Value::Double),
            RangeKind::StringSet { values } => values
                .iter()
                .find(|v| v.as_str() == text)
                .map(|v| Value::Str(v.clone())),
        };
        value.ok_or_else(|| {
            SimError::Config(
                ErrorInfo::new("invalid-attribute-value", "value is outside the attribute range")
                    .with_context("attribute", self.name.clone())
                    .with_context("value", text.to_string()),
            )
        })
    }
}

fn fold_f64(values: &[f64], pick: fn(f64, f64) -> f64) -> Value {
    values
        .iter()
        .copied()
        .reduce(pick)
        .map_or(Value::Invalid, Value::Double)
}

/// Ordered set of attribute domains, e.g. the node attributes a model expects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributesScope {
    ranges: Vec<AttributeRange>,
}

impl AttributesScope {
    /// Builds a scope, rejecting duplicate names and empty domains.
    pub fn new(ranges: Vec<AttributeRange>) -> Result<Self, SimError> {
        for (idx, range) in ranges.iter().enumerate() {
            range.check()?;
            if ranges[..idx].iter().any(|other| other.name == range.name) {
                return Err(SimError::Config(
                    ErrorInfo::new("duplicate-attribute", "attribute declared twice")
                        .with_context("attribute", range.name.clone()),
                ));
            }
        }
        Ok(Self { ranges })
    }

    /// Number of attributes in scope.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true when the scope declares no attribute.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Range declared for `name`.
    pub fn get(&self, name: &str) -> Option<&AttributeRange> {
        self.ranges.iter().find(|range| range.name == name)
    }

    /// Ranges in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeRange> {
        self.ranges.iter()
    }

    /// Checks that `attrs` holds a valid value for every attribute in scope.
    pub fn validate(&self, attrs: &Attributes) -> Result<(), SimError> {
        for range in &self.ranges {
            match attrs.get(&range.name) {
                Some(value) if value.is_valid() => {
                    range.validate(&value.to_string())?;
                }
                _ => {
                    return Err(SimError::Config(
                        ErrorInfo::new("missing-attribute", "attribute has no value")
                            .with_context("attribute", range.name.clone()),
                    ))
                }
            }
        }
        Ok(())
    }
}
