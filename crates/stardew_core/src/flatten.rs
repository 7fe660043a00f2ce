//! Schema-less conversion of an XML subtree into nested typed values.
//!
//! Two strategies plug into [`Flattener`]: a [`NodeTransform`] may replace
//! the value of a whole node (coordinate collapsing is one), and a
//! [`ValueCoercion`] sees every value on its way into the parent map, where it
//! can retype it or drop it.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::xml::{Element, TYPE_ATTR};

/// Key holding element attributes. `@` cannot start an XML tag name.
pub const ATTRIBUTES_KEY: &str = "@attributes";

pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Pair(Box<Value>, Box<Value>),
    Map(Fields),
    List(Vec<Value>),
}

impl Value {
    pub fn pair(x: Value, y: Value) -> Self {
        Self::Pair(Box::new(x), Box::new(y))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Repeated tags flatten to a list, single ones do not; this views both
    /// shapes as a slice.
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Self::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

pub trait ValueCoercion {
    /// Returns the value to store under `key`, or `None` to omit it.
    fn coerce(&self, key: &str, value: Value) -> Option<Value>;
}

pub trait NodeTransform {
    /// A returned value is used verbatim for the node.
    fn transform(&self, element: &Element) -> Option<Value>;
}

/// Keeps every value exactly as read.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCoercion;

impl ValueCoercion for RawCoercion {
    fn coerce(&self, _key: &str, value: Value) -> Option<Value> {
        Some(value)
    }
}

/// Types booleans and numbers, optionally dropping falsy or zero values.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypedCoercion {
    pub filter_false: bool,
    pub filter_zero: bool,
}

impl ValueCoercion for TypedCoercion {
    fn coerce(&self, key: &str, value: Value) -> Option<Value> {
        let value = match value {
            Value::Str(text) => coerce_text(text),
            Value::Pair(x, y) => match (*x, *y) {
                (Value::Str(x), Value::Str(y)) if is_integer(&x) && is_integer(&y) => {
                    match (x.parse::<i64>(), y.parse::<i64>()) {
                        (Ok(x), Ok(y)) => Value::pair(Value::Int(x), Value::Int(y)),
                        _ => Value::pair(Value::Str(x), Value::Str(y)),
                    }
                }
                (x, y) => Value::pair(x, y),
            },
            other => other,
        };

        if self.filter_false {
            let empty = match &value {
                Value::Bool(false) => true,
                Value::Map(fields) => fields.is_empty(),
                Value::List(items) => items.is_empty(),
                _ => false,
            };
            if empty {
                debug!("dropping false/empty key {key}");
                return None;
            }
        }
        if self.filter_zero {
            let zero = match value {
                Value::Int(i) => i == 0,
                Value::Float(f) => f == 0.0,
                _ => false,
            };
            if zero {
                debug!("dropping zero key {key}");
                return None;
            }
        }
        Some(value)
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

fn coerce_text(text: String) -> Value {
    match text.as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if is_integer(&text)
        && let Ok(i) = text.parse::<i64>()
    {
        return Value::Int(i);
    }
    if is_float(&text)
        && let Ok(f) = text.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::Str(text)
}

/// Collapses `{X, Y}` nodes into a pair of their raw texts.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordTransform;

impl NodeTransform for CoordTransform {
    fn transform(&self, element: &Element) -> Option<Value> {
        if !element.is_coord_node() {
            return None;
        }
        let x = element.child("X", false)?.text()?;
        let y = element.child("Y", false)?.text()?;
        Some(Value::pair(
            Value::Str(x.to_string()),
            Value::Str(y.to_string()),
        ))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    pub filter_false: bool,
    pub filter_zero: bool,
    pub collapse_points: bool,
}

pub struct Flattener {
    coercion: Box<dyn ValueCoercion>,
    transform: Option<Box<dyn NodeTransform>>,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

impl Flattener {
    pub fn new() -> Self {
        Self {
            coercion: Box::new(TypedCoercion::default()),
            transform: None,
        }
    }

    pub fn from_options(options: FlattenOptions) -> Self {
        let flattener = Self::new().with_coercion(TypedCoercion {
            filter_false: options.filter_false,
            filter_zero: options.filter_zero,
        });
        if options.collapse_points {
            flattener.with_transform(CoordTransform)
        } else {
            flattener
        }
    }

    pub fn with_coercion(mut self, coercion: impl ValueCoercion + 'static) -> Self {
        self.coercion = Box::new(coercion);
        self
    }

    pub fn with_transform(mut self, transform: impl NodeTransform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// `{tag: value}` for the element, empty when it has no value.
    pub fn flatten(&self, element: &Element) -> Fields {
        let mut out = Fields::new();
        if let Some(value) = self.value(element) {
            out.insert(element.tag.clone(), value);
        }
        out
    }

    /// The element's value after coercion.
    pub fn value(&self, element: &Element) -> Option<Value> {
        let raw = self.raw_value(element)?;
        self.coercion.coerce(&element.tag, raw)
    }

    fn raw_value(&self, element: &Element) -> Option<Value> {
        if let Some(value) = self
            .transform
            .as_ref()
            .and_then(|transform| transform.transform(element))
        {
            return Some(value);
        }
        if let Some(text) = element.text() {
            return Some(Value::Str(text.to_string()));
        }

        let attributes: Fields = element
            .attributes
            .iter()
            .filter(|(key, _)| key != TYPE_ATTR)
            .map(|(key, value)| (key.clone(), Value::Str(value.clone())))
            .collect();
        if element.children.is_empty() && attributes.is_empty() {
            return None;
        }

        let mut fields = Fields::new();
        let mut repeated = BTreeSet::new();
        for child in element.children() {
            if let Some(value) = self.value(child) {
                merge(&mut fields, &mut repeated, &child.tag, value);
            }
        }
        if !attributes.is_empty() {
            fields.insert(ATTRIBUTES_KEY.to_string(), Value::Map(attributes));
        }
        Some(Value::Map(fields))
    }
}

fn merge(fields: &mut Fields, repeated: &mut BTreeSet<String>, key: &str, value: Value) {
    let Some(existing) = fields.get_mut(key) else {
        fields.insert(key.to_string(), value);
        return;
    };
    if repeated.contains(key) {
        if let Value::List(items) = existing {
            items.push(value);
        }
        return;
    }
    let first = std::mem::replace(existing, Value::List(Vec::new()));
    *existing = Value::List(vec![first, value]);
    repeated.insert(key.to_string());
}
