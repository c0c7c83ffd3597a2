use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Number};

use crate::{Decode, DecodeError, Document, Value};

/// Decode prism document, or json text, into any [`Deserialize`] type.
///
/// Documents convert to json objects, decimals to json numbers when they fit,
/// and temporal values to their string form.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T> Decode for Json<T>
where
    T: DeserializeOwned,
{
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Err(DecodeError::Null),
            Value::String(text) => Ok(Json(serde_json::from_str(&text)?)),
            value => Ok(Json(serde_json::from_value(value.into())?)),
        }
    }
}

impl<T: Serialize> TryFrom<Json<T>> for Value {
    type Error = serde_json::Error;

    fn try_from(json: Json<T>) -> Result<Self, Self::Error> {
        serde_json::to_value(json.0).map(Into::into)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        use serde_json::Value as J;
        match value {
            Value::Null => J::Null,
            Value::Boolean(b) => J::Bool(b),
            Value::Integer(i) => J::from(i),
            Value::Long(l) => J::from(l),
            Value::Decimal(d) => {
                let text = d.to_string();
                match text.parse::<Number>() {
                    Ok(n) => J::Number(n),
                    Err(_) => J::String(text),
                }
            }
            Value::Float(f) => Number::from_f64(f.into()).map_or(J::Null, J::Number),
            Value::Double(d) => Number::from_f64(d).map_or(J::Null, J::Number),
            Value::Date(d) => J::String(d.to_string()),
            Value::Time(t) => J::String(t.to_string()),
            Value::Timestamp(t) => J::String(t.to_string()),
            Value::Interval(i) => J::String(i.to_string()),
            Value::String(s) => J::String(s),
            Value::Binary(b) => J::Array(b.iter().map(|b| J::from(*b)).collect()),
            Value::List(values) => J::Array(values.into_iter().map(Into::into).collect()),
            Value::Document(doc) => J::Object(
                doc.into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match value {
            J::Null => Value::Null,
            J::Bool(b) => Value::Boolean(b),
            J::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Value::from(i),
                (None, Some(u), _) => Value::from(u),
                (None, None, Some(f)) => Value::Double(f),
                (None, None, None) => Value::Null,
            },
            J::String(s) => Value::String(s),
            J::Array(values) => Value::List(values.into_iter().map(Into::into).collect()),
            J::Object(map) => Value::Document(map.into_iter().collect::<Document>()),
        }
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}
