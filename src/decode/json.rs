//! Deserializer over a parsed JSON document
//!
//! Decoding goes through an already parsed [`serde_json::Value`] so that type
//! mismatches are reported with the field they occurred in, using
//! [`DecodeError`] rather than `serde_json`'s line/column errors.

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, Unexpected,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use super::DecodeError;

pub(crate) struct JsonDeserializer<'a> {
    value: &'a Value,
}

impl<'a> JsonDeserializer<'a> {
    pub(crate) fn new(value: &'a Value) -> Self {
        Self { value }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Unexpected::Unsigned(u)
            } else if let Some(i) = n.as_i64() {
                Unexpected::Signed(i)
            } else {
                Unexpected::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

impl<'de, 'a> Deserializer<'de> for JsonDeserializer<'a> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else if let Some(f) = n.as_f64() {
                    visitor.visit_f64(f)
                } else {
                    Err(de::Error::custom(format!("unsupported number {}", n)))
                }
            }
            Value::String(s) => visitor.visit_str(s),
            Value::Array(items) => visitor.visit_seq(JsonSeqAccess {
                iter: items.iter().enumerate(),
            }),
            Value::Object(map) => visitor.visit_map(JsonMapAccess {
                iter: map.iter(),
                pending: None,
            }),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            Value::Object(map) if map.len() == 1 => visitor.visit_enum(JsonEnumAccess { map }),
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct JsonSeqAccess<'a> {
    iter: std::iter::Enumerate<std::slice::Iter<'a, Value>>,
}

impl<'de, 'a> SeqAccess<'de> for JsonSeqAccess<'a> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some((i, value)) => seed
                .deserialize(JsonDeserializer::new(value))
                .map(Some)
                .map_err(|e| e.at(i.to_string())),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct JsonMapAccess<'a> {
    iter: serde_json::map::Iter<'a>,
    pending: Option<(&'a String, &'a Value)>,
}

impl<'de, 'a> MapAccess<'de> for JsonMapAccess<'a> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some((key, value));
                seed.deserialize(key.as_str().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| de::Error::custom("value requested before key"))?;

        seed.deserialize(JsonDeserializer::new(value))
            .map_err(|e| e.at(key.as_str()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct JsonEnumAccess<'a> {
    map: &'a Map<String, Value>,
}

impl<'de, 'a> EnumAccess<'de> for JsonEnumAccess<'a> {
    type Error = DecodeError;
    type Variant = JsonDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error> {
        let (variant, value) = self
            .map
            .iter()
            .next()
            .ok_or_else(|| de::Error::custom("expected a single-key map for an enum"))?;

        let tag = seed.deserialize(variant.as_str().into_deserializer())?;
        Ok((tag, JsonDeserializer::new(value)))
    }
}

impl<'de, 'a> VariantAccess<'de> for JsonDeserializer<'a> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(unexpected(other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        title: String,
        body: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
        T::deserialize(JsonDeserializer::new(&value))
    }

    #[test]
    fn test_decode_struct() {
        let post: Post = decode(json!({"title": "x", "body": "y", "extra": true})).unwrap();

        assert_eq!(
            post,
            Post {
                title: "x".into(),
                body: "y".into(),
                tags: vec![],
            }
        );
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let err = decode::<Post>(json!({"title": -1, "body": "y"})).unwrap_err();

        assert_eq!(err.key(), Some("title"));
        assert_eq!(err.message(), "cannot unmarshal integer `-1` to a string");
    }

    #[test]
    fn test_mismatch_inside_sequence_has_index() {
        let err = decode::<Post>(json!({"title": "x", "body": "y", "tags": ["a", 2]})).unwrap_err();

        assert_eq!(err.field().as_deref(), Some("tags.1"));
    }

    #[test]
    fn test_renamed_field_uses_serialized_name() {
        #[derive(Debug, Deserialize)]
        struct Profile {
            #[serde(rename = "display_name")]
            _name: String,
        }

        let err = decode::<Profile>(json!({"display_name": [1, 2, 3]})).unwrap_err();
        assert_eq!(err.key(), Some("display_name"));
        assert_eq!(err.message(), "cannot unmarshal sequence to a string");
    }

    #[test]
    fn test_options_and_enums() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Shape {
            Circle(f64),
            Square { side: u32 },
            Empty,
        }

        #[derive(Debug, Deserialize)]
        struct Drawing {
            label: Option<String>,
            shapes: Vec<Shape>,
        }

        let drawing: Drawing = decode(json!({
            "label": null,
            "shapes": [{"Circle": 1.5}, {"Square": {"side": 2}}, "Empty"],
        }))
        .unwrap();

        assert_eq!(drawing.label, None);
        assert_eq!(
            drawing.shapes,
            vec![Shape::Circle(1.5), Shape::Square { side: 2 }, Shape::Empty]
        );
    }
}
