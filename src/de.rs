use std::fmt;

use serde::de::{self, Deserializer, Visitor};

pub fn uppercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_string(UppercaseVisitor)
}

struct UppercaseVisitor;

impl Visitor<'_> for UppercaseVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("string value, normalized to uppercase")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v.to_uppercase())
    }
}
