use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Full booking form as posted by the website. Every field is optional and
/// free text; numbers and booleans from the form are kept as their text form.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub contact_number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub suburb: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub bedrooms: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub bathrooms: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub carpet_cleaning: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub furnished: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub pest_control: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct QuickBookingRequest {
    #[serde(default, deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub phone: Option<String>,
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_become_text_and_blanks_disappear() {
        let booking: BookingRequest = serde_json::from_str(
            r#"{"name":"Jo","bedrooms":3,"carpetCleaning":true,"message":"  ","propertyType":null}"#,
        )
        .unwrap();
        assert_eq!(booking.name.as_deref(), Some("Jo"));
        assert_eq!(booking.bedrooms.as_deref(), Some("3"));
        assert_eq!(booking.carpet_cleaning.as_deref(), Some("true"));
        assert_eq!(booking.message, None);
        assert_eq!(booking.property_type, None);
        assert_eq!(booking.suburb, None);
    }
}
