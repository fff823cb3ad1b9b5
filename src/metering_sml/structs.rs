use serde::{Deserialize, Serialize};
use std::fmt;

/// Message type of the list responses a meter pushes periodically.
pub const SML_GET_LIST_RESPONSE: &str = "SmlGetListResponse";

// Decoded SML data structures as delivered by the external decoder

/// A complete decoded SML message, the body is what we care about.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmlMessage {
    #[serde(rename = "messageBody")]
    pub message_body: SmlRecord,
}

/// One decoded message body carrying the value list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SmlRecord {
    #[serde(rename = "type", default)]
    pub msg_type: String,
    #[serde(rename = "valList", default)]
    pub val_list: Vec<SmlValueEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SmlValueEntry {
    #[serde(rename = "objName")]
    pub obj_name: String,
    #[serde(default)]
    pub value: SmlEntryValue,
    // Kept for logging only, scaling is applied by the decoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<i8>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SmlEntryValue {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl SmlRecord {
    pub fn new(msg_type: &str, val_list: Vec<SmlValueEntry>) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            val_list,
        }
    }

    /// First entry carrying the given object name.
    pub fn find(&self, obj_name: &str) -> Option<&SmlValueEntry> {
        self.val_list.iter().find(|entry| entry.obj_name == obj_name)
    }
}

impl SmlValueEntry {
    pub fn new(obj_name: &str, value: impl Into<SmlEntryValue>) -> Self {
        Self {
            obj_name: obj_name.to_string(),
            value: value.into(),
            unit: None,
            scaler: None,
        }
    }
}

impl fmt::Display for SmlEntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmlEntryValue::Bool(b) => write!(f, "{}", b),
            SmlEntryValue::Number(n) => write!(f, "{}", n),
            SmlEntryValue::Text(s) => write!(f, "{}", s),
            SmlEntryValue::Null => Ok(()),
        }
    }
}

impl From<&str> for SmlEntryValue {
    fn from(value: &str) -> Self {
        SmlEntryValue::Text(value.to_string())
    }
}

impl From<String> for SmlEntryValue {
    fn from(value: String) -> Self {
        SmlEntryValue::Text(value)
    }
}

impl From<f64> for SmlEntryValue {
    fn from(value: f64) -> Self {
        SmlEntryValue::Number(value)
    }
}

// Unit mappings for SML values, only the ones electricity meters send
pub fn get_sml_unit_name(unit_code: u8) -> Option<&'static str> {
    match unit_code {
        27 => Some("W"),     // watt
        28 => Some("VA"),    // volt ampere
        29 => Some("var"),   // volt ampere reactive
        30 => Some("Wh"),    // watt hour
        31 => Some("VAh"),   // volt ampere hour
        32 => Some("varh"),  // var hour
        33 => Some("A"),     // ampere
        35 => Some("V"),     // volt
        44 => Some("Hz"),    // hertz
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message() {
        let line = r#"{"messageBody": {"type": "SmlGetListResponse", "valList": [
            {"objName": "129-129:199.130.3*255", "value": "ISK"},
            {"objName": "1-0:16.7.0*255", "value": 3.0, "unit": 27, "scaler": -1},
            {"objName": "1-0:0.0.9*255"}
        ]}}"#;
        let message: SmlMessage = serde_json::from_str(line).unwrap();
        let record = message.message_body;

        assert_eq!(record.msg_type, SML_GET_LIST_RESPONSE);
        assert_eq!(record.val_list.len(), 3);
        assert_eq!(record.val_list[0].value, SmlEntryValue::Text("ISK".to_string()));
        assert_eq!(record.val_list[1].value, SmlEntryValue::Number(3.0));
        assert_eq!(record.val_list[1].unit, Some(27));
        assert_eq!(record.val_list[1].scaler, Some(-1));
        assert_eq!(record.val_list[2].value, SmlEntryValue::Null);
    }

    #[test]
    fn test_find_returns_first_match() {
        let record = SmlRecord::new(SML_GET_LIST_RESPONSE, vec![
            SmlValueEntry::new("1-0:1.8.0*255", 1.0),
            SmlValueEntry::new("1-0:1.8.0*255", 2.0),
        ]);
        assert_eq!(record.find("1-0:1.8.0*255").unwrap().value, SmlEntryValue::Number(1.0));
        assert!(record.find("1-0:2.8.0*255").is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SmlEntryValue::from("ISK").to_string(), "ISK");
        assert_eq!(SmlEntryValue::from(20534559.3).to_string(), "20534559.3");
        assert_eq!(SmlEntryValue::Null.to_string(), "");
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(get_sml_unit_name(27), Some("W"));
        assert_eq!(get_sml_unit_name(30), Some("Wh"));
        assert_eq!(get_sml_unit_name(0), None);
    }
}
