//! Intercepted command codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of a received code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "G")]
    GCode,
    #[serde(rename = "M")]
    MCode,
    #[serde(rename = "T")]
    TCode,
    #[serde(rename = "Q")]
    Comment,
    #[serde(rename = "K")]
    Keyword,
    /// Anything the host sends that this build does not know about
    #[serde(other)]
    Other,
}

impl CodeType {
    fn letter(self) -> &'static str {
        match self {
            CodeType::GCode => "G",
            CodeType::MCode => "M",
            CodeType::TCode => "T",
            CodeType::Comment => "Q",
            CodeType::Keyword => "K",
            CodeType::Other => "?",
        }
    }
}

/// A single command received from the interception session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    /// Code family
    #[serde(rename = "type")]
    pub code_type: CodeType,

    /// Major number (`1201` in `M1201.3`)
    #[serde(default)]
    pub major_number: Option<u32>,

    /// Minor number (`3` in `M1201.3`)
    #[serde(default)]
    pub minor_number: Option<u32>,

    /// Channel the code was sent from (`HTTP`, `USB`, `File`, ...)
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "Unknown".to_string()
}

impl Code {
    #[cfg(test)]
    pub fn mcode(major: u32, minor: Option<u32>, channel: &str) -> Self {
        Self {
            code_type: CodeType::MCode,
            major_number: Some(major),
            minor_number: minor,
            channel: channel.to_string(),
        }
    }

    pub fn is_mcode(&self) -> bool {
        self.code_type == CodeType::MCode
    }

    /// Short string form used as the lookup key, e.g. `M1201` or `M1201.1`.
    pub fn short_str(&self) -> String {
        let mut key = self.code_type.letter().to_string();
        if let Some(major) = self.major_number {
            key.push_str(&major.to_string());
            if let Some(minor) = self.minor_number {
                key.push('.');
                key.push_str(&minor.to_string());
            }
        }
        key
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.short_str(), self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_str() {
        assert_eq!(Code::mcode(1201, None, "HTTP").short_str(), "M1201");
        assert_eq!(Code::mcode(1201, Some(2), "HTTP").short_str(), "M1201.2");
    }

    #[test]
    fn test_deserialize_host_code() {
        let json = r#"{
            "type": "M",
            "majorNumber": 1201,
            "minorNumber": null,
            "channel": "HTTP",
            "parameters": [],
            "lineNumber": 12
        }"#;
        let code: Code = serde_json::from_str(json).unwrap();
        assert!(code.is_mcode());
        assert_eq!(code.short_str(), "M1201");
        assert_eq!(code.channel, "HTTP");
    }

    #[test]
    fn test_deserialize_gcode_is_not_mcode() {
        let code: Code =
            serde_json::from_str(r#"{"type":"G","majorNumber":1,"channel":"File"}"#).unwrap();
        assert!(!code.is_mcode());
        assert_eq!(code.short_str(), "G1");
    }

    #[test]
    fn test_deserialize_unknown_type() {
        let code: Code = serde_json::from_str(r#"{"type":"X","channel":"SBC"}"#).unwrap();
        assert_eq!(code.code_type, CodeType::Other);
        assert!(!code.is_mcode());
    }
}
