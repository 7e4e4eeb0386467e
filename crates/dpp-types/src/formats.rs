use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How much of a passport's reference graph to resolve when expanding.
///
/// The four formats increase in completeness:
///
/// - `compact` -- bare reference lists, nothing resolved
/// - `base` -- own attachments and events resolved, sub-passports left as IDs
/// - `full` -- like `base`, plus each sub-passport expanded once at `base`
/// - `complete` -- like `base`, with sub-passports expanded recursively to
///   the leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Compact,
    Base,
    Full,
    Complete,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Base => "base",
            Self::Full => "full",
            Self::Complete => "complete",
        }
    }
}

impl FromStr for ContentFormat {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(Self::Compact),
            "base" => Ok(Self::Base),
            "full" => Ok(Self::Full),
            "complete" => Ok(Self::Complete),
            other => Err(TypeError::InvalidContentFormat(other.to_string())),
        }
    }
}

/// Outer shape of an expanded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputShape {
    /// The expansion as constructed, unwrapped.
    #[serde(rename = "json")]
    Json,
    /// The expansion nested under `credentialSubject` in a fixed
    /// verifiable-credential wrapper.
    #[serde(rename = "json-ld")]
    JsonLd,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLd => "json-ld",
        }
    }
}

impl FromStr for OutputShape {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "json-ld" => Ok(Self::JsonLd),
            other => Err(TypeError::InvalidOutputShape(other.to_string())),
        }
    }
}

/// Requested signature treatment of an expanded document.
///
/// Only [`SignatureMode::Unsigned`] has implemented behavior; the other
/// modes are accepted as values for forward compatibility and fail
/// explicitly at expansion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureMode {
    #[serde(rename = "unsigned")]
    Unsigned,
    #[serde(rename = "self-signed")]
    SelfSigned,
    #[serde(rename = "signed")]
    Signed,
}

impl SignatureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::SelfSigned => "self-signed",
            Self::Signed => "signed",
        }
    }
}

impl FromStr for SignatureMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsigned" => Ok(Self::Unsigned),
            "self-signed" => Ok(Self::SelfSigned),
            "signed" => Ok(Self::Signed),
            other => Err(TypeError::InvalidSignatureMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_format_parse_roundtrip() {
        for format in [
            ContentFormat::Compact,
            ContentFormat::Base,
            ContentFormat::Full,
            ContentFormat::Complete,
        ] {
            assert_eq!(format.as_str().parse::<ContentFormat>().unwrap(), format);
        }
    }

    #[test]
    fn unknown_content_format_fails() {
        let err = "verbose".parse::<ContentFormat>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidContentFormat(_)));
    }

    #[test]
    fn output_shape_parse() {
        assert_eq!("json-ld".parse::<OutputShape>().unwrap(), OutputShape::JsonLd);
        assert!("xml".parse::<OutputShape>().is_err());
    }

    #[test]
    fn signature_mode_parse() {
        assert_eq!(
            "self-signed".parse::<SignatureMode>().unwrap(),
            SignatureMode::SelfSigned
        );
        assert!("notarized".parse::<SignatureMode>().is_err());
    }
}
