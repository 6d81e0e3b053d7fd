//! Validated sigil alphabet.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::external::SymbolAlphabet;

/// An ordered list of equal-width binary strings.
///
/// Construction fails on an empty list, a non-binary entry or mixed widths,
/// so a controller holding one can always complete a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SigilAlphabet {
    sigils: Vec<String>,
}

impl SigilAlphabet {
    pub fn new<I, S>(sigils: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sigils: Vec<String> = sigils.into_iter().map(Into::into).collect();
        let Some(first) = sigils.first() else {
            return Err(ConfigError::EmptyAlphabet);
        };
        let expected = first.len();
        for (index, bits) in sigils.iter().enumerate() {
            if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
                return Err(ConfigError::InvalidSigil {
                    index,
                    bits: bits.clone(),
                });
            }
            if bits.len() != expected {
                return Err(ConfigError::SigilWidthMismatch {
                    index,
                    width: bits.len(),
                    expected,
                });
            }
        }
        Ok(Self { sigils })
    }

    /// Parse a JSON array of bit strings.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let sigils: Vec<String> = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidRunConfig(format!("alphabet json: {e}")))?;
        Self::new(sigils)
    }

    /// Bit width shared by every sigil.
    #[must_use]
    pub fn width(&self) -> usize {
        self.sigils.first().map_or(0, String::len)
    }

    #[must_use]
    pub fn sigils(&self) -> &[String] {
        &self.sigils
    }
}

impl<'de> Deserialize<'de> for SigilAlphabet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let sigils = Vec::<String>::deserialize(deserializer)?;
        Self::new(sigils).map_err(serde::de::Error::custom)
    }
}

impl SymbolAlphabet for SigilAlphabet {
    fn len(&self) -> usize {
        self.sigils.len()
    }

    fn bits(&self, index: usize) -> Option<&str> {
        self.sigils.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_alphabet_is_rejected() {
        let err = SigilAlphabet::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ConfigError::EmptyAlphabet);
    }

    #[test]
    fn non_binary_sigil_is_rejected() {
        let err = SigilAlphabet::new(["0101", "01x1"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSigil { index: 1, .. }));
    }

    #[test]
    fn mixed_widths_are_rejected() {
        let err = SigilAlphabet::new(["0101", "011"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::SigilWidthMismatch {
                index: 1,
                width: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<SigilAlphabet>(r#"["10","01"]"#).is_ok());
        assert!(serde_json::from_str::<SigilAlphabet>("[]").is_err());
    }

    #[test]
    fn lookup_by_index() {
        let a = SigilAlphabet::new(["1100", "0011"]).expect("valid");
        assert_eq!(a.len(), 2);
        assert_eq!(a.width(), 4);
        assert_eq!(a.bits(1), Some("0011"));
        assert_eq!(a.bits(2), None);
    }
}
