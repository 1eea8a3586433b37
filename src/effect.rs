use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

/// How an effect estimate transforms when the allele orientation is reversed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum EffectType {
    /// Signed additive estimate (regression beta); flipping negates it.
    #[serde(rename = "BETA")]
    Additive,
    /// Ratio estimate (odds ratio); flipping takes its reciprocal.
    #[serde(rename = "OR")]
    Multiplicative,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown effect type: {0} (expected BETA or OR)")]
pub struct UnknownEffectType(pub String);

/// The reciprocal of a zero odds ratio is undefined.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot invert a zero multiplicative effect")]
pub struct ZeroEffect;

impl EffectType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Additive => "BETA",
            Self::Multiplicative => "OR",
        }
    }

    /// Returns the effect value expressed for the opposite allele orientation.
    pub fn invert(self, value: f64) -> Result<f64, ZeroEffect> {
        match self {
            Self::Additive => Ok(-value),
            Self::Multiplicative => {
                if value == 0.0 {
                    return Err(ZeroEffect);
                }
                Ok(1.0 / value)
            }
        }
    }
}

impl FromStr for EffectType {
    type Err = UnknownEffectType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BETA" => Ok(Self::Additive),
            "OR" => Ok(Self::Multiplicative),
            _ => Err(UnknownEffectType(s.to_string())),
        }
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Formats an effect value with the fixed seven-decimal output precision.
///
/// Values that round to zero print as `0.0000000` whatever their sign.
pub fn format_effect(value: f64) -> String {
    let formatted = format!("{value:.7}");
    match formatted.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|b| matches!(b, b'0' | b'.')) => {
            magnitude.to_string()
        }
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selectors_case_insensitively() {
        assert_eq!("BETA".parse::<EffectType>().unwrap(), EffectType::Additive);
        assert_eq!("or".parse::<EffectType>().unwrap(), EffectType::Multiplicative);
        assert_eq!(
            "logOR".parse::<EffectType>(),
            Err(UnknownEffectType("logOR".to_string()))
        );
    }

    #[test]
    fn additive_inversion_negates() {
        assert_eq!(EffectType::Additive.invert(2.5).unwrap(), -2.5);
        assert_eq!(EffectType::Additive.invert(-1.5).unwrap(), 1.5);
        assert_eq!(EffectType::Additive.invert(0.0).unwrap(), 0.0);
    }

    #[test]
    fn multiplicative_inversion_takes_reciprocal() {
        assert_eq!(EffectType::Multiplicative.invert(2.0).unwrap(), 0.5);
        assert_eq!(EffectType::Multiplicative.invert(-4.0).unwrap(), -0.25);
        assert_eq!(EffectType::Multiplicative.invert(1.0).unwrap(), 1.0);
    }

    #[test]
    fn multiplicative_inversion_rejects_zero() {
        assert_eq!(EffectType::Multiplicative.invert(0.0), Err(ZeroEffect));
        assert_eq!(EffectType::Multiplicative.invert(-0.0), Err(ZeroEffect));
    }

    #[test]
    fn formats_seven_decimals() {
        assert_eq!(format_effect(-1.5), "-1.5000000");
        assert_eq!(format_effect(1.0), "1.0000000");
        assert_eq!(format_effect(0.123456789), "0.1234568");
    }

    #[test]
    fn values_rounding_to_zero_lose_their_sign() {
        assert_eq!(format_effect(-0.0), "0.0000000");
        assert_eq!(format_effect(-1e-9), "0.0000000");
        assert_eq!(format_effect(-0.00000004), "0.0000000");
        assert_eq!(format_effect(0.0), "0.0000000");
        assert_eq!(format_effect(-0.00000006), "-0.0000001");
        assert_eq!(format_effect(EffectType::Additive.invert(0.0).unwrap()), "0.0000000");
    }
}
