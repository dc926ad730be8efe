use serde::{Deserialize, Serialize};
use std::fmt;

/// Millilitres in one US fluid ounce.
pub const ML_PER_OZ: f64 = 29.5735;

/// Largest single entry accepted, in millilitres.
pub const MAX_ENTRY_ML: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Ml,
    Oz,
}

impl Unit {
    pub fn parse(s: &str) -> Option<Unit> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ml" => Some(Unit::Ml),
            "oz" => Some(Unit::Oz),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Ml => "ml",
            Unit::Oz => "oz",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn to_ml(amount: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Ml => amount,
        Unit::Oz => amount * ML_PER_OZ,
    }
}

pub fn from_ml(ml: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Ml => ml,
        Unit::Oz => ml / ML_PER_OZ,
    }
}

/// A loggable amount: finite, positive, and no more than `MAX_ENTRY_ML`.
pub fn is_valid_amount(amount: f64, unit: Unit) -> bool {
    amount.is_finite() && amount > 0.0 && to_ml(amount, unit) <= MAX_ENTRY_ML
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oz_converts_to_ml() {
        assert!((to_ml(8.0, Unit::Oz) - 236.588).abs() < 1e-9);
        assert_eq!(to_ml(250.0, Unit::Ml), 250.0);
    }

    #[test]
    fn from_ml_inverts_to_ml() {
        let ml = to_ml(17.0, Unit::Oz);
        assert!((from_ml(ml, Unit::Oz) - 17.0).abs() < 1e-9);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Unit::parse("ML"), Some(Unit::Ml));
        assert_eq!(Unit::parse(" oz "), Some(Unit::Oz));
        assert_eq!(Unit::parse("cups"), None);
    }

    #[test]
    fn amount_validation() {
        assert!(is_valid_amount(250.0, Unit::Ml));
        assert!(is_valid_amount(338.0, Unit::Oz));
        assert!(!is_valid_amount(0.0, Unit::Ml));
        assert!(!is_valid_amount(-5.0, Unit::Ml));
        assert!(!is_valid_amount(f64::NAN, Unit::Ml));
        assert!(!is_valid_amount(10_001.0, Unit::Ml));
        assert!(!is_valid_amount(400.0, Unit::Oz));
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Unit::Oz).unwrap(), "\"oz\"");
        let u: Unit = serde_json::from_str("\"ml\"").unwrap();
        assert_eq!(u, Unit::Ml);
    }
}
