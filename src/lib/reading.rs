use itertools::Itertools;
use json::{number::Number, JsonValue};
use std::fmt::Display;

/// Exact fixed-point number: `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i64,
    scale: u8,
}

impl Decimal {
    pub const fn new(mantissa: i64, scale: u8) -> Self {
        Self { mantissa, scale }
    }

    pub const fn from_int(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// Raw register word divided by `10^scale`, two's complement when `signed`.
    pub fn from_word(raw: u16, scale: u8, signed: bool) -> Self {
        let mantissa = if signed {
            i64::from(raw as i16)
        } else {
            i64::from(raw)
        };
        Self::new(mantissa, scale)
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(i32::from(self.scale))
    }

    /// `self` as a percentage of `whole` with two decimal places, truncated
    /// toward zero. A zero `whole` yields zero.
    pub fn percent_of(&self, whole: Decimal) -> Decimal {
        if whole.mantissa == 0 {
            return Decimal::new(0, 2);
        }

        // self / whole * 100, scaled by 10^2
        let numerator = i128::from(self.mantissa) * 10i128.pow(u32::from(whole.scale)) * 10_000;
        let denominator = i128::from(whole.mantissa) * 10i128.pow(u32::from(self.scale));
        Decimal::new((numerator / denominator) as i64, 2)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scale == 0 {
            return self.mantissa.fmt(f);
        }

        let divisor = 10u64.pow(u32::from(self.scale));
        let magnitude = self.mantissa.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$}",
            if self.mantissa < 0 { "-" } else { "" },
            magnitude / divisor,
            magnitude % divisor,
            width = self.scale as usize
        )
    }
}

impl From<Decimal> for JsonValue {
    fn from(value: Decimal) -> Self {
        Number::from_parts(
            value.mantissa >= 0,
            value.mantissa.unsigned_abs(),
            -i16::from(value.scale),
        )
        .into()
    }
}

/// One decoded quantity. Produced fresh on every read.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(Decimal),
    Text(String),
    Series(Vec<Decimal>),
}

impl Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Number(value) => value.fmt(f),
            Reading::Text(text) => text.fmt(f),
            Reading::Series(values) => write!(f, "[{}]", values.iter().join(", ")),
        }
    }
}

impl From<Reading> for JsonValue {
    fn from(reading: Reading) -> Self {
        match reading {
            Reading::Number(value) => value.into(),
            Reading::Text(text) => text.into(),
            Reading::Series(values) => JsonValue::Array(values.into_iter().map(Into::into).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scaled() {
        assert_eq!(Decimal::new(1250, 1).to_string(), "125.0");
        assert_eq!(Decimal::new(78, 0).to_string(), "78");
        assert_eq!(Decimal::new(-5, 2).to_string(), "-0.05");
        assert_eq!(Decimal::new(123, 4).to_string(), "0.0123");
        assert_eq!(Decimal::new(-32768, 0).to_string(), "-32768");
    }

    #[test]
    fn unsigned_words_divide_exactly() {
        for raw in [0u16, 1, 9, 10, 1250, 32767, 32768, 65535] {
            for scale in 0..=4u8 {
                let value = Decimal::from_word(raw, scale, false);
                assert_eq!(value.mantissa(), i64::from(raw));
                assert_eq!(value.scale(), scale);
                assert_eq!(value.to_f64(), f64::from(raw) / 10f64.powi(i32::from(scale)));
            }
        }
    }

    #[test]
    fn signed_words_are_twos_complement() {
        assert_eq!(Decimal::from_word(0, 0, true).mantissa(), 0);
        assert_eq!(Decimal::from_word(32767, 0, true).mantissa(), 32767);
        assert_eq!(Decimal::from_word(32768, 0, true).mantissa(), -32768);
        assert_eq!(Decimal::from_word(65535, 2, true).mantissa(), -1);
        assert_eq!(Decimal::from_word(65436, 2, true).to_string(), "-1.00");
    }

    #[test]
    fn percentage() {
        let remaining = Decimal::new(50_000, 3);
        let total = Decimal::new(100_000, 3);
        assert_eq!(remaining.percent_of(total), Decimal::new(5000, 2));
        assert_eq!(
            Decimal::new(1, 0).percent_of(Decimal::new(3, 0)).to_string(),
            "33.33"
        );
        assert_eq!(remaining.percent_of(Decimal::new(0, 3)).to_string(), "0.00");
    }

    #[test]
    fn json_numbers_are_exact() {
        let value: JsonValue = Decimal::new(1250, 1).into();
        assert_eq!(value.as_f64(), Some(125.0));
        let value: JsonValue = Decimal::new(-44, 0).into();
        assert_eq!(value.as_i64(), Some(-44));
    }

    #[test]
    fn display_readings() {
        assert_eq!(Reading::Text("RNG-CTRL-RVR40".into()).to_string(), "RNG-CTRL-RVR40");
        assert_eq!(
            Reading::Series(vec![Decimal::new(33, 1), Decimal::new(34, 1)]).to_string(),
            "[3.3, 3.4]"
        );
        assert_eq!(
            json::stringify(Reading::Series(vec![Decimal::new(33, 1)])),
            "[3.3]"
        );
    }
}
