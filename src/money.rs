use anyhow::{Context, Error, Result};
use num_traits::Zero;
use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::*;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use tracing::warn;

/// Currency amount. Display is always fixed point with two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(pub Decimal);

impl Money {
    /// Rounds half away from zero to exactly 2 dp. Values too large to
    /// carry two decimals come back as zero.
    pub fn round2(self) -> Self {
        let mut d = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if d.is_zero() {
            d.set_sign_positive(true);
        }
        d.rescale(2);
        if d.scale() != 2 {
            warn!(value = %self.0, "amount out of range, using zero");
            return Self(Decimal::new(0, 2));
        }
        Self(d)
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Sum that degrades to zero instead of overflowing.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Money {
        iter.into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .unwrap_or_else(|| {
                warn!("sum overflowed, using zero");
                Money::zero()
            })
    }

    /// Parses form input the way the store screens do: longest numeric prefix, 0 otherwise.
    pub fn parse_lenient(raw: &str) -> Self {
        Self(parse_decimal_lenient(raw))
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn to_currency_string(&self) -> String {
        let rounded = self.round2();
        if rounded.0.is_sign_negative() {
            format!("(₹{})", rounded.abs())
        } else {
            format!("₹{rounded}")
        }
    }
}

/// Lenient decimal parse shared by every numeric form field.
///
/// Leading whitespace is skipped and the longest prefix that reads as a
/// number (optional sign, digits, fraction, exponent) is used, so `"12abc"`
/// is 12 and `"3.5.1"` is 3.5. Blank input, input without a numeric prefix,
/// and values outside the decimal range all come back as zero.
pub fn parse_decimal_lenient(raw: &str) -> Decimal {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &s[int_start..i];

    let mut frac_digits = "";
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = &s[frac_start..j];
        if !frac_digits.is_empty() || !int_digits.is_empty() {
            i = j;
        }
    }
    if int_digits.is_empty() && frac_digits.is_empty() {
        return Decimal::ZERO;
    }

    let mut exponent = None;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits_start {
            exponent = Some(&s[i + 1..j]);
        }
    }

    let mut mantissa = String::with_capacity(int_digits.len() + frac_digits.len() + 3);
    if negative {
        mantissa.push('-');
    }
    mantissa.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        mantissa.push('.');
        mantissa.push_str(frac_digits);
    }

    let parsed = match exponent {
        Some(exp) => Decimal::from_scientific(&format!("{mantissa}e{exp}")),
        None => Decimal::from_str(&mantissa),
    };
    parsed.unwrap_or(Decimal::ZERO)
}

/// Lenient whole number parse for counts: optional sign and leading digits,
/// so `"3.7"` is 3 and `"1e3"` is 1. Anything else is zero.
pub fn parse_integer_lenient(raw: &str) -> Decimal {
    let s = raw.trim_start();
    let digits_start = usize::from(s.starts_with(['-', '+']));
    let digits_end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| digits_start + i);
    if digits_end == digits_start {
        return Decimal::ZERO;
    }
    Decimal::from_str(&s[..digits_end]).unwrap_or(Decimal::ZERO)
}

/// Basically this holds a Decimal that is scaled out to at least 2 dp (doesn't round).
impl TryFrom<f64> for Money {
    type Error = Error;

    fn try_from(f: f64) -> Result<Self> {
        let mut d = Decimal::from_f64(f).context(format!("Failed to convert {} to Money", f))?;
        if d.scale() < 2 {
            d.rescale(2);
        }
        Ok(Self(d))
    }
}

impl FromStr for Money {
    type Err = Error;

    /// Strict parse, for documents rather than form edits.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let d = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .context(format!("Failed to parse {:?} as Money", s))?;
        Ok(Self(d))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round2();
        match f.width() {
            Some(width) => write!(f, "{:>width$}", rounded.0.to_string()),
            None => write!(f, "{}", rounded.0),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Money, E> {
        Money::try_from(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

impl Zero for Money {
    fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<'a, 'b> Add<&'b Money> for &'a Money {
    type Output = Money;

    fn add(self, other: &Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Add<Money> for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub<Money> for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod money_tests {
    use super::*;
    use std::convert::TryInto;

    #[test]
    fn money_from_f64() -> Result<()> {
        // less than 2 dp
        let m: Money = 1f64.try_into()?;
        assert_eq!(m.to_string(), "1.00");
        let m: Money = 1.1.try_into()?;
        assert_eq!(m.to_string(), "1.10");

        // display rounds, value doesn't
        let m: Money = 1.115.try_into()?;
        assert_eq!(m.to_string(), "1.12");
        assert_eq!(m.0, Decimal::new(1115, 3));

        Ok(())
    }

    #[test]
    fn round2_half_away_from_zero() {
        let r = |s: &str| Money(Decimal::from_str(s).unwrap()).round2().to_string();
        assert_eq!(r("451.5"), "451.50");
        assert_eq!(r("0.005"), "0.01");
        assert_eq!(r("0.004"), "0.00");
        assert_eq!(r("2.675"), "2.68");
        assert_eq!(r("-2.675"), "-2.68");
        assert_eq!(r("-0.001"), "0.00");
        assert_eq!(r("1000000"), "1000000.00");
    }

    #[test]
    fn round2_out_of_range_is_zero() {
        let huge = Money(Decimal::from_str("7000000000000000000000000000").unwrap());
        assert_eq!(huge.round2().to_string(), "0.00");
        assert_eq!(huge.round2().0.scale(), 2);
        let max_two_dp = Money(Decimal::from_str("700000000000000000000000000").unwrap());
        assert_eq!(max_two_dp.round2().to_string(), "700000000000000000000000000.00");
    }

    #[test]
    fn checked_arithmetic() {
        let max = Money(Decimal::MAX);
        assert_eq!(max.checked_add(max), None);
        assert_eq!(max.checked_sub(-max), None);
        assert_eq!(Money::checked_sum([max, max]).to_string(), "0.00");
        let parts = ["1.10", "2.20"].iter().map(|s| Money::parse_lenient(s));
        assert_eq!(Money::checked_sum(parts).to_string(), "3.30");
    }

    #[test]
    fn lenient_parse() {
        let p = |s: &str| parse_decimal_lenient(s).to_string();
        assert_eq!(p("3"), "3");
        assert_eq!(p(" 150.5 "), "150.5");
        assert_eq!(p("12abc"), "12");
        assert_eq!(p("3.5.1"), "3.5");
        assert_eq!(p(".5"), "0.5");
        assert_eq!(p("5."), "5");
        assert_eq!(p("-4"), "-4");
        assert_eq!(p("+7"), "7");
        assert_eq!(p("1e3"), "1000");
        assert_eq!(p("2e"), "2");
        assert_eq!(p(""), "0");
        assert_eq!(p("   "), "0");
        assert_eq!(p("abc"), "0");
        assert_eq!(p("."), "0");
        assert_eq!(p("-"), "0");
        assert_eq!(p("99999999999999999999999999999999999"), "0");
    }

    #[test]
    fn integer_parse() {
        let p = |s: &str| parse_integer_lenient(s).to_string();
        assert_eq!(p("12"), "12");
        assert_eq!(p(" 3.7"), "3");
        assert_eq!(p("1e3"), "1");
        assert_eq!(p("-2"), "-2");
        assert_eq!(p("+4x"), "4");
        assert_eq!(p(""), "0");
        assert_eq!(p("-"), "0");
        assert_eq!(p("abc"), "0");
        assert_eq!(p("99999999999999999999999999999999999"), "0");
    }

    #[test]
    fn currency_string() -> Result<()> {
        assert_eq!(Money::parse_lenient("451.5").to_currency_string(), "₹451.50");
        assert_eq!(Money::parse_lenient("-3.1").to_currency_string(), "(₹3.10)");
        Ok(())
    }

    #[test]
    fn test_add() -> Result<()> {
        let add = Money::try_from(100.00)? + Money::try_from(100.00)?;
        assert_eq!(add.to_string(), "200.00");
        let sum: Money = ["1.10", "2.20", "3.30"]
            .iter()
            .map(|s| Money::parse_lenient(s))
            .sum();
        assert_eq!(sum.to_string(), "6.60");
        Ok(())
    }

    #[test]
    fn serde_as_string() -> Result<()> {
        let m: Money = serde_yaml::from_str("\"48.5\"")?;
        assert_eq!(serde_json::to_string(&m)?, "\"48.50\"");
        let m: Money = serde_yaml::from_str("500")?;
        assert_eq!(m.to_string(), "500.00");
        assert!(serde_yaml::from_str::<Money>("\"abc\"").is_err());
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Addition overflowed")]
    #[allow(unused_must_use)]
    fn test_add_panic() -> () {
        Money::try_from(7.9e28).unwrap() + Money::try_from(7.9e28).unwrap();
    }
}
