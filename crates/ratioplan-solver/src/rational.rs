use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::RationalError;

/// Exact fraction of two arbitrary precision integers.
///
/// Arithmetic results are left unsimplified; call [`Rational::simplify`] at
/// natural checkpoints to keep the magnitudes in check. Equality, ordering and
/// hashing all work on the value, never on the stored representation, so
/// `2/4 == 1/2`.
///
/// Invariant: the denominator is strictly positive.
#[derive(Clone)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

/// How [`Rational::to_decimal_string`] treats the discarded digits.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    /// Away from zero
    Up,
    /// Towards zero
    Down,
    /// Towards positive infinity
    Ceiling,
    /// Towards negative infinity
    Floor,
    /// Nearest neighbour, ties away from zero
    HalfUp,
    /// Nearest neighbour, ties towards zero
    HalfDown,
    /// Nearest neighbour, ties to the even neighbour
    #[default]
    HalfEven,
}

impl Rational {
    /// Create `numerator / denominator`, failing if the denominator is zero.
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Result<Self, RationalError> {
        let numerator = numerator.into();
        let denominator = denominator.into();
        if denominator.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self::from_parts(numerator, denominator))
    }

    /// Normalizes the sign onto the numerator. The caller guarantees a non-zero denominator.
    fn from_parts(numerator: BigInt, denominator: BigInt) -> Self {
        if denominator.is_negative() {
            Self {
                numerator: -numerator,
                denominator: -denominator,
            }
        } else {
            Self { numerator, denominator }
        }
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self {
            numerator: value.into(),
            denominator: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self {
            numerator: BigInt::ZERO,
            denominator: BigInt::one(),
        }
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    pub fn minus_one() -> Self {
        Self::from_integer(-1)
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.numerator == self.denominator
    }

    pub fn is_minus_one(&self) -> bool {
        self.numerator.is_negative() && self.numerator.magnitude() == self.denominator.magnitude()
    }

    pub fn is_positive(&self) -> bool {
        self.numerator.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    pub fn is_integer(&self) -> bool {
        self.denominator.is_one() || (&self.numerator % &self.denominator).is_zero()
    }

    pub fn signum(&self) -> i32 {
        match self.numerator.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// The same value in lowest terms.
    pub fn simplify(&self) -> Self {
        if self.denominator.is_one() {
            return self.clone();
        }
        if self.numerator.is_zero() {
            return Self::zero();
        }
        let gcd = self.numerator.gcd(&self.denominator);
        if gcd.is_one() {
            return self.clone();
        }
        Self {
            numerator: &self.numerator / &gcd,
            denominator: &self.denominator / &gcd,
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator.clone(),
        }
    }

    pub fn reciprocal(&self) -> Result<Self, RationalError> {
        if self.numerator.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self::from_parts(self.denominator.clone(), self.numerator.clone()))
    }

    /// Exact division, failing on a zero divisor.
    pub fn checked_div(&self, divisor: &Rational) -> Result<Self, RationalError> {
        if divisor.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        if divisor.is_one() {
            return Ok(self.clone());
        }
        if divisor.is_minus_one() {
            return Ok(-self);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        Ok(Self::from_parts(
            &self.numerator * &divisor.denominator,
            &self.denominator * &divisor.numerator,
        ))
    }

    pub fn divide_by_integer(&self, divisor: impl Into<BigInt>) -> Result<Self, RationalError> {
        let divisor = divisor.into();
        if divisor.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self::from_parts(self.numerator.clone(), &self.denominator * divisor))
    }

    pub fn multiply_by_integer(&self, factor: impl Into<BigInt>) -> Self {
        Self {
            numerator: &self.numerator * factor.into(),
            denominator: self.denominator.clone(),
        }
    }

    /// The integer value, failing if the fraction does not divide evenly.
    pub fn to_integer_exact(&self) -> Result<BigInt, RationalError> {
        let (quotient, remainder) = self.numerator.div_rem(&self.denominator);
        if remainder.is_zero() {
            Ok(quotient)
        } else {
            Err(RationalError::NotAnInteger(self.to_string()))
        }
    }

    /// The integer part, truncated towards zero.
    pub fn to_integer_truncated(&self) -> BigInt {
        &self.numerator / &self.denominator
    }

    /// The value rounded to `scale` fractional digits, as an unscaled integer
    /// (`value * 10^scale`).
    fn to_unscaled(&self, scale: u32, mode: RoundingMode) -> BigInt {
        let factor = num_traits::pow(BigInt::from(10u32), scale as usize);
        let scaled = &self.numerator * factor;
        let (quotient, remainder) = scaled.div_rem(&self.denominator);
        if remainder.is_zero() {
            return quotient;
        }

        let positive = self.numerator.is_positive();
        let twice_remainder = remainder.abs() * 2u32;
        let away_from_zero = match mode {
            RoundingMode::Up => true,
            RoundingMode::Down => false,
            RoundingMode::Ceiling => positive,
            RoundingMode::Floor => !positive,
            RoundingMode::HalfUp => twice_remainder >= self.denominator,
            RoundingMode::HalfDown => twice_remainder > self.denominator,
            RoundingMode::HalfEven => match twice_remainder.cmp(&self.denominator) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => quotient.is_odd(),
            },
        };

        if !away_from_zero {
            quotient
        } else if positive {
            quotient + 1u32
        } else {
            quotient - 1u32
        }
    }

    /// Render with exactly `scale` fractional digits.
    pub fn to_decimal_string(&self, scale: u32, mode: RoundingMode) -> String {
        let unscaled = self.to_unscaled(scale, mode);
        let digits = unscaled.magnitude().to_string();
        let sign = if unscaled.is_negative() { "-" } else { "" };
        if scale == 0 {
            return format!("{sign}{digits}");
        }
        let scale = scale as usize;
        let digits = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = digits.split_at(digits.len() - scale);
        format!("{sign}{whole}.{fraction}")
    }

    /// The value rounded to `scale` fractional digits.
    pub fn round(&self, scale: u32, mode: RoundingMode) -> Self {
        let unscaled = self.to_unscaled(scale, mode);
        Self {
            numerator: unscaled,
            denominator: num_traits::pow(BigInt::from(10u32), scale as usize),
        }
        .simplify()
    }

    /// Lossy conversion for display purposes.
    pub fn to_f64(&self) -> f64 {
        match (self.numerator.to_f64(), self.denominator.to_f64()) {
            (Some(n), Some(d)) if n.is_finite() && d.is_finite() => n / d,
            _ => self
                .to_decimal_string(17, RoundingMode::HalfEven)
                .parse()
                .unwrap_or(f64::NAN),
        }
    }

    pub fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    pub fn min(self, other: Self) -> Self {
        if other < self { other } else { self }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Rational {
                fn from(value: $t) -> Self {
                    Self::from_integer(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_primitive!(i32, i64, u32, u64, usize);

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        if self.denominator == other.denominator {
            return self.numerator == other.numerator;
        }
        &self.numerator * &other.denominator == &other.numerator * &self.denominator
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.denominator == other.denominator {
            return self.numerator.cmp(&other.numerator);
        }
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl Hash for Rational {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let simplified = self.simplify();
        simplified.numerator.hash(state);
        simplified.denominator.hash(state);
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simplified = self.simplify();
        if simplified.denominator.is_one() {
            write!(f, "{}", simplified.numerator)
        } else {
            write!(f, "{}/{}", simplified.numerator, simplified.denominator)
        }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    /// Accepts `"n/d"`, a bare integer, or a finite decimal such as `"-22.5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse_int = |text: &str| -> Result<BigInt, RationalError> {
            text.trim()
                .parse::<BigInt>()
                .map_err(|_| RationalError::Parse(s.to_string()))
        };

        if let Some((numerator, denominator)) = s.split_once('/') {
            return Rational::new(parse_int(numerator)?, parse_int(denominator)?);
        }

        if let Some((whole, fraction)) = s.split_once('.') {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RationalError::Parse(s.to_string()));
            }
            let (negative, digits) = match whole.as_bytes().first() {
                Some(b'-') => (true, &whole[1..]),
                Some(b'+') => (false, &whole[1..]),
                _ => (false, whole),
            };
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RationalError::Parse(s.to_string()));
            }
            let whole = match digits {
                "" => BigInt::ZERO,
                digits => parse_int(digits)?,
            };
            let denominator = num_traits::pow(BigInt::from(10u32), fraction.len());
            let magnitude = whole * &denominator + parse_int(fraction)?;
            let numerator = if negative { -magnitude } else { magnitude };
            return Ok(Self::from_parts(numerator, denominator));
        }

        Ok(Self::from_integer(parse_int(s)?))
    }
}

fn add_rationals(a: &Rational, b: &Rational) -> Rational {
    if a.is_zero() {
        return b.clone();
    }
    if b.is_zero() {
        return a.clone();
    }
    if a.denominator == b.denominator {
        return Rational {
            numerator: &a.numerator + &b.numerator,
            denominator: a.denominator.clone(),
        };
    }
    Rational {
        numerator: &a.numerator * &b.denominator + &b.numerator * &a.denominator,
        denominator: &a.denominator * &b.denominator,
    }
}

fn mul_rationals(a: &Rational, b: &Rational) -> Rational {
    if a.is_zero() || b.is_zero() {
        return Rational::zero();
    }
    if a.is_one() {
        return b.clone();
    }
    if b.is_one() {
        return a.clone();
    }
    if a.is_minus_one() {
        return -b;
    }
    if b.is_minus_one() {
        return -a;
    }
    Rational {
        numerator: &a.numerator * &b.numerator,
        denominator: &a.denominator * &b.denominator,
    }
}

impl Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        if self.is_zero() {
            return self.clone();
        }
        Rational {
            numerator: -&self.numerator,
            denominator: self.denominator.clone(),
        }
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl Add<&Rational> for &Rational {
    type Output = Rational;

    fn add(self, rhs: &Rational) -> Rational {
        add_rationals(self, rhs)
    }
}

impl Sub<&Rational> for &Rational {
    type Output = Rational;

    fn sub(self, rhs: &Rational) -> Rational {
        if rhs.is_zero() {
            return self.clone();
        }
        add_rationals(self, &-rhs)
    }
}

impl Mul<&Rational> for &Rational {
    type Output = Rational;

    fn mul(self, rhs: &Rational) -> Rational {
        mul_rationals(self, rhs)
    }
}

impl Div<&Rational> for &Rational {
    type Output = Rational;

    /// # Panics
    ///
    /// Panics when dividing by zero, like integer division. Use
    /// [`Rational::checked_div`] to get a [`RationalError::DivisionByZero`] instead.
    fn div(self, rhs: &Rational) -> Rational {
        match self.checked_div(rhs) {
            Ok(quotient) => quotient,
            Err(_) => panic!("attempt to divide a rational by zero"),
        }
    }
}

macro_rules! forward_binop {
    ($($imp:ident :: $method:ident),*) => {
        $(
            impl $imp<Rational> for Rational {
                type Output = Rational;

                fn $method(self, rhs: Rational) -> Rational {
                    (&self).$method(&rhs)
                }
            }

            impl $imp<&Rational> for Rational {
                type Output = Rational;

                fn $method(self, rhs: &Rational) -> Rational {
                    (&self).$method(rhs)
                }
            }

            impl $imp<Rational> for &Rational {
                type Output = Rational;

                fn $method(self, rhs: Rational) -> Rational {
                    self.$method(&rhs)
                }
            }
        )*
    };
}

forward_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl Sum for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Self {
        iter.fold(Rational::zero(), |acc, x| (acc + x).simplify())
    }
}

impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        iter.fold(Rational::zero(), |acc, x| (acc + x).simplify())
    }
}

impl Zero for Rational {
    fn zero() -> Self {
        Rational::zero()
    }

    fn is_zero(&self) -> bool {
        Rational::is_zero(self)
    }
}

impl One for Rational {
    fn one() -> Self {
        Rational::one()
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Rational;

    impl Serialize for Rational {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    struct RationalVisitor;

    impl Visitor<'_> for RationalVisitor {
        type Value = Rational;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an exact rational such as \"3/2\", \"1.5\" or an integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Rational, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rational, E> {
            Ok(Rational::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rational, E> {
            Ok(Rational::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rational, E> {
            Err(E::custom(format!(
                "floating point value {v} is not exact; write it as a string"
            )))
        }
    }

    impl<'de> Deserialize<'de> for Rational {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Rational, D::Error> {
            deserializer.deserialize_any(RationalVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d).unwrap()
    }

    #[test]
    fn test_equality_ignores_representation() {
        assert_eq!(r(2, 4), r(1, 2));
        assert_eq!(r(-3, -6), r(1, 2));
        assert_eq!(r(3, -6), r(-1, 2));
        assert_ne!(r(1, 3), r(1, 2));
    }

    #[test]
    fn test_hash_matches_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(r(2, 4));
        assert!(set.contains(&r(1, 2)));
        assert!(set.contains(&r(-5, -10)));
    }

    #[test]
    fn test_ordering() {
        assert!(r(1, 3) < r(1, 2));
        assert!(r(-1, 2) < r(-1, 3));
        assert!(r(7, 3) > Rational::from(2));
        let mut values = vec![r(3, 4), r(-1, 1), r(1, 8), Rational::zero()];
        values.sort();
        assert_eq!(values, vec![r(-1, 1), Rational::zero(), r(1, 8), r(3, 4)]);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(r(1, 2) + r(1, 3), r(5, 6));
        assert_eq!(r(1, 2) - r(1, 3), r(1, 6));
        assert_eq!(r(2, 3) * r(3, 4), r(1, 2));
        assert_eq!(r(2, 3).checked_div(&r(4, 9)).unwrap(), r(3, 2));
        assert_eq!(r(5, 7).divide_by_integer(5).unwrap(), r(1, 7));
        assert_eq!(-r(1, 2), r(-1, 2));
        assert_eq!(r(-7, 2).abs(), r(7, 2));
    }

    #[test]
    fn test_results_are_not_simplified_until_asked() {
        let sum = r(1, 4) + r(1, 4);
        assert_eq!(sum.denominator(), &BigInt::from(4));
        let simplified = sum.simplify();
        assert_eq!(simplified.numerator(), &BigInt::from(1));
        assert_eq!(simplified.denominator(), &BigInt::from(2));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(Rational::new(1, 0), Err(RationalError::DivisionByZero));
        assert_eq!(r(1, 2).checked_div(&Rational::zero()), Err(RationalError::DivisionByZero));
        assert_eq!(r(1, 2).divide_by_integer(0), Err(RationalError::DivisionByZero));
        assert_eq!(Rational::zero().reciprocal(), Err(RationalError::DivisionByZero));
    }

    #[test]
    #[should_panic(expected = "divide a rational by zero")]
    fn test_div_operator_panics_on_zero() {
        let _ = r(1, 2) / Rational::zero();
    }

    #[test]
    fn test_singletons() {
        assert!(Rational::one().is_one());
        assert!(Rational::minus_one().is_minus_one());
        assert!(r(-3, 3).is_minus_one());
        assert!(Rational::zero().is_zero());
        assert_eq!(r(5, 9) * Rational::one(), r(5, 9));
        assert_eq!(r(5, 9) * Rational::minus_one(), r(-5, 9));
        assert_eq!(r(5, 9) * Rational::zero(), Rational::zero());
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(r(12, 4).to_integer_exact().unwrap(), BigInt::from(3));
        assert!(matches!(r(7, 2).to_integer_exact(), Err(RationalError::NotAnInteger(_))));
        assert_eq!(r(7, 2).to_integer_truncated(), BigInt::from(3));
        assert_eq!(r(-7, 2).to_integer_truncated(), BigInt::from(-3));
    }

    #[test]
    fn test_decimal_rounding_modes() {
        let value = r(5, 2); // 2.5
        assert_eq!(value.to_decimal_string(0, RoundingMode::HalfEven), "2");
        assert_eq!(value.to_decimal_string(0, RoundingMode::HalfUp), "3");
        assert_eq!(value.to_decimal_string(0, RoundingMode::HalfDown), "2");
        assert_eq!(value.to_decimal_string(0, RoundingMode::Up), "3");
        assert_eq!(value.to_decimal_string(0, RoundingMode::Down), "2");

        let negative = r(-5, 2);
        assert_eq!(negative.to_decimal_string(0, RoundingMode::Floor), "-3");
        assert_eq!(negative.to_decimal_string(0, RoundingMode::Ceiling), "-2");
        assert_eq!(negative.to_decimal_string(0, RoundingMode::HalfUp), "-3");

        assert_eq!(r(1, 3).to_decimal_string(4, RoundingMode::HalfEven), "0.3333");
        assert_eq!(r(2, 3).to_decimal_string(4, RoundingMode::HalfEven), "0.6667");
        assert_eq!(r(-1, 8).to_decimal_string(2, RoundingMode::Down), "-0.12");
        assert_eq!(r(-1, 1000).to_decimal_string(2, RoundingMode::HalfEven), "0.00");
        assert_eq!(Rational::from(60).to_decimal_string(2, RoundingMode::Down), "60.00");
        assert_eq!(r(1, 3).round(2, RoundingMode::HalfEven), r(33, 100));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("3/6".parse::<Rational>().unwrap(), r(1, 2));
        assert_eq!("-42".parse::<Rational>().unwrap(), Rational::from(-42));
        assert_eq!("22.5".parse::<Rational>().unwrap(), r(45, 2));
        assert_eq!("-0.25".parse::<Rational>().unwrap(), r(-1, 4));
        assert_eq!(".5".parse::<Rational>().unwrap(), r(1, 2));
        assert!("1/0".parse::<Rational>().is_err());
        assert!("abc".parse::<Rational>().is_err());
        assert!("1.".parse::<Rational>().is_err());
        assert_eq!("+1.5".parse::<Rational>().unwrap(), r(3, 2));
        assert_eq!("-.5".parse::<Rational>().unwrap(), r(-1, 2));
        for malformed in ["+-1.5", "--1.5", "-+-2.25", "- 1.5", "1-2.5", "-.", "."] {
            assert!(malformed.parse::<Rational>().is_err(), "{malformed} should not parse");
        }

        assert_eq!(r(6, 4).to_string(), "3/2");
        assert_eq!(r(-8, 4).to_string(), "-2");
        assert_eq!(Rational::zero().to_string(), "0");
        assert_eq!(r(-3, 9).to_string().parse::<Rational>().unwrap(), r(-1, 3));
    }

    #[test]
    fn test_sum() {
        let total: Rational = [r(1, 2), r(1, 3), r(1, 6)].iter().sum();
        assert!(total.is_one());
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(r(1, 4).to_f64(), 0.25);
        assert_eq!(r(-3, 2).to_f64(), -1.5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_exact_strings() {
        assert_eq!(serde_json::to_string(&r(6, 4)).unwrap(), "\"3/2\"");
        assert_eq!(serde_json::to_string(&r(-8, 2)).unwrap(), "\"-4\"");
        assert_eq!(serde_json::from_str::<Rational>("\"45/2\"").unwrap(), r(45, 2));
        assert_eq!(serde_json::from_str::<Rational>("12").unwrap(), Rational::from(12));
        assert!(serde_json::from_str::<Rational>("0.1").is_err());
        assert!(serde_json::from_str::<Rational>("\"1/0\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_division_then_multiplication_is_exact(
            an in -10_000i64..10_000,
            ad in 1i64..10_000,
            bn in -10_000i64..10_000,
            bd in 1i64..10_000,
        ) {
            prop_assume!(bn != 0);
            let a = r(an, ad);
            let b = r(bn, bd);
            let quotient = a.checked_div(&b).unwrap();
            prop_assert_eq!(&quotient * &b, a);
        }
    }
}
