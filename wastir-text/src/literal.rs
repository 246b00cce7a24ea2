// Conversion of numeric tokens into the bits stored in the IR. Functions return `None` when the
// literal is out of range for the requested type. Callers report the error with the token text.

use crate::lexer::{Float, NumBase, Sign};
use std::mem;

// Unsigned magnitude of digits which may contain '_' separators
pub fn parse_u64(digits: &str, base: NumBase) -> Option<u64> {
    let radix = base.radix();
    let mut ret: u64 = 0;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(radix)?;
        ret = ret.checked_mul(radix as u64)?.checked_add(d as u64)?;
    }
    Some(ret)
}

pub fn parse_u32(digits: &str, base: NumBase) -> Option<u32> {
    parse_u64(digits, base).and_then(|u| u32::try_from(u).ok())
}

// Two's complement bits of an integer literal of `bits` width. Both signed and unsigned ranges are
// accepted, i.e. -2^(N-1) <= x < 2^N.
pub fn int_bits(sign: Option<Sign>, base: NumBase, digits: &str, bits: u32) -> Option<u64> {
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let magnitude = parse_u64(digits, base)?;
    match sign {
        None | Some(Sign::Plus) if magnitude <= mask => Some(magnitude),
        Some(Sign::Minus) if magnitude <= 1u64 << (bits - 1) => Some(magnitude.wrapping_neg() & mask),
        _ => None,
    }
}

// Exponents beyond i32 saturate. The literal then rounds to zero or overflows like any other value
// out of range.
fn parse_exponent(digits: &str) -> Option<i32> {
    let mut ret: i32 = 0;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(10)? as i32;
        ret = ret.saturating_mul(10).saturating_add(d);
    }
    Some(ret)
}

// Hexadecimal float literals are rounded to nearest even by hand since std cannot parse them.
//
// The significand is accumulated as an integer with a few extra bits (4 bits per hex digit plus
// one sticky bit) and the exponent is adjusted for every fractional digit. Then the significand is
// normalized, rounded and encoded as a normal number, a subnormal number or infinity.
macro_rules! hex_float_bits_fn {
    ($name:ident, $float:ty, $uint:ty) => {
        fn $name(frac: &str, exp: Option<(Sign, &str)>) -> Option<$uint> {
            const SIGNIFICAND_BITS: i32 = <$float>::MANTISSA_DIGITS as i32;
            const BITS: i32 = (mem::size_of::<$float>() * 8) as i32;
            // Two more bits than the significand are needed to round to nearest. Digits are read
            // 4 bits at once and 1 bit remembers whether dropped digits were all zero.
            const TEMP_SIG_BITS: i32 = SIGNIFICAND_BITS + 4 + 1;
            // The integer significand has TEMP_SIG_BITS bits but IEEE 754 has 1 bit integer part.
            const TEMP_EXP_BIAS: i32 = (<$float>::MAX_EXP - 1) + (TEMP_SIG_BITS - 1);
            const TEMP_MAX_EXP: i32 = (<$float>::MAX_EXP - 1) - (TEMP_SIG_BITS - 1);
            const TEMP_MIN_EXP: i32 = (<$float>::MIN_EXP - 1) - (TEMP_SIG_BITS - 1);

            let mut temp_exp: i32 = match exp {
                Some((exp_sign, exp_str)) => {
                    let e = parse_exponent(exp_str)?;
                    match exp_sign {
                        Sign::Plus => e,
                        Sign::Minus => -e,
                    }
                }
                None => 0,
            };

            // 0x123.456 is read as 0x123456p-12
            let mut temp_sig: $uint = 0;
            let mut saw_dot = false;
            for c in frac.chars() {
                let digit = match c {
                    '.' => {
                        saw_dot = true;
                        continue;
                    }
                    '_' => continue,
                    c => c.to_digit(16)? as $uint,
                };
                if temp_sig < 1 << (SIGNIFICAND_BITS + 1) {
                    temp_sig = (temp_sig << 4) | digit;
                    if saw_dot {
                        temp_exp = temp_exp.saturating_sub(4);
                    }
                } else {
                    // Significand is already full. Only the sticky bit matters from here
                    temp_sig |= (digit != 0) as $uint;
                    if !saw_dot {
                        temp_exp = temp_exp.saturating_add(4);
                    }
                }
            }

            if temp_sig == 0 {
                return Some(0);
            }

            if temp_sig < 1 << (TEMP_SIG_BITS - 1) {
                let shift = temp_sig.leading_zeros() as i32 - (BITS - TEMP_SIG_BITS);
                temp_sig <<= shift;
                temp_exp = temp_exp.saturating_sub(shift);
            }

            let bits = if (TEMP_MIN_EXP..=TEMP_MAX_EXP).contains(&temp_exp) {
                // Normal number, or infinity when rounding carries into the exponent
                temp_sig &= (1 << (TEMP_SIG_BITS - 1)) - 1;
                // Round to nearest even. 0x2f masks the kept LSB and the extra bits below it
                if (temp_sig & 0x2f) != 0 {
                    temp_sig += 0x10;
                }
                (temp_sig >> 5) + (((temp_exp + TEMP_EXP_BIAS) as $uint) << (SIGNIFICAND_BITS - 1))
            } else if TEMP_MIN_EXP - SIGNIFICAND_BITS <= temp_exp && temp_exp < TEMP_MIN_EXP {
                // Subnormal or zero. Keep a sticky bit for the shifted out bits
                let shift = TEMP_MIN_EXP - temp_exp;
                let sticky = ((temp_sig & ((1 << shift) - 1)) != 0) as $uint;
                temp_sig = (temp_sig >> shift) | sticky;
                if (temp_sig & 0x2f) != 0 {
                    temp_sig += 0x10;
                }
                temp_sig >> 5
            } else if TEMP_MAX_EXP < temp_exp {
                return None;
            } else {
                0
            };

            if <$float>::from_bits(bits).is_infinite() {
                None
            } else {
                Some(bits)
            }
        }
    };
}

hex_float_bits_fn!(hex_f32_bits, f32, u32);
hex_float_bits_fn!(hex_f64_bits, f64, u64);

macro_rules! float_bits_fn {
    ($name:ident, $hex:ident, $float:ty, $uint:ty) => {
        // https://webassembly.github.io/spec/core/text/values.html#floating-point
        pub fn $name(sign: Sign, float: &Float<'_>) -> Option<$uint> {
            const BITS: u32 = (mem::size_of::<$float>() * 8) as u32;
            const SIGNIFICAND_BITS: u32 = <$float>::MANTISSA_DIGITS - 1;
            const EXP_MASK: $uint = ((1 << (BITS - 1)) - 1) & !((1 << SIGNIFICAND_BITS) - 1);
            const PAYLOAD_MASK: $uint = (1 << SIGNIFICAND_BITS) - 1;

            let magnitude: $uint = match float {
                Float::Inf => EXP_MASK,
                Float::Nan(None) => EXP_MASK | (1 << (SIGNIFICAND_BITS - 1)),
                Float::Nan(Some(payload)) => {
                    let payload = parse_u64(payload, NumBase::Hex)?;
                    if payload == 0 || payload > PAYLOAD_MASK as u64 {
                        return None;
                    }
                    EXP_MASK | payload as $uint
                }
                Float::Val {
                    base: NumBase::Hex,
                    frac,
                    exp,
                } => $hex(frac, *exp)?,
                Float::Val {
                    base: NumBase::Dec,
                    frac,
                    exp,
                } => {
                    let mut s: String = frac.chars().filter(|c| *c != '_').collect();
                    if let Some((sign, exp)) = exp {
                        s.push('e');
                        if *sign == Sign::Minus {
                            s.push('-');
                        }
                        s.extend(exp.chars().filter(|c| *c != '_'));
                    }
                    let f = s.parse::<$float>().ok()?;
                    if f.is_infinite() {
                        return None;
                    }
                    f.to_bits()
                }
            };

            Some(match sign {
                Sign::Plus => magnitude,
                Sign::Minus => magnitude | (1 << (BITS - 1)),
            })
        }
    };
}

float_bits_fn!(f32_bits, hex_f32_bits, f32, u32);
float_bits_fn!(f64_bits, hex_f64_bits, f64, u64);

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_of(sign: Sign, float: Float<'_>) -> Option<f32> {
        f32_bits(sign, &float).map(f32::from_bits)
    }

    fn hex32(frac: &str, exp: Option<(Sign, &str)>) -> Option<f32> {
        f32_of(
            Sign::Plus,
            Float::Val {
                base: NumBase::Hex,
                frac,
                exp,
            },
        )
    }

    fn hex64(frac: &str, exp: Option<(Sign, &str)>) -> Option<f64> {
        f64_bits(
            Sign::Plus,
            &Float::Val {
                base: NumBase::Hex,
                frac,
                exp,
            },
        )
        .map(f64::from_bits)
    }

    #[test]
    fn unsigned_integers() {
        assert_eq!(parse_u64("1_000", NumBase::Dec), Some(1000));
        assert_eq!(parse_u64("ff", NumBase::Hex), Some(255));
        assert_eq!(parse_u64("18446744073709551615", NumBase::Dec), Some(u64::MAX));
        assert_eq!(parse_u64("18446744073709551616", NumBase::Dec), None);
        assert_eq!(parse_u32("4294967295", NumBase::Dec), Some(u32::MAX));
        assert_eq!(parse_u32("4294967296", NumBase::Dec), None);
        assert_eq!(parse_u32("1g", NumBase::Hex), None);
    }

    #[test]
    fn integer_bits() {
        assert_eq!(int_bits(None, NumBase::Dec, "4294967295", 32), Some(0xffff_ffff));
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Dec, "1", 32), Some(0xffff_ffff));
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Dec, "2147483648", 32), Some(0x8000_0000));
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Dec, "2147483649", 32), None);
        assert_eq!(int_bits(Some(Sign::Plus), NumBase::Dec, "4294967296", 32), None);
        assert_eq!(int_bits(None, NumBase::Hex, "ffffffffffffffff", 64), Some(u64::MAX));
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Hex, "8000000000000000", 64), Some(1 << 63));
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Dec, "128", 8), Some(0x80));
        assert_eq!(int_bits(None, NumBase::Dec, "256", 8), None);
        assert_eq!(int_bits(Some(Sign::Minus), NumBase::Dec, "0", 16), Some(0));
    }

    #[test]
    fn decimal_floats() {
        let val = |frac, exp| Float::Val {
            base: NumBase::Dec,
            frac,
            exp,
        };
        assert_eq!(f32_of(Sign::Plus, val("1.5", None)), Some(1.5));
        assert_eq!(f32_of(Sign::Minus, val("1_0", Some((Sign::Minus, "1")))), Some(-1.0));
        assert_eq!(f32_of(Sign::Plus, val("1", Some((Sign::Plus, "39")))), None);
        assert_eq!(f64_bits(Sign::Plus, &val("1", Some((Sign::Plus, "39")))), Some(1e39f64.to_bits()));
        assert_eq!(f32_bits(Sign::Minus, &val("0", None)), Some(0x8000_0000));
    }

    #[test]
    fn special_floats() {
        assert_eq!(f32_bits(Sign::Plus, &Float::Inf), Some(0x7f80_0000));
        assert_eq!(f32_bits(Sign::Minus, &Float::Inf), Some(0xff80_0000));
        assert_eq!(f32_bits(Sign::Plus, &Float::Nan(None)), Some(0x7fc0_0000));
        assert_eq!(f64_bits(Sign::Plus, &Float::Nan(None)), Some(0x7ff8_0000_0000_0000));
        assert_eq!(f32_bits(Sign::Plus, &Float::Nan(Some("1"))), Some(0x7f80_0001));
        assert_eq!(f32_bits(Sign::Minus, &Float::Nan(Some("7f_ffff"))), Some(0xffff_ffff));
        assert_eq!(f32_bits(Sign::Plus, &Float::Nan(Some("0"))), None);
        assert_eq!(f32_bits(Sign::Plus, &Float::Nan(Some("800000"))), None);
        assert_eq!(f64_bits(Sign::Plus, &Float::Nan(Some("800000"))), Some(0x7ff0_0000_0080_0000));
    }

    #[test]
    fn hex_floats() {
        assert_eq!(hex32("1", None), Some(1.0));
        assert_eq!(hex32("1.8", Some((Sign::Plus, "3"))), Some(12.0));
        assert_eq!(hex32("0.1", None), Some(0.0625));
        assert_eq!(hex32("1", Some((Sign::Minus, "1"))), Some(0.5));
        assert_eq!(hex32("0", None), Some(0.0));
        assert_eq!(hex32("1.fffffe", Some((Sign::Plus, "127"))), Some(f32::MAX));
        assert_eq!(hex32("1", Some((Sign::Plus, "128"))), None);
        assert_eq!(hex32("1", Some((Sign::Minus, "149"))), Some(f32::from_bits(1)));
        assert_eq!(hex32("1", Some((Sign::Minus, "126"))), Some(f32::MIN_POSITIVE));
        assert_eq!(hex64("1.fffffffffffff", Some((Sign::Plus, "1023"))), Some(f64::MAX));
        assert_eq!(hex64("1", Some((Sign::Minus, "1074"))), Some(f64::from_bits(1)));
    }

    #[test]
    fn hex_float_huge_exponents() {
        assert_eq!(hex32("1", Some((Sign::Minus, "99999999999"))), Some(0.0));
        assert_eq!(hex64("1.8", Some((Sign::Minus, "99_999_999_999_999_999_999"))), Some(0.0));
        assert_eq!(hex32("1", Some((Sign::Plus, "99999999999"))), None);
        assert_eq!(hex64("0.0001", Some((Sign::Plus, "99999999999"))), None);
        assert_eq!(hex32("0", Some((Sign::Plus, "99999999999"))), Some(0.0));
    }

    #[test]
    fn hex_float_rounding() {
        // 0x1.000001p0 is exactly between two f32 values and rounds to even
        assert_eq!(hex32("1.000001", None), Some(1.0));
        // 0x1.000003p0 is between 1+2^-23 and 1+2^-22 and rounds up to even
        assert_eq!(hex32("1.000003", None), Some(f32::from_bits(0x3f80_0002)));
        // Slightly above the midpoint rounds up
        assert_eq!(hex32("1.0000010000001", None), Some(f32::from_bits(0x3f80_0001)));
        // Largest value which rounds down to f32::MAX
        assert_eq!(hex32("1.fffffefffffff", Some((Sign::Plus, "127"))), Some(f32::MAX));
        assert_eq!(hex32("1.ffffff", Some((Sign::Plus, "127"))), None);
    }
}
