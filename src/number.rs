// SPDX-License-Identifier: Apache-2.0

//! Verilog/C numeric literal parsing and formatting, plus the small regex
//! identifier helpers re-exported from [`crate::selector`].

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// The base a literal was written in. `Unknown` is only produced for a
/// string that failed to parse as any recognized grammar; a successfully
/// parsed literal is never `Unknown`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Base {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
    Unknown,
}

/// An immutable arbitrary-precision literal parsed from either Verilog
/// (`[W]'BVVV`) or C (`0x`/`0b`/leading-zero-octal/bare-decimal) syntax, or
/// from a `[hi:lo]` bit-range expression.
#[derive(Clone, Debug)]
pub struct NumberLiteral {
    base: Base,
    magnitude: BigUint,
    width: usize,
    has_explicit_width: bool,
    error_detected: bool,
}

impl NumberLiteral {
    pub fn base(&self) -> Base {
        self.base
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_explicit_width(&self) -> bool {
        self.has_explicit_width
    }

    pub fn error_detected(&self) -> bool {
        self.error_detected
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.magnitude.to_i64()
    }

    /// Parses a numeric literal, or a `[hi:lo]` bit-range expression (in
    /// which case the result carries no magnitude, only a width).
    pub fn parse(input: &str) -> NumberLiteral {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return NumberLiteral {
                base: Base::Unknown,
                magnitude: BigUint::zero(),
                width: 0,
                has_explicit_width: false,
                error_detected: true,
            };
        }

        if let Some(range) = parse_bit_range(trimmed) {
            return range;
        }

        if let Some(lit) = parse_verilog_form(trimmed) {
            return lit;
        }

        if let Some(lit) = parse_c_form(trimmed) {
            return lit;
        }

        NumberLiteral {
            base: Base::Unknown,
            magnitude: BigUint::zero(),
            width: 0,
            has_explicit_width: false,
            error_detected: true,
        }
    }

    /// Verilog short form: `'bVVV`, `'o755`, `'d1234`, `'hdeadbeef`. No
    /// width prefix; hex digits lowercase, decimal unprefixed otherwise.
    pub fn format(&self) -> String {
        let (prefix, digits) = self.base_digits();
        format!("'{prefix}{digits}")
    }

    /// Verilog long form: width prefix included only if the literal was
    /// parsed with an explicit width; otherwise the minimum width needed
    /// to represent the magnitude is computed and used instead.
    pub fn format_verilog(&self) -> String {
        let width = if self.has_explicit_width {
            self.width
        } else {
            minimum_width(&self.magnitude)
        };
        let (prefix, digits) = self.base_digits();
        format!("{width}'{prefix}{digits}")
    }

    /// Verilog long form, zero-padded so the digit string spans exactly
    /// `self.width` bits (e.g. `8'b00001010`, `32'h0000dead`).
    pub fn format_verilog_proper_width(&self) -> String {
        let masked = mask_to_width(&self.magnitude, self.width);
        let (prefix, digits) = digits_for_base(self.base, &masked);
        let padded = pad_digits(self.base, &digits, self.width);
        format!("{}'{prefix}{padded}", self.width.max(1))
    }

    /// C form: `0b1010`, `0xdead`, `0755`, `1234`.
    pub fn format_c(&self) -> String {
        let masked = mask_to_width(&self.magnitude, self.width);
        match self.base {
            Base::Binary => format!("0b{}", masked.to_str_radix(2)),
            Base::Octal => format!("0{}", masked.to_str_radix(8)),
            Base::Hexadecimal => format!("0x{}", masked.to_str_radix(16)),
            Base::Decimal | Base::Unknown => masked.to_str_radix(10),
        }
    }

    fn base_digits(&self) -> (char, String) {
        let masked = if self.has_explicit_width {
            mask_to_width(&self.magnitude, self.width)
        } else {
            self.magnitude.clone()
        };
        digits_for_base(self.base, &masked)
    }
}

fn digits_for_base(base: Base, value: &BigUint) -> (char, String) {
    match base {
        Base::Binary => ('b', value.to_str_radix(2)),
        Base::Octal => ('o', value.to_str_radix(8)),
        Base::Decimal | Base::Unknown => ('d', value.to_str_radix(10)),
        Base::Hexadecimal => ('h', value.to_str_radix(16)),
    }
}

fn pad_digits(base: Base, digits: &str, width: usize) -> String {
    let needed = match base {
        Base::Binary => width,
        Base::Octal => (width + 2) / 3,
        Base::Hexadecimal => (width + 3) / 4,
        Base::Decimal | Base::Unknown => return digits.to_string(),
    }
    .max(1);
    if digits.len() >= needed {
        digits.to_string()
    } else {
        format!("{}{}", "0".repeat(needed - digits.len()), digits)
    }
}

fn mask_to_width(value: &BigUint, width: usize) -> BigUint {
    if width == 0 {
        return value.clone();
    }
    let modulus = BigUint::from(1u8) << width;
    value % modulus
}

fn minimum_width(value: &BigUint) -> usize {
    if value.is_zero() {
        1
    } else {
        value.bits() as usize
    }
}

fn parse_bit_range(input: &str) -> Option<NumberLiteral> {
    let inner = input.strip_prefix('[')?.strip_suffix(']')?;
    let (hi, lo) = inner.split_once(':')?;
    let hi: i64 = hi.trim().parse().ok()?;
    let lo: i64 = lo.trim().parse().ok()?;
    let width = (hi - lo).unsigned_abs() as usize + 1;
    Some(NumberLiteral {
        base: Base::Decimal,
        magnitude: BigUint::zero(),
        width,
        has_explicit_width: true,
        error_detected: false,
    })
}

fn parse_verilog_form(input: &str) -> Option<NumberLiteral> {
    let tick = input.find('\'')?;
    let (width_part, rest) = input.split_at(tick);
    let rest = &rest[1..];
    let mut chars = rest.chars();
    let base_char = chars.next()?.to_ascii_lowercase();
    let base = match base_char {
        'b' => Base::Binary,
        'o' => Base::Octal,
        'd' => Base::Decimal,
        'h' => Base::Hexadecimal,
        _ => return None,
    };
    let digits = chars.as_str();
    if digits.is_empty() {
        return None;
    }

    let has_explicit_width = !width_part.trim().is_empty();
    let width: usize = if has_explicit_width {
        width_part.trim().parse().ok()?
    } else {
        0
    };

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let radix = radix_of(base);
    let magnitude = BigUint::parse_bytes(cleaned.as_bytes(), radix)?;

    let inferred_width = if width == 0 {
        minimum_width(&magnitude)
    } else {
        width
    };
    let error_detected = has_explicit_width && magnitude.bits() as usize > width.max(1);

    Some(NumberLiteral {
        base,
        magnitude,
        width: inferred_width,
        has_explicit_width,
        error_detected,
    })
}

fn parse_c_form(input: &str) -> Option<NumberLiteral> {
    let lower = input.to_ascii_lowercase();
    let (base, radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (Base::Hexadecimal, 16, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (Base::Binary, 2, rest.to_string())
    } else if lower.len() > 1 && lower.starts_with('0') {
        (Base::Octal, 8, lower[1..].to_string())
    } else {
        (Base::Decimal, 10, lower.clone())
    };

    if digits.is_empty() {
        if lower == "0" {
            return Some(NumberLiteral {
                base: Base::Decimal,
                magnitude: BigUint::zero(),
                width: 1,
                has_explicit_width: false,
                error_detected: false,
            });
        }
        return None;
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = BigUint::parse_bytes(cleaned.as_bytes(), radix)?;
    let width = minimum_width(&magnitude);

    Some(NumberLiteral {
        base,
        magnitude,
        width,
        has_explicit_width: false,
        error_detected: false,
    })
}

fn radix_of(base: Base) -> u32 {
    match base {
        Base::Binary => 2,
        Base::Octal => 8,
        Base::Decimal | Base::Unknown => 10,
        Base::Hexadecimal => 16,
    }
}
