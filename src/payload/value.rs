//! Typed value decoding: signed/unsigned integers, BCD,
//! float32, and the CP16/CP32/CP48 date/time encodings, plus the LVAR
//! variable-length selector (EN 13757-3 Table 5).

use crate::error::ProtocolError;

/// A decoded field value (spec §3 "Decoded record").
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// A signed or unsigned integer, already sign-extended to `i64`.
    Integer(i64),
    /// IEEE-754 float32, widened to `f64`.
    Float(f64),
    /// A calendar date (no time component): CP16.
    Date {
        /// 1..31.
        day: u8,
        /// 1..12.
        month: u8,
        /// Four-digit year.
        year: u16,
    },
    /// A date and time without seconds: CP32.
    DateTime {
        /// 1..31.
        day: u8,
        /// 1..12.
        month: u8,
        /// Four-digit year.
        year: u16,
        /// 0..23.
        hour: u8,
        /// 0..59.
        minute: u8,
        /// Invalid-value / daylight-saving-time flags carried by CP32.
        valid: bool,
        /// Daylight saving time in effect.
        summer_time: bool,
    },
    /// A date and time including seconds: CP48.
    DateTimeWithSeconds {
        /// 1..31.
        day: u8,
        /// 1..12.
        month: u8,
        /// Four-digit year.
        year: u16,
        /// 0..23.
        hour: u8,
        /// 0..59.
        minute: u8,
        /// 0..59.
        second: u8,
    },
    /// A time of day without a date component: CP24.
    Time {
        /// 0..23.
        hour: u8,
        /// 0..59.
        minute: u8,
        /// 0..59.
        second: u8,
    },
    /// Raw ASCII text (LVAR text fields, plain-text VIF units).
    Text(String),
    /// Raw bytes when no further interpretation applies.
    Bytes(Vec<u8>),
}

/// Decodes a little-endian two's-complement signed integer of 1, 2, 3, 4,
/// 6, or 8 bytes, sign-extended to `i64`.
pub fn decode_signed_int(bytes: &[u8]) -> i64 {
    let width = bytes.len();
    if width == 0 {
        return 0;
    }
    let mut value: i64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        value |= (b as i64) << (8 * i);
    }
    let sign_bit = 1i64 << (width * 8 - 1);
    if value & sign_bit != 0 {
        value -= 1i64 << (width * 8);
    }
    value
}

/// Decodes IEEE-754 float32, little-endian.
pub fn decode_float32(bytes: &[u8; 4]) -> f32 {
    f32::from_le_bytes(*bytes)
}

/// Decodes binary-coded decimal of `bytes.len() * 2` digits, little-endian
/// byte order (least-significant digit pair first). The high nibble of the
/// most-significant byte is `0xF` for a negative value per Annex B; any
/// other non-decimal nibble is a protocol error.
pub fn decode_bcd(bytes: &[u8]) -> Result<i64, ProtocolError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    let mut value: i64 = 0;
    let mut multiplier: i64 = 1;
    let last = bytes.len() - 1;
    let mut negative = false;

    for (i, &byte) in bytes.iter().enumerate() {
        let low = byte & 0x0F;
        let mut high = (byte >> 4) & 0x0F;

        if i == last && high == 0xF {
            negative = true;
            high = 0;
        }

        if low > 9 || high > 9 {
            return Err(ProtocolError::InvalidBcd);
        }

        value += low as i64 * multiplier;
        multiplier *= 10;
        value += high as i64 * multiplier;
        multiplier *= 10;
    }

    Ok(if negative { -value } else { value })
}

fn century_from_two_digit_year(yy: u8) -> u16 {
    2000 + yy as u16
}

/// Decodes a CP16 date: 2 bytes.
pub fn decode_date_cp16(bytes: &[u8; 2]) -> Result<DecodedValue, ProtocolError> {
    let day = bytes[0] & 0x1F;
    let month = bytes[1] & 0x0F;
    let year_low = (bytes[0] & 0xE0) >> 5;
    let year_high = (bytes[1] & 0xF0) >> 1;
    let year = century_from_two_digit_year(year_low | year_high);

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(ProtocolError::InvalidDateTime);
    }
    Ok(DecodedValue::Date { day, month, year })
}

/// Decodes a CP32 date-time: 4 bytes.
pub fn decode_datetime_cp32(bytes: &[u8; 4]) -> Result<DecodedValue, ProtocolError> {
    let minute = bytes[0] & 0x3F;
    let valid = bytes[0] & 0x80 == 0;
    let hour = bytes[1] & 0x1F;
    let summer_time = bytes[1] & 0x80 != 0;
    let day = bytes[2] & 0x1F;
    let month = bytes[3] & 0x0F;
    let year_low = (bytes[2] & 0xE0) >> 5;
    let year_high = (bytes[3] & 0xF0) >> 1;
    let year = century_from_two_digit_year(year_low | year_high);

    if minute > 59 || hour > 23 || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(ProtocolError::InvalidDateTime);
    }
    Ok(DecodedValue::DateTime {
        day,
        month,
        year,
        hour,
        minute,
        valid,
        summer_time,
    })
}

/// Decodes a CP48 date-time-with-seconds: 6 bytes.
pub fn decode_datetime_cp48(bytes: &[u8; 6]) -> Result<DecodedValue, ProtocolError> {
    let second = bytes[0] & 0x3F;
    let minute = bytes[1] & 0x3F;
    let hour = bytes[2] & 0x1F;
    let day = bytes[3] & 0x1F;
    let month = bytes[4] & 0x0F;
    let year_low = (bytes[3] & 0xE0) >> 5;
    let year_high = (bytes[4] & 0xF0) >> 1;
    let year = century_from_two_digit_year(year_low | year_high);

    if second > 59 || minute > 59 || hour > 23 || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(ProtocolError::InvalidDateTime);
    }
    Ok(DecodedValue::DateTimeWithSeconds {
        day,
        month,
        year,
        hour,
        minute,
        second,
    })
}

/// Decodes a CP24 time-of-day: 3 bytes.
pub fn decode_time_cp24(bytes: &[u8; 3]) -> Result<DecodedValue, ProtocolError> {
    let second = bytes[0] & 0x3F;
    let minute = bytes[1] & 0x3F;
    let hour = bytes[2] & 0x1F;
    if second > 59 || minute > 59 || hour > 23 {
        return Err(ProtocolError::InvalidDateTime);
    }
    Ok(DecodedValue::Time { hour, minute, second })
}

/// The LVAR selector byte's interpretation (EN 13757-3 Table 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LvarKind {
    /// ASCII text of the given length.
    AsciiText(usize),
    /// Positive BCD of the given digit count.
    PositiveBcd(usize),
    /// Negative BCD of the given digit count.
    NegativeBcd(usize),
    /// Binary number of the given byte count.
    Binary(usize),
}

/// Interprets an LVAR selector byte per EN 13757-3 Table 5.
pub fn lvar_kind(selector: u8) -> Result<LvarKind, ProtocolError> {
    match selector {
        0x00..=0xBF => Ok(LvarKind::AsciiText(selector as usize)),
        0xC0..=0xCF => Ok(LvarKind::PositiveBcd(2 * (selector - 0xC0) as usize)),
        0xD0..=0xDF => Ok(LvarKind::NegativeBcd(2 * (selector - 0xD0) as usize)),
        0xE0..=0xEF => Ok(LvarKind::Binary((selector - 0xE0) as usize)),
        _ => Err(ProtocolError::PayloadTruncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_signed_int32_little_endian() {
        // spec §8 Scenario B: `D2 04 00 00` -> 1234.
        assert_eq!(decode_signed_int(&[0xD2, 0x04, 0x00, 0x00]), 1234);
    }

    #[test]
    fn decodes_signed_int24_little_endian() {
        // spec §8 Scenario F: `E8 03 00` -> 1000.
        assert_eq!(decode_signed_int(&[0xE8, 0x03, 0x00]), 1000);
    }

    #[test]
    fn decodes_negative_signed_int() {
        assert_eq!(decode_signed_int(&[0xFF, 0xFF]), -1);
        assert_eq!(decode_signed_int(&[0x00, 0x80]), -32768);
    }

    #[test]
    fn decode_signed_int_empty_slice_is_zero() {
        // Reachable via a zero-length LVAR `Binary` selector (0xE0); must
        // not underflow computing the sign bit.
        assert_eq!(decode_signed_int(&[]), 0);
    }

    #[test]
    fn decodes_bcd_positive_and_negative() {
        assert_eq!(decode_bcd(&[0x34, 0x12]).unwrap(), 1234);
        assert_eq!(decode_bcd(&[0x34, 0xF2]).unwrap(), -234);
    }

    #[test]
    fn decode_bcd_empty_slice_is_zero() {
        // Reachable via a zero-length LVAR `PositiveBcd`/`NegativeBcd`
        // selector (0xC0/0xD0); must not underflow `bytes.len() - 1`.
        assert_eq!(decode_bcd(&[]).unwrap(), 0);
    }

    #[test]
    fn rejects_invalid_bcd_nibble() {
        assert_eq!(decode_bcd(&[0xAB]), Err(ProtocolError::InvalidBcd));
    }

    #[test]
    fn decodes_cp32_datetime() {
        // minute=30, hour=14, day=15, month=6, year 2024 (yy=24).
        let bytes = [0x1E, 0x0E, (24 & 0x07) << 5 | 15, ((24 >> 3) & 0x0F) << 4 | 6];
        let value = decode_datetime_cp32(&bytes).unwrap();
        assert_eq!(
            value,
            DecodedValue::DateTime {
                day: 15,
                month: 6,
                year: 2024,
                hour: 14,
                minute: 30,
                valid: true,
                summer_time: false,
            }
        );
    }

    #[test]
    fn rejects_out_of_range_datetime() {
        let bytes = [0x3D, 0x00, 0x00, 0x00]; // minute=61
        assert_eq!(decode_datetime_cp32(&bytes), Err(ProtocolError::InvalidDateTime));
    }

    #[test]
    fn lvar_table5_ranges() {
        assert_eq!(lvar_kind(0x00).unwrap(), LvarKind::AsciiText(0));
        assert_eq!(lvar_kind(0xBF).unwrap(), LvarKind::AsciiText(0xBF));
        assert_eq!(lvar_kind(0xC2).unwrap(), LvarKind::PositiveBcd(4));
        assert_eq!(lvar_kind(0xD1).unwrap(), LvarKind::NegativeBcd(2));
        assert_eq!(lvar_kind(0xE3).unwrap(), LvarKind::Binary(3));
        assert!(lvar_kind(0xFB).is_err());
    }
}
