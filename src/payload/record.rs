//! Data-record assembly: combines a DIB, a VIB,
//! and a typed value into one [`Record`].

use super::dib::{self, DataField, DifOutcome, Function};
use super::value::{self, DecodedValue, LvarKind};
use super::vif;
use crate::error::ProtocolError;

/// One data record: the header fields plus its decoded value (spec §3
/// "Decoded record").
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Instantaneous/maximum/minimum/error.
    pub function: Function,
    /// Accumulated storage number.
    pub storage_number: u32,
    /// Accumulated tariff.
    pub tariff: u32,
    /// Accumulated subunit.
    pub subunit: u32,
    /// Unit text resolved from the VIB.
    pub unit: String,
    /// Human-readable quantity name resolved from the VIB.
    pub quantity: String,
    /// Combinable-VIFE modifier descriptions, in encounter order.
    pub modifiers: Vec<&'static str>,
    /// The decoded, scaled value.
    pub value: DecodedValue,
    /// The unscaled bytes this record's value was decoded from.
    pub raw_bytes: Vec<u8>,
}

/// What parsing one DIB/VIB/value unit at the front of a byte slice
/// produced, plus how many bytes it consumed.
pub enum RecordOutcome {
    /// A normal record.
    Record(Record),
    /// `0x0F`: remainder of the payload is manufacturer-specific.
    ManufacturerSpecific,
    /// `0x1F`: sets `more_records_follow`, produces no record.
    MoreRecordsFollow,
    /// `0x2F`: idle filler, produces no record.
    IdleFiller,
}

fn apply_int_transform(raw: i64, factor: f64) -> DecodedValue {
    if factor == 1.0 {
        DecodedValue::Integer(raw)
    } else {
        DecodedValue::Float(raw as f64 * factor)
    }
}

/// Parses one DIB+VIB+value unit from the front of `input`. Returns the
/// outcome and the number of bytes consumed (spec §8 invariant 5: bytes
/// consumed equals `(1 + dife_count) + (1 + vife_count) + data_length`).
pub fn parse_record(input: &[u8]) -> Result<(RecordOutcome, usize), ProtocolError> {
    let (dif_outcome, dif_len) = dib::parse_dib(input)?;

    let info = match dif_outcome {
        DifOutcome::ManufacturerSpecific => return Ok((RecordOutcome::ManufacturerSpecific, dif_len)),
        DifOutcome::MoreRecordsFollow => return Ok((RecordOutcome::MoreRecordsFollow, dif_len)),
        DifOutcome::IdleFiller => return Ok((RecordOutcome::IdleFiller, dif_len)),
        DifOutcome::Record(info) => info,
    };

    let rest = &input[dif_len..];

    if info.data_field == DataField::SelectionForReadout || info.data_field == DataField::None {
        // No VIB for a data-less record (spec §3: special-function DIBs
        // carry no VIB; a "no data"/"selection" DIF is data-less the same
        // way).
        return Ok((
            RecordOutcome::Record(Record {
                function: info.function,
                storage_number: info.storage_number,
                tariff: info.tariff,
                subunit: info.subunit,
                unit: String::new(),
                quantity: String::new(),
                modifiers: Vec::new(),
                value: DecodedValue::Bytes(Vec::new()),
                raw_bytes: Vec::new(),
            }),
            dif_len,
        ));
    }

    let (resolved_vib, vib_len) = vif::parse_vib(rest)?;
    let value_start = &rest[vib_len..];

    let (value, raw_bytes, value_len) = if resolved_vib.plaintext {
        let len = *value_start.first().ok_or(ProtocolError::PayloadTruncated)? as usize;
        let text_bytes = value_start
            .get(1..1 + len)
            .ok_or(ProtocolError::PayloadTruncated)?;
        let text: String = text_bytes.iter().rev().map(|&b| b as char).collect();
        (DecodedValue::Text(text), text_bytes.to_vec(), 1 + len)
    } else {
        match info.data_field {
            DataField::Lvar => {
                let selector = *value_start.first().ok_or(ProtocolError::PayloadTruncated)?;
                let kind = value::lvar_kind(selector)?;
                match kind {
                    LvarKind::AsciiText(n) => {
                        let bytes = value_start.get(1..1 + n).ok_or(ProtocolError::PayloadTruncated)?;
                        let text: String = bytes.iter().rev().map(|&b| b as char).collect();
                        (DecodedValue::Text(text), bytes.to_vec(), 1 + n)
                    }
                    LvarKind::PositiveBcd(digits) => {
                        let n = digits / 2;
                        let bytes = value_start.get(1..1 + n).ok_or(ProtocolError::PayloadTruncated)?;
                        let raw = value::decode_bcd(bytes)?;
                        (apply_int_transform(raw, resolved_vib.factor), bytes.to_vec(), 1 + n)
                    }
                    LvarKind::NegativeBcd(digits) => {
                        let n = digits / 2;
                        let bytes = value_start.get(1..1 + n).ok_or(ProtocolError::PayloadTruncated)?;
                        let raw = -value::decode_bcd(bytes)?.abs();
                        (apply_int_transform(raw, resolved_vib.factor), bytes.to_vec(), 1 + n)
                    }
                    LvarKind::Binary(n) => {
                        let bytes = value_start.get(1..1 + n).ok_or(ProtocolError::PayloadTruncated)?;
                        let raw = value::decode_signed_int(bytes);
                        (apply_int_transform(raw, resolved_vib.factor), bytes.to_vec(), 1 + n)
                    }
                }
            }
            DataField::Float32 => {
                let bytes = value_start.get(0..4).ok_or(ProtocolError::PayloadTruncated)?;
                let arr: [u8; 4] = bytes.try_into().unwrap();
                let raw = value::decode_float32(&arr) as f64;
                (DecodedValue::Float(raw * resolved_vib.factor), bytes.to_vec(), 4)
            }
            DataField::Bcd(digits) => {
                let n = digits as usize / 2;
                let bytes = value_start.get(0..n).ok_or(ProtocolError::PayloadTruncated)?;
                let raw = value::decode_bcd(bytes)?;
                (apply_int_transform(raw, resolved_vib.factor), bytes.to_vec(), n)
            }
            DataField::SignedInt(width) => {
                let n = width as usize;
                let bytes = value_start.get(0..n).ok_or(ProtocolError::PayloadTruncated)?;
                let raw = value::decode_signed_int(bytes);
                (apply_int_transform(raw, resolved_vib.factor), bytes.to_vec(), n)
            }
            DataField::None | DataField::SelectionForReadout => unreachable!("handled above"),
        }
    };

    Ok((
        RecordOutcome::Record(Record {
            function: info.function,
            storage_number: info.storage_number,
            tariff: info.tariff,
            subunit: info.subunit,
            unit: resolved_vib.unit,
            quantity: resolved_vib.quantity,
            modifiers: resolved_vib.modifiers,
            value,
            raw_bytes,
        }),
        dif_len + vib_len + value_len,
    ))
}
