//! DIB (Data Information Block) parsing: the DIF byte and its DIFE chain
//!.

use crate::constants;
use crate::error::ProtocolError;

/// What a DIF byte (before any DIFE chain) signals about the record that
/// follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DifOutcome {
    /// A normal record: parsing should continue into the VIB.
    Record(DataInfo),
    /// `0x0F`: the remainder of the payload is manufacturer-specific and
    /// opaque; record parsing stops here.
    ManufacturerSpecific,
    /// `0x1F`: more-records-follow marker; produces no record of its own.
    MoreRecordsFollow,
    /// `0x2F`: idle filler; skip and continue.
    IdleFiller,
}

/// The data-field code from DIF bits 0..3 (EN 13757-3 Table 4), naming how
/// many bytes (or what variable-length scheme) the value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    /// No data accompanies this record.
    None,
    /// A little-endian two's-complement signed integer of the given width.
    SignedInt(u8),
    /// IEEE-754 float32.
    Float32,
    /// A selection-for-readout marker; carries no data.
    SelectionForReadout,
    /// Binary-coded decimal with the given digit count.
    Bcd(u8),
    /// Variable-length (LVAR): length and interpretation are carried by the
    /// first payload byte (EN 13757-3 Table 5).
    Lvar,
}

impl DataField {
    fn from_code(code: u8) -> Self {
        match code {
            0x00 => DataField::None,
            0x01 => DataField::SignedInt(1),
            0x02 => DataField::SignedInt(2),
            0x03 => DataField::SignedInt(3),
            0x04 => DataField::SignedInt(4),
            0x05 => DataField::Float32,
            0x06 => DataField::SignedInt(6),
            0x07 => DataField::SignedInt(8),
            0x08 => DataField::SelectionForReadout,
            0x09 => DataField::Bcd(2),
            0x0A => DataField::Bcd(4),
            0x0B => DataField::Bcd(6),
            0x0C => DataField::Bcd(8),
            0x0D => DataField::Lvar,
            0x0E => DataField::Bcd(12),
            _ => unreachable!("0x0F is the special-function code, handled before this point"),
        }
    }

    /// Fixed byte length of the value, or `None` for `Lvar` whose length is
    /// only known after reading the LVAR selector byte.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            DataField::None | DataField::SelectionForReadout => Some(0),
            DataField::SignedInt(n) => Some(n as usize),
            DataField::Float32 => Some(4),
            DataField::Bcd(digits) => Some(digits as usize / 2),
            DataField::Lvar => None,
        }
    }
}

/// Function code from DIF bits 4..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Instantaneous value.
    Instantaneous,
    /// Maximum value.
    Maximum,
    /// Minimum value.
    Minimum,
    /// Value during an error state.
    Error,
}

impl Function {
    fn from_bits(dif: u8) -> Self {
        match (dif & constants::MBUS_DIF_MASK_FUNCTION) >> 4 {
            0b00 => Function::Instantaneous,
            0b01 => Function::Maximum,
            0b10 => Function::Minimum,
            _ => Function::Error,
        }
    }
}

/// Everything the DIB contributes to a record, before the VIB is consulted
/// (spec §3 "Fields extracted from a DRH").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInfo {
    /// The raw data-field code (DIF bits 0..3).
    pub data_field: DataField,
    /// Instantaneous/maximum/minimum/error.
    pub function: Function,
    /// Accumulated storage number: DIF bit 6 plus DIFE storage bits,
    /// `storage |= dife_storage_bits << (1 + 4*k)`.
    pub storage_number: u32,
    /// Accumulated tariff: DIFE tariff bits, `tariff |= dife_tariff << (2*k)`.
    pub tariff: u32,
    /// Accumulated subunit: DIFE subunit bit, `subunit |= dife_subunit << k`.
    pub subunit: u32,
    /// Number of DIFE bytes consumed (for the spec §8 byte-accounting
    /// invariant: bytes consumed == `(1 + dife_count) + ...`).
    pub dife_count: usize,
}

/// Parses a DIF byte and its DIFE chain from the front of `input`.
///
/// Returns the outcome and the number of bytes consumed (always at least 1).
pub fn parse_dib(input: &[u8]) -> Result<(DifOutcome, usize), ProtocolError> {
    let dif = *input.first().ok_or(ProtocolError::PayloadTruncated)?;

    match dif {
        constants::MBUS_DIF_MANUFACTURER_SPECIFIC => return Ok((DifOutcome::ManufacturerSpecific, 1)),
        constants::MBUS_DIF_MORE_RECORDS_FOLLOW => return Ok((DifOutcome::MoreRecordsFollow, 1)),
        constants::MBUS_DIF_IDLE_FILLER => return Ok((DifOutcome::IdleFiller, 1)),
        constants::MBUS_DIF_GLOBAL_READOUT => {
            return Err(ProtocolError::UnknownVif {
                code: constants::MBUS_DIF_GLOBAL_READOUT,
                path: "dif",
            })
        }
        _ => {}
    }

    let data_field = DataField::from_code(dif & constants::MBUS_DIF_MASK_DATA);
    let function = Function::from_bits(dif);
    let mut storage_number = ((dif & constants::MBUS_DIF_MASK_STORAGE_LSB) >> 6) as u32;
    let mut tariff: u32 = 0;
    let mut subunit: u32 = 0;

    let mut consumed = 1;
    let mut k: u32 = 0;
    let mut extended = dif & constants::MBUS_DIF_EXTENSION_BIT != 0;

    while extended {
        if k as usize >= constants::MBUS_DIFE_CHAIN_MAX {
            return Err(ProtocolError::DifeChainTooLong);
        }
        let dife = *input.get(consumed).ok_or(ProtocolError::PayloadTruncated)?;
        consumed += 1;

        let dife_storage = dife & constants::MBUS_DIFE_MASK_STORAGE;
        let dife_tariff = (dife & constants::MBUS_DIFE_MASK_TARIFF) >> 4;
        let dife_subunit = (dife & constants::MBUS_DIFE_MASK_SUBUNIT) >> 6;

        storage_number |= (dife_storage as u32) << (1 + 4 * k);
        tariff |= (dife_tariff as u32) << (2 * k);
        subunit |= (dife_subunit as u32) << k;

        extended = dife & constants::MBUS_DIF_EXTENSION_BIT != 0;
        k += 1;
    }

    Ok((
        DifOutcome::Record(DataInfo {
            data_field,
            function,
            storage_number,
            tariff,
            subunit,
            dife_count: (consumed - 1),
        }),
        consumed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_dif_with_no_extension() {
        let (outcome, consumed) = parse_dib(&[0x04]).unwrap();
        assert_eq!(consumed, 1);
        match outcome {
            DifOutcome::Record(info) => {
                assert_eq!(info.data_field, DataField::SignedInt(4));
                assert_eq!(info.function, Function::Instantaneous);
                assert_eq!(info.storage_number, 0);
                assert_eq!(info.dife_count, 0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn accumulates_storage_tariff_subunit_across_difes() {
        // DIF=0x84 (extension bit set, storage lsb=0, data=4), one DIFE=0x01 (storage bit 0 set).
        let (outcome, consumed) = parse_dib(&[0xC4, 0x01]).unwrap();
        assert_eq!(consumed, 2);
        match outcome {
            DifOutcome::Record(info) => {
                // storage lsb (bit6 of DIF=1, since 0xC4 = 1100_0100) | dife storage bits << 1
                assert_eq!(info.storage_number, 1 | (1 << 1));
                assert_eq!(info.dife_count, 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn rejects_dife_chain_over_cap() {
        let mut bytes = vec![0x84]; // extension bit set
        for _ in 0..10 {
            bytes.push(0x80); // extension bit set, no terminator
        }
        assert_eq!(parse_dib(&bytes), Err(ProtocolError::DifeChainTooLong));
    }

    #[test]
    fn manufacturer_specific_marker() {
        assert_eq!(parse_dib(&[0x0F]).unwrap(), (DifOutcome::ManufacturerSpecific, 1));
    }

    #[test]
    fn global_readout_is_an_error() {
        assert_eq!(
            parse_dib(&[0x7F]),
            Err(ProtocolError::UnknownVif {
                code: constants::MBUS_DIF_GLOBAL_READOUT,
                path: "dif"
            })
        );
    }
}
