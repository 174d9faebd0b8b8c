//! VIB (Value Information Block) resolution: the VIF byte and its VIFE
//! chain.

use super::vif_tables::{self, VifDescriptor};
use crate::constants;
use crate::error::ProtocolError;

/// The resolved outcome of a VIB: unit, quantity label, the multiplicative
/// transform to apply to the raw decoded number, and any combinable
/// modifiers attached by trailing VIFEs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVib {
    /// Unit text (e.g. `"Wh"`), empty for non-unit VIFs (plain-text,
    /// manufacturer-specific).
    pub unit: String,
    /// Human-readable quantity name.
    pub quantity: String,
    /// Scale applied to the raw decoded number (spec §4.4.3
    /// `value_transform`).
    pub factor: f64,
    /// Descriptions of any combinable VIFE modifiers in encounter order.
    pub modifiers: Vec<&'static str>,
    /// True when the primary VIF was the plain-text marker (0x7C): the
    /// payload carries an inline ASCII unit string instead of a table unit.
    pub plaintext: bool,
    /// Number of VIF/VIFE bytes consumed, for the spec §8 byte-accounting
    /// invariant.
    pub bytes_consumed: usize,
}

/// Parses the VIF byte and its VIFE chain from the front of `input` (spec
/// §4.4.2 "Lookup procedure for VIF").
pub fn parse_vib(input: &[u8]) -> Result<(ResolvedVib, usize), ProtocolError> {
    let first = *input.first().ok_or(ProtocolError::PayloadTruncated)?;
    let code = first & constants::MBUS_VIF_MASK_CODE;
    let mut extended = first & constants::MBUS_VIF_EXTENSION_BIT != 0;
    let mut consumed = 1;

    let mut unit = String::new();
    let mut quantity = String::new();
    let mut factor = 1.0;
    let mut plaintext = false;

    match vif_tables::lookup_primary(code).ok_or(ProtocolError::UnknownVif { code, path: "primary" })? {
        VifDescriptor::Unit { unit: u, quantity: q, factor: f } => {
            unit = u.to_string();
            quantity = q.to_string();
            factor = f;
        }
        VifDescriptor::PlainText => {
            plaintext = true;
        }
        VifDescriptor::ManufacturerSpecific => {
            quantity = "Manufacturer-specific".to_string();
        }
        VifDescriptor::Modifier { description } => {
            quantity = description.to_string();
        }
        VifDescriptor::FirstExtension | VifDescriptor::SecondExtension => {
            let table = if code == constants::MBUS_VIF_FIRST_EXTENSION {
                "first extension"
            } else {
                "second extension"
            };
            let sub = *input.get(consumed).ok_or(ProtocolError::PayloadTruncated)?;
            let sub_code = sub & constants::MBUS_VIF_MASK_CODE;
            extended = sub & constants::MBUS_VIF_EXTENSION_BIT != 0;
            consumed += 1;

            let descriptor = if code == constants::MBUS_VIF_FIRST_EXTENSION {
                vif_tables::lookup_first_extension(sub_code)
            } else {
                vif_tables::lookup_second_extension(sub_code)
            }
            .ok_or(ProtocolError::UnknownVif { code: sub_code, path: table })?;

            match descriptor {
                VifDescriptor::Unit { unit: u, quantity: q, factor: f } => {
                    unit = u.to_string();
                    quantity = q.to_string();
                    factor = f;
                }
                VifDescriptor::Modifier { description } => {
                    quantity = description.to_string();
                }
                _ => {
                    quantity = "Extension".to_string();
                }
            }
        }
    }

    let mut modifiers = Vec::new();
    let mut chain_len = 0usize;
    while extended {
        if chain_len >= constants::MBUS_VIFE_CHAIN_MAX {
            return Err(ProtocolError::VifeChainTooLong);
        }
        let byte = *input.get(consumed).ok_or(ProtocolError::PayloadTruncated)?;
        let vife_code = byte & constants::MBUS_VIF_MASK_CODE;
        extended = byte & constants::MBUS_VIF_EXTENSION_BIT != 0;
        consumed += 1;
        chain_len += 1;

        match vif_tables::lookup_combinable(vife_code) {
            Some(VifDescriptor::Modifier { description }) => modifiers.push(description),
            Some(_) | None => {
                return Err(ProtocolError::UnknownVif {
                    code: vife_code,
                    path: "orthogonal",
                })
            }
        }
    }

    Ok((
        ResolvedVib {
            unit,
            quantity,
            factor,
            modifiers,
            plaintext,
            bytes_consumed: consumed,
        },
        consumed,
    ))
}
