//! M-Bus Protocol Constants
//!
//! This module defines constants used in the M-Bus protocol implementation,
//! based on the EN 13757-2/-3 standard.

// ----------------------------------------------------------------------------
// Wire-level framing bytes
// ----------------------------------------------------------------------------

/// Start byte shared by short and control/long frames' first `0x68`.
pub const MBUS_FRAME_START_LONG: u8 = 0x68;
/// Start byte of a short frame.
pub const MBUS_FRAME_START_SHORT: u8 = 0x10;
/// Single-byte acknowledgement frame.
pub const MBUS_FRAME_ACK: u8 = 0xE5;
/// Stop byte terminating short and long frames.
pub const MBUS_FRAME_STOP: u8 = 0x16;

// ----------------------------------------------------------------------------
// Address space
// ----------------------------------------------------------------------------

/// Lowest valid normal primary address.
pub const MBUS_ADDRESS_PRIMARY_MIN: u8 = 1;
/// Highest valid normal primary address.
pub const MBUS_ADDRESS_PRIMARY_MAX: u8 = 250;
/// Selected-secondary pseudo-address.
pub const MBUS_ADDRESS_SELECTED_SECONDARY: u8 = 253;
/// No-station placeholder address.
pub const MBUS_ADDRESS_NO_STATION: u8 = 254;
/// Broadcast address; no reply is expected.
pub const MBUS_ADDRESS_BROADCAST: u8 = 255;

// ----------------------------------------------------------------------------
// C-field (control) encodings, master-to-slave direction
// ----------------------------------------------------------------------------

/// SND_NKE (link reset / application reset request).
pub const MBUS_CONTROL_MASK_SND_NKE: u8 = 0x40;
/// SND_UD (send user data), no FCV.
pub const MBUS_CONTROL_MASK_SND_UD: u8 = 0x53;
/// REQ_UD1 (class-1 data request), no FCV.
pub const MBUS_CONTROL_MASK_REQ_UD1: u8 = 0x5A;
/// REQ_UD2 (class-2 data request), no FCV.
pub const MBUS_CONTROL_MASK_REQ_UD2: u8 = 0x5B;

/// FCV (Frame Count Valid) bit.
pub const MBUS_CONTROL_MASK_FCV: u8 = 0x10;
/// FCB (Frame Count Bit) toggle bit.
pub const MBUS_CONTROL_MASK_FCB: u8 = 0x20;

// ----------------------------------------------------------------------------
// CI-field (control information) codes recognised by the core
// ----------------------------------------------------------------------------

/// Variable data response from slave, long transport-layer header
/// (includes a 12-byte manufacturer/serial/version/medium identification).
pub const MBUS_CI_RESP_VARIABLE_LONG: u8 = 0x72;
/// Variable data response from slave, short header (no identification).
pub const MBUS_CI_RESP_VARIABLE_SHORT: u8 = 0x7A;

// ----------------------------------------------------------------------------
// DIF (Data Information Field) masks and special values
// ----------------------------------------------------------------------------

/// Mask selecting the data-field code (bits 0..3).
pub const MBUS_DIF_MASK_DATA: u8 = 0x0F;
/// Mask selecting the function code (bits 4..5).
pub const MBUS_DIF_MASK_FUNCTION: u8 = 0x30;
/// Mask selecting the low bit of the storage number (bit 6).
pub const MBUS_DIF_MASK_STORAGE_LSB: u8 = 0x40;
/// Extension bit (bit 7): when set, another DIFE/VIFE follows.
pub const MBUS_DIF_EXTENSION_BIT: u8 = 0x80;

/// Manufacturer-specific data: remainder of payload is opaque.
pub const MBUS_DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;
/// More-records-follow marker.
pub const MBUS_DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;
/// Idle filler byte; skip and continue.
pub const MBUS_DIF_IDLE_FILLER: u8 = 0x2F;
/// Global-readout request marker; an error if seen in a response.
pub const MBUS_DIF_GLOBAL_READOUT: u8 = 0x7F;

/// Mask selecting the storage-number bits of a DIFE (bits 0..3).
pub const MBUS_DIFE_MASK_STORAGE: u8 = 0x0F;
/// Mask selecting the tariff bits of a DIFE (bits 4..5).
pub const MBUS_DIFE_MASK_TARIFF: u8 = 0x30;
/// Mask selecting the subunit (device) bit of a DIFE (bit 6).
pub const MBUS_DIFE_MASK_SUBUNIT: u8 = 0x40;

/// Maximum number of DIFE bytes in a single DIB chain.
pub const MBUS_DIFE_CHAIN_MAX: usize = 10;
/// Maximum number of VIFE bytes in a single VIB chain.
pub const MBUS_VIFE_CHAIN_MAX: usize = 10;

// ----------------------------------------------------------------------------
// VIF (Value Information Field) masks and extension pointers
// ----------------------------------------------------------------------------

/// Mask selecting the 7 code bits of a VIF/VIFE (all but the extension bit).
pub const MBUS_VIF_MASK_CODE: u8 = 0x7F;
/// Extension bit of a VIF/VIFE (bit 7): when set, another VIFE follows.
pub const MBUS_VIF_EXTENSION_BIT: u8 = 0x80;

/// Primary VIF value that redirects into the first extension table
/// (EN 13757-3 Table 14).
pub const MBUS_VIF_FIRST_EXTENSION: u8 = 0x7B;
/// Primary VIF value that redirects into the second extension table
/// (EN 13757-3 Table 12).
pub const MBUS_VIF_SECOND_EXTENSION: u8 = 0x7D;
/// Primary VIF value introducing plain-text unit encoding: the next byte
/// is an ASCII-string length, followed by the unit text itself.
pub const MBUS_VIF_PLAINTEXT: u8 = 0x7C;
/// Manufacturer-specific VIF; unit/scale not resolved by this core.
pub const MBUS_VIF_MANUFACTURER_SPECIFIC: u8 = 0x7F;
