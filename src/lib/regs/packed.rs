//! Quantities sharing a single register.

use std::fmt::Display;

/// Low byte of register 0x0103: bit 7 sign, bits 0-6 magnitude in °C.
pub fn battery_temperature(word: u16) -> i16 {
    sign_magnitude((word & 0x00FF) as u8)
}

/// High byte of register 0x0103: bit 15 sign, bits 8-14 magnitude in °C.
pub fn controller_temperature(word: u16) -> i16 {
    sign_magnitude((word >> 8) as u8)
}

// A set sign bit over a zero magnitude is plain zero.
fn sign_magnitude(byte: u8) -> i16 {
    let magnitude = i16::from(byte & 0x7F);
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

pub fn version(words: [u16; 2]) -> String {
    format!(
        "V{}.{}.{}",
        words[0] & 0xFF,
        words[1] >> 8,
        words[1] & 0xFF
    )
}

pub fn serial_date_code(words: [u16; 2]) -> String {
    format!(
        "#{} date code {}-{}",
        words[1],
        words[1] >> 8,
        words[1] & 0xFF
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingState {
    Deactivated,
    Activated,
    Mppt,
    Equalizing,
    Boost,
    Floating,
    CurrentLimiting,
    Unknown(u8),
}

impl From<u16> for ChargingState {
    fn from(word: u16) -> Self {
        match (word & 0x00FF) as u8 {
            0 => ChargingState::Deactivated,
            1 => ChargingState::Activated,
            2 => ChargingState::Mppt,
            3 => ChargingState::Equalizing,
            4 => ChargingState::Boost,
            5 => ChargingState::Floating,
            6 => ChargingState::CurrentLimiting,
            other => ChargingState::Unknown(other),
        }
    }
}

impl Display for ChargingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargingState::Deactivated => "deactivated".fmt(f),
            ChargingState::Activated => "activated".fmt(f),
            ChargingState::Mppt => "mppt".fmt(f),
            ChargingState::Equalizing => "equalizing".fmt(f),
            ChargingState::Boost => "boost".fmt(f),
            ChargingState::Floating => "floating".fmt(f),
            ChargingState::CurrentLimiting => "current limiting".fmt(f),
            ChargingState::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}
