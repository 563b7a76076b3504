pub mod db;
pub mod packed;

use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::protocol::FunctionCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    ChargeController,
    SmartBattery,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::ChargeController, DeviceKind::SmartBattery];

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::ChargeController => "charge_controller",
            DeviceKind::SmartBattery => "smart_battery",
        }
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Error, Debug)]
pub enum DeviceKindError {
    #[error("invalid device '{0}'")]
    BadDevice(String),
}

impl FromStr for DeviceKind {
    type Err = DeviceKindError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        DeviceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == input)
            .ok_or_else(|| DeviceKindError::BadDevice(input.to_string()))
    }
}

/// How the words of a register are turned into a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// One word, divided by `10^scale`.
    Scaled,
    /// Two words, high word first, divided by `10^scale`.
    Long,
    /// Packed ASCII, two characters per word.
    Text,
    /// `V{major}.{minor}.{patch}` packed into two words.
    Version,
    /// `#{serial} date code {year}-{month}` packed into the second word.
    SerialDateCode,
    /// Sign-magnitude low byte.
    BatteryTemperature,
    /// Sign-magnitude high byte.
    ControllerTemperature,
    /// Low byte enumerates the charging stage.
    ChargingState,
    /// Variable length list: the element count sits in `count_address`,
    /// the elements start at the register address. At most `max` elements.
    Series { count_address: u16, max: u16 },
    /// Two-word value at the register address as a percentage of the
    /// two-word value at `whole_address`.
    Percentage { whole_address: u16 },
}

/// One named quantity of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub device: DeviceKind,
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub address: u16,
    pub count: u16,
    pub scale: u8,
    pub function: FunctionCode,
    pub signed: bool,
    pub decode: Decode,
    /// Known doubt about the address this quantity is mapped to.
    pub caveat: Option<&'static str>,
}

impl Register {
    pub const fn new(
        device: DeviceKind,
        name: &'static str,
        label: &'static str,
        unit: &'static str,
        address: u16,
        scale: u8,
    ) -> Self {
        Register {
            device,
            name,
            label,
            unit,
            address,
            count: 1,
            scale,
            function: FunctionCode::ReadHoldingRegisters,
            signed: false,
            decode: Decode::Scaled,
            caveat: None,
        }
    }

    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub const fn decoded(mut self, decode: Decode, count: u16) -> Self {
        self.decode = decode;
        self.count = count;
        self
    }

    pub const fn caveat(mut self, caveat: &'static str) -> Self {
        self.caveat = Some(caveat);
        self
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#06x} {:3} {} {:<4} {}{}",
            self.address,
            self.count,
            self.function,
            self.unit,
            self.name,
            if self.caveat.is_some() { " (suspect)" } else { "" }
        )
    }
}

pub fn list_registers(device: DeviceKind) -> &'static [Register] {
    match device {
        DeviceKind::ChargeController => db::CHARGE_CONTROLLER,
        DeviceKind::SmartBattery => db::SMART_BATTERY,
    }
}

pub fn find_register(device: DeviceKind, name: &str) -> Option<&'static Register> {
    list_registers(device).iter().find(|reg| reg.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_READ_COUNT;
    use itertools::Itertools;

    #[test]
    fn parse_device_kind() {
        assert_eq!(
            "charge_controller".parse::<DeviceKind>().unwrap(),
            DeviceKind::ChargeController
        );
        assert_eq!(
            "smart_battery".parse::<DeviceKind>().unwrap(),
            DeviceKind::SmartBattery
        );
        assert!("inverter".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn names_are_unique_per_device() {
        for device in DeviceKind::ALL {
            let regs = list_registers(device);
            assert_eq!(regs.iter().map(|reg| reg.name).unique().count(), regs.len());
            assert!(regs.iter().all(|reg| reg.device == device));
        }
    }

    #[test]
    fn entries_fit_register_space() {
        for device in DeviceKind::ALL {
            for reg in list_registers(device) {
                assert!(reg.count >= 1 && reg.count <= MAX_READ_COUNT, "{}", reg);
                assert!(reg.address.checked_add(reg.count - 1).is_some(), "{}", reg);
                if let Decode::Series { max, .. } = reg.decode {
                    assert!(reg.address.checked_add(max).is_some(), "{}", reg);
                }
            }
        }
    }

    #[test]
    fn suspect_mappings_stay_flagged() {
        let min_solar = find_register(DeviceKind::ChargeController, "minimum_solar_power_today")
            .unwrap();
        assert_eq!(min_solar.address, 0x0110);
        assert!(min_solar.caveat.is_some());

        let serial = find_register(DeviceKind::ChargeController, "controller_serial").unwrap();
        let hardware = find_register(DeviceKind::ChargeController, "controller_hardware").unwrap();
        assert_eq!(serial.address, hardware.address);
        assert!(serial.caveat.is_some());
        assert!(hardware.caveat.is_none());
    }

    #[test]
    fn lookup() {
        let reg = find_register(DeviceKind::ChargeController, "solar_voltage").unwrap();
        assert_eq!((reg.address, reg.scale, reg.signed), (0x0107, 1, false));
        assert!(find_register(DeviceKind::SmartBattery, "solar_voltage").is_none());
    }

    #[test]
    fn display() {
        let reg = find_register(DeviceKind::ChargeController, "controller_model").unwrap();
        assert_eq!(reg.to_string(), "0x000c   8 3      controller_model");
    }
}
