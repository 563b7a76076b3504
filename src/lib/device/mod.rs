mod charge_controller;
mod smart_battery;

use anyhow::{anyhow, Context, Result};

use crate::port::{self, PortSettings};
use crate::protocol::{RtuMaster, Transport, SLAVE_ADDRESSES};
use crate::reader::{CommunicationError, RegisterReader, RetryPolicy};
use crate::reading::{Decimal, Reading};
use crate::regs::{self, packed, Decode, Register};

pub use crate::regs::DeviceKind;
pub use charge_controller::ChargeController;
pub use smart_battery::SmartBattery;

/// Modbus RTU over a real serial port.
pub type SerialTransport = RtuMaster;

/// Open `port_name` with the fixed Renogy line settings. The returned master
/// may talk to any slave on the bus.
pub fn open_bus(port_name: &str, force: bool) -> Result<SerialTransport> {
    let settings = PortSettings::default();
    let builder = port::port_builder(port_name, &settings, force)?;
    RtuMaster::connect(&builder, settings.timeout)
        .with_context(|| format!("Can't open port '{}'", port_name))
}

/// Open `port_name` with the fixed Renogy line settings and bind it to one
/// slave. The port is released when the returned reader is dropped.
pub fn open_session(
    port_name: &str,
    slave: u8,
    retry: RetryPolicy,
    force: bool,
) -> Result<RegisterReader<SerialTransport>> {
    if !SLAVE_ADDRESSES.contains(&slave) {
        return Err(anyhow!(
            "Slave address {} out of range {}-{}",
            slave,
            SLAVE_ADDRESSES.start(),
            SLAVE_ADDRESSES.end()
        ));
    }

    Ok(RegisterReader::new(open_bus(port_name, force)?, slave, retry))
}

/// Named quantities of one device. Every read is a fresh bus transaction.
pub trait Device: Send {
    fn kind(&self) -> DeviceKind;
    fn read(&mut self, reg: &Register) -> Result<Reading, CommunicationError>;

    fn registers(&self) -> &'static [Register] {
        regs::list_registers(self.kind())
    }
}

pub fn make_device<'a, T: Transport + 'a>(
    kind: DeviceKind,
    reader: RegisterReader<T>,
) -> Box<dyn Device + 'a> {
    match kind {
        DeviceKind::ChargeController => Box::new(ChargeController::new(reader)),
        DeviceKind::SmartBattery => Box::new(SmartBattery::new(reader)),
    }
}

fn read_word<T: Transport>(
    reader: &mut RegisterReader<T>,
    reg: &Register,
) -> Result<u16, CommunicationError> {
    let [word] = reader.read_array::<1>(reg.address, reg.function)?;
    Ok(word)
}

fn read_number<T: Transport>(
    reader: &mut RegisterReader<T>,
    reg: &Register,
) -> Result<Decimal, CommunicationError> {
    match reg.decode {
        Decode::Long => reader.read_long(reg.address, reg.scale, reg.function, reg.signed),
        _ => reader.read_scaled(reg.address, reg.scale, reg.function, reg.signed),
    }
}

fn read_series<T: Transport>(
    reader: &mut RegisterReader<T>,
    reg: &Register,
    count_address: u16,
    max: u16,
) -> Result<Vec<Decimal>, CommunicationError> {
    let [count] = reader.read_array::<1>(count_address, reg.function)?;
    let count = count.min(max);
    if count == 0 {
        return Ok(Vec::new());
    }

    Ok(reader
        .read_registers(reg.address, count, reg.function)?
        .into_iter()
        .map(|word| Decimal::from_word(word, reg.scale, reg.signed))
        .collect())
}

fn read_percentage<T: Transport>(
    reader: &mut RegisterReader<T>,
    reg: &Register,
    whole_address: u16,
) -> Result<Decimal, CommunicationError> {
    let part = reader.read_long(reg.address, reg.scale, reg.function, reg.signed)?;
    let whole = reader.read_long(whole_address, reg.scale, reg.function, reg.signed)?;
    Ok(part.percent_of(whole))
}

/// Read and decode any register map entry.
pub fn read_register<T: Transport>(
    reader: &mut RegisterReader<T>,
    reg: &Register,
) -> Result<Reading, CommunicationError> {
    Ok(match reg.decode {
        Decode::Scaled | Decode::Long => Reading::Number(read_number(reader, reg)?),
        Decode::Text => Reading::Text(reader.read_string(reg.address, reg.count, reg.function)?),
        Decode::Version => {
            Reading::Text(packed::version(reader.read_array(reg.address, reg.function)?))
        }
        Decode::SerialDateCode => Reading::Text(packed::serial_date_code(
            reader.read_array(reg.address, reg.function)?,
        )),
        Decode::BatteryTemperature => Reading::Number(Decimal::from_int(
            packed::battery_temperature(read_word(reader, reg)?).into(),
        )),
        Decode::ControllerTemperature => Reading::Number(Decimal::from_int(
            packed::controller_temperature(read_word(reader, reg)?).into(),
        )),
        Decode::ChargingState => {
            Reading::Text(packed::ChargingState::from(read_word(reader, reg)?).to_string())
        }
        Decode::Series { count_address, max } => {
            Reading::Series(read_series(reader, reg, count_address, max)?)
        }
        Decode::Percentage { whole_address } => {
            Reading::Number(read_percentage(reader, reg, whole_address)?)
        }
    })
}
