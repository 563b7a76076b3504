use anyhow::Result;

use super::{
    open_session, read_number, read_percentage, read_register, read_series, Device, DeviceKind,
    SerialTransport,
};
use crate::protocol::Transport;
use crate::reader::{CommunicationError, RegisterReader, RetryPolicy};
use crate::reading::{Decimal, Reading};
use crate::regs::{db, Decode, Register};

/// Renogy smart lithium iron phosphate battery with a built-in BMS.
pub struct SmartBattery<T> {
    reader: RegisterReader<T>,
}

impl SmartBattery<SerialTransport> {
    pub fn open(port_name: &str, slave: u8, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::new(open_session(port_name, slave, retry, false)?))
    }
}

impl<T: Transport> SmartBattery<T> {
    pub fn new(reader: RegisterReader<T>) -> Self {
        Self { reader }
    }

    pub fn slave(&self) -> u8 {
        self.reader.slave()
    }

    pub fn close(self) -> T {
        self.reader.into_inner()
    }

    fn series(&mut self, reg: &Register) -> Result<Vec<Decimal>, CommunicationError> {
        match reg.decode {
            Decode::Series { count_address, max } => {
                read_series(&mut self.reader, reg, count_address, max)
            }
            _ => read_number(&mut self.reader, reg).map(|value| vec![value]),
        }
    }

    pub fn cell_voltages(&mut self) -> Result<Vec<Decimal>, CommunicationError> {
        self.series(&db::CELL_VOLTAGES)
    }

    pub fn cell_temperatures(&mut self) -> Result<Vec<Decimal>, CommunicationError> {
        self.series(&db::CELL_TEMPERATURES)
    }

    pub fn environment_temperatures(&mut self) -> Result<Vec<Decimal>, CommunicationError> {
        self.series(&db::ENVIRONMENT_TEMPERATURES)
    }

    pub fn heater_temperatures(&mut self) -> Result<Vec<Decimal>, CommunicationError> {
        self.series(&db::HEATER_TEMPERATURES)
    }

    pub fn bms_temperature(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::BMS_TEMPERATURE)
    }

    /// Pack current [A], negative while discharging.
    pub fn current(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::CURRENT)
    }

    pub fn voltage(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::VOLTAGE)
    }

    pub fn remaining_capacity(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::REMAINING_CAPACITY)
    }

    pub fn total_capacity(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::TOTAL_CAPACITY)
    }

    /// Remaining over total capacity [%], two decimals.
    pub fn state_of_charge(&mut self) -> Result<Decimal, CommunicationError> {
        read_percentage(&mut self.reader, &db::STATE_OF_CHARGE, db::TOTAL_CAPACITY.address)
    }

    pub fn cycle_number(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::CYCLE_NUMBER)
    }

    pub fn charge_voltage_limit(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::CHARGE_VOLTAGE_LIMIT)
    }

    pub fn discharge_voltage_limit(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::DISCHARGE_VOLTAGE_LIMIT)
    }

    pub fn charge_current_limit(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::CHARGE_CURRENT_LIMIT)
    }

    pub fn discharge_current_limit(&mut self) -> Result<Decimal, CommunicationError> {
        read_number(&mut self.reader, &db::DISCHARGE_CURRENT_LIMIT)
    }
}

impl<T: Transport> Device for SmartBattery<T> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::SmartBattery
    }

    fn read(&mut self, reg: &Register) -> Result<Reading, CommunicationError> {
        read_register(&mut self.reader, reg)
    }
}
