use anyhow::Result;

use super::{open_session, read_register, read_word, Device, DeviceKind, SerialTransport};
use crate::protocol::Transport;
use crate::reader::{CommunicationError, RegisterReader, RetryPolicy};
use crate::reading::{Decimal, Reading};
use crate::regs::{
    db,
    packed::{self, ChargingState},
    Register,
};

/// Renogy Rover / Wanderer / Adventurer solar charge controller.
///
/// Every accessor is one bus transaction; nothing is cached and readings
/// taken one after another are not a consistent snapshot.
pub struct ChargeController<T> {
    reader: RegisterReader<T>,
}

impl ChargeController<SerialTransport> {
    pub fn open(port_name: &str, slave: u8, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::new(open_session(port_name, slave, retry, false)?))
    }
}

impl<T: Transport> ChargeController<T> {
    pub fn new(reader: RegisterReader<T>) -> Self {
        Self { reader }
    }

    pub fn slave(&self) -> u8 {
        self.reader.slave()
    }

    /// End the session and hand back the transport.
    pub fn close(self) -> T {
        self.reader.into_inner()
    }

    fn number(&mut self, reg: &Register) -> Result<Decimal, CommunicationError> {
        self.reader
            .read_scaled(reg.address, reg.scale, reg.function, reg.signed)
    }

    /// PV array input [V]
    pub fn solar_voltage(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::SOLAR_VOLTAGE)
    }

    /// PV array input [A]
    pub fn solar_current(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::SOLAR_CURRENT)
    }

    /// PV array input [W]
    pub fn solar_power(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::SOLAR_POWER)
    }

    pub fn load_voltage(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::LOAD_VOLTAGE)
    }

    pub fn load_current(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::LOAD_CURRENT)
    }

    pub fn load_power(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::LOAD_POWER)
    }

    pub fn battery_voltage(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::BATTERY_VOLTAGE)
    }

    /// Battery state of charge [%]
    pub fn battery_state_of_charge(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::BATTERY_STATE_OF_CHARGE)
    }

    pub fn battery_charge_current(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::BATTERY_CHARGE_CURRENT)
    }

    /// Battery temperature [°C], from the low byte of the shared register.
    pub fn battery_temperature(&mut self) -> Result<i16, CommunicationError> {
        read_word(&mut self.reader, &db::BATTERY_TEMPERATURE).map(packed::battery_temperature)
    }

    /// Temperature inside the controller [°C], from the high byte of the
    /// shared register.
    pub fn controller_temperature(&mut self) -> Result<i16, CommunicationError> {
        read_word(&mut self.reader, &db::CONTROLLER_TEMPERATURE)
            .map(packed::controller_temperature)
    }

    pub fn controller_model(&mut self) -> Result<String, CommunicationError> {
        let reg = &db::CONTROLLER_MODEL;
        self.reader.read_string(reg.address, reg.count, reg.function)
    }

    pub fn controller_software(&mut self) -> Result<String, CommunicationError> {
        let reg = &db::CONTROLLER_SOFTWARE;
        self.reader
            .read_array(reg.address, reg.function)
            .map(packed::version)
    }

    pub fn controller_hardware(&mut self) -> Result<String, CommunicationError> {
        let reg = &db::CONTROLLER_HARDWARE;
        self.reader
            .read_array(reg.address, reg.function)
            .map(packed::version)
    }

    /// Shares its registers with the hardware version and may be wrong for
    /// some models.
    pub fn controller_serial(&mut self) -> Result<String, CommunicationError> {
        let reg = &db::CONTROLLER_SERIAL;
        self.reader
            .read_array(reg.address, reg.function)
            .map(packed::serial_date_code)
    }

    pub fn charging_state(&mut self) -> Result<ChargingState, CommunicationError> {
        read_word(&mut self.reader, &db::CHARGING_STATE).map(ChargingState::from)
    }

    pub fn maximum_solar_power_today(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAXIMUM_SOLAR_POWER_TODAY)
    }

    /// Reads 0x0110, which the protocol documentation lists as the maximum
    /// discharging power of the day.
    pub fn minimum_solar_power_today(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MINIMUM_SOLAR_POWER_TODAY)
    }

    pub fn maximum_battery_voltage_today(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAXIMUM_BATTERY_VOLTAGE_TODAY)
    }

    pub fn minimum_battery_voltage_today(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MINIMUM_BATTERY_VOLTAGE_TODAY)
    }

    pub fn max_charging_current(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAX_CHARGING_CURRENT)
    }

    pub fn max_charging_power(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAX_CHARGING_POWER)
    }

    pub fn max_discharging_current(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAX_DISCHARGING_CURRENT)
    }

    pub fn max_discharging_power(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::MAX_DISCHARGING_POWER)
    }

    /// Charged today [Ah]
    pub fn charging(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::CHARGING_AMP_HOURS_TODAY)
    }

    /// Discharged today [Ah]
    pub fn discharging(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::DISCHARGING_AMP_HOURS_TODAY)
    }

    /// Generated today [kWh]
    pub fn power_generation(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::POWER_GENERATION_TODAY)
    }

    /// Consumed today [kWh]
    pub fn power_consumption(&mut self) -> Result<Decimal, CommunicationError> {
        self.number(&db::POWER_CONSUMPTION_TODAY)
    }
}

impl<T: Transport> Device for ChargeController<T> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::ChargeController
    }

    fn read(&mut self, reg: &Register) -> Result<Reading, CommunicationError> {
        read_register(&mut self.reader, reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{mock::ScriptedTransport, FunctionCode};

    fn controller(transport: ScriptedTransport) -> ChargeController<ScriptedTransport> {
        ChargeController::new(RegisterReader::new(transport, 1, RetryPolicy::default()))
    }

    #[test]
    fn solar_voltage() {
        let mut cc = controller(ScriptedTransport::new().ok(&[1250]));
        assert_eq!(cc.solar_voltage().unwrap().to_string(), "125.0");
        assert_eq!(
            cc.close().requests,
            vec![(1, FunctionCode::ReadHoldingRegisters, 0x0107, 1)]
        );
    }

    #[test]
    fn state_of_charge_is_integer() {
        let mut cc = controller(ScriptedTransport::new().ok(&[78]));
        assert_eq!(cc.battery_state_of_charge().unwrap(), Decimal::from_int(78));
    }

    #[test]
    fn packed_temperatures() {
        let mut cc = controller(ScriptedTransport::new().ok(&[0x2C2C]).ok(&[0x2C2C]));
        assert_eq!(cc.battery_temperature().unwrap(), 44);
        assert_eq!(cc.controller_temperature().unwrap(), 44);

        let mut cc = controller(ScriptedTransport::new().ok(&[0xAC80]).ok(&[0xAC80]));
        assert_eq!(cc.battery_temperature().unwrap(), 0);
        assert_eq!(cc.controller_temperature().unwrap(), -44);
    }

    #[test]
    fn identity() {
        let mut cc = controller(
            ScriptedTransport::new()
                .ok(&[0x2020, 0x524E, 0x472D, 0x4354, 0x524C, 0x2D52, 0x5652, 0x3430])
                .ok(&[0x0001, 0x0203])
                .ok(&[0x0001, 0x0100])
                .ok(&[0x0001, 0x1403]),
        );
        assert_eq!(cc.controller_model().unwrap(), "RNG-CTRL-RVR40");
        assert_eq!(cc.controller_software().unwrap(), "V1.2.3");
        assert_eq!(cc.controller_hardware().unwrap(), "V1.1.0");
        assert_eq!(cc.controller_serial().unwrap(), "#5123 date code 20-3");

        let addresses: Vec<u16> = cc.close().requests.iter().map(|r| r.2).collect();
        assert_eq!(addresses, vec![0x000C, 0x0014, 0x0016, 0x0016]);
    }

    #[test]
    fn daily_accumulators() {
        let mut cc = controller(ScriptedTransport::new().ok(&[12345]).ok(&[17]).ok(&[136]));
        assert_eq!(cc.power_generation().unwrap().to_string(), "1.2345");
        assert_eq!(cc.charging().unwrap().to_string(), "17");
        assert_eq!(cc.maximum_battery_voltage_today().unwrap().to_string(), "13.6");
    }

    #[test]
    fn reads_are_never_cached() {
        let mut cc = controller(ScriptedTransport::new().ok(&[120]).ok(&[121]));
        assert_eq!(cc.load_power().unwrap(), Decimal::from_int(120));
        assert_eq!(cc.load_power().unwrap(), Decimal::from_int(121));
        assert_eq!(cc.close().requests.len(), 2);
    }

    #[test]
    fn charging_state() {
        let mut cc = controller(ScriptedTransport::new().ok(&[0x0002]));
        assert_eq!(cc.charging_state().unwrap(), ChargingState::Mppt);
    }

    #[test]
    fn suspect_alias_reads_discharge_register() {
        let mut cc = controller(ScriptedTransport::new().ok(&[300]).ok(&[300]));
        assert_eq!(
            cc.minimum_solar_power_today().unwrap(),
            cc.max_discharging_power().unwrap()
        );
        let requests = cc.close().requests;
        assert_eq!(requests[0], requests[1]);
    }
}
