use super::{Decode, DeviceKind, Register};

const CC: DeviceKind = DeviceKind::ChargeController;
const SB: DeviceKind = DeviceKind::SmartBattery;

// Rover / Wanderer / Adventurer charge controllers

pub const CONTROLLER_MODEL: Register =
    Register::new(CC, "controller_model", "Controller model", "", 0x000C, 0).decoded(Decode::Text, 8);
pub const CONTROLLER_SOFTWARE: Register =
    Register::new(CC, "controller_software", "Controller SW version", "", 0x0014, 0)
        .decoded(Decode::Version, 2);
pub const CONTROLLER_HARDWARE: Register =
    Register::new(CC, "controller_hardware", "Controller HW version", "", 0x0016, 0)
        .decoded(Decode::Version, 2);
pub const CONTROLLER_SERIAL: Register =
    Register::new(CC, "controller_serial", "Controller serial number", "", 0x0016, 0)
        .decoded(Decode::SerialDateCode, 2)
        .caveat("reads the hardware version registers; does not fit ML2420 regulators");

pub const BATTERY_STATE_OF_CHARGE: Register =
    Register::new(CC, "battery_state_of_charge", "Battery state of charge", "%", 0x0100, 0);
pub const BATTERY_VOLTAGE: Register =
    Register::new(CC, "battery_voltage", "Battery voltage", "V", 0x0101, 1);
pub const BATTERY_CHARGE_CURRENT: Register =
    Register::new(CC, "battery_charge_current", "Battery charge current", "A", 0x0102, 2);
pub const CONTROLLER_TEMPERATURE: Register =
    Register::new(CC, "controller_temperature", "Controller temperature", "°C", 0x0103, 0)
        .decoded(Decode::ControllerTemperature, 1);
pub const BATTERY_TEMPERATURE: Register =
    Register::new(CC, "battery_temperature", "Battery temperature", "°C", 0x0103, 0)
        .decoded(Decode::BatteryTemperature, 1);
pub const LOAD_VOLTAGE: Register = Register::new(CC, "load_voltage", "Load voltage", "V", 0x0104, 1);
pub const LOAD_CURRENT: Register = Register::new(CC, "load_current", "Load current", "A", 0x0105, 2);
pub const LOAD_POWER: Register = Register::new(CC, "load_power", "Load power", "W", 0x0106, 0);
pub const SOLAR_VOLTAGE: Register =
    Register::new(CC, "solar_voltage", "Solar voltage", "V", 0x0107, 1);
pub const SOLAR_CURRENT: Register =
    Register::new(CC, "solar_current", "Solar current", "A", 0x0108, 2);
pub const SOLAR_POWER: Register = Register::new(CC, "solar_power", "Solar power", "W", 0x0109, 0);

pub const MINIMUM_BATTERY_VOLTAGE_TODAY: Register = Register::new(
    CC,
    "minimum_battery_voltage_today",
    "Battery voltage today, min",
    "V",
    0x010B,
    1,
);
pub const MAXIMUM_BATTERY_VOLTAGE_TODAY: Register = Register::new(
    CC,
    "maximum_battery_voltage_today",
    "Battery voltage today, max",
    "V",
    0x010C,
    1,
);
pub const MAX_CHARGING_CURRENT: Register = Register::new(
    CC,
    "max_charging_current",
    "Maximum charging current today",
    "A",
    0x010D,
    2,
);
pub const MAX_DISCHARGING_CURRENT: Register = Register::new(
    CC,
    "max_discharging_current",
    "Maximum discharging current today",
    "A",
    0x010E,
    2,
);
pub const MAXIMUM_SOLAR_POWER_TODAY: Register = Register::new(
    CC,
    "maximum_solar_power_today",
    "Solar power today, max",
    "W",
    0x010F,
    0,
);
pub const MAX_CHARGING_POWER: Register = Register::new(
    CC,
    "max_charging_power",
    "Maximum charging power today",
    "W",
    0x010F,
    0,
);
pub const MINIMUM_SOLAR_POWER_TODAY: Register = Register::new(
    CC,
    "minimum_solar_power_today",
    "Solar power today, min",
    "W",
    0x0110,
    0,
)
.caveat("0x0110 is documented as max discharging power of the current day");
pub const MAX_DISCHARGING_POWER: Register = Register::new(
    CC,
    "max_discharging_power",
    "Maximum discharging power today",
    "W",
    0x0110,
    0,
);
pub const CHARGING_AMP_HOURS_TODAY: Register =
    Register::new(CC, "charging", "Charging today", "Ah", 0x0111, 0);
pub const DISCHARGING_AMP_HOURS_TODAY: Register =
    Register::new(CC, "discharging", "Discharging today", "Ah", 0x0112, 0);
pub const POWER_GENERATION_TODAY: Register =
    Register::new(CC, "power_generation", "Power generated today", "kWh", 0x0113, 4);
pub const POWER_CONSUMPTION_TODAY: Register =
    Register::new(CC, "power_consumption", "Power consumed today", "kWh", 0x0114, 4);
pub const CHARGING_STATE: Register =
    Register::new(CC, "charging_state", "Charging state", "", 0x0120, 0)
        .decoded(Decode::ChargingState, 1);

pub static CHARGE_CONTROLLER: &[Register] = &[
    CONTROLLER_MODEL,
    CONTROLLER_SOFTWARE,
    CONTROLLER_HARDWARE,
    CONTROLLER_SERIAL,
    CONTROLLER_TEMPERATURE,
    SOLAR_VOLTAGE,
    SOLAR_CURRENT,
    SOLAR_POWER,
    MAXIMUM_SOLAR_POWER_TODAY,
    MINIMUM_SOLAR_POWER_TODAY,
    LOAD_VOLTAGE,
    LOAD_CURRENT,
    LOAD_POWER,
    BATTERY_VOLTAGE,
    MAXIMUM_BATTERY_VOLTAGE_TODAY,
    MINIMUM_BATTERY_VOLTAGE_TODAY,
    BATTERY_STATE_OF_CHARGE,
    BATTERY_TEMPERATURE,
    BATTERY_CHARGE_CURRENT,
    MAX_CHARGING_CURRENT,
    MAX_CHARGING_POWER,
    CHARGING_AMP_HOURS_TODAY,
    POWER_GENERATION_TODAY,
    MAX_DISCHARGING_CURRENT,
    MAX_DISCHARGING_POWER,
    DISCHARGING_AMP_HOURS_TODAY,
    POWER_CONSUMPTION_TODAY,
    CHARGING_STATE,
];

// Smart lithium iron phosphate batteries, decimal addresses

pub const CELL_VOLTAGES: Register = Register::new(SB, "cell_voltages", "Cell voltages", "V", 5001, 1)
    .decoded(
        Decode::Series {
            count_address: 5000,
            max: 16,
        },
        1,
    );
pub const CELL_TEMPERATURES: Register =
    Register::new(SB, "cell_temperatures", "Cell temperatures", "°C", 5018, 1)
        .signed()
        .decoded(
            Decode::Series {
                count_address: 5017,
                max: 16,
            },
            1,
        );
pub const BMS_TEMPERATURE: Register =
    Register::new(SB, "bms_temperature", "BMS temperature", "°C", 5035, 1).signed();
pub const ENVIRONMENT_TEMPERATURES: Register = Register::new(
    SB,
    "environment_temperatures",
    "Environment temperatures",
    "°C",
    5037,
    1,
)
.signed()
.decoded(
    Decode::Series {
        count_address: 5036,
        max: 2,
    },
    1,
);
pub const HEATER_TEMPERATURES: Register =
    Register::new(SB, "heater_temperatures", "Heater temperatures", "°C", 5040, 1)
        .signed()
        .decoded(
            Decode::Series {
                count_address: 5039,
                max: 2,
            },
            1,
        );
pub const CURRENT: Register = Register::new(SB, "current", "Current", "A", 5042, 2).signed();
pub const VOLTAGE: Register = Register::new(SB, "voltage", "Voltage", "V", 5043, 1);
pub const REMAINING_CAPACITY: Register =
    Register::new(SB, "remaining_capacity", "Remaining capacity", "Ah", 5044, 3)
        .decoded(Decode::Long, 2);
pub const TOTAL_CAPACITY: Register =
    Register::new(SB, "total_capacity", "Total capacity", "Ah", 5046, 3).decoded(Decode::Long, 2);
pub const STATE_OF_CHARGE: Register =
    Register::new(SB, "state_of_charge", "State of charge", "%", 5044, 3).decoded(
        Decode::Percentage {
            whole_address: 5046,
        },
        2,
    );
pub const CYCLE_NUMBER: Register = Register::new(SB, "cycle_number", "Cycle number", "", 5048, 0);
pub const CHARGE_VOLTAGE_LIMIT: Register =
    Register::new(SB, "charge_voltage_limit", "Charge voltage limit", "V", 5049, 1);
pub const DISCHARGE_VOLTAGE_LIMIT: Register = Register::new(
    SB,
    "discharge_voltage_limit",
    "Discharge voltage limit",
    "V",
    5050,
    1,
);
pub const CHARGE_CURRENT_LIMIT: Register =
    Register::new(SB, "charge_current_limit", "Charge current limit", "A", 5051, 2);
pub const DISCHARGE_CURRENT_LIMIT: Register = Register::new(
    SB,
    "discharge_current_limit",
    "Discharge current limit",
    "A",
    5052,
    2,
)
.signed();

pub static SMART_BATTERY: &[Register] = &[
    CELL_VOLTAGES,
    CELL_TEMPERATURES,
    BMS_TEMPERATURE,
    ENVIRONMENT_TEMPERATURES,
    HEATER_TEMPERATURES,
    CURRENT,
    VOLTAGE,
    REMAINING_CAPACITY,
    TOTAL_CAPACITY,
    STATE_OF_CHARGE,
    CYCLE_NUMBER,
    CHARGE_VOLTAGE_LIMIT,
    DISCHARGE_VOLTAGE_LIMIT,
    CHARGE_CURRENT_LIMIT,
    DISCHARGE_CURRENT_LIMIT,
];
