use std::io;
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use env_logger::TimestampPrecision;
use json::JsonValue;
use log::{error, info, warn};

use renogy_modbus::device::SerialTransport;
use renogy_modbus::protocol::{ProtocolError, Transport};
use renogy_modbus::{ChargeController, CommunicationError, Decimal, RetryPolicy};

/// Poll a charge controller and print one JSON record per cycle
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// enable debug output
    #[clap(long, short)]
    debug: bool,

    /// Serial device or 'auto'
    #[clap(long, short, default_value = "/dev/ttyUSB0")]
    portname: String,

    /// Modbus slave address of the controller
    #[clap(long, short, default_value_t = 1)]
    slaveaddress: u8,

    /// Seconds between polling cycles
    #[clap(long, short, default_value_t = 8)]
    interval_secs: u64,

    /// Attempts per read
    #[clap(long, short, default_value_t = 3)]
    retries: usize,
}

fn now_iso() -> String {
    let now: DateTime<Utc> = SystemTime::now().into();
    now.to_rfc3339()
}

fn temperature(value: i16) -> JsonValue {
    Decimal::from_int(value.into()).into()
}

fn poll<T: Transport>(cc: &mut ChargeController<T>) -> Result<JsonValue> {
    Ok(json::object! {
        soc: cc.battery_state_of_charge()?,
        Upv: cc.solar_voltage()?,
        Ipv: cc.solar_current()?,
        Ppv: cc.solar_power()?,
        Ubat: cc.battery_voltage()?,
        Ubatmax: cc.maximum_battery_voltage_today()?,
        Ubatmin: cc.minimum_battery_voltage_today()?,
        ICbatmax: cc.max_charging_current()?,
        ICbat: cc.battery_charge_current()?,
        DayCharge: cc.charging()?,
        DayEnergy: cc.power_generation()?,
        Tbat: temperature(cc.battery_temperature()?),
        Tctrl: temperature(cc.controller_temperature()?),
        Cstate: cc.charging_state()?.to_string(),
    })
}

/// The link itself is gone (adapter unplugged, descriptor dead): only a
/// fresh open can recover. Timeouts just mean the slave kept quiet.
fn port_lost(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<CommunicationError>() {
        Some(CommunicationError {
            source: ProtocolError::Io(e),
            ..
        }) => e.kind() != io::ErrorKind::TimedOut,
        _ => false,
    }
}

fn open(args: &Args) -> Result<ChargeController<SerialTransport>> {
    ChargeController::open(
        &args.portname,
        args.slaveaddress,
        RetryPolicy::new(args.retries, Duration::ZERO),
    )
    .with_context(|| format!("Can't open controller on '{}'", args.portname))
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(Some(TimestampPrecision::Millis))
    .format_target(false)
    .init();

    let interval = Duration::from_secs(args.interval_secs);
    let mut session = None;

    loop {
        if session.is_none() {
            match open(&args) {
                Ok(cc) => {
                    info!("Polling slave {} on {}", args.slaveaddress, args.portname);
                    session = Some(cc);
                }
                Err(e) => error!("{:#}", e),
            }
        }

        if let Some(cc) = session.as_mut() {
            match poll(cc) {
                Ok(record) => println!("{}: {}", now_iso(), record.dump()),
                Err(e) => {
                    error!("{:#}", e);
                    if port_lost(&e) {
                        warn!("Closing {}, reopening on the next cycle", args.portname);
                        session = None;
                    }
                }
            }
        }

        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renogy_modbus::protocol::{FunctionCode, ProtocolError};
    use renogy_modbus::RegisterReader;

    /// Every register holds the same word.
    struct Constant(u16);

    impl Transport for Constant {
        fn transact(
            &mut self,
            _slave: u8,
            _function: FunctionCode,
            _address: u16,
            count: u16,
        ) -> Result<Vec<u16>, ProtocolError> {
            Ok(vec![self.0; count as usize])
        }
    }

    /// Every transaction fails with the same I/O error.
    struct Failing(io::ErrorKind);

    impl Transport for Failing {
        fn transact(
            &mut self,
            _slave: u8,
            _function: FunctionCode,
            _address: u16,
            _count: u16,
        ) -> Result<Vec<u16>, ProtocolError> {
            Err(ProtocolError::Io(self.0.into()))
        }
    }

    fn failed_poll(transport: Failing) -> anyhow::Error {
        let reader = RegisterReader::new(transport, 1, RetryPolicy::new(1, Duration::ZERO));
        poll(&mut ChargeController::new(reader)).unwrap_err()
    }

    #[test]
    fn record_keys() {
        let reader = RegisterReader::new(Constant(0x2C05), 1, RetryPolicy::default());
        let record = poll(&mut ChargeController::new(reader)).unwrap();

        let keys: Vec<&str> = record.entries().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![
                "soc", "Upv", "Ipv", "Ppv", "Ubat", "Ubatmax", "Ubatmin", "ICbatmax", "ICbat",
                "DayCharge", "DayEnergy", "Tbat", "Tctrl", "Cstate"
            ]
        );
        assert_eq!(record["Tbat"].as_i32(), Some(5));
        assert_eq!(record["Tctrl"].as_i32(), Some(44));
        assert_eq!(record["Cstate"], "floating");
        assert_eq!(record["Upv"].dump(), "1126.9");
    }

    #[test]
    fn timeout_keeps_the_port() {
        let err = failed_poll(Failing(io::ErrorKind::TimedOut));
        assert!(err.downcast_ref::<CommunicationError>().is_some());
        assert!(!port_lost(&err));
    }

    #[test]
    fn broken_pipe_reopens_the_port() {
        assert!(port_lost(&failed_poll(Failing(io::ErrorKind::BrokenPipe))));
    }

    #[test]
    fn exception_keeps_the_port() {
        let err: anyhow::Error = CommunicationError {
            slave: 1,
            address: 0x0100,
            count: 1,
            attempts: 1,
            source: ProtocolError::Exception { code: 0x02 },
        }
        .into();
        assert!(!port_lost(&err));
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = now_iso();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok(), "{}", ts);
    }
}
