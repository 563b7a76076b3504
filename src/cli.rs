use anyhow::Result;
pub use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

use renogy_modbus::protocol::SLAVE_ADDRESSES;
use renogy_modbus::DeviceKind;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("invalid range '{0}'")]
    BadRange(String),
    #[error("slave address {0} out of range 1-247")]
    OutOfRange(u8),
}

/// Slave addresses to search, sorted and free of duplicates.
#[derive(Debug, PartialEq)]
pub struct SlaveRange(Vec<u8>);

impl Deref for SlaveRange {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for SlaveRange {
    type Err = RangeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(\d+)(?:-(\d+))?$").unwrap();
        }

        let parse = |s: &str, part: &str| -> Result<u8, RangeError> {
            let val = part
                .parse::<u8>()
                .map_err(|_| RangeError::BadRange(s.to_string()))?;
            if SLAVE_ADDRESSES.contains(&val) {
                Ok(val)
            } else {
                Err(RangeError::OutOfRange(val))
            }
        };

        let mut result: Vec<u8> = Vec::new();

        for s in input.split(',') {
            let c = RE
                .captures(s.trim())
                .ok_or_else(|| RangeError::BadRange(s.to_string()))?;
            let first = parse(s, &c[1])?;
            match c.get(2) {
                None => result.push(first),
                Some(last) => {
                    let last = parse(s, last.as_str())?;
                    result.extend(cmp::min(first, last)..=cmp::max(first, last));
                }
            }
        }

        result.sort_unstable();
        result.dedup();
        Ok(SlaveRange(result))
    }
}

#[derive(Error, Debug)]
pub enum RegNameError {
    #[error("invalid register name '{0}'")]
    BadRegName(String),
}

/// Quantity name as listed by `--list-registers`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegName(String);

impl Deref for RegName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for RegName {
    type Err = RegNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^[a-z][_a-z0-9]*$").unwrap();
        }
        if RE.is_match(s) {
            Ok(RegName(s.to_string()))
        } else {
            Err(RegNameError::BadRegName(s.to_string()))
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Skip sanity checks
    #[clap(long, short)]
    pub force: bool,

    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// Serial device or 'auto'
    #[clap(long, short, default_value = "/dev/ttyUSB0")]
    pub portname: String,

    /// Modbus slave address of the device
    #[clap(long, short, default_value_t = 1)]
    pub slaveaddress: u8,

    /// Type of the attached device
    #[clap(
        long,
        default_value = "charge_controller",
        possible_values = ["charge_controller", "smart_battery"]
    )]
    pub device: DeviceKind,

    /// Search the bus for answering slave addresses
    #[clap(long)]
    pub find_slave_address: bool,

    /// Slave addresses tried by --find-slave-address, e.g. 1-16,48
    #[clap(long, default_value = "1-247")]
    pub scan_range: SlaveRange,

    /// Read only the named quantity (repeatable)
    #[clap(long = "read", short = 'n', value_name = "NAME")]
    pub names: Vec<RegName>,

    /// List the register map of the device and exit
    #[clap(long, short)]
    pub list_registers: bool,

    /// Attempts per read
    #[clap(long, short, default_value_t = 3)]
    pub retries: usize,

    /// Pause between attempts
    #[clap(long, default_value_t = 0)]
    pub retry_delay_ms: u64,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,
}
