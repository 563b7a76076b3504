mod rtu;

use std::{
    fmt::Display,
    io,
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use log::debug;
use thiserror::Error;

pub use rtu::RtuMaster;

/// Valid unicast slave addresses.
pub const SLAVE_ADDRESSES: RangeInclusive<u8> = 1..=247;

/// Largest register count a single read may request.
pub const MAX_READ_COUNT: u16 = 125;

/// Register read by `scan` to find out whether an address is populated.
pub const SCAN_REGISTER: u16 = 0x000A;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (*self as u8).fmt(f)
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupted response frame")]
    BadFrame,
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("modbus exception {code:#04x} ({})", exception_name(.code))]
    Exception { code: u8 },
    #[error("invalid register count {0}")]
    InvalidCount(u16),
    #[error("invalid slave address {0}")]
    InvalidSlave(u8),
}

impl ProtocolError {
    /// Failures of the link itself. Re-issuing the same request may succeed.
    /// An exception is a deliberate answer of the slave and never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            ProtocolError::Io(_)
            | ProtocolError::BadFrame
            | ProtocolError::UnexpectedResponse(_) => true,
            ProtocolError::Exception { .. }
            | ProtocolError::InvalidCount(_)
            | ProtocolError::InvalidSlave(_) => false,
        }
    }
}

fn exception_name(code: &u8) -> &'static str {
    match *code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "slave device failure",
        0x05 => "acknowledge",
        0x06 => "slave device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target failed to respond",
        _ => "unknown",
    }
}

/// A Modbus master able to run one register read transaction at a time.
///
/// Implementations block until the response arrived or the link timed out.
/// The returned vector holds exactly `count` words on success.
pub trait Transport: Send {
    fn transact(
        &mut self,
        slave: u8,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transact(
        &mut self,
        slave: u8,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        (**self).transact(slave, function, address, count)
    }
}

/// Several sessions on one physical bus. The lock is held for the whole
/// request/response round trip.
impl<T: Transport> Transport for Arc<Mutex<T>> {
    fn transact(
        &mut self,
        slave: u8,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        let mut bus = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        bus.transact(slave, function, address, count)
    }
}

/// Try every address in `ids` once and return those a slave answered on.
///
/// An exception response still proves a live slave at that address.
pub fn scan<T, I>(transport: &mut T, ids: I) -> Vec<u8>
where
    T: Transport + ?Sized,
    I: IntoIterator<Item = u8>,
{
    ids.into_iter()
        .filter(|id| {
            match transport.transact(*id, FunctionCode::ReadHoldingRegisters, SCAN_REGISTER, 1) {
                Ok(_) | Err(ProtocolError::Exception { .. }) => {
                    debug!("scan: slave {} answered", id);
                    true
                }
                Err(e) => {
                    debug!("scan: slave {}: {}", id, e);
                    false
                }
            }
        })
        .collect()
}
