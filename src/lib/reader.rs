//! Retrying register reads on top of a [`Transport`].
//!
//! Every read is a complete Modbus transaction. Link failures (timeouts,
//! corrupted or mismatching frames) are retried up to the configured number
//! of attempts; what the slave actually returned, exceptions included, is
//! never second-guessed.

use std::{thread, time::Duration};

use log::{debug, warn};
use thiserror::Error;

use crate::protocol::{FunctionCode, ProtocolError, Transport};
use crate::reading::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try; anything below one is raised to one.
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

#[derive(Error, Debug)]
#[error("slave {slave}: reading {count} register(s) at {address:#06x} failed after {attempts} attempt(s)")]
pub struct CommunicationError {
    pub slave: u8,
    pub address: u16,
    pub count: u16,
    pub attempts: usize,
    #[source]
    pub source: ProtocolError,
}

/// Reads registers of one slave through a transport it owns exclusively.
pub struct RegisterReader<T> {
    transport: T,
    slave: u8,
    retry: RetryPolicy,
}

impl<T: Transport> RegisterReader<T> {
    pub fn new(transport: T, slave: u8, retry: RetryPolicy) -> Self {
        Self {
            transport,
            slave,
            retry,
        }
    }

    pub fn slave(&self) -> u8 {
        self.slave
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// `count` raw words starting at `address`.
    pub fn read_registers(
        &mut self,
        address: u16,
        count: u16,
        function: FunctionCode,
    ) -> Result<Vec<u16>, CommunicationError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = self
                .transport
                .transact(self.slave, function, address, count)
                .and_then(|words| {
                    if words.len() == count as usize {
                        Ok(words)
                    } else {
                        Err(ProtocolError::BadFrame)
                    }
                });

            match result {
                Ok(words) => return Ok(words),
                Err(e) if e.is_transient() && attempt < self.retry.attempts() => {
                    debug!(
                        "slave {} {:#06x}: attempt {}/{} failed: {}",
                        self.slave,
                        address,
                        attempt,
                        self.retry.attempts(),
                        e
                    );
                    let delay = self.retry.delay();
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(e) => {
                    warn!(
                        "slave {} {:#06x}: giving up after {} attempt(s): {}",
                        self.slave, address, attempt, e
                    );
                    return Err(CommunicationError {
                        slave: self.slave,
                        address,
                        count,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Fixed number of contiguous words.
    pub fn read_array<const N: usize>(
        &mut self,
        address: u16,
        function: FunctionCode,
    ) -> Result<[u16; N], CommunicationError> {
        let words = self.read_registers(address, N as u16, function)?;
        words.try_into().map_err(|_| CommunicationError {
            slave: self.slave,
            address,
            count: N as u16,
            attempts: 1,
            source: ProtocolError::BadFrame,
        })
    }

    /// Single register as `raw / 10^scale`.
    pub fn read_scaled(
        &mut self,
        address: u16,
        scale: u8,
        function: FunctionCode,
        signed: bool,
    ) -> Result<Decimal, CommunicationError> {
        let [raw] = self.read_array::<1>(address, function)?;
        Ok(Decimal::from_word(raw, scale, signed))
    }

    /// Two registers, high word first, as `raw / 10^scale`.
    pub fn read_long(
        &mut self,
        address: u16,
        scale: u8,
        function: FunctionCode,
        signed: bool,
    ) -> Result<Decimal, CommunicationError> {
        let [hi, lo] = self.read_array::<2>(address, function)?;
        let raw = (u32::from(hi) << 16) | u32::from(lo);
        let mantissa = if signed {
            i64::from(raw as i32)
        } else {
            i64::from(raw)
        };
        Ok(Decimal::new(mantissa, scale))
    }

    /// `count` registers of packed ASCII.
    pub fn read_string(
        &mut self,
        address: u16,
        count: u16,
        function: FunctionCode,
    ) -> Result<String, CommunicationError> {
        self.read_registers(address, count, function)
            .map(|words| registers_to_string(&words))
    }
}

/// Two characters per register, high byte first. Surrounding blanks and
/// NUL padding are dropped.
pub fn registers_to_string(words: &[u16]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
    String::from_utf8_lossy(&bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::ScriptedTransport;
    use std::time::Instant;

    const FC: FunctionCode = FunctionCode::ReadHoldingRegisters;

    fn reader(transport: ScriptedTransport) -> RegisterReader<ScriptedTransport> {
        RegisterReader::new(transport, 1, RetryPolicy::default())
    }

    #[test]
    fn scaled_unsigned() {
        let mut reader = reader(ScriptedTransport::new().ok(&[1250]));
        assert_eq!(
            reader.read_scaled(0x0107, 1, FC, false).unwrap(),
            Decimal::new(1250, 1)
        );
        assert_eq!(
            reader.into_inner().requests,
            vec![(1, FC, 0x0107, 1)]
        );
    }

    #[test]
    fn scaled_signed() {
        let mut reader = reader(ScriptedTransport::new().ok(&[0xFF9C]).ok(&[100]));
        assert_eq!(
            reader.read_scaled(5042, 2, FC, true).unwrap().to_string(),
            "-1.00"
        );
        assert_eq!(
            reader.read_scaled(5042, 2, FC, true).unwrap().to_string(),
            "1.00"
        );
    }

    #[test]
    fn transient_failures_are_retried() {
        let mut reader = reader(ScriptedTransport::new().timeout().timeout().ok(&[78]));
        assert_eq!(
            reader.read_scaled(0x0100, 0, FC, false).unwrap(),
            Decimal::from_int(78)
        );
        assert_eq!(reader.into_inner().requests.len(), 3);
    }

    #[test]
    fn exhausted_retries_surface_one_error() {
        let transport = ScriptedTransport::new()
            .timeout()
            .err(ProtocolError::UnexpectedResponse("invalid crc".into()))
            .err(ProtocolError::BadFrame)
            .ok(&[78]);
        let mut reader = reader(transport);

        let err = reader.read_scaled(0x0100, 0, FC, false).unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.address, 0x0100);
        assert!(matches!(err.source, ProtocolError::BadFrame));

        // the fourth scripted response was never requested
        assert_eq!(reader.into_inner().responses.len(), 1);
    }

    #[test]
    fn exceptions_are_not_retried() {
        let transport = ScriptedTransport::new()
            .err(ProtocolError::Exception { code: 0x02 })
            .ok(&[1]);
        let mut reader = reader(transport);

        let err = reader.read_registers(0x9000, 1, FC).unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.source, ProtocolError::Exception { code: 0x02 }));
    }

    #[test]
    fn busy_slave_is_not_retried() {
        let transport = ScriptedTransport::new()
            .err(ProtocolError::Exception { code: 0x06 })
            .ok(&[78]);
        let mut reader = reader(transport);

        let err = reader.read_scaled(0x0100, 0, FC, false).unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.source, ProtocolError::Exception { code: 0x06 }));
        assert_eq!(reader.into_inner().requests.len(), 1);
    }

    #[test]
    fn delay_between_attempts() {
        let delay = Duration::from_millis(20);
        let mut reader = RegisterReader::new(
            ScriptedTransport::new().timeout().ok(&[78]),
            1,
            RetryPolicy::new(2, delay),
        );
        assert_eq!(reader.retry_policy().delay(), delay);

        let started = Instant::now();
        assert_eq!(
            reader.read_scaled(0x0100, 0, FC, false).unwrap(),
            Decimal::from_int(78)
        );
        assert!(started.elapsed() >= delay);
        assert_eq!(reader.into_inner().requests.len(), 2);
    }

    #[test]
    fn single_attempt_policy() {
        let mut reader = RegisterReader::new(
            ScriptedTransport::new().timeout().ok(&[1]),
            1,
            RetryPolicy::new(0, Duration::ZERO),
        );
        assert_eq!(reader.retry_policy().attempts(), 1);
        assert!(reader.read_registers(0x0100, 1, FC).is_err());
    }

    #[test]
    fn short_response_is_retried() {
        let mut reader = reader(ScriptedTransport::new().ok(&[1]).ok(&[0x0001, 0x0203]));
        assert_eq!(
            reader.read_registers(0x0014, 2, FC).unwrap(),
            vec![0x0001, 0x0203]
        );
    }

    #[test]
    fn long_high_word_first() {
        let mut reader = reader(ScriptedTransport::new().ok(&[0x0001, 0x86A0]));
        assert_eq!(
            reader.read_long(5044, 3, FC, false).unwrap().to_string(),
            "100.000"
        );
    }

    #[test]
    fn identity_string() {
        let words = [0x4D50, 0x5430, 0x2020, 0x2020];
        assert_eq!(registers_to_string(&words), "MPT0");

        let mut reader = reader(ScriptedTransport::new().ok(&[
            0x2020, 0x524E, 0x472D, 0x4354, 0x524C, 0x2D52, 0x5652, 0x3430,
        ]));
        assert_eq!(
            reader.read_string(0x000C, 8, FC).unwrap(),
            "RNG-CTRL-RVR40"
        );
    }

    #[test]
    fn identity_string_nul_padding() {
        assert_eq!(registers_to_string(&[0x4142, 0x4300, 0x0000]), "ABC");
    }
}
