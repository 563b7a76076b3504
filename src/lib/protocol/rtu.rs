use super::{FunctionCode, ProtocolError, Transport, MAX_READ_COUNT, SLAVE_ADDRESSES};
use log::debug;
use std::io;
use std::time::Duration;
use tokio_modbus::client::sync::{rtu, Context};
use tokio_modbus::prelude::{SlaveContext, SyncReader};
use tokio_modbus::Slave;
use tokio_serial::SerialPortBuilder;

/// Modbus RTU master on a serial line, driven by the blocking tokio-modbus
/// client. The slave address is switched per transaction.
pub struct RtuMaster {
    ctx: Context,
}

impl RtuMaster {
    /// Open the port described by `builder`. `timeout` bounds every
    /// request/response round trip.
    pub fn connect(builder: &SerialPortBuilder, timeout: Duration) -> io::Result<Self> {
        let mut ctx = rtu::connect_slave(builder, Slave(*SLAVE_ADDRESSES.start()))?;
        ctx.set_timeout(Some(timeout));
        Ok(Self { ctx })
    }
}

impl Transport for RtuMaster {
    fn transact(
        &mut self,
        slave: u8,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        if !SLAVE_ADDRESSES.contains(&slave) {
            return Err(ProtocolError::InvalidSlave(slave));
        }

        if count == 0 || count > MAX_READ_COUNT {
            return Err(ProtocolError::InvalidCount(count));
        }

        debug!("read {} fc{} {:#06x} {}", slave, function, address, count);
        self.ctx.set_slave(Slave(slave));
        let response = match function {
            FunctionCode::ReadHoldingRegisters => self.ctx.read_holding_registers(address, count),
            FunctionCode::ReadInputRegisters => self.ctx.read_input_registers(address, count),
        };
        map_response(response)
    }
}

fn map_response(response: tokio_modbus::Result<Vec<u16>>) -> Result<Vec<u16>, ProtocolError> {
    match response {
        Ok(Ok(words)) => {
            debug!("recv {:04x?}", words);
            Ok(words)
        }
        Ok(Err(exception)) => Err(ProtocolError::Exception {
            code: exception.into(),
        }),
        Err(tokio_modbus::Error::Transport(e)) => Err(ProtocolError::Io(e)),
        Err(e) => Err(ProtocolError::UnexpectedResponse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_modbus::ExceptionCode;

    #[test]
    fn words_pass_through() {
        assert_eq!(
            map_response(Ok(Ok(vec![1250, 0x2C05]))).unwrap(),
            vec![1250, 0x2C05]
        );
    }

    #[test]
    fn exception_keeps_its_code() {
        let err = map_response(Ok(Err(ExceptionCode::IllegalDataAddress))).unwrap_err();
        assert!(matches!(err, ProtocolError::Exception { code: 0x02 }));
        assert!(!err.is_transient());

        let err = map_response(Ok(Err(ExceptionCode::ServerDeviceBusy))).unwrap_err();
        assert!(matches!(err, ProtocolError::Exception { code: 0x06 }));
    }

    #[test]
    fn link_errors_stay_io() {
        let err = map_response(Err(tokio_modbus::Error::Transport(
            io::ErrorKind::TimedOut.into(),
        )))
        .unwrap_err();
        match err {
            ProtocolError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected {:?}", other),
        }
    }
}
