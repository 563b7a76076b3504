#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
use linux::is_port_open;
#[cfg(target_os = "macos")]
use macos::is_port_open;
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_port_open(_port_name: &str) -> bool {
    false
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
use anyhow::Context;
use anyhow::Result;
use core::time::Duration;
use log::debug;
use serialport::SerialPortType;
use thiserror::Error;
use tokio_serial::{DataBits, Parity, SerialPortBuilder, StopBits};

#[derive(Error, Debug)]
pub enum OpenPortError {
    #[error("no usb serial adapter found")]
    NoCompatiblePort,
    #[error("{port_name:?} busy")]
    PortBusy { port_name: String },
    #[error("rs485 configuration failed on {port_name:?}")]
    Rs485Error { port_name: String },
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
trait Rs485 {
    fn rs485_is_enabled(&self) -> Result<bool>;
    fn rs485_enable(&self, enable: bool) -> Result<()>;

    fn rs485_is_supported(&self) -> bool {
        match self.rs485_is_enabled() {
            Ok(enabled) => self.rs485_enable(enabled).is_ok(),
            Err(_) => false,
        }
    }
}

/// Line settings of a Renogy RS-485/RS-232 port. The devices only speak
/// 9600 8N1; the timeout applies to every transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSettings {
    pub baudrate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_secs(1),
        }
    }
}

#[derive(PartialEq)]
struct UsbId(u16, u16);

static COMPATIBLE_IDS: &[UsbId] = &[
    UsbId(0x1a86, 0x7523), // QinHeng Electronics HL-340 USB-Serial adapter
    UsbId(0x0403, 0x6001), // FTDI FT232 USB-UART
    UsbId(0x0403, 0x6014), // FTDI FT232H Single HS USB-UART/FIFO IC
    UsbId(0x10c4, 0xea60), // Silicon Labs CP210x UART Bridge
    UsbId(0x067b, 0x2303), // Prolific PL2303 Serial Port
];

/// Resolve `port_name` and prepare the line for a Modbus RTU session.
///
/// The port itself is opened by the RTU client; only the RS-485 mode of
/// on-board `ttyS*` UARTs is switched here, through a short native open.
pub fn port_builder(
    port_name: &str,
    settings: &PortSettings,
    force: bool,
) -> Result<SerialPortBuilder> {
    let true_name: String = if port_name == "auto" {
        guess_port()?
    } else {
        port_name.to_string()
    };

    if !force && is_port_open(&true_name) {
        return Err(OpenPortError::PortBusy {
            port_name: true_name,
        }
        .into());
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    if true_name.contains("ttyS") {
        let port = serialport::new(&true_name, settings.baudrate)
            .open_native()
            .with_context(|| format!("Can't open port '{}'", true_name))?;

        if port.rs485_is_supported() && port.rs485_enable(true).is_err() && !force {
            return Err(OpenPortError::Rs485Error {
                port_name: true_name,
            }
            .into());
        }
    }

    debug!("port_builder: {} @ {} baud", &true_name, settings.baudrate);
    Ok(tokio_serial::new(&true_name, settings.baudrate)
        .data_bits(settings.data_bits)
        .parity(settings.parity)
        .stop_bits(settings.stop_bits)
        .timeout(settings.timeout))
}

fn guess_port() -> Result<String> {
    serialport::available_ports()?
        .into_iter()
        .filter(|info| match &info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                COMPATIBLE_IDS.contains(&UsbId(usb_info.vid, usb_info.pid))
            }
            SerialPortType::Unknown
            | SerialPortType::PciPort
            | SerialPortType::BluetoothPort => false,
        })
        .map(|info| info.port_name)
        .find(|name| !is_port_open(name))
        .ok_or_else(|| OpenPortError::NoCompatiblePort.into())
}
