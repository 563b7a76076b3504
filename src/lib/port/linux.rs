use super::Rs485;

use anyhow::Result;
use glob::glob;
use serialport::TTYPort as NativePort;
use std::fs;
use std::os::unix::io::AsRawFd;

/// Whether any process (this one included) holds `port_name` open.
pub fn is_port_open(port_name: &str) -> bool {
    let fds = match glob("/proc/[0-9]*/fd/*") {
        Ok(paths) => paths,
        Err(_) => return false,
    };

    fds.filter_map(|p| p.ok())
        .filter_map(|path| fs::read_link(path).ok())
        .any(|link| link.to_str() == Some(port_name))
}

impl Rs485 for NativePort {
    fn rs485_is_enabled(&self) -> Result<bool> {
        let mut conf = ioctl::SerialRs485::default();
        unsafe { ioctl::get_rs485(self.as_raw_fd(), &mut conf) }?;
        Ok(conf.flags & ioctl::SER_RS485_ENABLED != 0)
    }

    // RTS drives the transceiver's driver-enable pin while a request is sent.
    fn rs485_enable(&self, enable: bool) -> Result<()> {
        let conf = ioctl::SerialRs485::with_flags(if enable {
            ioctl::SER_RS485_ENABLED | ioctl::SER_RS485_RTS_ON_SEND
        } else {
            0
        });
        unsafe { ioctl::set_rs485(self.as_raw_fd(), &conf) }?;
        Ok(())
    }
}

/// `struct serial_rs485` from linux/serial.h.
mod ioctl {
    use nix::{ioctl_read_bad, ioctl_write_ptr_bad};

    pub const SER_RS485_ENABLED: u32 = 1 << 0;
    pub const SER_RS485_RTS_ON_SEND: u32 = 1 << 1;

    #[derive(Debug, Default)]
    #[repr(C)]
    pub struct SerialRs485 {
        pub flags: u32,
        delay_rts_before_send: u32,
        delay_rts_after_send: u32,
        padding: [u32; 5],
    }

    impl SerialRs485 {
        pub fn with_flags(flags: u32) -> Self {
            Self {
                flags,
                ..Default::default()
            }
        }
    }

    ioctl_read_bad!(get_rs485, 0x542E, SerialRs485);
    ioctl_write_ptr_bad!(set_rs485, 0x542F, SerialRs485);
}
