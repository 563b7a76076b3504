//! Register access for Renogy charge controllers and smart batteries
//! attached to a Modbus RTU serial bus.

pub mod device;
pub mod port;
pub mod protocol;
pub mod reader;
pub mod reading;
pub mod regs;

pub use device::{ChargeController, DeviceKind, SmartBattery};
pub use reader::{CommunicationError, RegisterReader, RetryPolicy};
pub use reading::{Decimal, Reading};
