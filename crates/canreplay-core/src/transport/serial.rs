//! Serial port handling
//!
//! Low-level serial access for the SLCAN adapter.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::time::Duration;

use super::TransportError;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid), usb.product),
            _ => (None, None, None),
        };
        Self {
            name: info.port_name,
            vid,
            pid,
            product,
        }
    }
}

/// Sort key so ttyACM* ports come first, then ttyUSB*, then the rest,
/// each group ordered numerically by suffix. SLCAN dongles almost
/// always enumerate as ACM devices.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let base = name.rsplit('/').next().unwrap_or(name);
    for (rank, prefix) in [(0u8, "ttyACM"), (1, "ttyUSB")] {
        if let Some(rest) = base.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, base.to_string());
        }
    }
    (2, 0, base.to_string())
}

/// List available serial ports in deterministic order.
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Open a serial port with a bounded write/read timeout.
pub fn open_port(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, TransportError> {
    serialport::new(name, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| TransportError::Open {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

/// Configure a port for SLCAN traffic: 8N1, no flow control.
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), TransportError> {
    let name = port_name_or_unknown(port);
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| open_err(&name, e))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| open_err(&name, e))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| open_err(&name, e))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| open_err(&name, e))?;
    Ok(())
}

/// Clear both serial buffers (stale adapter chatter from before open).
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), TransportError> {
    let name = port_name_or_unknown(port);
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| open_err(&name, e))
}

fn open_err(name: &str, e: serialport::Error) -> TransportError {
    TransportError::Open {
        port: name.to_string(),
        reason: e.to_string(),
    }
}

fn port_name_or_unknown(port: &dyn SerialPort) -> String {
    port.name().unwrap_or_else(|| "<unknown>".to_string())
}
