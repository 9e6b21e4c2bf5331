//! Small shared helpers

pub mod comparison;
pub mod ports;

pub use ports::{common_ports, format_duration, parse_port_spec, service_name, COMMON_PORTS};
