use std::fmt::Display;

use thiserror::Error;

use crate::ids::IdPair;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to create {0}")]
    Construction(ConstructionStep),
    #[error("{op} [err {status:08x}]")]
    Host { op: HostOp, status: i32 },
    #[error("Service did not return {0} interface")]
    MissingInterface(InterfaceKind),
    #[error(
        "Device with product ID 0x{:04x} and vendor ID 0x{:04x} not found",
        .0.product_id,
        .0.vendor_id
    )]
    NotFound(IdPair),
    #[error("USB power control is not available on {0}")]
    UnsupportedPlatform(&'static str),
}

impl Error {
    /// Maps a host status code to `Ok` when it is zero.
    pub fn check(op: HostOp, status: i32) -> Result<(), Error> {
        if status == 0 {
            Ok(())
        } else {
            Err(Error::Host { op, status })
        }
    }
}

/// Host-service call that returned a non-zero status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOp {
    OpenMasterPort,
    MatchingServices,
    CreatePlugin,
    QueryInterface,
    OpenDevice,
    Suspend,
    CloseDevice,
}

impl Display for HostOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HostOp::OpenMasterPort => "Failed to open master port",
            HostOp::MatchingServices => "Failed to get matching services",
            HostOp::CreatePlugin => "Failed to create plugin interface for service",
            HostOp::QueryInterface => "Failed to query device interface",
            HostOp::OpenDevice => "Error opening device",
            HostOp::Suspend => "Error suspending or resuming device",
            HostOp::CloseDevice => "Error closing device",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructionStep {
    MatchingDictionary,
    ProductNumber,
    VendorNumber,
}

impl Display for ConstructionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConstructionStep::MatchingDictionary => "matching dictionary",
            ConstructionStep::ProductNumber => "number reference for product ID",
            ConstructionStep::VendorNumber => "number reference for vendor ID",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceKind {
    Plugin,
    Device,
}

impl Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InterfaceKind::Plugin => "plugin",
            InterfaceKind::Device => "device",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_message_carries_status() {
        let err = Error::check(HostOp::OpenDevice, 0xe00002c5_u32 as i32).unwrap_err();
        assert_eq!(err.to_string(), "Error opening device [err e00002c5]");
        assert!(Error::check(HostOp::OpenDevice, 0).is_ok());
    }

    #[test]
    fn not_found_lists_product_then_vendor() {
        let err = Error::NotFound(IdPair::new(0x045e, 0x0040));
        assert_eq!(
            err.to_string(),
            "Device with product ID 0x0040 and vendor ID 0x045e not found"
        );
    }

    #[test]
    fn construction_and_interface_messages() {
        assert_eq!(
            Error::Construction(ConstructionStep::MatchingDictionary).to_string(),
            "Failed to create matching dictionary"
        );
        assert_eq!(
            Error::MissingInterface(InterfaceKind::Plugin).to_string(),
            "Service did not return plugin interface"
        );
    }
}
