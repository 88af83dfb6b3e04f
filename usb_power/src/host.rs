//! Contract consumed from the host's device-management service.
//!
//! Every object handed out by the host is an owned value that releases the
//! underlying host resource when dropped.

use crate::{error::Error, ids::IdPair};

pub trait HostService {
    /// Opaque filter understood by the host. Submitting it gives it away.
    type Criterion;
    type Device: UsbDevice;
    /// Lazily yields the devices attached at enumeration time.
    type Devices: Iterator<Item = Self::Device>;

    /// Builds a criterion matching vendor id AND product id exactly.
    fn match_criterion(&self, ids: IdPair) -> Result<Self::Criterion, Error>;

    fn matching_devices(&self, criterion: Self::Criterion) -> Result<Self::Devices, Error>;
}

pub trait UsbDevice {
    type Plugin: ControlPlugin;

    fn control_plugin(&self) -> Result<Self::Plugin, Error>;
}

pub trait ControlPlugin {
    type Control: DeviceControl;

    /// Queries the plugin for the versioned device-control interface.
    fn device_control(&self) -> Result<Self::Control, Error>;
}

/// Raw device-control calls. Callers go through
/// [`ControlSession`](crate::power::ControlSession), which keeps open/close
/// paired and only allows the directive while open.
pub trait DeviceControl {
    fn open(&mut self) -> Result<(), Error>;
    fn set_suspended(&mut self, suspend: bool) -> Result<(), Error>;
    fn close(&mut self) -> Result<(), Error>;
}
