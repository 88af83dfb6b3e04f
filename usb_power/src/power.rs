//! Match, open and suspend/resume every attached device with a given id pair.

use tracing::{debug, info, instrument, warn};

use crate::{
    error::Error,
    host::{ControlPlugin, DeviceControl, HostService, UsbDevice},
    ids::{IdPair, PowerAction},
};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

/// An exclusively opened device-control channel.
///
/// Opened once by [`ControlSession::open`], closed once either by
/// [`ControlSession::close`] or, on an error path, when dropped.
pub struct ControlSession<'a, C: DeviceControl> {
    control: &'a mut C,
    open: bool,
}

impl<'a, C: DeviceControl> ControlSession<'a, C> {
    pub fn open(control: &'a mut C) -> Result<Self, Error> {
        control.open()?;
        Ok(Self {
            control,
            open: true,
        })
    }

    pub fn set_suspended(&mut self, suspend: bool) -> Result<(), Error> {
        self.control.set_suspended(suspend)
    }

    pub fn close(mut self) -> Result<(), Error> {
        self.open = false;
        self.control.close()
    }
}

impl<C: DeviceControl> Drop for ControlSession<'_, C> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.control.close() {
                warn!("closing device after failure: {e}");
            }
        }
    }
}

/// Applies `action` to every attached device matching `ids`.
///
/// Stops at the first failing device. Resources taken for that device are
/// released before the error is returned, and devices after it are never
/// pulled from the enumeration. Returns [`Error::NotFound`] when nothing
/// matched.
#[instrument(skip_all, fields(%ids, %action))]
pub fn apply<H: HostService>(
    host: &H,
    ids: IdPair,
    action: PowerAction,
) -> Result<TransitionOutcome, Error> {
    let criterion = host.match_criterion(ids)?;
    let devices = host.matching_devices(criterion)?;

    let mut outcome = TransitionOutcome::default();
    for device in devices {
        outcome.attempted += 1;
        debug!(index = outcome.attempted, "matched device");
        transition(&device, action)?;
        outcome.succeeded += 1;
        info!(index = outcome.attempted, "{action} complete");
    }

    if outcome.succeeded == 0 {
        return Err(Error::NotFound(ids));
    }
    Ok(outcome)
}

fn transition<D: UsbDevice>(device: &D, action: PowerAction) -> Result<(), Error> {
    let mut control = {
        let plugin = device.control_plugin()?;
        plugin.device_control()?
    };
    let mut session = ControlSession::open(&mut control)?;
    session.set_suspended(action.is_suspend())?;
    session.close()
}
