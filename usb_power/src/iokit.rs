//! IOKit implementation of the host-service contract.

use std::{ffi::c_void, mem::ManuallyDrop, ptr};

use core_foundation::{base::TCFType, number::CFNumber, string::CFString};
use core_foundation_sys::{
    base::{kCFAllocatorDefault, CFRelease},
    dictionary::{CFDictionaryRef, CFDictionarySetValue, CFMutableDictionaryRef},
    number::{kCFNumberSInt32Type, CFNumberCreate},
    uuid::CFUUIDGetUUIDBytes,
};
use tracing::{debug, trace, warn};

use crate::{
    error::{ConstructionStep, Error, HostOp, InterfaceKind},
    host::{ControlPlugin, DeviceControl, HostService, UsbDevice},
    ids::IdPair,
};

mod ffi;

use ffi::*;

/// Owns the IOKit master port for the lifetime of a run.
pub struct IoKitHost {
    master_port: mach_port_t,
}

impl IoKitHost {
    pub fn open() -> Result<Self, Error> {
        let mut master_port = MACH_PORT_NULL;
        let status = unsafe { IOMasterPort(MACH_PORT_NULL, &mut master_port) };
        Error::check(HostOp::OpenMasterPort, status)?;
        Ok(Self { master_port })
    }
}

impl Drop for IoKitHost {
    fn drop(&mut self) {
        let status = unsafe { mach_port_deallocate(mach_task_self_, self.master_port) };
        if status != 0 {
            warn!("mach_port_deallocate failed [err {status:08x}]");
        }
    }
}

/// `IOServiceMatching` dictionary narrowed to one vendor/product pair.
pub struct MatchingDict(CFMutableDictionaryRef);

impl MatchingDict {
    pub fn for_ids(ids: IdPair) -> Result<Self, Error> {
        let dict = unsafe { IOServiceMatching(kIOUSBDeviceClassName.as_ptr()) };
        if dict.is_null() {
            return Err(Error::Construction(ConstructionStep::MatchingDictionary));
        }
        let dict = MatchingDict(dict);
        dict.set_number(kUSBProductID, ids.product_id, ConstructionStep::ProductNumber)?;
        dict.set_number(kUSBVendorID, ids.vendor_id, ConstructionStep::VendorNumber)?;
        Ok(dict)
    }

    fn set_number(
        &self,
        key: &'static str,
        value: u16,
        step: ConstructionStep,
    ) -> Result<(), Error> {
        let value = i32::from(value);
        let number = unsafe {
            CFNumberCreate(
                kCFAllocatorDefault,
                kCFNumberSInt32Type,
                &value as *const i32 as *const c_void,
            )
        };
        if number.is_null() {
            return Err(Error::Construction(step));
        }
        let number = unsafe { CFNumber::wrap_under_create_rule(number) };
        let key = CFString::from_static_string(key);
        unsafe { CFDictionarySetValue(self.0, key.as_CFTypeRef(), number.as_CFTypeRef()) };
        Ok(())
    }

    /// Hands the reference to IOKit; the dictionary must not be released here.
    fn into_raw(self) -> CFDictionaryRef {
        ManuallyDrop::new(self).0 as CFDictionaryRef
    }
}

impl Drop for MatchingDict {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as *const c_void) };
    }
}

pub struct ServiceIter(io_iterator_t);

impl Iterator for ServiceIter {
    type Item = UsbService;

    fn next(&mut self) -> Option<UsbService> {
        let service = unsafe { IOIteratorNext(self.0) };
        (service != IO_OBJECT_NULL).then_some(UsbService(service))
    }
}

impl Drop for ServiceIter {
    fn drop(&mut self) {
        unsafe { IOObjectRelease(self.0) };
    }
}

pub struct UsbService(io_service_t);

impl Drop for UsbService {
    fn drop(&mut self) {
        trace!(service = self.0, "releasing service");
        unsafe { IOObjectRelease(self.0) };
    }
}

pub struct PluginInterface(*mut *mut IOCFPlugInInterface);

impl Drop for PluginInterface {
    fn drop(&mut self) {
        unsafe { IODestroyPlugInInterface(self.0) };
    }
}

pub struct DeviceInterface(*mut *mut IOUSBDeviceInterface245);

impl DeviceInterface {
    fn this(&self) -> *mut c_void {
        self.0 as *mut c_void
    }

    fn vtable(&self) -> &IOUSBDeviceInterface245 {
        unsafe { &**self.0 }
    }
}

impl Drop for DeviceInterface {
    fn drop(&mut self) {
        let refs = unsafe { (self.vtable().Release)(self.this()) };
        trace!(refs, "released device interface");
    }
}

impl HostService for IoKitHost {
    type Criterion = MatchingDict;
    type Device = UsbService;
    type Devices = ServiceIter;

    fn match_criterion(&self, ids: IdPair) -> Result<MatchingDict, Error> {
        MatchingDict::for_ids(ids)
    }

    fn matching_devices(&self, criterion: MatchingDict) -> Result<ServiceIter, Error> {
        let mut iterator: io_iterator_t = IO_OBJECT_NULL;
        let status = unsafe {
            IOServiceGetMatchingServices(self.master_port, criterion.into_raw(), &mut iterator)
        };
        Error::check(HostOp::MatchingServices, status)?;
        Ok(ServiceIter(iterator))
    }
}

impl UsbDevice for UsbService {
    type Plugin = PluginInterface;

    fn control_plugin(&self) -> Result<PluginInterface, Error> {
        let mut plugin: *mut *mut IOCFPlugInInterface = ptr::null_mut();
        let mut score = 0i32;
        let status = unsafe {
            IOCreatePlugInInterfaceForService(
                self.0,
                kIOUSBDeviceUserClientTypeID(),
                kIOCFPlugInInterfaceID(),
                &mut plugin,
                &mut score,
            )
        };
        Error::check(HostOp::CreatePlugin, status)?;
        if plugin.is_null() {
            return Err(Error::MissingInterface(InterfaceKind::Plugin));
        }
        debug!(service = self.0, score, "created plugin interface");
        Ok(PluginInterface(plugin))
    }
}

impl ControlPlugin for PluginInterface {
    type Control = DeviceInterface;

    fn device_control(&self) -> Result<DeviceInterface, Error> {
        let mut device: *mut c_void = ptr::null_mut();
        let status = unsafe {
            ((**self.0).QueryInterface)(
                self.0 as *mut c_void,
                CFUUIDGetUUIDBytes(kIOUSBDeviceInterfaceID245()),
                &mut device,
            )
        };
        Error::check(HostOp::QueryInterface, status)?;
        if device.is_null() {
            return Err(Error::MissingInterface(InterfaceKind::Device));
        }
        Ok(DeviceInterface(device as *mut *mut IOUSBDeviceInterface245))
    }
}

impl DeviceControl for DeviceInterface {
    fn open(&mut self) -> Result<(), Error> {
        let status = unsafe { (self.vtable().USBDeviceOpen)(self.this()) };
        Error::check(HostOp::OpenDevice, status)
    }

    fn set_suspended(&mut self, suspend: bool) -> Result<(), Error> {
        let status = unsafe { (self.vtable().USBDeviceSuspend)(self.this(), u8::from(suspend)) };
        Error::check(HostOp::Suspend, status)
    }

    fn close(&mut self) -> Result<(), Error> {
        let status = unsafe { (self.vtable().USBDeviceClose)(self.this()) };
        Error::check(HostOp::CloseDevice, status)
    }
}

#[cfg(test)]
mod tests {
    use core_foundation_sys::{
        dictionary::{CFDictionaryGetCount, CFDictionaryGetValue},
        number::CFNumberRef,
    };

    use super::*;

    fn number(dict: &MatchingDict, key: &'static str) -> Option<i32> {
        let key = CFString::from_static_string(key);
        let value = unsafe { CFDictionaryGetValue(dict.0 as CFDictionaryRef, key.as_CFTypeRef()) };
        if value.is_null() {
            return None;
        }
        unsafe { CFNumber::wrap_under_get_rule(value as CFNumberRef) }.to_i32()
    }

    #[test]
    fn criterion_holds_product_and_vendor() {
        let dict = MatchingDict::for_ids(IdPair::new(0x045e, 0x0040)).unwrap();
        assert_eq!(number(&dict, kUSBProductID), Some(0x0040));
        assert_eq!(number(&dict, kUSBVendorID), Some(0x045e));
        // IOProviderClass plus the two ids
        assert_eq!(unsafe { CFDictionaryGetCount(dict.0 as CFDictionaryRef) }, 3);
    }

    #[test]
    fn criterion_keeps_full_id_range() {
        let dict = MatchingDict::for_ids(IdPair::new(0xffff, 0x8000)).unwrap();
        assert_eq!(number(&dict, kUSBProductID), Some(0x8000));
        assert_eq!(number(&dict, kUSBVendorID), Some(0xffff));
    }
}
