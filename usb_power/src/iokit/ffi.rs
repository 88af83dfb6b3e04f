//! Hand-declared IOKit and Mach entry points.
//!
//! The COM-style vtables only spell out the slots that are called; the rest
//! are opaque pointers kept for layout.

#![allow(dead_code, non_camel_case_types, non_snake_case, non_upper_case_globals)]

use std::ffi::{c_char, c_void};

use core_foundation_sys::{
    base::CFAllocatorRef,
    dictionary::{CFDictionaryRef, CFMutableDictionaryRef},
    uuid::{CFUUIDBytes, CFUUIDGetConstantUUIDWithBytes, CFUUIDRef},
};

pub type kern_return_t = i32;
pub type IOReturn = kern_return_t;
pub type HRESULT = i32;
pub type mach_port_t = u32;
pub type io_object_t = mach_port_t;
pub type io_iterator_t = io_object_t;
pub type io_service_t = io_object_t;

pub const MACH_PORT_NULL: mach_port_t = 0;
pub const IO_OBJECT_NULL: io_object_t = 0;

pub const kIOUSBDeviceClassName: &std::ffi::CStr = c"IOUSBDevice";
pub const kUSBProductID: &str = "idProduct";
pub const kUSBVendorID: &str = "idVendor";

/// `IUNKNOWN_C_GUTS` followed by the plugin-specific slots.
#[repr(C)]
pub struct IOCFPlugInInterface {
    _reserved: *mut c_void,
    pub QueryInterface:
        unsafe extern "C" fn(this: *mut c_void, iid: CFUUIDBytes, ppv: *mut *mut c_void) -> HRESULT,
    pub AddRef: unsafe extern "C" fn(this: *mut c_void) -> u32,
    pub Release: unsafe extern "C" fn(this: *mut c_void) -> u32,
    pub version: u16,
    pub revision: u16,
    // plugin lifecycle slots, never called from here
    _lifecycle: [*const c_void; 3],
}

/// Prefix of `IOUSBDeviceStruct245`, up to and including `USBDeviceSuspend`.
#[repr(C)]
pub struct IOUSBDeviceInterface245 {
    _reserved: *mut c_void,
    pub QueryInterface:
        unsafe extern "C" fn(this: *mut c_void, iid: CFUUIDBytes, ppv: *mut *mut c_void) -> HRESULT,
    pub AddRef: unsafe extern "C" fn(this: *mut c_void) -> u32,
    pub Release: unsafe extern "C" fn(this: *mut c_void) -> u32,
    // CreateDeviceAsyncEventSource .. GetDeviceAsyncPort
    _async: [*const c_void; 4],
    pub USBDeviceOpen: unsafe extern "C" fn(this: *mut c_void) -> IOReturn,
    pub USBDeviceClose: unsafe extern "C" fn(this: *mut c_void) -> IOReturn,
    // GetDeviceClass .. CreateInterfaceIterator
    _funcs_100: [*const c_void; 19],
    // USBDeviceOpenSeize, DeviceRequestTO, DeviceRequestAsyncTO
    _funcs_182: [*const c_void; 3],
    pub USBDeviceSuspend: unsafe extern "C" fn(this: *mut c_void, suspend: u8) -> IOReturn,
}

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub fn IOMasterPort(
        bootstrap_port: mach_port_t,
        master_port: *mut mach_port_t,
    ) -> kern_return_t;
    pub fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
    /// Consumes one reference to `matching`, whatever the outcome.
    pub fn IOServiceGetMatchingServices(
        master_port: mach_port_t,
        matching: CFDictionaryRef,
        existing: *mut io_iterator_t,
    ) -> kern_return_t;
    pub fn IOIteratorNext(iterator: io_iterator_t) -> io_object_t;
    pub fn IOObjectRelease(object: io_object_t) -> kern_return_t;
    pub fn IOCreatePlugInInterfaceForService(
        service: io_service_t,
        plugin_type: CFUUIDRef,
        interface_type: CFUUIDRef,
        the_interface: *mut *mut *mut IOCFPlugInInterface,
        the_score: *mut i32,
    ) -> kern_return_t;
    pub fn IODestroyPlugInInterface(interface: *mut *mut IOCFPlugInInterface) -> kern_return_t;
}

extern "C" {
    pub static mach_task_self_: mach_port_t;
    pub fn mach_port_deallocate(task: mach_port_t, name: mach_port_t) -> kern_return_t;
}

fn constant_uuid(b: [u8; 16]) -> CFUUIDRef {
    let alloc: CFAllocatorRef = std::ptr::null();
    unsafe {
        CFUUIDGetConstantUUIDWithBytes(
            alloc, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11],
            b[12], b[13], b[14], b[15],
        )
    }
}

pub fn kIOUSBDeviceUserClientTypeID() -> CFUUIDRef {
    constant_uuid([
        0x9d, 0xc7, 0xb7, 0x80, 0x9e, 0xc0, 0x11, 0xd4, 0xa5, 0x4f, 0x00, 0x0a, 0x27, 0x05, 0x28,
        0x61,
    ])
}

pub fn kIOCFPlugInInterfaceID() -> CFUUIDRef {
    constant_uuid([
        0xc2, 0x44, 0xe8, 0x58, 0x10, 0x9c, 0x11, 0xd4, 0x91, 0xd4, 0x00, 0x50, 0xe4, 0xc6, 0x42,
        0x6f,
    ])
}

pub fn kIOUSBDeviceInterfaceID245() -> CFUUIDRef {
    constant_uuid([
        0xfe, 0x2f, 0xd5, 0x2f, 0x3b, 0x5a, 0x47, 0x3b, 0x97, 0x7b, 0xad, 0x99, 0x00, 0x1e, 0xb3,
        0xed,
    ])
}
