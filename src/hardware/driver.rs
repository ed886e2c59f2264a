//! Compute driver abstraction
//!
//! The inspector talks to the native driver only through [`ComputeDriver`], which
//! exposes the four query capabilities it needs:
//! - platform discovery
//! - device discovery (a sizing call, then a populating call)
//! - platform information (bounded text)
//! - device information (bounded text, scalars, or the work-item-size triple)
//!
//! The OpenCL implementation lives in `opencl.rs`; tests use a scripted fake.

use std::fmt;
use thiserror::Error;

/// Capacity of a platform information text query, in bytes.
pub const PLATFORM_INFO_CAPACITY: usize = 512;

/// Capacity of a device information text query, in bytes.
pub const DEVICE_INFO_CAPACITY: usize = 1024;

/// Non-success status returned by a driver query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name} ({code})")]
pub struct DriverError {
    /// Raw status code as reported by the driver
    pub code: i32,
    /// Symbolic name of the status (e.g., "CL_DEVICE_NOT_FOUND")
    pub name: String,
}

impl DriverError {
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    /// No platform is installed (ICD loader found nothing).
    pub fn platform_not_found() -> Self {
        Self::new(-1001, "CL_PLATFORM_NOT_FOUND_KHR")
    }

    /// Fewer devices than requested exist.
    pub fn device_not_found() -> Self {
        Self::new(-1, "CL_DEVICE_NOT_FOUND")
    }

    pub fn invalid_value() -> Self {
        Self::new(-30, "CL_INVALID_VALUE")
    }
}

/// Device-type filter for device discovery.
///
/// Only GPUs are inspected; CPU and accelerator devices are never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Gpu,
}

/// Platform information field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformField {
    Name,
    Version,
}

/// Semantic type of a device property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Uint,
    Ulong,
    Size,
    Sizes,
}

/// The fixed set of device properties the inspector reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    Name,
    Vendor,
    DriverVersion,
    DeviceVersion,
    MaxClockFrequency,
    GlobalMemSize,
    LocalMemSize,
    MaxConstantBufferSize,
    MaxComputeUnits,
    MaxWorkGroupSize,
    MaxWorkItemDimensions,
    MaxWorkItemSizes,
}

impl DeviceProperty {
    /// Every reported property, in report order.
    pub const ALL: [DeviceProperty; 12] = [
        DeviceProperty::Name,
        DeviceProperty::Vendor,
        DeviceProperty::DriverVersion,
        DeviceProperty::DeviceVersion,
        DeviceProperty::MaxClockFrequency,
        DeviceProperty::GlobalMemSize,
        DeviceProperty::LocalMemSize,
        DeviceProperty::MaxConstantBufferSize,
        DeviceProperty::MaxComputeUnits,
        DeviceProperty::MaxWorkGroupSize,
        DeviceProperty::MaxWorkItemDimensions,
        DeviceProperty::MaxWorkItemSizes,
    ];

    pub fn kind(self) -> ValueKind {
        match self {
            DeviceProperty::Name
            | DeviceProperty::Vendor
            | DeviceProperty::DriverVersion
            | DeviceProperty::DeviceVersion => ValueKind::Text,
            DeviceProperty::MaxClockFrequency | DeviceProperty::MaxComputeUnits => ValueKind::Uint,
            DeviceProperty::GlobalMemSize
            | DeviceProperty::LocalMemSize
            | DeviceProperty::MaxConstantBufferSize => ValueKind::Ulong,
            DeviceProperty::MaxWorkGroupSize | DeviceProperty::MaxWorkItemDimensions => {
                ValueKind::Size
            }
            DeviceProperty::MaxWorkItemSizes => ValueKind::Sizes,
        }
    }

    /// Size of the destination the driver writes this property into.
    pub fn destination_size(self) -> usize {
        match self.kind() {
            ValueKind::Text => DEVICE_INFO_CAPACITY,
            ValueKind::Uint => std::mem::size_of::<u32>(),
            ValueKind::Ulong => std::mem::size_of::<u64>(),
            ValueKind::Size => std::mem::size_of::<usize>(),
            ValueKind::Sizes => std::mem::size_of::<[usize; 3]>(),
        }
    }
}

impl fmt::Display for DeviceProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceProperty::Name => "CL_DEVICE_NAME",
            DeviceProperty::Vendor => "CL_DEVICE_VENDOR",
            DeviceProperty::DriverVersion => "CL_DRIVER_VERSION",
            DeviceProperty::DeviceVersion => "CL_DEVICE_VERSION",
            DeviceProperty::MaxClockFrequency => "CL_DEVICE_MAX_CLOCK_FREQUENCY",
            DeviceProperty::GlobalMemSize => "CL_DEVICE_GLOBAL_MEM_SIZE",
            DeviceProperty::LocalMemSize => "CL_DEVICE_LOCAL_MEM_SIZE",
            DeviceProperty::MaxConstantBufferSize => "CL_DEVICE_MAX_CONSTANT_BUFFER_SIZE",
            DeviceProperty::MaxComputeUnits => "CL_DEVICE_MAX_COMPUTE_UNITS",
            DeviceProperty::MaxWorkGroupSize => "CL_DEVICE_MAX_WORK_GROUP_SIZE",
            DeviceProperty::MaxWorkItemDimensions => "CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS",
            DeviceProperty::MaxWorkItemSizes => "CL_DEVICE_MAX_WORK_ITEM_SIZES",
        };
        f.write_str(name)
    }
}

/// A typed device property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Uint(u32),
    Ulong(u64),
    Size(usize),
    Sizes([usize; 3]),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Text(_) => ValueKind::Text,
            PropertyValue::Uint(_) => ValueKind::Uint,
            PropertyValue::Ulong(_) => ValueKind::Ulong,
            PropertyValue::Size(_) => ValueKind::Size,
            PropertyValue::Sizes(_) => ValueKind::Sizes,
        }
    }
}

/// Query capabilities of a native compute driver.
///
/// Handles are opaque and only valid while the driver that produced them is alive.
pub trait ComputeDriver {
    type Platform: Copy + fmt::Debug;
    type Device: Copy + fmt::Debug;

    /// Return at most `max_entries` platform handles.
    fn platform_ids(&self, max_entries: usize) -> Result<Vec<Self::Platform>, DriverError>;

    /// Number of devices of `kind` under `platform`.
    fn device_count(&self, platform: Self::Platform, kind: DeviceKind) -> Result<u32, DriverError>;

    /// Populate up to `count` device handles of `kind` under `platform`.
    fn device_ids(
        &self,
        platform: Self::Platform,
        kind: DeviceKind,
        count: u32,
    ) -> Result<Vec<Self::Device>, DriverError>;

    /// Read a platform text field, bounded to `capacity` bytes.
    fn platform_info(
        &self,
        platform: Self::Platform,
        field: PlatformField,
        capacity: usize,
    ) -> Result<String, DriverError>;

    /// Read a device property into a destination of `capacity` bytes.
    fn device_info(
        &self,
        device: Self::Device,
        property: DeviceProperty,
        capacity: usize,
    ) -> Result<PropertyValue, DriverError>;
}

/// Truncate driver text to fit a NUL-terminated buffer of `capacity` bytes.
pub fn bound_text(mut text: String, capacity: usize) -> String {
    if let Some(nul) = text.find('\0') {
        text.truncate(nul);
    }

    let limit = capacity.saturating_sub(1);
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }

    text
}

/// Driver used when the binary is built without a real backend.
///
/// Platform discovery always fails, so inspection stops at the first decision point.
#[cfg_attr(feature = "opencl", allow(dead_code))]
#[derive(Debug, Default)]
pub struct UnavailableDriver;

impl ComputeDriver for UnavailableDriver {
    type Platform = ();
    type Device = ();

    fn platform_ids(&self, _max_entries: usize) -> Result<Vec<()>, DriverError> {
        Err(DriverError::platform_not_found())
    }

    fn device_count(&self, _platform: (), _kind: DeviceKind) -> Result<u32, DriverError> {
        Err(DriverError::invalid_value())
    }

    fn device_ids(
        &self,
        _platform: (),
        _kind: DeviceKind,
        _count: u32,
    ) -> Result<Vec<()>, DriverError> {
        Err(DriverError::invalid_value())
    }

    fn platform_info(
        &self,
        _platform: (),
        _field: PlatformField,
        _capacity: usize,
    ) -> Result<String, DriverError> {
        Err(DriverError::invalid_value())
    }

    fn device_info(
        &self,
        _device: (),
        _property: DeviceProperty,
        _capacity: usize,
    ) -> Result<PropertyValue, DriverError> {
        Err(DriverError::invalid_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_text_keeps_short_values() {
        assert_eq!(bound_text("Vendor X OpenCL".to_string(), 512), "Vendor X OpenCL");
    }

    #[test]
    fn test_bound_text_reserves_terminator() {
        let long = "a".repeat(2000);
        let bounded = bound_text(long, DEVICE_INFO_CAPACITY);
        assert_eq!(bounded.len(), DEVICE_INFO_CAPACITY - 1);
    }

    #[test]
    fn test_bound_text_stops_at_embedded_nul() {
        assert_eq!(bound_text("gfx1030\0garbage".to_string(), 64), "gfx1030");
    }

    #[test]
    fn test_bound_text_respects_char_boundaries() {
        // "é" is two bytes; a 4-byte buffer leaves room for 3 bytes of text
        let bounded = bound_text("éé".to_string(), 4);
        assert_eq!(bounded, "é");
    }

    #[test]
    fn test_property_order_and_kinds() {
        assert_eq!(DeviceProperty::ALL[0], DeviceProperty::Name);
        assert_eq!(DeviceProperty::ALL[11], DeviceProperty::MaxWorkItemSizes);
        assert_eq!(DeviceProperty::GlobalMemSize.kind(), ValueKind::Ulong);
        assert_eq!(DeviceProperty::MaxWorkGroupSize.kind(), ValueKind::Size);
        assert_eq!(DeviceProperty::Name.destination_size(), 1024);
        assert_eq!(DeviceProperty::MaxComputeUnits.destination_size(), 4);
        assert_eq!(
            DeviceProperty::MaxWorkItemSizes.destination_size(),
            3 * std::mem::size_of::<usize>()
        );
    }

    #[test]
    fn test_driver_error_display() {
        assert_eq!(
            DriverError::new(-1, "CL_DEVICE_NOT_FOUND").to_string(),
            "CL_DEVICE_NOT_FOUND (-1)"
        );
    }

    #[test]
    fn test_unavailable_driver_has_no_platforms() {
        let err = UnavailableDriver.platform_ids(1).unwrap_err();
        assert_eq!(err, DriverError::platform_not_found());
    }
}
