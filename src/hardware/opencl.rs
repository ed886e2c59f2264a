//! OpenCL driver backend
//!
//! Implements [`ComputeDriver`] on top of the `opencl3` bindings. Requires the
//! system OpenCL ICD loader at link time (`--features opencl`).

use opencl3::device::{Device, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::ClError;
use opencl3::platform::{get_platforms, Platform};
use opencl3::types::cl_device_type;
use tracing::{debug, trace};

use super::driver::{
    bound_text, ComputeDriver, DeviceKind, DeviceProperty, DriverError, PlatformField,
    PropertyValue,
};

impl From<ClError> for DriverError {
    fn from(err: ClError) -> Self {
        DriverError::new(err.0, err.to_string())
    }
}

fn device_type(kind: DeviceKind) -> cl_device_type {
    match kind {
        DeviceKind::Gpu => CL_DEVICE_TYPE_GPU,
    }
}

/// Driver backed by the installed OpenCL platforms
#[derive(Debug, Default)]
pub struct OpenClDriver;

impl OpenClDriver {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeDriver for OpenClDriver {
    type Platform = Platform;
    type Device = Device;

    fn platform_ids(&self, max_entries: usize) -> Result<Vec<Platform>, DriverError> {
        let mut platforms = get_platforms()?;
        debug!("OpenCL reported {} platform(s)", platforms.len());
        platforms.truncate(max_entries);
        Ok(platforms)
    }

    fn device_count(&self, platform: Platform, kind: DeviceKind) -> Result<u32, DriverError> {
        // The ICD reports CL_DEVICE_NOT_FOUND as an empty list, not an error
        let ids = platform.get_devices(device_type(kind))?;
        Ok(u32::try_from(ids.len()).unwrap_or(u32::MAX))
    }

    fn device_ids(
        &self,
        platform: Platform,
        kind: DeviceKind,
        count: u32,
    ) -> Result<Vec<Device>, DriverError> {
        let mut ids = platform.get_devices(device_type(kind))?;
        ids.truncate(count as usize);
        Ok(ids.into_iter().map(Device::new).collect())
    }

    fn platform_info(
        &self,
        platform: Platform,
        field: PlatformField,
        capacity: usize,
    ) -> Result<String, DriverError> {
        let text = match field {
            PlatformField::Name => platform.name()?,
            PlatformField::Version => platform.version()?,
        };
        Ok(bound_text(text, capacity))
    }

    fn device_info(
        &self,
        device: Device,
        property: DeviceProperty,
        capacity: usize,
    ) -> Result<PropertyValue, DriverError> {
        trace!("clGetDeviceInfo({}, {} bytes)", property, capacity);

        let value = match property {
            DeviceProperty::Name => PropertyValue::Text(bound_text(device.name()?, capacity)),
            DeviceProperty::Vendor => PropertyValue::Text(bound_text(device.vendor()?, capacity)),
            DeviceProperty::DriverVersion => {
                PropertyValue::Text(bound_text(device.driver_version()?, capacity))
            }
            DeviceProperty::DeviceVersion => {
                PropertyValue::Text(bound_text(device.version()?, capacity))
            }
            DeviceProperty::MaxClockFrequency => PropertyValue::Uint(device.max_clock_frequency()?),
            DeviceProperty::GlobalMemSize => PropertyValue::Ulong(device.global_mem_size()?),
            DeviceProperty::LocalMemSize => PropertyValue::Ulong(device.local_mem_size()?),
            DeviceProperty::MaxConstantBufferSize => {
                PropertyValue::Ulong(device.max_constant_buffer_size()?)
            }
            DeviceProperty::MaxComputeUnits => PropertyValue::Uint(device.max_compute_units()?),
            DeviceProperty::MaxWorkGroupSize => PropertyValue::Size(device.max_work_group_size()?),
            DeviceProperty::MaxWorkItemDimensions => {
                PropertyValue::Size(device.max_work_item_dimensions()? as usize)
            }
            DeviceProperty::MaxWorkItemSizes => {
                PropertyValue::Sizes(work_item_triple(&device.max_work_item_sizes()?))
            }
        };

        Ok(value)
    }
}

/// First three per-dimension limits, zero-filled when the device reports fewer.
fn work_item_triple(sizes: &[usize]) -> [usize; 3] {
    let mut triple = [0usize; 3];
    for (slot, size) in triple.iter_mut().zip(sizes) {
        *slot = *size;
    }
    triple
}
