//! Device inspector
//!
//! Walks the driver in a fixed, linear order:
//! 1. acquire the first platform
//! 2. read its name and version
//! 3. count GPU devices (fatal on failure or zero)
//! 4. populate the device handles
//! 5. query every [`DeviceProperty`] of every device and hand the result to a sink
//!
//! Per-field query failures never abort the run; the field is reported as missing.

use serde::Serialize;
use std::io;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::driver::{
    ComputeDriver, DeviceKind, DeviceProperty, DriverError, PlatformField, PropertyValue,
    PLATFORM_INFO_CAPACITY,
};
use super::report::ReportSink;

/// Fatal inspection errors
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("clGetPlatformIDs() failed: {0}")]
    NoPlatformAvailable(DriverError),

    #[error("clGetDeviceIDs() failed: {0}")]
    DeviceQueryFailed(DriverError),

    #[error("There is No OpenCL supported device on this system.")]
    NoDevicesFound,

    #[error("Failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Identification of the inspected platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformSummary {
    /// Platform name (the vendor implementation, e.g., "NVIDIA CUDA")
    pub name: Option<String>,
    /// Platform version string
    pub version: Option<String>,
}

/// Everything reported for one GPU device
///
/// A `None` field means the driver query for it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    /// Position in the driver's device list
    pub index: usize,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub driver_version: Option<String>,
    /// OpenCL version supported by the device
    pub device_version: Option<String>,
    /// Maximum clock frequency in MHz
    pub max_clock_mhz: Option<u32>,
    pub global_mem_bytes: Option<u64>,
    pub local_mem_bytes: Option<u64>,
    pub constant_buffer_bytes: Option<u64>,
    pub compute_units: Option<u32>,
    pub max_work_group_size: Option<usize>,
    pub max_work_item_dimensions: Option<usize>,
    pub max_work_item_sizes: Option<[usize; 3]>,
}

impl DeviceReport {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Store `value` in the field for `property`.
    ///
    /// Returns `false` (and stores nothing) when the value has the wrong type.
    pub fn record(&mut self, property: DeviceProperty, value: PropertyValue) -> bool {
        match (property, value) {
            (DeviceProperty::Name, PropertyValue::Text(v)) => self.name = Some(v),
            (DeviceProperty::Vendor, PropertyValue::Text(v)) => self.vendor = Some(v),
            (DeviceProperty::DriverVersion, PropertyValue::Text(v)) => {
                self.driver_version = Some(v)
            }
            (DeviceProperty::DeviceVersion, PropertyValue::Text(v)) => {
                self.device_version = Some(v)
            }
            (DeviceProperty::MaxClockFrequency, PropertyValue::Uint(v)) => {
                self.max_clock_mhz = Some(v)
            }
            (DeviceProperty::GlobalMemSize, PropertyValue::Ulong(v)) => {
                self.global_mem_bytes = Some(v)
            }
            (DeviceProperty::LocalMemSize, PropertyValue::Ulong(v)) => {
                self.local_mem_bytes = Some(v)
            }
            (DeviceProperty::MaxConstantBufferSize, PropertyValue::Ulong(v)) => {
                self.constant_buffer_bytes = Some(v)
            }
            (DeviceProperty::MaxComputeUnits, PropertyValue::Uint(v)) => {
                self.compute_units = Some(v)
            }
            (DeviceProperty::MaxWorkGroupSize, PropertyValue::Size(v)) => {
                self.max_work_group_size = Some(v)
            }
            (DeviceProperty::MaxWorkItemDimensions, PropertyValue::Size(v)) => {
                self.max_work_item_dimensions = Some(v)
            }
            (DeviceProperty::MaxWorkItemSizes, PropertyValue::Sizes(v)) => {
                self.max_work_item_sizes = Some(v)
            }
            _ => return false,
        }
        true
    }
}

/// Queries one platform and its GPU devices through a [`ComputeDriver`]
pub struct Inspector<D: ComputeDriver> {
    driver: D,
}

impl<D: ComputeDriver> Inspector<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    #[cfg(test)]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Acquire the first platform the driver reports.
    pub fn discover_platform(&self) -> Result<D::Platform, InspectError> {
        let platforms = self
            .driver
            .platform_ids(1)
            .map_err(InspectError::NoPlatformAvailable)?;

        let platform = platforms
            .into_iter()
            .next()
            .ok_or_else(|| InspectError::NoPlatformAvailable(DriverError::platform_not_found()))?;

        info!("Using platform {:?}", platform);
        Ok(platform)
    }

    /// Number of GPU devices under `platform`; zero is an error.
    pub fn count_gpu_devices(&self, platform: D::Platform) -> Result<u32, InspectError> {
        let count = self
            .driver
            .device_count(platform, DeviceKind::Gpu)
            .map_err(InspectError::DeviceQueryFailed)?;

        // Also reached by CL_DEVICE_NOT_FOUND, which opencl3 reports as an empty list
        if count == 0 {
            return Err(InspectError::NoDevicesFound);
        }

        info!("Found {} GPU device(s)", count);
        Ok(count)
    }

    /// Read a platform text field; `None` when the query fails.
    pub fn fetch_platform_info(
        &self,
        platform: D::Platform,
        field: PlatformField,
    ) -> Option<String> {
        match self
            .driver
            .platform_info(platform, field, PLATFORM_INFO_CAPACITY)
        {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("Platform {:?} query failed: {}", field, err);
                None
            }
        }
    }

    /// Populate exactly `count` device handles, in driver order.
    pub fn enumerate_gpu_devices(
        &self,
        platform: D::Platform,
        count: u32,
    ) -> Result<Vec<D::Device>, InspectError> {
        let mut devices = self
            .driver
            .device_ids(platform, DeviceKind::Gpu, count)
            .map_err(InspectError::DeviceQueryFailed)?;

        let expected = count as usize;
        if devices.len() < expected {
            // The count was already reported; a shorter list cannot fill it
            warn!(
                "Driver returned {} device handle(s), expected {}",
                devices.len(),
                count
            );
            return Err(InspectError::DeviceQueryFailed(
                DriverError::device_not_found(),
            ));
        }
        if devices.len() > expected {
            warn!(
                "Driver returned {} device handle(s), expected {}",
                devices.len(),
                count
            );
            devices.truncate(expected);
        }

        Ok(devices)
    }

    /// Query one property; `None` when the driver fails or answers with the wrong type.
    pub fn fetch_device_property(
        &self,
        device: D::Device,
        property: DeviceProperty,
    ) -> Option<PropertyValue> {
        let capacity = property.destination_size();
        debug!("Querying {} ({} bytes) on {:?}", property, capacity, device);

        match self.driver.device_info(device, property, capacity) {
            Ok(value) if value.kind() == property.kind() => Some(value),
            Ok(value) => {
                warn!("{} returned an unexpected {:?} value", property, value.kind());
                None
            }
            Err(err) => {
                warn!("{} query failed: {}", property, err);
                None
            }
        }
    }

    /// Query every reported property of one device.
    pub fn describe_device(&self, index: usize, device: D::Device) -> DeviceReport {
        let mut report = DeviceReport::new(index);
        for property in DeviceProperty::ALL {
            if let Some(value) = self.fetch_device_property(device, property) {
                report.record(property, value);
            }
        }
        report
    }

    /// Run the full inspection, streaming each stage into `sink`.
    ///
    /// Returns the number of devices reported.
    pub fn inspect<S: ReportSink>(&self, sink: &mut S) -> Result<usize, InspectError> {
        sink.begin()?;

        let platform = self.discover_platform()?;
        let summary = PlatformSummary {
            name: self.fetch_platform_info(platform, PlatformField::Name),
            version: self.fetch_platform_info(platform, PlatformField::Version),
        };
        sink.platform(&summary)?;

        let count = self.count_gpu_devices(platform)?;
        sink.device_count(count)?;

        let devices = self.enumerate_gpu_devices(platform, count)?;
        for (index, device) in devices.iter().copied().enumerate() {
            let report = self.describe_device(index, device);
            sink.device(&report)?;
        }

        Ok(devices.len())
    }
}
