//! Scripted driver for exercising the inspector without hardware

use std::cell::RefCell;
use std::collections::HashSet;

use super::driver::{
    bound_text, ComputeDriver, DeviceKind, DeviceProperty, DriverError, PlatformField,
    PropertyValue,
};

/// A driver call, as recorded by [`FakeDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PlatformIds,
    DeviceCount,
    DeviceIds(u32),
    PlatformInfo(PlatformField),
    DeviceInfo(usize, DeviceProperty),
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub name: String,
    pub vendor: String,
    pub driver_version: String,
    pub device_version: String,
    pub clock_mhz: u32,
    pub global_mem: u64,
    pub local_mem: u64,
    pub constant_buffer: u64,
    pub compute_units: u32,
    pub work_group_size: usize,
    pub work_item_dims: usize,
    pub work_item_sizes: [usize; 3],
    /// Properties whose query returns a non-success status
    pub failing: HashSet<DeviceProperty>,
}

impl FakeDevice {
    pub fn gpu(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor: "Vendor X".to_string(),
            driver_version: "31.0.101".to_string(),
            device_version: "OpenCL 3.0".to_string(),
            clock_mhz: 2400,
            global_mem: 8 * 1024 * 1024 * 1024,
            local_mem: 64 * 1024,
            constant_buffer: 64 * 1024,
            compute_units: 32,
            work_group_size: 1024,
            work_item_dims: 3,
            work_item_sizes: [1024, 1024, 64],
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, property: DeviceProperty) -> Self {
        self.failing.insert(property);
        self
    }
}

#[derive(Debug)]
pub struct FakeDriver {
    pub platforms: Result<usize, DriverError>,
    pub platform_name: Result<String, DriverError>,
    pub platform_version: Result<String, DriverError>,
    pub count: Result<u32, DriverError>,
    pub populate: Result<(), DriverError>,
    pub devices: Vec<FakeDevice>,
    calls: RefCell<Vec<Call>>,
}

impl FakeDriver {
    /// One platform named "Vendor X OpenCL" exposing `devices`.
    pub fn with_devices(devices: Vec<FakeDevice>) -> Self {
        Self {
            platforms: Ok(1),
            platform_name: Ok("Vendor X OpenCL".to_string()),
            platform_version: Ok("OpenCL 3.0 Vendor X 24.1".to_string()),
            count: Ok(devices.len() as u32),
            populate: Ok(()),
            devices,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn without_platforms() -> Self {
        let mut driver = Self::with_devices(Vec::new());
        driver.platforms = Ok(0);
        driver
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn device_info_calls(&self) -> Vec<(usize, DeviceProperty)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::DeviceInfo(device, property) => Some((*device, *property)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl ComputeDriver for FakeDriver {
    type Platform = usize;
    type Device = usize;

    fn platform_ids(&self, max_entries: usize) -> Result<Vec<usize>, DriverError> {
        self.record(Call::PlatformIds);
        let available = self.platforms.clone()?;
        Ok((0..available.min(max_entries)).collect())
    }

    fn device_count(&self, _platform: usize, _kind: DeviceKind) -> Result<u32, DriverError> {
        self.record(Call::DeviceCount);
        self.count.clone()
    }

    fn device_ids(
        &self,
        _platform: usize,
        _kind: DeviceKind,
        count: u32,
    ) -> Result<Vec<usize>, DriverError> {
        self.record(Call::DeviceIds(count));
        self.populate.clone()?;
        Ok((0..self.devices.len().min(count as usize)).collect())
    }

    fn platform_info(
        &self,
        _platform: usize,
        field: PlatformField,
        capacity: usize,
    ) -> Result<String, DriverError> {
        self.record(Call::PlatformInfo(field));
        let text = match field {
            PlatformField::Name => self.platform_name.clone()?,
            PlatformField::Version => self.platform_version.clone()?,
        };
        Ok(bound_text(text, capacity))
    }

    fn device_info(
        &self,
        device: usize,
        property: DeviceProperty,
        capacity: usize,
    ) -> Result<PropertyValue, DriverError> {
        self.record(Call::DeviceInfo(device, property));
        let dev = self
            .devices
            .get(device)
            .ok_or_else(DriverError::invalid_value)?;
        if dev.failing.contains(&property) {
            return Err(DriverError::invalid_value());
        }

        let text = |value: &str| PropertyValue::Text(bound_text(value.to_string(), capacity));
        Ok(match property {
            DeviceProperty::Name => text(&dev.name),
            DeviceProperty::Vendor => text(&dev.vendor),
            DeviceProperty::DriverVersion => text(&dev.driver_version),
            DeviceProperty::DeviceVersion => text(&dev.device_version),
            DeviceProperty::MaxClockFrequency => PropertyValue::Uint(dev.clock_mhz),
            DeviceProperty::GlobalMemSize => PropertyValue::Ulong(dev.global_mem),
            DeviceProperty::LocalMemSize => PropertyValue::Ulong(dev.local_mem),
            DeviceProperty::MaxConstantBufferSize => PropertyValue::Ulong(dev.constant_buffer),
            DeviceProperty::MaxComputeUnits => PropertyValue::Uint(dev.compute_units),
            DeviceProperty::MaxWorkGroupSize => PropertyValue::Size(dev.work_group_size),
            DeviceProperty::MaxWorkItemDimensions => PropertyValue::Size(dev.work_item_dims),
            DeviceProperty::MaxWorkItemSizes => PropertyValue::Sizes(dev.work_item_sizes),
        })
    }
}
