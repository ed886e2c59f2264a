//! Report output
//!
//! [`TextReport`] writes the human-readable layout as the inspection progresses, so
//! a fatal error still leaves everything gathered before it on screen.
//! [`JsonReport`] collects an [`InspectionReport`] and serializes it at the end.

use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

use super::inspector::{DeviceReport, PlatformSummary};

/// Receives each stage of an inspection in order.
pub trait ReportSink {
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn platform(&mut self, platform: &PlatformSummary) -> io::Result<()>;

    fn device_count(&mut self, count: u32) -> io::Result<()>;

    fn device(&mut self, device: &DeviceReport) -> io::Result<()>;
}

/// Human-readable report
pub struct TextReport<W: Write> {
    out: W,
    placeholder: String,
}

impl<W: Write> TextReport<W> {
    /// `placeholder` is printed in place of any value the driver failed to report.
    pub fn new(out: W, placeholder: impl Into<String>) -> Self {
        Self {
            out,
            placeholder: placeholder.into(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn field<T: Display>(&mut self, label: &str, value: Option<T>) -> io::Result<()> {
        match value {
            Some(value) => writeln!(self.out, "{}{}", label, value),
            None => writeln!(self.out, "{}{}", label, self.placeholder),
        }
    }

    fn section(&mut self, title: &str, rule: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", title)?;
        writeln!(self.out, "{}", rule)
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "OpenCL Information :")?;
        writeln!(self.out, "=======================")
    }

    fn platform(&mut self, platform: &PlatformSummary) -> io::Result<()> {
        self.field(
            "OpenCL supporting GPU platform name: ",
            platform.name.as_deref(),
        )?;
        self.field(
            "OpenCL supporting GPU Platform version : ",
            platform.version.as_deref(),
        )
    }

    fn device_count(&mut self, count: u32) -> io::Result<()> {
        writeln!(
            self.out,
            "Total number of OpenCL supporting GPU device(s) on this system: {}",
            count
        )
    }

    fn device(&mut self, device: &DeviceReport) -> io::Result<()> {
        self.section(
            "*********** GPU DEVICE GENERAL INFORMATION ***********",
            "======================================================",
        )?;
        writeln!(self.out, "GPU Device Number : {}", device.index)?;
        self.field("GPU Device Name: ", device.name.as_deref())?;
        self.field("GPU Device Vendor: ", device.vendor.as_deref())?;
        self.field("GPU Driver Version: ", device.driver_version.as_deref())?;
        self.field("GPU Device OpenCL version: ", device.device_version.as_deref())?;
        self.field("GPU Device Clock Rate: ", device.max_clock_mhz)?;

        self.section(
            "********** GPU DEVICE MEMORY INFORMATION ***************",
            "========================================================",
        )?;
        self.field("GPU Device Global Memory Bytes: ", device.global_mem_bytes)?;
        self.field("GPU Device Local Memory Bytes: ", device.local_mem_bytes)?;
        self.field(
            "GPU Device Constant Buffer Size Bytes: ",
            device.constant_buffer_bytes,
        )?;

        self.section(
            "********** GPU DEVICE COMPUTE INFORMATION ***************",
            "========================================================",
        )?;
        self.field(
            "GPU Device Number Of Parallel Processor Cores: ",
            device.compute_units,
        )?;
        self.field("GPU Device Work Group Size: ", device.max_work_group_size)?;
        self.field(
            "GPU Device Work Item Dimensions : ",
            device.max_work_item_dimensions,
        )?;
        self.field(
            "GPU Device Work Item Sizes : ",
            device
                .max_work_item_sizes
                .map(|[x, y, z]| format!("{} {} {}", x, y, z)),
        )?;

        self.out.flush()
    }
}

/// Machine-readable form of a complete inspection
#[derive(Debug, Clone, Default, Serialize)]
pub struct InspectionReport {
    pub platform: PlatformSummary,
    pub device_count: u32,
    pub devices: Vec<DeviceReport>,
}

/// Collects the inspection for JSON output
#[derive(Debug, Default)]
pub struct JsonReport {
    report: InspectionReport,
}

impl JsonReport {
    #[cfg(test)]
    pub fn into_report(self) -> InspectionReport {
        self.report
    }

    /// Write the collected report as pretty-printed JSON.
    pub fn finish<W: Write>(self, mut out: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(&mut out, &self.report)?;
        writeln!(out).map_err(serde_json::Error::io)
    }
}

impl ReportSink for JsonReport {
    fn platform(&mut self, platform: &PlatformSummary) -> io::Result<()> {
        self.report.platform = platform.clone();
        Ok(())
    }

    fn device_count(&mut self, count: u32) -> io::Result<()> {
        self.report.device_count = count;
        Ok(())
    }

    fn device(&mut self, device: &DeviceReport) -> io::Result<()> {
        self.report.devices.push(device.clone());
        Ok(())
    }
}
