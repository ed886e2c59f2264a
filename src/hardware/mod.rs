//! Compute device inspection module
//!
//! Queries the first OpenCL platform for its GPU devices and reports a fixed set of
//! identification, memory, and compute properties for each.

pub mod driver;
pub mod inspector;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod report;

#[cfg(test)]
pub(crate) mod fake;

pub use driver::ComputeDriver;
pub use inspector::{InspectError, Inspector};
#[cfg(feature = "opencl")]
pub use opencl::OpenClDriver;
pub use report::{JsonReport, TextReport};
