//! visionx library crate.
//!
//! Capture a camera frame or take an uploaded image, send it to a face or
//! object detection service, and hold the annotated result for display.

pub mod analysis;
pub mod camera;
pub mod cli;
pub mod config;
pub mod frame;
pub mod pipeline;
pub mod render;
pub mod results;
