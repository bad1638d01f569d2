//! UI layer: the capture form window.

pub mod app;

pub use app::CaptureApp;
