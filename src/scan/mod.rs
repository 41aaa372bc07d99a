//! Scan Loop Layer
//!
//! Runs the frame pipeline against a live stream of OCR results: admits at
//! most one frame at a time, paces analyses, skips frames whose recognition
//! failed and hands reports to the renderer.

pub mod gate;
pub mod session;
pub mod worker;

pub use gate::{Admission, FrameGate, FramePermit};
pub use session::{FrameReport, ScanSession, SessionStats};
pub use worker::{Offer, ScanWorker};
