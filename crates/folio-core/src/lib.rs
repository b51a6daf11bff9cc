//! folio core types shared by the client and the runtime.
//!
//! Nothing in here touches windows, files or physics: components are plain
//! data, the event bus and the task scheduler are driven by the frame loop.

pub mod components;
pub mod events;
pub mod schedule;
