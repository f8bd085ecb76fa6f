pub mod frames;
pub use frames::{ Frame, Error, AsyncFrameRead, AsyncFrameWrite };

#[cfg(feature="futures")]
pub mod frames_futures;
