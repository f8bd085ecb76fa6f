//transports moving general frames between host and radio

use core::future::Future;
use crate::frame::GeneralFrame;

pub mod stream;
pub mod memory;

pub use stream::StreamTransport;
pub use memory::MemoryRadio;

pub trait Transport {
	fn send(&mut self, frame: GeneralFrame) -> impl Future<Output = Result<(), frames::Error>> + Send;
	//next frame from the radio, responses and callbacks alike
	fn receive(&mut self) -> impl Future<Output = Result<GeneralFrame, frames::Error>> + Send;
}
