use frames::{ AsyncFrameRead, AsyncFrameWrite, Frame, Error };
use log::trace;
use crate::frame::{ GeneralFrame, TransportFrame };
use super::Transport;

//MT framing over a byte stream (serial port, tcp bridge)
pub struct StreamTransport<R, W> {
	reader: R,
	writer: W
}

impl<R: AsyncFrameRead + Send, W: AsyncFrameWrite + Send> StreamTransport<R, W> {
	pub fn new(reader: R, writer: W) -> Self {
		Self { reader, writer }
	}

	pub fn into_inner(self) -> (R, W) {
		(self.reader, self.writer)
	}
}

impl<R: AsyncFrameRead + Send, W: AsyncFrameWrite + Send> Transport for StreamTransport<R, W> {
	async fn send(&mut self, frame: GeneralFrame) -> Result<(), Error> {
		trace!("-> {} {:02x?}", frame.header, frame.data);

		TransportFrame(frame).async_write_frame(&mut self.writer, &()).await
	}

	async fn receive(&mut self) -> Result<GeneralFrame, Error> {
		let TransportFrame(frame) = TransportFrame::async_read_frame(&mut self.reader, &()).await?;

		trace!("<- {} {:02x?}", frame.header, frame.data);

		Ok(frame)
	}
}
