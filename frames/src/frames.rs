use core::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	Other(String),
	#[error("Timed out")]
	Timeout,
	#[error("Unexpected Eof")]
	UnexpectedEof,
	#[error("Bad frame checksum (expected: {expected:#04x}, received: {received:#04x})")]
	BadChecksum { expected: u8, received: u8 },
	#[error("Frame too long ({0} bytes)")]
	FrameTooLong(usize),
}

impl Error {
	//errors after which the byte stream can not be trusted anymore
	pub fn need_reset(&self) -> bool {
		match self {
			Self::Other(_) | Self::UnexpectedEof => true,
			_ => false
		}
	}
}

//traits for async read / write (serial port adapters, tcp bridges, etc.)

pub trait AsyncFrameRead {
	fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Error>> + Send;
}

pub trait AsyncFrameWrite {
	fn write(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize, Error>> + Send;
	fn flush(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}

pub trait Frame
{
	type Params: Sync;

	//number of bytes still needed to complete the frame in buf, 0 when complete
	//implementations may drop leading garbage from buf
	fn get_buffer_len(buf: &mut Vec<u8>, params: &Self::Params) -> Result<usize, Error>;
	fn from_buf(buf: &[u8], params: &Self::Params) -> Result<Self, Error> where Self: Sized;
	fn as_bytes(&self, params: &Self::Params, buf: &mut Vec<u8>) -> Result<(), Error>;

	fn read_buf<R: AsyncFrameRead + Send>(r: &mut R, params: &Self::Params) -> impl Future<Output = Result<Vec<u8>, Error>> + Send {
		async {
			let mut buf = Vec::new();

			loop {
				let desired_diff = Self::get_buffer_len(&mut buf, params)?;

				if desired_diff == 0 {
					break;
				}

				let start = buf.len();
				buf.resize(start + desired_diff, 0);

				let mut filled = start;

				while filled < buf.len() {
					let rr = r.read(&mut buf[filled..]).await?;

					if rr == 0 {
						return Err(Error::UnexpectedEof);
					}

					filled += rr;
				}
			}

			Ok(buf)
		}
	}

	fn async_read_frame<R: AsyncFrameRead + Send>(r: &mut R, params: &Self::Params) -> impl Future<Output = Result<Self, Error>> + Send where
		Self: Sized {
		async {
			let buf = Self::read_buf(r, params).await?;

			Self::from_buf(&buf, params)
		}
	}

	fn async_write_frame<W: AsyncFrameWrite + Send>(&self, w: &mut W, params: &Self::Params)  -> impl Future<Output = Result<(), Error>> + Send where
		Self: Sized,
		Self: Sync {
		async {
			let mut vec = Vec::new();
			self.as_bytes(params, &mut vec)?;

			let mut buf = vec.as_slice();

			while !buf.is_empty() {
				let wl = w.write(buf).await?;

				if wl == 0 {
					return Err(Error::UnexpectedEof);
				}

				buf = &buf[wl..];
			}

			w.flush().await
		}
	}
}
