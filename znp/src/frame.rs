//MT general frame and its serial framing: SOF | len | cmd0 | cmd1 | data | FCS

use deku::{ self, prelude::* };
use frames::{ Frame, Error };
use crate::{ commands::Command, sys::{ Request, Response } };

pub const SOF: u8 = 0xFE;
pub const MAX_DATA_LEN: usize = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralFrame {
	pub header: Command,
	pub data: Vec<u8>
}

impl GeneralFrame {
	pub fn new(header: Command, data: Vec<u8>) -> Self {
		Self { header, data }
	}

	pub fn from_request(request: &Request) -> Result<Self, DekuError> {
		Self::from_command_bytes(request.to_bytes()?)
	}

	pub fn from_response(response: &Response) -> Result<Self, DekuError> {
		Self::from_command_bytes(response.to_bytes()?)
	}

	fn from_command_bytes(mut bytes: Vec<u8>) -> Result<Self, DekuError> {
		if bytes.len() < 2 {
			return Err(DekuError::Parse("command without header".into()));
		}

		let data = bytes.split_off(2);

		Ok(Self { header: Command { cmd0: bytes[0], id: bytes[1] }, data })
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(self.data.len() + 2);
		buf.extend_from_slice(&self.header.to_le_bytes());
		buf.extend_from_slice(&self.data);
		buf
	}

	pub fn request(&self) -> Result<Request, DekuError> {
		Request::try_from(self.to_bytes().as_slice())
	}

	pub fn response(&self) -> Result<Response, DekuError> {
		Response::try_from(self.to_bytes().as_slice())
	}
}

fn fcs(buf: &[u8]) -> u8 {
	buf.iter().fold(0, |a, b| a ^ b)
}

//general frame as it travels over the serial line
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFrame(pub GeneralFrame);

impl Frame for TransportFrame {
	type Params = ();

	fn get_buffer_len(buf: &mut Vec<u8>, _params: &()) -> Result<usize, Error> {
		//skip anything before start of frame
		if let Some(pos) = buf.iter().position(|b| *b == SOF) {
			if pos > 0 {
				buf.drain(..pos);
			}
		}
		else {
			buf.clear();
			return Ok(1);
		}

		if buf.len() < 2 {
			return Ok(2 - buf.len());
		}

		let data_len = buf[1] as usize;

		if data_len > MAX_DATA_LEN {
			return Err(Error::FrameTooLong(data_len));
		}

		Ok((data_len + 5).saturating_sub(buf.len()))
	}

	fn from_buf(buf: &[u8], _params: &()) -> Result<Self, Error> {
		if buf.len() < 5 || buf[0] != SOF || buf.len() != buf[1] as usize + 5 {
			return Err(Error::Other("malformed frame".to_string()));
		}

		let received = buf[buf.len() - 1];
		let expected = fcs(&buf[1..buf.len() - 1]);

		if expected != received {
			return Err(Error::BadChecksum { expected, received });
		}

		Ok(Self(GeneralFrame {
			header: Command { cmd0: buf[2], id: buf[3] },
			data: buf[4..buf.len() - 1].to_vec()
		}))
	}

	fn as_bytes(&self, _params: &(), buf: &mut Vec<u8>) -> Result<(), Error> {
		let data = &self.0.data;

		if data.len() > MAX_DATA_LEN {
			return Err(Error::FrameTooLong(data.len()));
		}

		buf.push(SOF);
		let start = buf.len();
		buf.push(data.len() as u8);
		buf.extend_from_slice(&self.0.header.to_le_bytes());
		buf.extend_from_slice(data);
		let checksum = fcs(&buf[start..]);
		buf.push(checksum);

		Ok(())
	}
}
