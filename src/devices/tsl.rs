
use lazy_static::lazy_static;
use regex::{Captures, Match, Regex};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{TslError, TslResult};
use crate::session::Session;

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

pub const IDN:              &str = "*IDN?";
pub const START_WAVELENGTH: &str = ":WAV:SWE:STAR?";
pub const STOP_WAVELENGTH:  &str = ":WAV:SWE:STOP?";
pub const SWEEP_STATUS:     &str = ":WAV:SWE?";
pub const SWEEP_SPEED:      &str = ":WAV:SWE:SPE?";
pub const SWEEP_DWELL:      &str = ":WAV:SWE:DWEL?";
pub const SWEEP_MODE:       &str = ":WAV:SWE:MOD?";
pub const SWEEP_CYCLES:     &str = ":WAV:SWE:CYCL?";
pub const SWEEP_START:      &str = ":WAV:SWE:STAT 1";
pub const SWEEP_STOP:       &str = ":WAV:SWE:STAT 0";
pub const WAVELENGTH:       &str = ":WAV?";

/// Sweep mode as reported by `:WAV:SWE:MOD?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepMode {
	StepOneWay,
	ContinuousOneWay,
	StepTwoWay,
	ContinuousTwoWay,
}

impl SweepMode {

	pub fn code(self) -> i32 {
		match self {
			SweepMode::StepOneWay       => 0,
			SweepMode::ContinuousOneWay => 1,
			SweepMode::StepTwoWay       => 2,
			SweepMode::ContinuousTwoWay => 3,
		}
	}

	pub fn is_continuous(self) -> bool { self.code() % 2 == 1 }
	pub fn is_two_way(self) -> bool { self.code() >= 2 }

}

impl TryFrom<i32> for SweepMode {
	type Error = TslError;

	fn try_from(code:i32) -> TslResult<Self> {
		match code {
			0 => Ok(SweepMode::StepOneWay),
			1 => Ok(SweepMode::ContinuousOneWay),
			2 => Ok(SweepMode::StepTwoWay),
			3 => Ok(SweepMode::ContinuousTwoWay),
			_ => Err(TslError::parse(&code.to_string(), "a sweep mode between 0 and 3")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

/// Everything the instrument reports about its sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
	pub start_nm: f64,
	pub stop_nm: f64,
	pub speed: f64,
	pub dwell: f64,
	pub mode: SweepMode,
	pub cycles: i64,
	pub status: f64,
}

fn match_str(opt_match:Option<Match>, reply:&str, field:&'static str) -> TslResult<String> {
	match opt_match {
		Some(m) => Ok(m.as_str().trim().to_owned()),
		None    => Err(TslError::parse(reply, field)),
	}
}

pub fn parse_identity(reply:&str) -> TslResult<Identity> {
	let caps:Captures = IDN_RE.captures(reply).ok_or_else(|| TslError::parse(reply, "an *IDN? reply"))?;

	Ok(Identity {
		manufacturer: match_str(caps.get(1), reply, "manufacturer")?,
		model:        match_str(caps.get(2), reply, "model")?,
		serial_num:   match_str(caps.get(3), reply, "serial number")?,
		fw_version:   match_str(caps.get(4), reply, "firmware version")?,
	})
}

pub fn parse_float(reply:&str) -> TslResult<f64> {
	reply.trim().parse::<f64>().map_err(|_| TslError::parse(reply, "a float"))
}

pub fn parse_int(reply:&str) -> TslResult<i64> {
	reply.trim().parse::<i64>().map_err(|_| TslError::parse(reply, "an integer"))
}

pub fn sweep_cycles_cmd(count:i64) -> Result<String, String> {
	if count < 0 { return Err(format!("Sweep cycles requires a non-negative integer, got {}", count)); }
	Ok(format!(":WAV:SWE:CYCL {}", count))
}

pub fn sweep_delay_cmd(delay:f64) -> Result<String, String> {
	if !delay.is_finite() { return Err(format!("Delay requires a finite number, got {}", delay)); }
	Ok(format!(":WAV:SWE:DEL {:.1}", delay))
}

pub fn wavelength_cmd(wavelength_nm:f64) -> Result<String, String> {
	if !wavelength_nm.is_finite() { return Err(format!("Wavelength requires a finite number, got {}", wavelength_nm)); }
	Ok(format!(":WAV {:.4}nm", wavelength_nm))
}

/// Santec TSL tunable laser on its LAN command port.
#[derive(Debug)]
pub struct TSL {
	session: Session,
}

impl TSL {

	pub fn new(host:&str, port:u16) -> TslResult<Self> {
		Self::connect(&SessionConfig::new(host, port))
	}

	pub fn connect(config:&SessionConfig) -> TslResult<Self> {
		Ok(Self::from_session(Session::connect(config)?))
	}

	pub fn from_session(session:Session) -> Self { Self{ session } }

	pub fn close(&mut self) { self.session.close() }
	pub fn is_open(&self) -> bool { self.session.is_open() }

	pub fn query(&mut self, cmd:&str) -> TslResult<String> { self.session.query(cmd) }
	pub fn send(&mut self, cmd:&str) -> TslResult<()> { self.session.send(cmd) }

	fn query_float(&mut self, cmd:&str) -> TslResult<f64> {
		let res = self.session.query(cmd)?;
		parse_float(&res)
	}

	fn query_int(&mut self, cmd:&str) -> TslResult<i64> {
		let res = self.session.query(cmd)?;
		parse_int(&res)
	}

	// A rejected setter argument drops the connection before reporting the error
	fn checked(&mut self, cmd:Result<String, String>) -> TslResult<String> {
		cmd.map_err(|msg| {
			debug!("Closing session after invalid argument: {}", msg);
			self.session.close();
			TslError::Argument(msg)
		})
	}

	pub fn get_identity(&mut self) -> TslResult<Identity> {
		let res = self.session.query(IDN)?;
		parse_identity(&res)
	}

	pub fn read_start_wavelength(&mut self) -> TslResult<f64> { self.query_float(START_WAVELENGTH) }
	pub fn read_stop_wavelength(&mut self) -> TslResult<f64> { self.query_float(STOP_WAVELENGTH) }
	pub fn read_sweep_status(&mut self) -> TslResult<f64> { self.query_float(SWEEP_STATUS) }
	pub fn read_sweep_speed(&mut self) -> TslResult<f64> { self.query_float(SWEEP_SPEED) }

	/// Time between steps when a step sweep is in use.
	pub fn read_sweep_dwell(&mut self) -> TslResult<f64> { self.query_float(SWEEP_DWELL) }

	/// Raw sweep mode code, as the `i32` that [`SweepMode::code`] uses:
	///
	/// - 0: step sweep, one way
	/// - 1: continuous sweep, one way
	/// - 2: step sweep, two way
	/// - 3: continuous sweep, two way
	pub fn read_sweep_mode(&mut self) -> TslResult<i32> {
		let res = self.session.query(SWEEP_MODE)?;
		res.trim().parse::<i32>().map_err(|_| TslError::parse(&res, "an integer"))
	}

	pub fn read_sweep_mode_kind(&mut self) -> TslResult<SweepMode> {
		SweepMode::try_from(self.read_sweep_mode()?)
	}

	pub fn read_sweep_cycles(&mut self) -> TslResult<i64> { self.query_int(SWEEP_CYCLES) }

	pub fn read_wavelength(&mut self) -> TslResult<f64> { self.query_float(WAVELENGTH) }

	pub fn get_sweep_settings(&mut self) -> TslResult<SweepSettings> {
		Ok(SweepSettings {
			start_nm: self.read_start_wavelength()?,
			stop_nm:  self.read_stop_wavelength()?,
			speed:    self.read_sweep_speed()?,
			dwell:    self.read_sweep_dwell()?,
			mode:     self.read_sweep_mode_kind()?,
			cycles:   self.read_sweep_cycles()?,
			status:   self.read_sweep_status()?,
		})
	}

	pub fn start_sweep(&mut self) -> TslResult<()> { self.session.send(SWEEP_START) }
	pub fn stop_sweep(&mut self) -> TslResult<()> { self.session.send(SWEEP_STOP) }

	/// A negative count is never sent: it returns [`TslError::Argument`] and closes
	/// the session, so the caller has to reconnect.
	pub fn set_sweep_cycles(&mut self, count:i64) -> TslResult<()> {
		let cmd = self.checked(sweep_cycles_cmd(count))?;
		self.session.send(&cmd)
	}

	/// Time between sweeps when a continuous sweep is in use.
	pub fn set_sweep_delay(&mut self, delay:f64) -> TslResult<()> {
		let cmd = self.checked(sweep_delay_cmd(delay))?;
		self.session.send(&cmd)
	}

	pub fn set_wavelength(&mut self, wavelength_nm:f64) -> TslResult<()> {
		let cmd = self.checked(wavelength_cmd(wavelength_nm))?;
		self.session.send(&cmd)
	}

}
