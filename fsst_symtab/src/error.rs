use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  #[error("dict version mismatch: expect {expect}, got {got}")]
  Version { expect: u32, got: u32 },

  #[error("dict written on a machine of different endianness")]
  Endian,

  #[error("corrupt data: {0}")]
  Corrupt(&'static str),

  #[error("dict decode: {0}")]
  Decode(#[from] bitcode::Error),
}
