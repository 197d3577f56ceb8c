use crate::{
  ESC,
  dict::Dict,
  encode::Encode,
  error::{Error, Result},
  symbol::Symbol,
};

/// Code to bytes lookup, built from an [`Encode`] or a [`Dict`].
/// 编码到字节的查找表，由 [`Encode`] 或 [`Dict`] 构建。
#[derive(Clone)]
pub struct Decode {
  // 0 marks an unused code
  len: [u8; 256],
  symbol: [u64; 256],
  n_symbols: usize,
}

impl Decode {
  fn new(symbols: &[Symbol]) -> Self {
    let mut len = [0u8; 256];
    let mut symbol = [0u64; 256];
    for (code, s) in symbols.iter().enumerate() {
      len[code] = s.symbol_len() as u8;
      symbol[code] = s.val;
    }
    Self {
      len,
      symbol,
      n_symbols: symbols.len(),
    }
  }

  pub fn n_symbols(&self) -> usize {
    self.n_symbols
  }

  /// Decode `codes` and append to `out`, return bytes written.
  /// 解码 `codes` 并追加到 `out`，返回写入字节数。
  pub fn decode(&self, codes: &[u8], out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    out.reserve(codes.len() * 4);
    let mut it = codes.iter();
    while let Some(&code) = it.next() {
      if code == ESC {
        let &b = it.next().ok_or(Error::Corrupt("escape at end of input"))?;
        out.push(b);
        continue;
      }
      let len = self.len[code as usize] as usize;
      if len == 0 {
        return Err(Error::Corrupt("unknown code"));
      }
      out.extend_from_slice(&self.symbol[code as usize].to_le_bytes()[..len]);
    }
    Ok(out.len() - start)
  }

  /// Decode concatenated lines, `lens` being the compressed length of each.
  /// 解码拼接在一起的多行，`lens` 为每行压缩后长度。
  pub fn decompress(&self, codes: &[u8], lens: &[usize]) -> Result<(Vec<u8>, Vec<usize>)> {
    let mut out = Vec::with_capacity(codes.len() * 3);
    let mut out_lens = Vec::with_capacity(lens.len());
    let mut at = 0;
    for &len in lens {
      let line = codes
        .get(at..at + len)
        .ok_or(Error::Corrupt("line lengths exceed input"))?;
      out_lens.push(self.decode(line, &mut out)?);
      at += len;
    }
    Ok((out, out_lens))
  }
}

impl From<&Encode> for Decode {
  fn from(enc: &Encode) -> Self {
    Self::new(enc.symbols())
  }
}

impl TryFrom<&Dict> for Decode {
  type Error = Error;

  /// Symbol bytes are order independent, only the version must match.
  /// 符号字节与字节序无关，只需版本一致。
  fn try_from(dict: &Dict) -> Result<Self> {
    Ok(Self::new(&dict.symbols()?))
  }
}
