//! Portable symbol table
//! 可移植的符号表

use crate::{
  HASH_TAB_SIZE, LEN_SHIFT, MAX_SYMBOL_LEN,
  encode::Encode,
  error::{Error, Result},
  symbol::Symbol,
  table::ESC_CODE,
};

pub const VERSION: u32 = 20190218;

/// Serialized symbol table. Symbol bytes are stored in code order, so codes are implied.
/// 序列化的符号表。符号字节按编码顺序存放，编码隐含其中。
#[derive(Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct Dict {
  /// `VERSION << 32 | suffix_lim << 24 | terminator << 16 | n_symbols << 8 | 1`, native byte order.
  /// The trailing 1 tells the writer's endianness.
  /// 本机字节序，末尾的 1 用于识别写入方字节序。
  pub head: [u8; 8],
  pub zero_terminated: bool,
  pub len_histo: [u8; MAX_SYMBOL_LEN],
  // lengths 2..=8 then 1; the zero terminator at code 0 is implied
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Head {
  pub suffix_lim: u8,
  pub terminator: u8,
  pub n_symbols: u8,
  // written on a machine of the other byte order
  pub foreign: bool,
}

impl From<&Encode> for Dict {
  fn from(enc: &Encode) -> Self {
    let word = ((VERSION as u64) << 32)
      | ((enc.suffix_lim() as u64) << 24)
      | ((enc.terminator() as u64) << 16)
      | ((enc.n_symbols() as u64) << 8)
      | 1;
    let zt = enc.zero_terminated();
    let mut bytes = Vec::with_capacity(enc.n_symbols() * MAX_SYMBOL_LEN);
    for s in enc.symbols().iter().skip(zt as usize) {
      bytes.extend_from_slice(&s.to_le_bytes()[..s.symbol_len()]);
    }
    Self {
      head: word.to_ne_bytes(),
      zero_terminated: zt,
      len_histo: enc.len_histo(),
      bytes,
    }
  }
}

impl Dict {
  pub fn to_bytes(&self) -> Vec<u8> {
    bitcode::encode(self)
  }

  pub fn from_bytes(bin: &[u8]) -> Result<Self> {
    Ok(bitcode::decode(bin)?)
  }

  pub(crate) fn head(&self) -> Result<Head> {
    // the top byte of VERSION is also 1, so the marker alone cannot tell the byte order
    let valid = |w: u64| w >> 32 == VERSION as u64 && w & 0xFF == 1;
    let native = u64::from_ne_bytes(self.head);
    let (word, foreign) = if valid(native) {
      (native, false)
    } else if valid(native.swap_bytes()) {
      (native.swap_bytes(), true)
    } else if native & 0xFF == 1 {
      return Err(Error::Version {
        expect: VERSION,
        got: (native >> 32) as u32,
      });
    } else {
      return Err(Error::Corrupt("dict head marker"));
    };
    Ok(Head {
      suffix_lim: (word >> 24) as u8,
      terminator: (word >> 16) as u8,
      n_symbols: (word >> 8) as u8,
      foreign,
    })
  }

  pub fn n_symbols(&self) -> Result<usize> {
    Ok(self.head()?.n_symbols as usize)
  }

  /// Symbols with their codes, in code order.
  /// 带编码的符号，按编码顺序。
  pub fn symbols(&self) -> Result<Vec<Symbol>> {
    let n = self.head()?.n_symbols as usize;
    let zt = self.zero_terminated as usize;
    let histo = self.len_histo.map(usize::from);
    if histo.iter().sum::<usize>() != n {
      return Err(Error::Corrupt("dict length histogram"));
    }
    if histo[0] < zt {
      return Err(Error::Corrupt("dict missing zero terminator"));
    }

    let mut symbols = Vec::with_capacity(n);
    if zt == 1 {
      symbols.push(Symbol::from_char(0, 0));
    }
    let mut at = 0;
    for len in (2..=MAX_SYMBOL_LEN).chain([1]) {
      let cnt = histo[len - 1] - if len == 1 { zt } else { 0 };
      for _ in 0..cnt {
        let bytes = self
          .bytes
          .get(at..at + len)
          .ok_or(Error::Corrupt("dict symbols truncated"))?;
        let mut s = Symbol::from_bytes(bytes);
        s.set_code_len(symbols.len() as u16, len);
        symbols.push(s);
        at += len;
      }
    }
    if at != self.bytes.len() {
      return Err(Error::Corrupt("dict trailing bytes"));
    }
    Ok(symbols)
  }
}

/// Rebuild the encoder lookup structures at the stored codes.
/// 按存储的编码重建编码器查找结构。
impl TryFrom<&Dict> for Encode {
  type Error = Error;

  fn try_from(dict: &Dict) -> Result<Self> {
    let head = dict.head()?;
    if head.foreign {
      return Err(Error::Endian);
    }
    let symbols = dict.symbols()?;
    let n = symbols.len();
    let zt = dict.zero_terminated as u8;
    let histo = dict.len_histo;
    let byte_lim = n as u8 - (histo[0] - zt);
    if head.suffix_lim < zt || head.suffix_lim > zt + histo[1] {
      return Err(Error::Corrupt("dict suffix limit"));
    }

    let mut byte_codes = [ESC_CODE; 256];
    for s in symbols.iter().filter(|s| s.symbol_len() == 1) {
      byte_codes[s.first() as usize] = s.code() | (1 << LEN_SHIFT);
    }
    let mut short_codes = (0..1usize << 16)
      .map(|i| byte_codes[i & 0xFF])
      .collect::<Box<[u16]>>();
    let mut hash_tab = vec![Symbol::new(); HASH_TAB_SIZE].into_boxed_slice();
    for &s in &symbols {
      if s.symbol_len() > 1 && s.holds(head.terminator) {
        return Err(Error::Corrupt("dict symbol holds terminator"));
      }
      match s.symbol_len() {
        1 => {}
        2 => short_codes[s.first2() as usize] = s.code() | (2 << LEN_SHIFT),
        _ => {
          let slot = &mut hash_tab[s.hash() as usize & (HASH_TAB_SIZE - 1)];
          if !slot.is_free() {
            return Err(Error::Corrupt("dict hash slot clash"));
          }
          *slot = s;
        }
      }
    }

    Ok(Encode {
      short_codes,
      byte_codes,
      hash_tab,
      symbols,
      terminator: head.terminator,
      zt,
      suffix_lim: head.suffix_lim,
      byte_lim,
      len_histo: histo,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::Table;

  fn enc() -> Encode {
    let mut st = Table::default();
    for s in [&b"ab"[..], b"hello", b"x", b"xyz"] {
      assert!(st.add(Symbol::from_bytes(s)));
    }
    st.finalize()
  }

  #[test]
  fn head_fields() {
    let dict = Dict::from(&enc());
    let head = dict.head().unwrap();
    assert_eq!(head.n_symbols, 4);
    assert_eq!(head.terminator, 0);
    assert!(!head.foreign);
    assert_eq!(dict.bytes, b"abxyzhellox");
  }

  #[test]
  fn foreign_order_detected() {
    let mut dict = Dict::from(&enc());
    dict.head.reverse();
    assert!(dict.head().unwrap().foreign);
  }

  #[test]
  fn bad_version() {
    let mut dict = Dict::from(&enc());
    let word = u64::from_ne_bytes(dict.head) + (1 << 32);
    dict.head = word.to_ne_bytes();
    assert!(matches!(
      dict.head(),
      Err(Error::Version { expect: VERSION, got }) if got == VERSION + 1
    ));
  }

  #[test]
  fn terminator_in_symbol() {
    let mut dict = Dict::from(&enc());
    // "ab" becomes "a\0", the terminator being 0
    dict.bytes[1] = 0;
    assert!(matches!(Encode::try_from(&dict), Err(Error::Corrupt(_))));
  }

  #[test]
  fn truncated_bytes() {
    let mut dict = Dict::from(&enc());
    dict.bytes.pop();
    assert!(matches!(dict.symbols(), Err(Error::Corrupt(_))));
  }
}
