use std::{
  cmp::Ordering,
  fmt,
  hash::{Hash, Hasher},
};

use crate::{CODE_MASK, ICL_CODE_SHIFT, ICL_FREE, ICL_LEN_SHIFT, MAX_SYMBOL_LEN};

const HASH_PRIME: u64 = 2971215073;
const HASH_SHIFT: u32 = 15;

/// Multiplicative hash, used for hash table slots and as the sampling PRNG.
/// 乘法哈希，用于哈希表定位，也作为采样的伪随机数发生器。
#[inline(always)]
pub fn hash(w: u64) -> u64 {
  let h = w.wrapping_mul(HASH_PRIME);
  h ^ (h >> HASH_SHIFT)
}

/// Load up to 8 bytes as a little-endian word, zero padded.
/// 以小端序加载最多 8 字节，不足补零。
#[inline(always)]
pub fn load(bytes: &[u8]) -> u64 {
  if let Some(head) = bytes.first_chunk::<8>() {
    return u64::from_le_bytes(*head);
  }
  let mut w = [0u8; 8];
  w[..bytes.len()].copy_from_slice(bytes);
  u64::from_le_bytes(w)
}

/// Mask keeping the low `len` bytes of a word.
/// 保留低 `len` 字节的掩码。
#[inline(always)]
pub const fn mask(len: usize) -> u64 {
  u64::MAX >> ((MAX_SYMBOL_LEN - len) * 8)
}

#[derive(Copy, Clone)]
pub struct Symbol {
  // the byte sequence that this symbol stands for, byte 0 in the low bits
  // 此符号代表的字节序列，第 0 字节位于低位
  pub val: u64,

  // icl = ignoredBits:16, code:12, length:4 (low to high), upper 32 bits unused
  // one u64 so code and length are read with a single load
  // icl 由低到高为 ignoredBits:16、code:12、length:4，单个 u64 一次读出
  pub icl: u64,
}

// identity is the masked bytes and the length, code and stray high bits are ignored
impl PartialEq for Symbol {
  fn eq(&self, other: &Self) -> bool {
    self.val & self.mask() == other.val & other.mask() && self.symbol_len() == other.symbol_len()
  }
}

impl Eq for Symbol {}

impl Hash for Symbol {
  fn hash<H: Hasher>(&self, state: &mut H) {
    hash(self.val & self.mask()).hash(state);
    self.symbol_len().hash(state);
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_free() {
      return write!(f, "<free>");
    }
    let bytes = self.val.to_le_bytes();
    for &c in &bytes[..self.symbol_len()] {
      write!(f, "{}", std::ascii::escape_default(c))?;
    }
    write!(
      f,
      "\tignored: {}, code: {}, len: {}",
      self.ignored_bits(),
      self.code(),
      self.symbol_len()
    )
  }
}

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl Default for Symbol {
  fn default() -> Self {
    Self::new()
  }
}

impl Symbol {
  /// Empty hash table slot.
  /// 空哈希槽。
  pub const fn new() -> Self {
    Self {
      val: 0,
      icl: ICL_FREE,
    }
  }

  pub const fn from_char(c: u8, code: u16) -> Self {
    Self {
      val: c as u64,
      // single byte: 56 bits ignored, length 1
      // 单字节：忽略 56 位，长度 1
      icl: (1 << ICL_LEN_SHIFT) | ((code as u64) << ICL_CODE_SHIFT) | 56,
    }
  }

  /// Build a symbol from the first (at most 8) bytes, with an unassigned code.
  /// 由前 8 个以内字节构造符号，code 未分配。
  pub fn from_bytes(bytes: &[u8]) -> Self {
    debug_assert!(!bytes.is_empty());
    let len = bytes.len().min(MAX_SYMBOL_LEN);
    let mut s = Self {
      val: load(bytes) & mask(len),
      icl: 0,
    };
    s.set_code_len(CODE_MASK, len);
    s
  }

  pub fn set_code_len(&mut self, code: u16, len: usize) {
    self.icl = ((len as u64) << ICL_LEN_SHIFT)
      | (((code & CODE_MASK) as u64) << ICL_CODE_SHIFT)
      | ((MAX_SYMBOL_LEN - len) as u64 * 8);
  }

  #[inline]
  pub fn symbol_len(&self) -> usize {
    ((self.icl >> ICL_LEN_SHIFT) & 15) as usize
  }

  #[inline]
  pub fn code(&self) -> u16 {
    ((self.icl >> ICL_CODE_SHIFT) as u16) & CODE_MASK
  }

  // (8-length)*8: high bits to zero in the input word before comparing with a hash slot
  // (8-length)*8：与哈希槽比较前输入字需清零的高位数
  #[inline]
  pub fn ignored_bits(&self) -> u32 {
    (self.icl & u16::MAX as u64) as u32
  }

  #[inline]
  pub fn mask(&self) -> u64 {
    u64::MAX >> self.ignored_bits()
  }

  #[inline]
  pub fn is_free(&self) -> bool {
    self.icl >= ICL_FREE
  }

  #[inline]
  pub fn first(&self) -> u8 {
    debug_assert!(self.symbol_len() >= 1);
    (self.val & 0xFF) as u8
  }

  #[inline]
  pub fn first2(&self) -> u16 {
    debug_assert!(self.symbol_len() >= 2);
    (self.val & 0xFFFF) as u16
  }

  /// Whether `byte` is one of the symbol's bytes.
  /// `byte` 是否为符号中的某个字节。
  pub fn holds(&self, byte: u8) -> bool {
    self.to_le_bytes()[..self.symbol_len()].contains(&byte)
  }

  /// Hash of the first 3 bytes, the key of the hash table.
  /// 前 3 字节的哈希，即哈希表的键。
  #[inline]
  pub fn hash(&self) -> u64 {
    hash(self.val & 0xFF_FFFF)
  }

  /// Bytes of the symbol, valid up to `symbol_len()`.
  /// 符号字节，前 `symbol_len()` 个有效。
  #[inline]
  pub fn to_le_bytes(&self) -> [u8; 8] {
    self.val.to_le_bytes()
  }

  // right follows left: in "hello", "llo" follows "he"
  // right 紧随 left 之后，例如 "hello" 中 "llo" 跟在 "he" 之后
  pub fn concat(left: Self, right: Self) -> Self {
    let left_len = left.symbol_len();
    let len = (left_len + right.symbol_len()).min(MAX_SYMBOL_LEN);
    let val = if left_len >= MAX_SYMBOL_LEN {
      left.val
    } else {
      (right.val << (8 * left_len)) | left.val
    };
    let mut s = Self {
      val: val & mask(len),
      icl: 0,
    };
    s.set_code_len(CODE_MASK, len);
    s
  }
}

/// Candidate symbol ordered on gain.
/// 按增益排序的候选符号。
#[derive(Debug, Clone, Copy)]
pub struct QSymbol {
  pub symbol: Symbol,
  pub gain: u64,
}

impl Ord for QSymbol {
  // equal gain: longer symbol first, then smaller value first
  // 增益相同：长符号优先，再按值小者优先
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .gain
      .cmp(&other.gain)
      .then_with(|| self.symbol.symbol_len().cmp(&other.symbol.symbol_len()))
      .then_with(|| other.symbol.val.cmp(&self.symbol.val))
  }
}

impl PartialOrd for QSymbol {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for QSymbol {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for QSymbol {}
