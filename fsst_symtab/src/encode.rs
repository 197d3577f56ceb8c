use crate::{
  CHUNK, CODE_BASE, CODE_MASK, HASH_TAB_SIZE, LEN_SHIFT, MAX_SYMBOL_LEN, bound,
  symbol::{Symbol, hash, load},
};

// chunk + terminator + 8 bytes of slack for the word load
const BUF_LEN: usize = CHUNK + 1 + MAX_SYMBOL_LEN;

/// Compression loop flavour, all produce identical output.
/// 压缩循环的实现方式，输出完全一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
  /// Emit unextended two-byte codes before probing the hash table
  /// 先输出无扩展的两字节编码，再查哈希表
  NoSuffixOpt,
  /// Branch-free advance computed from the code entry
  /// 由编码表项无分支地计算前进量
  AvoidBranch,
  Branchy,
}

impl Variant {
  /// Pick by the table's length histogram.
  /// 依据符号表的长度直方图选择。
  pub fn pick(enc: &Encode) -> Self {
    let h = enc.len_histo.map(u32::from);
    let n = enc.n_symbols() as u32;
    let suffix_lim = enc.suffix_lim as u32;
    if 100 * h[1] > 65 * n && 100 * suffix_lim > 95 * h[1] {
      Self::NoSuffixOpt
    } else if h[0] > 24 && h[0] < 92 && (h[0] < 43 || h[6] + h[7] < 29) && (h[0] < 72 || h[2] < 72)
    {
      Self::AvoidBranch
    } else {
      Self::Branchy
    }
  }
}

/// Finalized, read-only symbol table. Codes are dense 0..n, ordered 2,3,..,8,1 by length.
/// Shareable across threads.
///
/// 定稿后的只读符号表。编码为紧凑的 0..n，按长度 2,3,..,8,1 排列。可跨线程共享。
#[derive(Clone)]
pub struct Encode {
  // first two bytes -> code | len << 12, escape is 511 | 1 << 12
  pub(crate) short_codes: Box<[u16]>,
  pub(crate) byte_codes: [u16; 256],
  pub(crate) hash_tab: Box<[Symbol]>,
  pub(crate) symbols: Vec<Symbol>,
  pub(crate) terminator: u8,
  // 1 when code 0 is the zero terminator
  pub(crate) zt: u8,
  pub(crate) suffix_lim: u8,
  // codes below are multi-byte
  pub(crate) byte_lim: u8,
  pub(crate) len_histo: [u8; MAX_SYMBOL_LEN],
}

impl Encode {
  pub fn n_symbols(&self) -> usize {
    self.symbols.len()
  }

  pub fn symbol(&self, code: u16) -> Symbol {
    self.symbols[code as usize]
  }

  pub fn symbols(&self) -> &[Symbol] {
    &self.symbols
  }

  pub fn terminator(&self) -> u8 {
    self.terminator
  }

  pub fn zero_terminated(&self) -> bool {
    self.zt != 0
  }

  /// Codes in `[zt, suffix_lim)` are two-byte symbols that no longer symbol starts with.
  /// `[zt, suffix_lim)` 内的编码是没有更长符号以之开头的两字节符号。
  pub fn suffix_lim(&self) -> u8 {
    self.suffix_lim
  }

  pub fn byte_lim(&self) -> u8 {
    self.byte_lim
  }

  pub fn len_histo(&self) -> [u8; MAX_SYMBOL_LEN] {
    self.len_histo
  }

  /// Finalized code of the longest symbol prefixing `input` (non-empty), `None` if the
  /// first byte must be escaped.
  /// 返回作为 `input` (非空) 前缀的最长符号的编码，首字节需转义时为 `None`。
  pub fn find_longest_symbol(&self, input: &[u8]) -> Option<u8> {
    debug_assert!(!input.is_empty());
    let len = input.len().min(MAX_SYMBOL_LEN);
    let word = load(input);
    let s = self.hash_tab[hash(word & 0xFF_FFFF) as usize & (HASH_TAB_SIZE - 1)];
    if !s.is_free() && s.symbol_len() <= len && s.val == word & s.mask() {
      return Some(s.code() as u8);
    }
    // short codes fall back to the byte code of their first byte
    let code = if len >= 2 {
      self.short_codes[(word & 0xFFFF) as usize]
    } else {
      self.byte_codes[(word & 0xFF) as usize]
    };
    (code & CODE_BASE == 0).then_some((code & CODE_MASK) as u8)
  }

  /// Compress `lines` into `out`, pushing one compressed length per line to `out_lens`.
  /// Stops before a chunk that might not fit and returns the number of lines completed;
  /// call again with the remaining lines and a fresh buffer.
  ///
  /// 将 `lines` 压缩到 `out`，每行压缩后长度追加到 `out_lens`。遇到可能放不下的分块即停止，
  /// 返回已完成的行数；用剩余行与新缓冲区再次调用即可继续。
  pub fn compress_bulk<T: AsRef<[u8]>>(
    &self,
    lines: &[T],
    out: &mut [u8],
    out_lens: &mut Vec<usize>,
  ) -> usize {
    self.compress_bulk_with(Variant::pick(self), lines, out, out_lens)
  }

  pub fn compress_bulk_with<T: AsRef<[u8]>>(
    &self,
    variant: Variant,
    lines: &[T],
    out: &mut [u8],
    out_lens: &mut Vec<usize>,
  ) -> usize {
    match variant {
      Variant::NoSuffixOpt => self.bulk::<T, true, false>(lines, out, out_lens),
      Variant::AvoidBranch => self.bulk::<T, false, true>(lines, out, out_lens),
      Variant::Branchy => self.bulk::<T, false, false>(lines, out, out_lens),
    }
  }

  /// Compress every line, returning the concatenated codes and per-line lengths.
  /// 压缩全部行，返回拼接的编码与每行长度。
  pub fn compress<T: AsRef<[u8]>>(&self, lines: &[T]) -> (Vec<u8>, Vec<usize>) {
    let cap = lines.iter().map(|l| bound(l.as_ref().len())).sum::<usize>();
    let mut out = vec![0u8; cap];
    let mut out_lens = Vec::with_capacity(lines.len());
    let done = self.compress_bulk(lines, &mut out, &mut out_lens);
    debug_assert_eq!(done, lines.len());
    out.truncate(out_lens.iter().sum());
    (out, out_lens)
  }

  /// Encode one string and append to `out`, return bytes written.
  /// 编码单个字符串并追加到 `out`，返回写入字节数。
  pub fn encode(&self, data: &[u8], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    out.resize(start + bound(data.len()), 0);
    let end = match Variant::pick(self) {
      Variant::NoSuffixOpt => self.line::<true, false>(data, out, start),
      Variant::AvoidBranch => self.line::<false, true>(data, out, start),
      Variant::Branchy => self.line::<false, false>(data, out, start),
    };
    out.truncate(end);
    end - start
  }

  fn bulk<T: AsRef<[u8]>, const NO_SUFFIX: bool, const AVOID_BRANCH: bool>(
    &self,
    lines: &[T],
    out: &mut [u8],
    out_lens: &mut Vec<usize>,
  ) -> usize {
    let mut buf = [0u8; BUF_LEN];
    let mut pos = 0;
    for (done, line) in lines.iter().enumerate() {
      let line = line.as_ref();
      let start = pos;
      for chunk in line.chunks(CHUNK) {
        if 2 * chunk.len() + 7 > out.len() - pos {
          return done;
        }
        pos = self.chunk::<NO_SUFFIX, AVOID_BRANCH>(&mut buf, chunk, out, pos);
      }
      out_lens.push(pos - start);
    }
    lines.len()
  }

  fn line<const NO_SUFFIX: bool, const AVOID_BRANCH: bool>(
    &self,
    data: &[u8],
    out: &mut [u8],
    mut pos: usize,
  ) -> usize {
    let mut buf = [0u8; BUF_LEN];
    for chunk in data.chunks(CHUNK) {
      pos = self.chunk::<NO_SUFFIX, AVOID_BRANCH>(&mut buf, chunk, out, pos);
    }
    pos
  }

  // out must have 2 * chunk.len() + 1 bytes from pos, the escape literal is written ahead
  #[inline(always)]
  fn chunk<const NO_SUFFIX: bool, const AVOID_BRANCH: bool>(
    &self,
    buf: &mut [u8; BUF_LEN],
    chunk: &[u8],
    out: &mut [u8],
    mut pos: usize,
  ) -> usize {
    let len = chunk.len();
    buf[..len].copy_from_slice(chunk);
    // no multi-byte symbol contains the terminator, so no match runs past the chunk
    buf[len] = self.terminator;

    let zt = self.zt;
    let mut cur = 0;
    while cur < len {
      let word = load(&buf[cur..]);
      let code = self.short_codes[(word & 0xFFFF) as usize];
      let c = code as u8;
      if NO_SUFFIX && c.wrapping_sub(zt) < self.suffix_lim - zt {
        out[pos] = c;
        pos += 1;
        cur += 2;
        continue;
      }
      let s = self.hash_tab[hash(word & 0xFF_FFFF) as usize & (HASH_TAB_SIZE - 1)];
      out[pos + 1] = word as u8;
      if !s.is_free() && s.val == word & s.mask() {
        out[pos] = s.code() as u8;
        pos += 1;
        cur += s.symbol_len();
      } else if AVOID_BRANCH {
        out[pos] = c;
        pos += 1 + ((code & CODE_BASE) >> 8) as usize;
        cur += (code >> LEN_SHIFT) as usize;
      } else if c.wrapping_sub(zt) < self.byte_lim - zt {
        out[pos] = c;
        pos += 1;
        cur += 2;
      } else {
        out[pos] = c;
        pos += 1 + ((code & CODE_BASE) >> 8) as usize;
        cur += 1;
      }
    }
    pos
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::Table;

  fn table(symbols: &[&[u8]]) -> Encode {
    let mut st = Table::default();
    for s in symbols {
      assert!(st.add(Symbol::from_bytes(s)));
    }
    st.finalize()
  }

  #[test]
  fn empty_table_escapes_everything() {
    let enc = Table::default().finalize();
    let mut out = vec![];
    assert_eq!(enc.encode(b"abc", &mut out), 6);
    assert_eq!(out, [255, b'a', 255, b'b', 255, b'c']);
    assert_eq!(enc.find_longest_symbol(b"a"), None);
  }

  #[test]
  fn longest_symbol_wins() {
    let enc = table(&[b"ab", b"abcd", b"c"]);
    let ab = enc.find_longest_symbol(b"ab").unwrap_or(255);
    let abcd = enc.find_longest_symbol(b"abcdzz").unwrap_or(255);
    let c = enc.find_longest_symbol(b"c").unwrap_or(255);
    assert_eq!(enc.find_longest_symbol(b"abc"), Some(ab));
    assert_eq!(enc.find_longest_symbol(b"ca"), Some(c));
    assert_eq!(enc.find_longest_symbol(b"zz"), None);

    let mut out = vec![];
    enc.encode(b"abcdabcz", &mut out);
    assert_eq!(out, [abcd, ab, c, 255, b'z']);
  }

  #[test]
  fn variants_agree() {
    let enc = table(&[b"ab", b"abcd", b"cd", b"e", b"xyz12345"]);
    let lines = [&b"abcdeabxyz12345"[..], b"", b"cdcdcdq", b"ab"];
    let mut all = vec![];
    for v in [Variant::NoSuffixOpt, Variant::AvoidBranch, Variant::Branchy] {
      let mut out = vec![0u8; 256];
      let mut lens = vec![];
      assert_eq!(enc.compress_bulk_with(v, &lines, &mut out, &mut lens), 4);
      out.truncate(lens.iter().sum());
      all.push((out, lens));
    }
    assert_eq!(all[0], all[1]);
    assert_eq!(all[1], all[2]);
  }

  #[test]
  fn full_buffer_stops_at_line() {
    let enc = table(&[b"ab"]);
    let lines = [b"abab", b"abab", b"abab"];
    // each line needs 2 * 4 + 7 = 15 free bytes up front and writes 2
    let mut out = vec![0u8; 18];
    let mut lens = vec![];
    assert_eq!(enc.compress_bulk(&lines, &mut out, &mut lens), 2);
    assert_eq!(lens, [2, 2]);
  }
}
