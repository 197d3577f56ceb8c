use crate::{
  CODE_BASE, CODE_LIMIT, CODE_MASK, ESC, HASH_TAB_SIZE, LEN_SHIFT, MAX_SYMBOL_LEN, MAX_SYMBOLS,
  encode::Encode,
  symbol::{Symbol, hash, load},
};

pub mod builder;
mod fmt;

// escape entry of a finalized byte/short code: bit 8 set, low byte ESC
pub(crate) const ESC_CODE: u16 = CODE_BASE | ESC as u16 | (1 << LEN_SHIFT);

/// Symbol table under construction. Codes 0..256 are the bytes themselves,
/// added symbols take codes from 256 upward. [`Table::finalize`] turns it into an [`Encode`].
///
/// 构建中的符号表。编码 0..256 代表字节本身，新增符号从 256 起取码。
/// [`Table::finalize`] 将其转为 [`Encode`]。
#[derive(Clone)]
pub struct Table {
  // first two bytes -> code | len << 12
  pub short_codes: Box<[u16]>,
  // byte -> code | 1 << 12
  pub byte_codes: [u16; 256],
  pub symbols: Vec<Symbol>,
  pub hash_tab: Box<[Symbol]>,
  pub n_symbols: u16,
  pub terminator: u8,
  pub zero_terminated: bool,
  pub len_histo: [u16; MAX_SYMBOL_LEN],
}

impl Default for Table {
  fn default() -> Self {
    Self::new(0, false)
  }
}

impl Table {
  pub fn new(terminator: u8, zero_terminated: bool) -> Self {
    let mut symbols = Vec::with_capacity(CODE_BASE as usize + MAX_SYMBOLS as usize);
    symbols.extend((0..CODE_BASE).map(|i| Symbol::from_char(i as u8, i)));

    let mut byte_codes = [0u16; 256];
    for (i, code) in byte_codes.iter_mut().enumerate() {
      *code = (1 << LEN_SHIFT) | i as u16;
    }
    let short_codes = (0..1usize << 16)
      .map(|i| byte_codes[i & 0xFF])
      .collect::<Box<[u16]>>();

    Self {
      short_codes,
      byte_codes,
      symbols,
      hash_tab: vec![Symbol::new(); HASH_TAB_SIZE].into_boxed_slice(),
      n_symbols: 0,
      terminator,
      zero_terminated,
      len_histo: [0; MAX_SYMBOL_LEN],
    }
  }

  /// Add a symbol under the next code. Returns false, leaving the table unchanged, if its
  /// hash slot is taken (3+ bytes) or it is multi-byte and holds the terminator.
  /// 以下一个编码加入符号。3 字节以上符号的哈希槽被占用，或多字节符号含终止符时返回 false，表不变。
  pub fn add(&mut self, mut s: Symbol) -> bool {
    let code = CODE_BASE + self.n_symbols;
    assert!(code < CODE_LIMIT, "symbol table full at {} symbols", self.n_symbols);
    let len = s.symbol_len();
    s.set_code_len(code, len);
    s.val &= s.mask();
    // the codec ends each chunk with the terminator and relies on no match crossing it
    if len > 1 && s.holds(self.terminator) {
      return false;
    }
    match len {
      1 => self.byte_codes[s.first() as usize] = code | (1 << LEN_SHIFT),
      2 => self.short_codes[s.first2() as usize] = code | (2 << LEN_SHIFT),
      _ => {
        let slot = &mut self.hash_tab[s.hash() as usize & (HASH_TAB_SIZE - 1)];
        if !slot.is_free() {
          return false;
        }
        *slot = s;
      }
    }
    self.symbols.push(s);
    self.n_symbols += 1;
    self.len_histo[len - 1] += 1;
    true
  }

  /// Code of the longest symbol that prefixes `input` (non-empty), falling back to the
  /// single byte pseudo code.
  /// 返回作为 `input` (非空) 前缀的最长符号编码，否则退回单字节伪码。
  pub fn find_longest_symbol(&self, input: &[u8]) -> u16 {
    debug_assert!(!input.is_empty());
    let len = input.len().min(MAX_SYMBOL_LEN);
    let word = load(input);
    let s = self.hash_tab[hash(word & 0xFF_FFFF) as usize & (HASH_TAB_SIZE - 1)];
    if !s.is_free() && s.symbol_len() <= len && s.val == word & s.mask() {
      return s.code();
    }
    if len >= 2 {
      let code = self.short_codes[(word & 0xFFFF) as usize] & CODE_MASK;
      if code >= CODE_BASE {
        return code;
      }
    }
    self.byte_codes[(word & 0xFF) as usize] & CODE_MASK
  }

  #[inline]
  pub fn symbol(&self, code: u16) -> Symbol {
    self.symbols[code as usize]
  }

  /// Renumber to dense codes 0..n ordered 2,3,..,8,1 by length. Two-byte symbols that no
  /// longer symbol extends come first, below `suffix_lim`. In zero-terminated mode the
  /// terminator stays at code 0.
  ///
  /// 重新编号为 0..n 的紧凑编码，按长度 2,3,..,8,1 排列。没有更长符号以之开头的两字节符号
  /// 排在最前，位于 `suffix_lim` 之下。零终止模式下终止符保持编码 0。
  pub fn finalize(mut self) -> Encode {
    let n = self.n_symbols as usize;
    assert!(n <= MAX_SYMBOLS as usize, "finalize: {n} symbols, at most {MAX_SYMBOLS}");
    let base = CODE_BASE as usize;
    let old = &self.symbols[base..base + n];
    let zt = usize::from(
      self.zero_terminated && n > 0 && old[0].symbol_len() == 1 && old[0].first() == 0,
    );

    let histo = self.len_histo.map(usize::from);
    let byte_lim = n - (histo[0] - zt);
    let mut rsum = [0usize; MAX_SYMBOL_LEN];
    rsum[0] = byte_lim;
    rsum[1] = zt;
    for i in 1..MAX_SYMBOL_LEN - 1 {
      rsum[i + 1] = rsum[i] + histo[i];
    }

    let mut new_code = [0u8; 256];
    let mut symbols = vec![Symbol::new(); n];
    if zt == 1 {
      let mut s = old[0];
      s.set_code_len(0, 1);
      symbols[0] = s;
    }

    let mut suffix_lim = rsum[1];
    let mut j = rsum[2];
    for (i, &s) in old.iter().enumerate().skip(zt) {
      let len = s.symbol_len();
      let code = if len == 2 {
        let first2 = s.first2();
        let extended = old
          .iter()
          .enumerate()
          .any(|(k, o)| k != i && o.symbol_len() > 2 && o.first2() == first2);
        if extended {
          j -= 1;
          j
        } else {
          suffix_lim += 1;
          suffix_lim - 1
        }
      } else {
        rsum[len - 1] += 1;
        rsum[len - 1] - 1
      };
      new_code[i] = code as u8;
      let mut s = s;
      s.set_code_len(code as u16, len);
      symbols[code] = s;
    }

    for bc in self.byte_codes.iter_mut() {
      let code = *bc & CODE_MASK;
      *bc = if code >= CODE_BASE {
        new_code[(code - CODE_BASE) as usize] as u16 | (1 << LEN_SHIFT)
      } else {
        ESC_CODE
      };
    }
    for (i, sc) in self.short_codes.iter_mut().enumerate() {
      let code = *sc & CODE_MASK;
      *sc = if code >= CODE_BASE {
        new_code[(code - CODE_BASE) as usize] as u16 | (*sc & !CODE_MASK)
      } else {
        self.byte_codes[i & 0xFF]
      };
    }
    for slot in self.hash_tab.iter_mut() {
      if !slot.is_free() {
        *slot = symbols[new_code[(slot.code() - CODE_BASE) as usize] as usize];
      }
    }

    let mut len_histo = [0u8; MAX_SYMBOL_LEN];
    for (h, &v) in len_histo.iter_mut().zip(&histo) {
      *h = v as u8;
    }

    Encode {
      short_codes: self.short_codes,
      byte_codes: self.byte_codes,
      hash_tab: self.hash_tab,
      symbols,
      terminator: self.terminator,
      zt: zt as u8,
      suffix_lim: suffix_lim as u8,
      byte_lim: byte_lim as u8,
      len_histo,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_table() {
    let st = Table::default();
    assert_eq!(st.n_symbols, 0);
    for i in 0..=255u8 {
      assert_eq!(st.symbol(i as u16), Symbol::from_char(i, i as u16));
      assert_eq!(st.find_longest_symbol(&[i]), i as u16);
    }
    assert!(st.hash_tab.iter().all(Symbol::is_free));
  }

  #[test]
  fn longest_match() {
    let mut st = Table::default();
    assert!(st.add(Symbol::from_bytes(b"ab")));
    assert!(st.add(Symbol::from_bytes(b"abcd")));
    assert!(st.add(Symbol::from_bytes(b"x")));
    assert_eq!(st.find_longest_symbol(b"abcdef"), 257);
    assert_eq!(st.find_longest_symbol(b"abc"), 256);
    assert_eq!(st.find_longest_symbol(b"a"), b'a' as u16);
    assert_eq!(st.find_longest_symbol(b"xyz"), 258);
    assert_eq!(st.len_histo, [1, 1, 0, 1, 0, 0, 0, 0]);
  }

  #[test]
  fn hash_collision_rejected() {
    let mut st = Table::default();
    assert!(st.add(Symbol::from_bytes(b"abcd")));
    // same first three bytes, same slot
    assert!(!st.add(Symbol::from_bytes(b"abcx")));
    assert_eq!(st.n_symbols, 1);
    assert_eq!(st.symbols.len(), CODE_BASE as usize + 1);
  }

  #[test]
  fn terminator_only_alone() {
    let mut st = Table::new(b'#', false);
    assert!(!st.add(Symbol::from_bytes(b"a#")));
    assert!(!st.add(Symbol::from_bytes(b"ab#cd")));
    assert!(st.add(Symbol::from_bytes(b"#")));
    assert!(st.add(Symbol::from_bytes(b"a")));
    assert_eq!(st.n_symbols, 2);
    assert_eq!(st.find_longest_symbol(b"a#"), 257);
  }

  #[test]
  fn finalize_orders_by_length() {
    let mut st = Table::default();
    for s in [&b"e"[..], b"he", b"hello", b"lo", b"abc"] {
      assert!(st.add(Symbol::from_bytes(s)));
    }
    let enc = st.finalize();
    assert_eq!(enc.n_symbols(), 5);
    // "lo" is not extended and gets the lowest code, "he" prefixes "hello"
    assert_eq!(enc.suffix_lim(), 1);
    assert_eq!(enc.symbol(0), Symbol::from_bytes(b"lo"));
    assert_eq!(enc.symbol(1), Symbol::from_bytes(b"he"));
    assert_eq!(enc.symbol(2), Symbol::from_bytes(b"abc"));
    assert_eq!(enc.symbol(3), Symbol::from_bytes(b"hello"));
    assert_eq!(enc.symbol(4), Symbol::from_bytes(b"e"));
    for code in 0..5u16 {
      assert_eq!(enc.symbol(code).code(), code);
    }
  }

  #[test]
  fn finalize_zero_terminated_keeps_code_0() {
    let mut st = Table::new(0, true);
    for s in [&b"\0"[..], b"ab", b"abc", b"q"] {
      assert!(st.add(Symbol::from_bytes(s)));
    }
    let enc = st.finalize();
    assert_eq!(enc.symbol(0), Symbol::from_bytes(b"\0"));
    assert_eq!(enc.symbol(1), Symbol::from_bytes(b"ab"));
    assert_eq!(enc.symbol(2), Symbol::from_bytes(b"abc"));
    assert_eq!(enc.symbol(3), Symbol::from_bytes(b"q"));
    assert_eq!(enc.suffix_lim(), 1);
  }
}
