//! Iterative symbol table construction
//! 迭代构建符号表

use std::collections::{BinaryHeap, HashMap};

use crate::{
  CODE_BASE, CODE_MASK, Config, CounterMode, MAX_SYMBOL_LEN, MAX_SYMBOLS,
  conf::default::FRAC_FULL,
  counter::{Count, Plain, Split},
  encode::Encode,
  sample::{Sample, make_sample},
  symbol::{QSymbol, Symbol, hash},
  table::Table,
};

/// Sample `li`, train with the configured counter layout, finalize.
/// 采样 `li`，按配置的计数器布局训练，然后定稿。
pub fn build<T: AsRef<[u8]>>(li: &[T], config: &Config) -> Encode {
  let sample = make_sample(li, config);
  if sample.buf.is_empty() {
    return Table::new(0, config.zero_terminated).finalize();
  }
  match config.counter {
    CounterMode::Split => build_with::<Split>(&sample, config),
    CounterMode::Plain => build_with::<Plain>(&sample, config),
  }
}

/// Least frequent byte of the sample, lowest value on ties; byte 0 when zero-terminated.
/// 样本中出现最少的字节，并列取最小值；零终止模式下为 0。
pub fn terminator(sample: &Sample, zero_terminated: bool) -> u8 {
  if zero_terminated {
    return 0;
  }
  let mut histo = [0usize; 256];
  for &b in &sample.buf {
    histo[b as usize] += 1;
  }
  (0..=u8::MAX).min_by_key(|&b| histo[b as usize]).unwrap_or(0)
}

/// Line `i` is left out of a round at fraction `frac` (of 128).
/// 比例为 `frac` (128 分之几) 时第 `i` 行不参与本轮。
#[inline]
pub fn skip_line(i: usize, frac: u32) -> bool {
  frac < FRAC_FULL && 1 + (hash((i as u64 + 1) * frac as u64) & 127) > frac as u64
}

/// Whether rounds below the full fraction leave lines out. A sample of fewer than 128 lines
/// cannot be cut into 128ths, so every round counts all of it.
/// 低于全比例的轮次是否跳过行。不足 128 行的样本无法按 128 分之几切分，每轮都统计全部。
#[inline]
pub fn skips_lines(sample: &Sample) -> bool {
  sample.len() >= FRAC_FULL as usize
}

/// Candidate threshold of a round: the configured minimum scaled by `frac`, capped by the
/// line count so a piece found in every line always passes.
/// 本轮候选阈值：配置的最小计数按 `frac` 缩放，并以行数为上限，使每行都出现的片段必定入选。
#[inline]
pub fn threshold(config: &Config, sample: &Sample, frac: u32) -> u64 {
  config.min_count(frac).min(sample.len() as u64)
}

/// Compress the sample with `st`, counting codes and code pairs. Returns the gain,
/// bytes saved over the escaped form.
/// 用 `st` 压缩样本，统计编码及编码对。返回增益，即相对全转义节省的字节数。
pub fn count<C: Count>(st: &Table, sample: &Sample, frac: u32, counters: &mut C) -> i64 {
  let mut gain = 0i64;
  let cost = |code: u16| 1 + (code < CODE_BASE) as i64;
  let skips = skips_lines(sample);
  for (i, line) in sample.lines().enumerate() {
    if line.is_empty() || (skips && skip_line(i, frac)) {
      continue;
    }
    let mut start = 0;
    let mut code1 = st.find_longest_symbol(line);
    let mut cur = st.symbol(code1).symbol_len();
    gain += cur as i64 - cost(code1);
    loop {
      counters.inc1(code1 as usize);
      // a multi-byte match also counts its first byte, so the byte survives as fallback
      if st.symbol(code1).symbol_len() != 1 {
        counters.inc1(line[start] as usize);
      }
      if cur == line.len() {
        break;
      }
      start = cur;
      let code2 = st.find_longest_symbol(&line[cur..]);
      let len2 = st.symbol(code2).symbol_len();
      cur += len2;
      gain += len2 as i64 - cost(code2);
      if frac < FRAC_FULL {
        counters.inc2(code1 as usize, code2 as usize);
        if len2 > 1 {
          counters.inc2(code1 as usize, line[start] as usize);
        }
      }
      code1 = code2;
    }
  }
  gain
}

/// Candidate symbols with their summed gain (count * length). Counts below `min` are dropped.
/// 候选符号及其累计增益 (计数 * 长度)。计数低于 `min` 的丢弃。
pub fn candidates<C: Count>(
  st: &Table,
  counters: &mut C,
  frac: u32,
  min: u64,
  config: &Config,
) -> HashMap<Symbol, u64> {
  let mut cands = HashMap::new();
  let mut add = |s: Symbol, count: u64| {
    if count >= min {
      *cands.entry(s).or_insert(0) += count * s.symbol_len() as u64;
    }
  };

  // the terminator is always a candidate, under its real code once it has one
  let term = st.byte_codes[st.terminator as usize] & CODE_MASK;
  counters.set1(term as usize, u32::MAX);

  let lim = st.symbols.len();
  let mut pos1 = 0;
  while pos1 < lim {
    let cnt1 = counters.next1(&mut pos1);
    if cnt1 == 0 || pos1 >= lim {
      pos1 += 1;
      continue;
    }
    let s1 = st.symbol(pos1 as u16);
    let promote = if s1.symbol_len() == 1 { config.promote } else { 1 };
    add(s1, promote * cnt1 as u64);

    if frac < FRAC_FULL && s1.symbol_len() < MAX_SYMBOL_LEN && s1.first() != st.terminator {
      let mut pos2 = 0;
      while pos2 < lim {
        let cnt2 = counters.next2(pos1, &mut pos2);
        if cnt2 != 0 && pos2 < lim {
          let s2 = st.symbol(pos2 as u16);
          if s2.first() != st.terminator && s2.symbol_len() < MAX_SYMBOL_LEN {
            add(Symbol::concat(s1, s2), cnt2 as u64);
          }
        }
        pos2 += 1;
      }
    }
    pos1 += 1;
  }
  cands
}

/// Next table: the terminator at code 256, then the best candidates by gain, at most 255.
/// 下一张表：终止符占编码 256，其后按增益取最优候选，最多 255 个。
pub fn make_table<C: Count>(
  st: &Table,
  counters: &mut C,
  frac: u32,
  min: u64,
  config: &Config,
) -> Table {
  let term = Symbol::from_bytes(&[st.terminator]);
  let mut heap = candidates(st, counters, frac, min, config)
    .into_iter()
    .filter(|(symbol, _)| *symbol != term)
    .map(|(symbol, gain)| QSymbol { symbol, gain })
    .collect::<BinaryHeap<_>>();
  let mut next = Table::new(st.terminator, st.zero_terminated);
  // saturated counts can tie or outrank it, so it does not go through the heap
  next.add(term);
  while next.n_symbols < MAX_SYMBOLS {
    let Some(q) = heap.pop() else {
      break;
    };
    // a hash slot clash drops the loser
    next.add(q.symbol);
  }
  next
}

pub fn build_with<C: Count>(sample: &Sample, config: &Config) -> Encode {
  let term = terminator(sample, config.zero_terminated);
  let mut st = Table::new(term, config.zero_terminated);
  let mut best = st.clone();
  let mut best_gain = i64::MIN;
  let mut best_counts = Vec::new();

  let mut frac = config.frac_start;
  loop {
    let mut counters = C::default();
    let gain = count(&st, sample, frac, &mut counters);
    log::debug!("frac {frac}: gain {gain}, {} symbols", st.n_symbols);
    if gain >= best_gain {
      best_gain = gain;
      best = st.clone();
      best_counts = counters.backup1();
    }
    if frac >= FRAC_FULL {
      break;
    }
    st = make_table(&st, &mut counters, frac, threshold(config, sample, frac), config);
    frac = (frac + config.frac_step).min(FRAC_FULL);
  }

  // last pass over the single counts of the best round only
  let mut counters = C::default();
  counters.restore1(&best_counts);
  let min = threshold(config, sample, FRAC_FULL);
  let st = make_table(&best, &mut counters, FRAC_FULL, min, config);
  log::debug!(
    "best gain {best_gain}, terminator {term}, {} symbols",
    st.n_symbols
  );
  st.finalize()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(li: &[&[u8]]) -> Sample {
    make_sample(li, &Config::default())
  }

  #[test]
  fn terminator_least_frequent() {
    let s = sample(&[b"aab"]);
    assert_eq!(terminator(&s, false), 0);
    let all: Vec<u8> = (0..=255u8).chain(0..=254u8).collect();
    let s = sample(&[&all]);
    assert_eq!(terminator(&s, false), 255);
    assert_eq!(terminator(&s, true), 0);
  }

  #[test]
  fn full_round_keeps_every_line() {
    assert!((0..1000).all(|i| !skip_line(i, FRAC_FULL)));
    let kept = (0..1000).filter(|&i| !skip_line(i, 68)).count();
    assert!(kept > 300 && kept < 800, "{kept}");
  }

  #[test]
  fn count_empty_table() {
    let s = sample(&[b"hello", b"hi"]);
    let st = Table::new(0, false);
    let mut c = Split::default();
    // every byte escapes: 1 byte in, 2 out
    assert_eq!(count(&st, &s, FRAC_FULL, &mut c), -7);
    assert_eq!(c.get1(b'h' as usize), 2);
    assert_eq!(c.get1(b'l' as usize), 2);
    assert_eq!(c.get2(b'h' as usize, b'e' as usize), 0);
  }

  #[test]
  fn candidates_merge_and_threshold() {
    let mut st = Table::new(0, false);
    assert!(st.add(Symbol::from_bytes(b"\0")));
    assert!(st.add(Symbol::from_bytes(b"a")));
    let mut c = Plain::default();
    for _ in 0..10 {
      c.inc1(257);
      c.inc1(b'a' as usize);
      c.inc2(257, b'b' as usize);
    }
    c.inc2(257, b'c' as usize);
    let config = Config::default();
    let cands = candidates(&st, &mut c, 68, config.min_count(68), &config);
    // pseudo "a" and real "a" merge: (10 + 10) * promote
    assert_eq!(cands[&Symbol::from_bytes(b"a")], 20 * config.promote);
    assert_eq!(cands[&Symbol::from_bytes(b"ab")], 20);
    // one "ac" is below min count 5 * 68 / 128 = 2
    assert!(!cands.contains_key(&Symbol::from_bytes(b"ac")));
    assert!(cands.contains_key(&Symbol::from_bytes(b"\0")));
  }

  #[test]
  fn eight_byte_operand_not_extended() {
    let mut st = Table::new(0, false);
    assert!(st.add(Symbol::from_bytes(b"ab")));
    assert!(st.add(Symbol::from_bytes(b"xxxxxxxx")));
    let mut c = Plain::default();
    for _ in 0..10 {
      c.inc1(256);
      c.inc1(257);
      c.inc2(256, 257);
      c.inc2(256, b'c' as usize);
      c.inc2(257, b'x' as usize);
    }
    let cands = candidates(&st, &mut c, 68, 2, &Config::default());
    assert!(cands.contains_key(&Symbol::from_bytes(b"abc")));
    assert!(!cands.contains_key(&Symbol::from_bytes(b"abxxxxxx")));
    assert!(!cands.keys().any(|s| s.symbol_len() == 8 && *s != Symbol::from_bytes(b"xxxxxxxx")));
  }

  #[test]
  fn terminator_keeps_first_code() {
    let mut st = Table::new(b'#', false);
    assert!(st.add(Symbol::from_bytes(b"a")));
    assert!(st.add(Symbol::from_bytes(b"#")));
    let mut c = Split::default();
    // real and pseudo "a" both saturated: their sum outranks the terminator
    c.set1(256, u32::MAX);
    c.set1(b'a' as usize, u32::MAX);
    let next = make_table(&st, &mut c, 68, 2, &Config::default());
    assert_eq!(next.symbol(CODE_BASE), Symbol::from_bytes(b"#"));
    assert_eq!(next.symbol(CODE_BASE + 1), Symbol::from_bytes(b"a"));
    assert_eq!(next.n_symbols, 2);
  }

  #[test]
  fn small_sample_counted_whole() {
    let config = Config::default();
    let s = sample(&[b"aaaa", b"aaab", b"aaac"]);
    assert!(!skips_lines(&s));
    assert_eq!(threshold(&config, &s, FRAC_FULL), 3);
    assert_eq!(threshold(&config, &s, 68), 2);

    let li: Vec<Vec<u8>> = (0..200u8).map(|i| vec![b'k', i]).collect();
    let s = make_sample(&li, &config);
    assert!(skips_lines(&s));
    assert_eq!(threshold(&config, &s, FRAC_FULL), config.min_count);

    // every line is counted even at the lowest fraction
    let s = sample(&[b"ab", b"ab", b"ab"]);
    let mut c = Plain::default();
    count(&Table::new(0, false), &s, 8, &mut c);
    assert_eq!(c.get2(b'a' as usize, b'b' as usize), 3);
  }
}
