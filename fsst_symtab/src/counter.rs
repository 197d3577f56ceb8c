//! Single and pair frequency counters over the construction code space
//! 构建期编码空间上的单码与码对频率计数

use crate::COUNT_CODES;

/// Saturation of single counts
/// 单码计数上限
pub const MAX1: u32 = 255 * 256;

/// Saturation of pair counts (4-bit high part)
/// 码对计数上限 (高位 4 位)
pub const MAX2: u32 = 15 * 256;

const HALF: usize = COUNT_CODES / 2;

// zero bytes after the high arrays, so an 8-byte window never leaves the buffer
const PAD: usize = 8;

pub trait Count: Default {
  fn inc1(&mut self, code: usize);
  fn inc2(&mut self, code1: usize, code2: usize);
  fn get1(&self, code: usize) -> u32;
  fn get2(&self, code1: usize, code2: usize) -> u32;

  /// Values above [`MAX1`] saturate
  /// 超过 [`MAX1`] 的值饱和
  fn set1(&mut self, code: usize, val: u32);

  /// Count at `*pos`; may advance `*pos` over codes known to be zero, in which case 0 is returned.
  /// 返回 `*pos` 处计数；可跳过已知为零的编码，此时返回 0。
  fn next1(&self, pos: &mut usize) -> u32 {
    self.get1(*pos)
  }

  fn next2(&self, pos1: usize, pos2: &mut usize) -> u32 {
    self.get2(pos1, *pos2)
  }

  fn backup1(&self) -> Vec<u16> {
    (0..COUNT_CODES).map(|code| self.get1(code) as u16).collect()
  }

  fn restore1(&mut self, backup: &[u16]) {
    for (code, &v) in backup.iter().enumerate() {
      self.set1(code, v as u32);
    }
  }
}

/// One 16-bit cell per count
/// 每个计数一个 16 位单元
#[derive(Clone)]
pub struct Plain {
  count1: Vec<u16>,
  count2: Vec<u16>,
}

impl Default for Plain {
  fn default() -> Self {
    Self {
      count1: vec![0; COUNT_CODES],
      count2: vec![0; COUNT_CODES * COUNT_CODES],
    }
  }
}

impl Count for Plain {
  #[inline]
  fn inc1(&mut self, code: usize) {
    let c = &mut self.count1[code];
    if (*c as u32) < MAX1 {
      *c += 1;
    }
  }

  #[inline]
  fn inc2(&mut self, code1: usize, code2: usize) {
    let c = &mut self.count2[code1 * COUNT_CODES + code2];
    if (*c as u32) < MAX2 {
      *c += 1;
    }
  }

  #[inline]
  fn get1(&self, code: usize) -> u32 {
    self.count1[code] as u32
  }

  #[inline]
  fn get2(&self, code1: usize, code2: usize) -> u32 {
    self.count2[code1 * COUNT_CODES + code2] as u32
  }

  fn set1(&mut self, code: usize, val: u32) {
    self.count1[code] = val.min(MAX1) as u16;
  }
}

/// Counts split into a low byte and a high part, the high part bumped as soon as low leaves 0.
/// A zero high part therefore means a zero count, and zero runs are skipped 8 bytes (singles)
/// or 16 nibbles (pairs) at a time.
///
/// 计数拆为低字节与高位部分，低字节离开 0 时高位即加一。
/// 因此高位为零即计数为零，零区可按 8 字节 (单码) 或 16 个半字节 (码对) 整块跳过。
#[derive(Clone)]
pub struct Split {
  high1: Vec<u8>,
  low1: Vec<u8>,
  // two 4-bit high parts per byte, even code in the low nibble
  // 每字节存两个 4 位高位，偶数编码在低半字节
  high2: Vec<u8>,
  low2: Vec<u8>,
}

impl Default for Split {
  fn default() -> Self {
    Self {
      high1: vec![0; COUNT_CODES + PAD],
      low1: vec![0; COUNT_CODES],
      high2: vec![0; COUNT_CODES * HALF + PAD],
      low2: vec![0; COUNT_CODES * COUNT_CODES],
    }
  }
}

#[inline(always)]
fn window(v: &[u8], at: usize) -> u64 {
  v.get(at..)
    .and_then(|s| s.first_chunk::<8>())
    .map_or(0, |b| u64::from_le_bytes(*b))
}

#[inline(always)]
fn join(high: u32, low: u32) -> u32 {
  // high was bumped early, take it back while low is mid-run
  // 高位提前加过一，低字节非零时减回
  ((high - (low != 0) as u32) << 8) + low
}

impl Count for Split {
  #[inline]
  fn inc1(&mut self, code: usize) {
    let low = &mut self.low1[code];
    if *low == 0 {
      let high = &mut self.high1[code];
      if *high == u8::MAX {
        return;
      }
      *high += 1;
    }
    *low = low.wrapping_add(1);
  }

  #[inline]
  fn inc2(&mut self, code1: usize, code2: usize) {
    let low = &mut self.low2[code1 * COUNT_CODES + code2];
    if *low == 0 {
      let high = &mut self.high2[code1 * HALF + (code2 >> 1)];
      let shift = (code2 & 1) << 2;
      if (*high >> shift) & 15 == 15 {
        return;
      }
      *high += 1 << shift;
    }
    *low = low.wrapping_add(1);
  }

  #[inline]
  fn get1(&self, code: usize) -> u32 {
    join(self.high1[code] as u32, self.low1[code] as u32)
  }

  #[inline]
  fn get2(&self, code1: usize, code2: usize) -> u32 {
    let high = (self.high2[code1 * HALF + (code2 >> 1)] >> ((code2 & 1) << 2)) & 15;
    join(high as u32, self.low2[code1 * COUNT_CODES + code2] as u32)
  }

  fn set1(&mut self, code: usize, val: u32) {
    let val = val.min(MAX1);
    let low = val & 255;
    self.low1[code] = low as u8;
    self.high1[code] = ((val >> 8) + (low != 0) as u32) as u8;
  }

  fn next1(&self, pos: &mut usize) -> u32 {
    let high = window(&self.high1, *pos);
    let skip = if high == 0 {
      7
    } else {
      (high.trailing_zeros() >> 3) as usize
    };
    let h = ((high >> (skip << 3)) & 255) as u32;
    *pos += skip;
    if *pos >= COUNT_CODES || h == 0 {
      return 0;
    }
    join(h, self.low1[*pos] as u32)
  }

  fn next2(&self, pos1: usize, pos2: &mut usize) -> u32 {
    let odd = *pos2 & 1;
    let high = window(&self.high2, pos1 * HALF + (*pos2 >> 1)) >> (odd << 2);
    let skip = if high == 0 {
      15 - odd
    } else {
      (high.trailing_zeros() >> 2) as usize
    };
    let h = ((high >> (skip << 2)) & 15) as u32;
    *pos2 += skip;
    // the window may run into the next row, those nibbles land past COUNT_CODES
    if *pos2 >= COUNT_CODES || h == 0 {
      return 0;
    }
    join(h, self.low2[pos1 * COUNT_CODES + *pos2] as u32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_carries_into_high() {
    let mut c = Split::default();
    for n in 1..=600u32 {
      c.inc1(300);
      assert_eq!(c.get1(300), n);
    }
    for n in 1..=300u32 {
      c.inc2(7, 9);
      assert_eq!(c.get2(7, 9), n);
    }
    assert_eq!(c.get2(7, 8), 0);
    assert_eq!(c.get2(7, 10), 0);
  }

  #[test]
  fn saturates() {
    let mut c = Split::default();
    let mut p = Plain::default();
    for _ in 0..MAX2 + 100 {
      c.inc2(1, 2);
      p.inc2(1, 2);
    }
    assert_eq!(c.get2(1, 2), MAX2);
    assert_eq!(p.get2(1, 2), MAX2);

    c.set1(5, u32::MAX);
    p.set1(5, u32::MAX);
    c.inc1(5);
    p.inc1(5);
    assert_eq!(c.get1(5), MAX1);
    assert_eq!(p.get1(5), MAX1);
  }

  #[test]
  fn set1_round_trips() {
    let mut c = Split::default();
    for v in [0, 1, 255, 256, 257, 511, 512, 65279, MAX1] {
      c.set1(42, v);
      assert_eq!(c.get1(42), v);
    }
  }

  #[test]
  fn next_skips_zero_runs() {
    let mut c = Split::default();
    c.inc1(3);
    c.inc1(100);
    c.inc1(COUNT_CODES - 1);
    let mut seen = vec![];
    let mut pos = 0;
    while pos < COUNT_CODES {
      if c.next1(&mut pos) != 0 {
        seen.push(pos);
      }
      pos += 1;
    }
    assert_eq!(seen, [3, 100, COUNT_CODES - 1]);

    c.inc2(4, 0);
    c.inc2(4, 33);
    c.inc2(4, 34);
    c.inc2(5, 1);
    let mut seen = vec![];
    let mut pos2 = 0;
    while pos2 < COUNT_CODES {
      if c.next2(4, &mut pos2) != 0 {
        seen.push(pos2);
      }
      pos2 += 1;
    }
    assert_eq!(seen, [0, 33, 34]);
  }
}
