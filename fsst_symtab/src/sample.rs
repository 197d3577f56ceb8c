//! Training sample
//! 训练样本

use crate::{Config, symbol::hash};

/// Sample lines stored back to back
/// 首尾相接存放的样本行
#[derive(Debug, Default, Clone)]
pub struct Sample {
  pub buf: Vec<u8>,
  // line i is buf[offsets[i]..offsets[i + 1]]
  pub offsets: Vec<usize>,
}

impl Sample {
  pub fn len(&self) -> usize {
    self.offsets.len().saturating_sub(1)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
    self.offsets.windows(2).map(|w| &self.buf[w[0]..w[1]])
  }

  fn push(&mut self, line: &[u8]) {
    self.buf.extend_from_slice(line);
    self.offsets.push(self.buf.len());
  }
}

/// Whole input below `sample_target` bytes, otherwise pseudo-random pieces of at most
/// `sample_line` bytes until the target is reached. Deterministic for a given seed.
///
/// 输入不足 `sample_target` 字节时整体使用，否则伪随机抽取不超过 `sample_line` 字节的片段
/// 直到达到目标大小。同一种子结果确定。
pub fn make_sample<T: AsRef<[u8]>>(li: &[T], config: &Config) -> Sample {
  let total: usize = li.iter().map(|l| l.as_ref().len()).sum();
  let target = config.sample_target;
  let mut sample = Sample {
    buf: Vec::with_capacity(total.min(target + config.sample_line)),
    offsets: vec![0],
  };

  if total < target {
    for line in li {
      sample.push(line.as_ref());
    }
    return sample;
  }

  let n = li.len() as u64;
  let piece = config.sample_line;
  let mut rnd = hash(config.seed);
  while sample.buf.len() < target {
    rnd = hash(rnd);
    let mut pick = (rnd % n) as usize;
    // total >= target > 0, so a non-empty line exists
    while li[pick].as_ref().is_empty() {
      pick += 1;
      if pick == li.len() {
        pick = 0;
      }
    }
    let line = li[pick].as_ref();
    let chunks = 1 + (line.len() - 1) / piece;
    rnd = hash(rnd);
    let start = piece * (rnd % chunks as u64) as usize;
    let end = line.len().min(start + piece);
    sample.push(&line[start..end]);
  }
  sample
}
