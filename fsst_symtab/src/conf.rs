//! Training configuration
//! 训练配置

/// Frequency counter layout
/// 频率计数器布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
  /// 16-bit cells, simple and larger
  /// 16 位计数单元，简单但占用更大
  Plain,
  /// High/low split cells with zero skipping
  /// 高低位拆分计数，可跳过零区
  Split,
}

/// Training options
/// 训练选项
#[derive(Debug, Clone, Copy)]
pub enum Conf {
  /// Sample size in bytes; smaller inputs are used whole
  /// 样本字节数，更小的输入整体使用
  SampleTarget(usize),

  /// Longest piece copied from one line into the sample
  /// 单行拷入样本的最长片段
  SampleLine(usize),

  /// Sample fraction (of 128) of the first round
  /// 首轮的样本比例 (128 分之几)
  FracStart(u32),

  /// Fraction added each round
  /// 每轮增加的比例
  FracStep(u32),

  /// Count multiplier for single-byte candidates
  /// 单字节候选的计数倍数
  Promote(u64),

  /// Minimum count at full fraction; scaled by frac/128 each round, never above the
  /// sample's line count
  /// 全比例时的最小计数，每轮按 frac/128 缩放，且不超过样本行数
  MinCount(u64),

  /// Seed of the sampling generator
  /// 采样随机数种子
  Seed(u64),

  /// Reserve byte 0 as terminator, kept at code 0
  /// 保留字节 0 作为终止符，固定为编码 0
  ZeroTerminated(bool),

  /// Frequency counter layout used while training
  /// 训练时使用的频率计数器布局
  Counter(CounterMode),
}

/// Resolved training configuration
/// 解析后的训练配置
#[derive(Debug, Clone)]
pub struct Config {
  /// Sample size in bytes
  /// 样本字节数
  pub sample_target: usize,

  /// Longest piece of one line in the sample
  /// 样本中单行片段的最大长度
  pub sample_line: usize,

  /// Fraction (of 128) of the first round
  /// 首轮比例 (128 分之几)
  pub frac_start: u32,

  /// Fraction added per round
  /// 每轮增加的比例
  pub frac_step: u32,

  /// Count multiplier for single bytes
  /// 单字节计数倍数
  pub promote: u64,

  /// Minimum candidate count at the full fraction
  /// 全比例时候选的最小计数
  pub min_count: u64,

  /// Sampling seed
  /// 采样种子
  pub seed: u64,

  /// Byte 0 is the terminator, kept at code 0
  /// 字节 0 为终止符，固定为编码 0
  pub zero_terminated: bool,

  /// Counter layout
  /// 计数器布局
  pub counter: CounterMode,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      sample_target: default::SAMPLE_TARGET,
      sample_line: default::SAMPLE_LINE,
      frac_start: default::FRAC_START,
      frac_step: default::FRAC_STEP,
      promote: default::PROMOTE,
      min_count: default::MIN_COUNT,
      seed: default::SEED,
      zero_terminated: false,
      counter: default::COUNTER,
    }
  }
}

impl From<&[Conf]> for Config {
  fn from(conf_li: &[Conf]) -> Self {
    let mut config = Self::default();
    for &conf in conf_li {
      match conf {
        Conf::SampleTarget(0) => log::warn!("SampleTarget 0 ignored"),
        Conf::SampleTarget(v) => config.sample_target = v,
        Conf::SampleLine(0) => log::warn!("SampleLine 0 ignored"),
        Conf::SampleLine(v) => config.sample_line = v,
        Conf::FracStart(v) => {
          if v == 0 || v > default::FRAC_FULL {
            log::warn!("FracStart {v} out of range (1-{})", default::FRAC_FULL);
          } else {
            config.frac_start = v;
          }
        }
        Conf::FracStep(0) => log::warn!("FracStep 0 ignored"),
        Conf::FracStep(v) => config.frac_step = v,
        Conf::Promote(v) => config.promote = v.max(1),
        Conf::MinCount(v) => config.min_count = v,
        Conf::Seed(v) => config.seed = v,
        Conf::ZeroTerminated(v) => config.zero_terminated = v,
        Conf::Counter(v) => config.counter = v,
      }
    }
    config
  }
}

impl Config {
  /// Minimum count for a candidate at `frac`
  /// 比例为 `frac` 时候选符号的最小计数
  #[inline]
  pub fn min_count(&self, frac: u32) -> u64 {
    self.min_count * frac as u64 / default::FRAC_FULL as u64
  }
}

/// Default values
/// 默认值
pub mod default {
  use super::CounterMode;

  pub const SAMPLE_TARGET: usize = 1 << 14;
  pub const SAMPLE_LINE: usize = 512;
  pub const FRAC_START: u32 = 8;
  pub const FRAC_STEP: u32 = 30;

  /// Whole sample, the last round
  /// 全样本，即最后一轮
  pub const FRAC_FULL: u32 = 128;

  pub const PROMOTE: u64 = 8;
  pub const MIN_COUNT: u64 = 5;
  pub const SEED: u64 = 4637947;
  pub const COUNTER: CounterMode = CounterMode::Split;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_conf() {
    let config = Config::from(
      &[
        Conf::SampleTarget(4096),
        Conf::FracStart(0),
        Conf::FracStep(0),
        Conf::Counter(CounterMode::Plain),
        Conf::ZeroTerminated(true),
      ][..],
    );
    assert_eq!(config.sample_target, 4096);
    assert_eq!(config.frac_start, default::FRAC_START);
    assert_eq!(config.frac_step, default::FRAC_STEP);
    assert_eq!(config.counter, CounterMode::Plain);
    assert!(config.zero_terminated);
  }

  #[test]
  fn min_count_scales() {
    let config = Config::default();
    assert_eq!(config.min_count(8), 0);
    assert_eq!(config.min_count(38), 1);
    assert_eq!(config.min_count(98), 3);
    assert_eq!(config.min_count(128), 5);
  }
}
