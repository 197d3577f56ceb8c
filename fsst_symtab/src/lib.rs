#![cfg_attr(docsrs, feature(doc_cfg))]

//! Adaptive static symbol table string compression (FSST)
//! 自适应静态符号表字符串压缩 (FSST)
//!
//! A table of up to 255 symbols (1 to 8 bytes each) is trained on a sample,
//! then every string is rewritten as one byte code per symbol, with an escape
//! code for bytes the table does not cover.
//! 在样本上训练出最多 255 个符号 (每个 1 到 8 字节)，之后每个字符串按符号
//! 改写为单字节编码，表中没有的字节用转义码输出。

pub mod conf;
pub mod counter;
pub mod decode;
pub mod dict;
pub mod encode;
pub mod error;
pub mod sample;
pub mod symbol;
pub mod table;

pub use conf::{Conf, Config, CounterMode};
pub use decode::Decode;
pub use dict::Dict;
pub use encode::{Encode, Variant};
pub use error::{Error, Result};
pub use symbol::Symbol;
pub use table::Table;

/// Escape code: the next byte is a literal
/// 转义码：下一字节为原样字面量
pub const ESC: u8 = 255;

/// During construction codes below 256 stand for the raw byte itself
/// 构建期间小于 256 的编码代表字节本身
pub const CODE_BASE: u16 = 256;

/// Code field width in icl and in the short/byte code entries
/// icl 及短码表项中 code 字段的位宽
pub const CODE_BITS: u32 = 12;
pub const CODE_LIMIT: u16 = 1 << CODE_BITS;
pub const CODE_MASK: u16 = CODE_LIMIT - 1;

/// Code space tracked by the frequency counters (256 pseudo + 255 real)
/// 频率计数覆盖的编码空间 (256 伪码 + 255 实码)
pub const COUNT_CODES: usize = 512;

/// Length shift inside a short/byte code entry
/// 短码表项中长度字段的偏移
pub const LEN_SHIFT: u32 = 12;

pub const ICL_LEN_SHIFT: u64 = 28;
pub const ICL_CODE_SHIFT: u64 = 16;
// length 15 with code 4095: above any occupied icl
pub const ICL_FREE: u64 = (15 << ICL_LEN_SHIFT) | ((CODE_MASK as u64) << ICL_CODE_SHIFT);

pub const HASH_TAB_SIZE: usize = 1 << 10;
pub const MAX_SYMBOL_LEN: usize = 8;
pub const MAX_SYMBOLS: u16 = 255;

/// Compression works on chunks of at most this many bytes
/// 压缩以不超过此长度的分块进行
pub const CHUNK: usize = 511;

/// Worst case output size for `len` input bytes
/// `len` 字节输入的最坏输出大小
pub const fn bound(len: usize) -> usize {
  2 * len + 7 * len.div_ceil(CHUNK)
}

/// Train a table on `li` with default configuration
/// 用默认配置在 `li` 上训练符号表
pub fn train<T: AsRef<[u8]>>(li: &[T]) -> Encode {
  train_with(li, &Config::default())
}

pub fn train_with<T: AsRef<[u8]>>(li: &[T], config: &Config) -> Encode {
  table::builder::build(li, config)
}

/// Concatenated codes and the compressed length of each line
/// 拼接后的编码及每行压缩长度
pub fn compress<T: AsRef<[u8]>>(enc: &Encode, li: &[T]) -> (Vec<u8>, Vec<usize>) {
  enc.compress(li)
}

pub fn decompress(dec: &Decode, codes: &[u8], lens: &[usize]) -> Result<(Vec<u8>, Vec<usize>)> {
  dec.decompress(codes, lens)
}
