use std::fmt;

use super::Table;
use crate::{CODE_BASE, encode::Encode};

impl fmt::Debug for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Table (building), terminator {}:", self.terminator)?;
    writeln!(f, "n_symbols: {}", self.n_symbols)?;
    for (i, s) in self.symbols.iter().enumerate().skip(CODE_BASE as usize) {
      writeln!(f, "symbols[{i}]: {s}")?;
    }
    writeln!(f, "len_histo: {:?}", self.len_histo)
  }
}

impl fmt::Display for Encode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Encode, terminator {}:", self.terminator())?;
    writeln!(f, "n_symbols: {}", self.n_symbols())?;
    for (i, s) in self.symbols().iter().enumerate() {
      writeln!(f, "symbols[{i}]: {s}")?;
    }
    writeln!(
      f,
      "suffix_lim: {}, byte_lim: {}",
      self.suffix_lim(),
      self.byte_lim()
    )?;
    writeln!(f, "len_histo: {:?}", self.len_histo())
  }
}

impl fmt::Debug for Encode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

#[cfg(test)]
mod tests {
  use crate::{Symbol, Table};

  #[test]
  fn dump() {
    let mut st = Table::default();
    assert!(st.add(Symbol::from_bytes(b"hey")));
    assert!(format!("{st:?}").contains("symbols[256]: hey"));
    let enc = st.finalize();
    let s = enc.to_string();
    assert!(s.contains("symbols[0]: hey"));
    assert!(s.contains("n_symbols: 1"));
  }
}
