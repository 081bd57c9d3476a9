use std::collections::HashSet;

/// Read-only snapshot of known ticker symbols.
///
/// Built once at startup and shared behind an `Arc`; newly imported
/// instruments are picked up only by building a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct InstrumentIndex {
    symbols: HashSet<String>,
}

impl InstrumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        index.extend(symbols);
        index
    }

    /// Add symbols while the snapshot is being built. Empty symbols are ignored.
    pub fn extend<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols.extend(
            symbols
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty()),
        );
    }

    /// Case-sensitive lookup, symbols are compared as stored.
    pub fn contains(&self, token: &str) -> bool {
        self.symbols.contains(token)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Rough heap footprint of the symbol strings, for startup logging.
    pub fn approx_size_bytes(&self) -> usize {
        self.symbols.iter().map(|s| s.len()).sum()
    }
}
