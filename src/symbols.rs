use crate::error::CompileError;

/// Slots are addressed by a single operand byte
pub(crate) const MAX_SYMBOLS: usize = u8::MAX as usize + 1;

/// The flat global variable table.
/// Every name gets a fixed slot the first time the compiler sees it, and keeps it for the rest of the program.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct SymbolTable {
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { names: Vec::new() }
    }

    /// Resolves a name to its slot, if it was defined before
    pub fn resolve(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|slot| slot as u8)
    }

    /// Returns the slot for this name, assigning the next free slot on first sight
    pub fn define(&mut self, name: &str) -> Result<u8, CompileError> {
        if let Some(slot) = self.resolve(name) {
            return Ok(slot);
        }

        if self.names.len() >= MAX_SYMBOLS {
            return Err(CompileError::TooManyVariables { max: MAX_SYMBOLS });
        }

        self.names.push(name.to_string());
        Ok((self.names.len() - 1) as u8)
    }

    /// The number of defined symbols
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_assigns_slots_in_order() {
        let mut symbols = SymbolTable::new();
        assert_eq!(symbols.define("a"), Ok(0));
        assert_eq!(symbols.define("b"), Ok(1));
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_define_is_deduplicated_by_name() {
        let mut symbols = SymbolTable::new();
        assert_eq!(symbols.define("a"), Ok(0));
        assert_eq!(symbols.define("b"), Ok(1));
        assert_eq!(symbols.define("a"), Ok(0));
        assert_eq!(symbols.into_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_resolve() {
        let mut symbols = SymbolTable::new();
        assert_eq!(symbols.resolve("a"), None);
        symbols.define("a").unwrap();
        assert_eq!(symbols.resolve("a"), Some(0));
    }

    #[test]
    fn test_too_many_symbols() {
        let mut symbols = SymbolTable::new();
        for i in 0..MAX_SYMBOLS {
            assert!(symbols.define(&format!("v{i}")).is_ok());
        }
        assert_eq!(
            symbols.define("one_too_many"),
            Err(CompileError::TooManyVariables { max: MAX_SYMBOLS })
        );
        // names that already have a slot keep resolving
        assert_eq!(symbols.define("v0"), Ok(0));
    }
}
