use indexmap::IndexMap;
use mlarch::Field;

use crate::error::Error;

/// Pending relocation: once the symbol is known, add
/// `position * factor / divisor` into `field` of instruction `insn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub insn: usize,
    pub field: Field,
    pub factor: i64,
    pub divisor: i64,
    /// 1-based source line of the reference
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Symbol {
    pub position: Option<i64>,
    /// Line of the definition
    pub defined_at: Option<usize>,
    pub actions: Vec<Action>,
}

/// Symbol table in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    map: IndexMap<String, Symbol>,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols {
            map: IndexMap::new(),
        }
    }

    pub fn define(&mut self, name: &str, position: i64, line: usize) -> Result<(), Error> {
        let sym = self.map.entry(name.to_string()).or_default();
        if let Some(prev) = sym.defined_at {
            return Err(Error::RedefinedSymbol(name.to_string(), prev));
        }
        sym.position = Some(position);
        sym.defined_at = Some(line);
        Ok(())
    }

    pub fn reference(&mut self, name: &str, action: Action) {
        self.map
            .entry(name.to_string())
            .or_default()
            .actions
            .push(action);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.map.get(name)
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.map.get(name).and_then(|sym| sym.position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
