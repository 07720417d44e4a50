use hashbrown::{HashMap, HashSet};
use rspirv::spirv::{BuiltIn, Capability, Word};

use crate::{
    item::Item,
    variable::{ConstVal, Value},
};

/// Interning key for constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstKey {
    Bool(bool),
    Scalar(Word, ConstVal),
    Composite(Word, Vec<Word>),
}

/// Signature of a defined or forward-called function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub ty: Word,
    pub ret: Word,
    pub params: Vec<Word>,
}

/// Module scope bookkeeping: everything that is interned or must be found again later.
#[derive(Clone, Debug, Default)]
pub struct LookupTables {
    pub types: HashMap<Item, Word>,
    pub items: HashMap<Word, Item>,
    pub constants: HashMap<ConstKey, Word>,
    pub constant_values: HashMap<Word, ConstVal>,

    /// Constants and module scope variables.
    pub globals: HashMap<Word, Word>,
    pub functions: HashMap<Word, Signature>,
    /// Callees referenced before their definition.
    pub forward_calls: HashMap<Word, Signature>,

    pub capabilities: HashSet<Capability>,
    pub extensions: HashSet<String>,
    pub ext_inst_imports: HashMap<String, Word>,
    pub entry_points: HashMap<String, Word>,
    pub used_builtins: HashMap<BuiltIn, Value>,
    pub bindings: HashMap<(u32, u32), Word>,

    pub annotations: HashSet<Vec<u32>>,
    pub debug_names: HashSet<(Word, Option<u32>)>,
}

impl LookupTables {
    /// Type of a module scope id, if it carries one.
    pub fn global_type(&self, id: Word) -> Option<Word> {
        self.globals
            .get(&id)
            .copied()
            .or_else(|| self.functions.get(&id).map(|sig| sig.ty))
    }

    /// Whether the id names anything that can be annotated.
    pub fn is_defined(&self, id: Word) -> bool {
        self.items.contains_key(&id)
            || self.globals.contains_key(&id)
            || self.functions.contains_key(&id)
            || self.ext_inst_imports.values().any(|it| *it == id)
    }
}
