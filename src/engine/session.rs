//! Host session seam
//!
//! The interactive environment the engine runs cells in. A notebook kernel
//! implements [`Session`] over its own namespace; [`CellSession`] is a
//! headless implementation whose cells are Rust closures.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

use crate::capture::Console;

/// Mutable mapping of names to values maintained for the user
pub type Namespace<V> = BTreeMap<String, V>;

/// Cell execution environment
pub trait Session {
    /// Value type stored in the namespace (the table handle)
    type Value;

    /// Execute a block of code against the namespace
    fn run_cell(&mut self, code: &str) -> Result<()>;

    /// Read a variable from the namespace
    fn variable(&self, name: &str) -> Option<Self::Value>;

    /// Merge variables into the namespace
    fn push(&mut self, variables: BTreeMap<String, Self::Value>);

    /// Remove output rendered so far for the current step
    fn clear_output(&mut self);
}

type Cell<V> = Box<dyn FnMut(&mut Namespace<V>, &Console) -> Result<()>>;

/// Session whose cells are registered closures, keyed by their code text
pub struct CellSession<V> {
    namespace: Namespace<V>,
    console: Console,
    cells: HashMap<String, Cell<V>>,
    executed: Vec<String>,
    clears: usize,
}

impl<V> CellSession<V> {
    pub fn new(console: Console) -> Self {
        Self {
            namespace: Namespace::new(),
            console,
            cells: HashMap::new(),
            executed: Vec::new(),
            clears: 0,
        }
    }

    /// Register the behavior of a cell
    pub fn register<F>(&mut self, code: impl Into<String>, cell: F) -> &mut Self
    where
        F: FnMut(&mut Namespace<V>, &Console) -> Result<()> + 'static,
    {
        self.cells.insert(code.into(), Box::new(cell));
        self
    }

    pub fn namespace(&self) -> &Namespace<V> {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut Namespace<V> {
        &mut self.namespace
    }

    /// Code of every cell executed so far, in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// How many times the output area was cleared
    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl<V: Clone> Session for CellSession<V> {
    type Value = V;

    fn run_cell(&mut self, code: &str) -> Result<()> {
        let cell = self
            .cells
            .get_mut(code)
            .ok_or_else(|| anyhow::anyhow!("No cell registered for code: {}", code))?;
        self.executed.push(code.to_string());
        cell(&mut self.namespace, &self.console)
    }

    fn variable(&self, name: &str) -> Option<V> {
        self.namespace.get(name).cloned()
    }

    fn push(&mut self, variables: BTreeMap<String, V>) {
        self.namespace.extend(variables);
    }

    fn clear_output(&mut self) {
        self.clears += 1;
    }
}
