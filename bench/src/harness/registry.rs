use std::collections::BTreeMap;

use tmsync::SyncPolicy;

use super::{
    ArrayInsertTest, ArraySumTest, BankTest, Benchmark, HashInsertTest, ListInsertTest, Runner,
    TreeInsertTest, TreeRemoveTest, Workload,
};

/// Builds a benchmark running under the given policy.
pub type Constructor = fn(SyncPolicy) -> Box<dyn Benchmark>;

/// Table of benchmarks by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Constructor>,
}

fn runner<W: Workload + Default + 'static>(policy: SyncPolicy) -> Box<dyn Benchmark> {
    Box::new(Runner::new(W::default(), policy))
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in workload.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, Constructor); 7] = [
            (ArraySumTest.name(), runner::<ArraySumTest>),
            (ArrayInsertTest.name(), runner::<ArrayInsertTest>),
            (ListInsertTest.name(), runner::<ListInsertTest>),
            (TreeInsertTest.name(), runner::<TreeInsertTest>),
            (TreeRemoveTest.name(), runner::<TreeRemoveTest>),
            (HashInsertTest.name(), runner::<HashInsertTest>),
            (BankTest::default().name(), runner::<BankTest>),
        ];
        for (name, constructor) in builtins {
            let _ = registry.register(name, constructor);
        }
        registry
    }

    /// Registers `constructor` under `name`, returning the constructor it replaces.
    pub fn register(&mut self, name: &str, constructor: Constructor) -> Option<Constructor> {
        self.entries.insert(name.to_string(), constructor)
    }

    /// Builds the benchmark registered under `name`.
    pub fn create(&self, name: &str, policy: SyncPolicy) -> Option<Box<dyn Benchmark>> {
        self.entries.get(name).map(|constructor| constructor(policy))
    }

    /// Returns `true` if a benchmark is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}
