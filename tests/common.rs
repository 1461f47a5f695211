//! Shared fixtures for the integration test suite
//!
//! A small zoo of module types exercising every declaration shape: leaf
//! modules, chained dependencies, mandatory dependencies, dynamic groups,
//! provide/collect mediators, and configure-step recorders.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use modkit::{
    Collect, CollectDeclaration, Dependency, DependencyGroup, DependencyList, Module,
    ModuleContext, ModuleError, Provide, ProvideDeclaration,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Ordering fixture: T2 depends on T4, T5, T3; T4 depends on T5; T1 depends
// on T2, T3; T7 depends on T1; T6 and the rest are leaves.
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct T3;
impl Module for T3 {}

#[derive(Default)]
pub struct T5;
impl Module for T5 {}

#[derive(Default)]
pub struct T4 {
    pub five: Dependency<T5>,
}
impl Module for T4 {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.five.declaration())
    }
}

#[derive(Default)]
pub struct T2 {
    pub four: Dependency<T4>,
    pub five: Dependency<T5>,
    pub three: Dependency<T3>,
}
impl Module for T2 {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new()
            .with(self.four.declaration())
            .with(self.five.declaration())
            .with(self.three.declaration())
    }
}

#[derive(Default)]
pub struct T1 {
    pub two: Dependency<T2>,
    pub three: Dependency<T3>,
}
impl Module for T1 {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new()
            .with(self.two.declaration())
            .with(self.three.declaration())
    }
}

#[derive(Default)]
pub struct T6;
impl Module for T6 {}

#[derive(Default)]
pub struct T7 {
    pub one: Dependency<T1>,
}
impl Module for T7 {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.one.declaration())
    }
}

// ---------------------------------------------------------------------------
// Cycle fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CycleA {
    pub b: Dependency<CycleB>,
}
impl Module for CycleA {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.b.declaration())
    }
}

#[derive(Default)]
pub struct CycleB {
    pub a: Dependency<CycleA>,
}
impl Module for CycleB {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.a.declaration())
    }
}

#[derive(Default)]
pub struct SelfLoop {
    pub me: Dependency<SelfLoop>,
}
impl Module for SelfLoop {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.me.declaration())
    }
}

// ---------------------------------------------------------------------------
// Mandatory dependency fixture: Database has no default factory.
// ---------------------------------------------------------------------------

pub struct Database {
    pub path: String,
}
impl Database {
    pub fn open(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}
impl Module for Database {}

pub struct NeedsDatabase {
    pub db: Dependency<Database>,
}
impl NeedsDatabase {
    pub fn new() -> Self {
        Self {
            db: Dependency::required(),
        }
    }
}
impl Module for NeedsDatabase {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.db.declaration())
    }
}

// ---------------------------------------------------------------------------
// Dynamic group fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct WorkerA;
impl Module for WorkerA {}

#[derive(Default)]
pub struct WorkerB;
impl Module for WorkerB {}

pub struct Fleet {
    pub workers: DependencyGroup,
}
impl Fleet {
    /// WorkerA, WorkerB, WorkerA - the duplicate exercises in-group dedup.
    pub fn new() -> Self {
        Self {
            workers: DependencyGroup::builder()
                .add::<WorkerA>()
                .add::<WorkerB>()
                .add::<WorkerA>()
                .build(),
        }
    }

    pub fn sized(worker_count: usize) -> Self {
        let mut builder = DependencyGroup::builder();
        for _ in 0..worker_count {
            builder = builder.add_with(WorkerA::default);
        }
        Self {
            workers: builder.build(),
        }
    }
}
impl Module for Fleet {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with_group(&self.workers)
    }
}

pub struct EmptyFleet {
    pub workers: DependencyGroup,
}
impl EmptyFleet {
    pub fn new() -> Self {
        Self {
            workers: DependencyGroup::empty(),
        }
    }
}
impl Module for EmptyFleet {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with_group(&self.workers)
    }
}

// ---------------------------------------------------------------------------
// Provide/Collect fixtures
// ---------------------------------------------------------------------------

/// Provides `2`, `Some(3)`, `None`, and `[4, 5, 6]` - collected as
/// `[2, 3, 4, 5, 6]`.
pub struct NumberSource {
    pub single: Provide<i32>,
    pub present: Provide<i32>,
    pub absent: Provide<i32>,
    pub batch: Provide<i32>,
}
impl Default for NumberSource {
    fn default() -> Self {
        Self {
            single: Provide::new(2),
            present: Provide::optional(Some(3)),
            absent: Provide::optional(None),
            batch: Provide::many(vec![4, 5, 6]),
        }
    }
}
impl Module for NumberSource {
    fn provides(&self) -> Vec<ProvideDeclaration> {
        vec![
            self.single.declaration(),
            self.present.declaration(),
            self.absent.declaration(),
            self.batch.declaration(),
        ]
    }
}

#[derive(Default)]
pub struct NumberSink {
    pub numbers: Collect<i32>,
}
impl Module for NumberSink {
    fn collects(&self) -> Vec<CollectDeclaration> {
        vec![self.numbers.declaration()]
    }
}

pub struct BatchProvider {
    pub values: Provide<i32>,
}
impl BatchProvider {
    pub fn with_values(values: Vec<i32>) -> Self {
        Self {
            values: Provide::many(values),
        }
    }
}
impl Module for BatchProvider {
    fn provides(&self) -> Vec<ProvideDeclaration> {
        vec![self.values.declaration()]
    }
}

/// Second provider type so two independently typed modules can contribute
/// to the same collected value type.
pub struct SecondBatchProvider {
    pub values: Provide<i32>,
}
impl SecondBatchProvider {
    pub fn with_values(values: Vec<i32>) -> Self {
        Self {
            values: Provide::many(values),
        }
    }
}
impl Module for SecondBatchProvider {
    fn provides(&self) -> Vec<ProvideDeclaration> {
        vec![self.values.declaration()]
    }
}

// ---------------------------------------------------------------------------
// Configure-step fixtures
// ---------------------------------------------------------------------------

pub type ConfigureLog = Arc<Mutex<Vec<String>>>;

pub struct StageA {
    pub log: ConfigureLog,
}
#[async_trait]
impl Module for StageA {
    async fn configure(&self, _context: ModuleContext) -> Result<(), ModuleError> {
        self.log.lock().unwrap().push("StageA".to_string());
        Ok(())
    }
}

pub struct StageB {
    pub log: ConfigureLog,
    pub a: Dependency<StageA>,
}
#[async_trait]
impl Module for StageB {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.a.declaration())
    }

    async fn configure(&self, _context: ModuleContext) -> Result<(), ModuleError> {
        self.log.lock().unwrap().push("StageB".to_string());
        Ok(())
    }
}

pub struct StageC {
    pub log: ConfigureLog,
    pub b: Dependency<StageB>,
}
#[async_trait]
impl Module for StageC {
    fn dependencies(&self) -> DependencyList {
        DependencyList::new().with(self.b.declaration())
    }

    async fn configure(&self, _context: ModuleContext) -> Result<(), ModuleError> {
        self.log.lock().unwrap().push("StageC".to_string());
        Ok(())
    }
}

pub struct FailingModule;
#[async_trait]
impl Module for FailingModule {
    async fn configure(&self, _context: ModuleContext) -> Result<(), ModuleError> {
        Err(ModuleError::Operation("boom".to_string()))
    }
}

/// Records the configure context for assertions: module id and one config
/// value.
#[derive(Default)]
pub struct ContextProbe {
    pub seen_id: Arc<Mutex<Option<String>>>,
    pub seen_endpoint: Arc<Mutex<Option<String>>>,
}
#[async_trait]
impl Module for ContextProbe {
    async fn configure(&self, context: ModuleContext) -> Result<(), ModuleError> {
        *self.seen_id.lock().unwrap() = Some(context.module_id.clone());
        *self.seen_endpoint.lock().unwrap() = Some(context.get_config_or("endpoint", "unset"));
        Ok(())
    }
}
