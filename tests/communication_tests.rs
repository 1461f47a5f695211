//! Provide/Collect mediator tests
//!
//! Exercises the full manager-driven path and the custom-host path where
//! the declarations are run against a repository by hand.

mod common;

use common::*;
use modkit::{
    Collect, DependencyResolver, ModuleManager, ModuleRef, Provide, SharedRepository,
};
use std::sync::Arc;

#[tokio::test]
async fn manager_collects_all_provided_shapes_in_order() {
    init_tracing();

    let source = Arc::new(NumberSource::default());
    let sink = Arc::new(NumberSink::default());

    let mut manager = ModuleManager::new();
    manager
        .register(ModuleRef::from_arc(Arc::clone(&source)))
        .register(ModuleRef::from_arc(Arc::clone(&sink)));
    manager.start().await.expect("startup");

    // Plain 2, present optional 3, absent optional skipped, batch 4..6.
    assert_eq!(sink.numbers.get(), &[2, 3, 4, 5, 6]);
    assert!(source.single.is_collected());
    assert!(source.absent.is_collected());
}

#[tokio::test]
async fn providers_contribute_in_resolved_module_order() {
    let first = Arc::new(BatchProvider::with_values(vec![10, 11]));
    let second = Arc::new(SecondBatchProvider::with_values(vec![20]));
    let sink = Arc::new(NumberSink::default());

    let mut manager = ModuleManager::new();
    manager.register_all(vec![
        ModuleRef::from_arc(Arc::clone(&first)),
        ModuleRef::from_arc(Arc::clone(&second)),
        ModuleRef::from_arc(Arc::clone(&sink)),
    ]);
    manager.start().await.expect("startup");

    assert_eq!(sink.numbers.get(), &[10, 11, 20]);
}

#[tokio::test]
async fn collect_with_no_providers_is_empty() {
    let sink = Arc::new(NumberSink::default());

    let mut manager = ModuleManager::new();
    manager.register(ModuleRef::from_arc(Arc::clone(&sink)));
    manager.start().await.expect("startup");

    assert!(sink.numbers.is_bound());
    assert!(sink.numbers.get().is_empty());
}

#[tokio::test]
async fn collector_before_provider_in_input_still_sees_everything() {
    // The provide pass is a barrier over all modules, so input order of the
    // collector relative to its providers does not matter.
    let sink = Arc::new(NumberSink::default());
    let provider = Arc::new(BatchProvider::with_values(vec![1, 2, 3]));

    let mut manager = ModuleManager::new();
    manager
        .register(ModuleRef::from_arc(Arc::clone(&sink)))
        .register(ModuleRef::from_arc(Arc::clone(&provider)));
    manager.start().await.expect("startup");

    assert_eq!(sink.numbers.get(), &[1, 2, 3]);
}

#[tokio::test]
async fn differently_typed_values_do_not_mix() {
    struct LabelProvider {
        labels: Provide<String>,
    }
    impl modkit::Module for LabelProvider {
        fn provides(&self) -> Vec<modkit::ProvideDeclaration> {
            vec![self.labels.declaration()]
        }
    }

    #[derive(Default)]
    struct LabelSink {
        labels: Collect<String>,
    }
    impl modkit::Module for LabelSink {
        fn collects(&self) -> Vec<modkit::CollectDeclaration> {
            vec![self.labels.declaration()]
        }
    }

    let numbers = Arc::new(BatchProvider::with_values(vec![7]));
    let labels = Arc::new(LabelProvider {
        labels: Provide::new("alpha".to_string()),
    });
    let number_sink = Arc::new(NumberSink::default());
    let label_sink = Arc::new(LabelSink::default());

    let mut manager = ModuleManager::new();
    manager.register_all(vec![
        ModuleRef::from_arc(Arc::clone(&numbers)),
        ModuleRef::from_arc(Arc::clone(&labels)),
        ModuleRef::from_arc(Arc::clone(&number_sink)),
        ModuleRef::from_arc(Arc::clone(&label_sink)),
    ]);
    manager.start().await.expect("startup");

    assert_eq!(number_sink.numbers.get(), &[7]);
    assert_eq!(label_sink.labels.get(), &["alpha".to_string()]);
}

#[test]
fn push_accumulates_before_the_provide_phase() {
    let provide = Provide::many(vec![1]);
    provide.push(2);
    provide.push(3);

    let repository = SharedRepository::new();
    provide.declaration().collect_into(&repository);

    let collect = Collect::<i32>::new();
    collect.declaration().bind_from(&repository);
    assert_eq!(collect.get(), &[1, 2, 3]);
}

#[test]
#[should_panic(expected = "read before the provide phase completed")]
fn premature_collect_read_panics() {
    let sink = NumberSink::default();
    let _ = sink.numbers.get();
}

#[test]
#[should_panic(expected = "mutated after collection")]
fn push_after_collection_panics() {
    let provide = Provide::new(1);
    let repository = SharedRepository::new();
    provide.declaration().collect_into(&repository);
    provide.push(2);
}

#[test]
#[should_panic(expected = "collected twice")]
fn running_one_declaration_twice_panics() {
    let provide = Provide::new(1);
    let repository = SharedRepository::new();
    let declaration = provide.declaration();
    declaration.collect_into(&repository);
    declaration.collect_into(&repository);
}

#[test]
#[should_panic(expected = "bound twice")]
fn binding_one_collect_slot_twice_panics() {
    let collect = Collect::<i32>::new();
    let repository = SharedRepository::new();
    let declaration = collect.declaration();
    declaration.bind_from(&repository);
    declaration.bind_from(&repository);
}

/// Drives the phases by hand the way a custom host would: resolve, run
/// every provide declaration, then bind every collect slot.
#[test]
fn custom_host_drives_phases_without_the_manager() {
    let source = Arc::new(NumberSource::default());
    let sink = Arc::new(NumberSink::default());

    let resolved = DependencyResolver::resolve(vec![
        ModuleRef::from_arc(Arc::clone(&source)),
        ModuleRef::from_arc(Arc::clone(&sink)),
    ]);

    let repository = SharedRepository::new();
    for module in &resolved {
        for provide in module.provides() {
            provide.collect_into(&repository);
        }
    }
    for module in &resolved {
        for collect in module.collects() {
            collect.bind_from(&repository);
        }
    }

    assert_eq!(sink.numbers.get(), &[2, 3, 4, 5, 6]);
}
