//! Dependency graph resolver
//!
//! Expands an ordered list of module instances into a dependency-ordered
//! sequence: every module appears after every module it depends on, missing
//! dependencies are auto-instantiated from their default factories exactly
//! once per concrete type, and cycles are detected with explicit three-state
//! node coloring over an iterative depth-first walk.
//!
//! Resolution failures are unrecoverable configuration errors - they
//! indicate a bug in how the application wires its modules - so the
//! resolver logs and panics instead of returning a partial graph.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

use crate::module::dependency::DependencyDeclaration;
use crate::module::traits::ModuleRef;

/// Stack frame for the iterative depth-first walk.
///
/// A module's declarations are evaluated exactly once, when its frame is
/// pushed; `next` tracks how many have been bound so far.
struct Frame {
    module: ModuleRef,
    deps: Vec<DependencyDeclaration>,
    next: usize,
}

/// Dependency graph resolver
///
/// See [`DependencyResolver::resolve`] for the contract. The resolver is
/// single-use internal state; callers interact with the associated function
/// only.
pub struct DependencyResolver {
    /// Output sequence, append-only, post-order
    resolved: Vec<ModuleRef>,
    /// Instance ids already appended to `resolved`
    resolved_ids: HashSet<usize>,
    /// First explicitly supplied instance per concrete type
    explicit: HashMap<TypeId, ModuleRef>,
    /// Auto-created instance per concrete type, shared across requesters
    by_type: HashMap<TypeId, ModuleRef>,
    /// Types currently being visited, in stack order (cycle detection)
    visiting: Vec<(TypeId, &'static str)>,
    visiting_types: HashSet<TypeId>,
}

impl DependencyResolver {
    /// Resolve `initial` into a dependency-ordered sequence.
    ///
    /// Ordering guarantees:
    ///
    /// - modules with no dependencies keep their relative input order;
    /// - a module's dependencies (recursively) appear immediately before
    ///   it, in declaration order;
    /// - an auto-created type requested from several places yields one
    ///   shared instance, positioned where it was first needed;
    /// - explicitly supplied instances are never replaced and are matched
    ///   by exact concrete type;
    /// - supplying the same instance twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics on a dependency cycle (reporting the cycle path) or on a
    /// mandatory dependency with no default factory and no matching
    /// instance anywhere in scope.
    pub fn resolve(initial: Vec<ModuleRef>) -> Vec<ModuleRef> {
        debug!(module_count = initial.len(), "starting module resolution");

        let mut explicit: HashMap<TypeId, ModuleRef> = HashMap::new();
        for module in &initial {
            explicit
                .entry(module.concrete_type_id())
                .or_insert_with(|| module.clone());
        }

        let mut resolver = Self {
            resolved: Vec::new(),
            resolved_ids: HashSet::new(),
            explicit,
            by_type: HashMap::new(),
            visiting: Vec::new(),
            visiting_types: HashSet::new(),
        };

        for module in &initial {
            resolver.visit(module.clone());
        }

        debug!(
            resolved_count = resolver.resolved.len(),
            "module resolution complete"
        );
        resolver.resolved
    }

    /// Depth-first post-order visit of one root module and everything it
    /// transitively depends on, driven by an explicit frame stack.
    fn visit(&mut self, root: ModuleRef) {
        if self.is_resolved(&root) {
            debug!(module = root.type_name(), "already resolved, skipping");
            return;
        }

        let mut stack = vec![self.enter(root)];

        while !stack.is_empty() {
            let (has_next, dep_index) = {
                let frame = stack.last_mut().expect("stack checked non-empty");
                if frame.next < frame.deps.len() {
                    let index = frame.next;
                    frame.next += 1;
                    (true, index)
                } else {
                    (false, 0)
                }
            };

            if !has_next {
                let frame = stack.pop().expect("stack checked non-empty");
                self.finish(frame.module);
                continue;
            }

            // Bind the next declaration, then descend into the bound
            // instance if it has not been resolved yet.
            let descend = {
                let frame = stack.last().expect("stack checked non-empty");
                let declaration = &frame.deps[dep_index];
                let instance = self.lookup_or_create(&frame.module, declaration);
                debug!(
                    module = frame.module.type_name(),
                    dependency = declaration.target_name(),
                    "binding dependency"
                );
                declaration.bind(&instance);
                if self.is_resolved(&instance) {
                    None
                } else {
                    Some(instance)
                }
            };

            if let Some(instance) = descend {
                let frame = self.enter(instance);
                stack.push(frame);
            }
        }
    }

    /// Locate the instance satisfying `declaration`, creating it from the
    /// default factory if needed. Fatal if the dependency is mandatory and
    /// nothing in scope matches.
    fn lookup_or_create(
        &mut self,
        owner: &ModuleRef,
        declaration: &DependencyDeclaration,
    ) -> ModuleRef {
        let target = declaration.target();

        // Explicitly supplied instances win, matched by exact concrete type.
        if let Some(instance) = self.explicit.get(&target) {
            return instance.clone();
        }

        // An instance auto-created earlier in this pass is shared.
        if let Some(instance) = self.by_type.get(&target) {
            return instance.clone();
        }

        if let Some(instance) = declaration.instantiate_default() {
            debug!(
                module = owner.type_name(),
                created = declaration.target_name(),
                "auto-created missing dependency"
            );
            self.by_type.insert(target, instance.clone());
            return instance;
        }

        self.fatal_unsatisfied(owner, declaration)
    }

    /// Push a module into the in-flight set, evaluating its declarations.
    /// Fatal if its concrete type is already in flight (re-entrant visit).
    fn enter(&mut self, module: ModuleRef) -> Frame {
        let type_id = module.concrete_type_id();
        if self.visiting_types.contains(&type_id) {
            self.fatal_cycle(&module);
        }
        self.visiting.push((type_id, module.type_name()));
        self.visiting_types.insert(type_id);

        let deps = module.dependencies().into_entries();
        debug!(
            module = module.type_name(),
            dependency_count = deps.len(),
            "visiting module"
        );
        Frame {
            module,
            deps,
            next: 0,
        }
    }

    /// Pop a module from the in-flight set and append it to the output.
    fn finish(&mut self, module: ModuleRef) {
        let type_id = module.concrete_type_id();
        self.visiting.pop();
        self.visiting_types.remove(&type_id);
        if self.resolved_ids.insert(module.instance_id()) {
            debug!(module = module.type_name(), "module resolved");
            self.resolved.push(module);
        }
    }

    fn is_resolved(&self, module: &ModuleRef) -> bool {
        self.resolved_ids.contains(&module.instance_id())
    }

    fn fatal_cycle(&self, offender: &ModuleRef) -> ! {
        let type_id = offender.concrete_type_id();
        let start = self
            .visiting
            .iter()
            .position(|(id, _)| *id == type_id)
            .unwrap_or(0);
        let mut path: Vec<&str> = self.visiting[start..].iter().map(|(_, name)| *name).collect();
        path.push(offender.type_name());
        let rendered = path.join(" -> ");
        error!(cycle = %rendered, "dependency cycle detected");
        panic!("dependency cycle detected: {rendered}");
    }

    fn fatal_unsatisfied(&self, owner: &ModuleRef, declaration: &DependencyDeclaration) -> ! {
        error!(
            module = owner.type_name(),
            missing = declaration.target_name(),
            "unsatisfied mandatory dependency"
        );
        panic!(
            "unsatisfied dependency: module '{}' requires '{}' but no instance exists and no default factory was declared",
            owner.type_name(),
            declaration.target_name()
        );
    }
}
