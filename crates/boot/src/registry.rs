//! Extension registry and load planning.
//!
//! The registry records descriptors in registration order and checks provider
//! claims as they arrive. [`ExtensionRegistry::plan`] then selects the active
//! provider(s) of every service and produces a deterministic initialization
//! order: a topological sort over "requires" edges in which, among extensions
//! whose dependencies are satisfied, the one registered first goes first.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;
use spi::{BootError, ExtensionDescriptor, ExtensionName, ProviderKind, ServiceName};
use tracing::debug;

/// The outcome of planning: who provides what, and in which order extensions
/// initialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    order: Vec<ExtensionName>,
    providers: BTreeMap<ServiceName, Vec<ExtensionName>>,
}

impl LoadPlan {
    /// Extensions in initialization order.
    pub fn order(&self) -> &[ExtensionName] {
        &self.order
    }

    /// The active providers of `service`, in load order. Empty when nothing
    /// provides it.
    pub fn providers_of(&self, service: &ServiceName) -> &[ExtensionName] {
        self.providers.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The services `extension` was selected to provide.
    pub fn selected_services(&self, extension: &ExtensionName) -> BTreeSet<ServiceName> {
        self.providers
            .iter()
            .filter(|(_, providers)| providers.contains(extension))
            .map(|(service, _)| service.clone())
            .collect()
    }

    /// Position of `extension` in the initialization order.
    pub fn position(&self, extension: &ExtensionName) -> Option<usize> {
        self.order.iter().position(|e| e == extension)
    }
}

/// Collects extension descriptors and resolves providers.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    descriptors: IndexMap<ExtensionName, ExtensionDescriptor>,
    claims: HashMap<ServiceName, Vec<(ExtensionName, ProviderKind)>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns a registered descriptor.
    pub fn descriptor(&self, name: &ExtensionName) -> Option<&ExtensionDescriptor> {
        self.descriptors.get(name)
    }

    /// Adds a descriptor.
    ///
    /// Fails without modifying the registry if the name is taken or if one of
    /// its provisions conflicts with an earlier claim. Exclusive claims
    /// conflict with any exclusive or shared claim on the same service; the
    /// check is symmetric, so the outcome does not depend on registration
    /// order. Conflicts between default providers are only detectable once
    /// every descriptor is known and are reported by [`Self::plan`].
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> Result<(), BootError> {
        let name = descriptor.name().clone();
        if self.descriptors.contains_key(&name) {
            return Err(BootError::DuplicateExtension { extension: name });
        }

        for provision in descriptor.provides_list() {
            let existing = self.claims.get(&provision.service).into_iter().flatten();
            for (other, kind) in existing {
                if conflicts(*kind, provision.kind) {
                    return Err(BootError::DuplicateProvider {
                        service: provision.service.clone(),
                        existing: other.clone(),
                        duplicate: name,
                    });
                }
            }
        }

        for provision in descriptor.provides_list() {
            self.claims
                .entry(provision.service.clone())
                .or_default()
                .push((name.clone(), provision.kind));
        }
        debug!(extension = %name, "Extension registered");
        self.descriptors.insert(name, descriptor);
        Ok(())
    }

    /// Returns the provider of `service`: the first active provider in
    /// registration order.
    pub fn resolve(&self, service: &ServiceName) -> Result<&ExtensionName, BootError> {
        self.resolve_all(service)?
            .into_iter()
            .next()
            .ok_or_else(|| BootError::UnresolvedDependency {
                service: service.clone(),
                required_by: None,
            })
    }

    /// Returns every active provider of `service`, in registration order.
    ///
    /// Default providers are active only when no other provider exists; more
    /// than one remaining default is a [`BootError::DuplicateProvider`].
    pub fn resolve_all(&self, service: &ServiceName) -> Result<Vec<&ExtensionName>, BootError> {
        let claims = self.claims.get(service).map(Vec::as_slice).unwrap_or(&[]);

        let overriding: Vec<&ExtensionName> = claims
            .iter()
            .filter(|(_, kind)| *kind != ProviderKind::Default)
            .map(|(name, _)| name)
            .collect();
        if !overriding.is_empty() {
            return Ok(overriding);
        }

        let defaults: Vec<&ExtensionName> = claims.iter().map(|(name, _)| name).collect();
        if let [first, second, ..] = defaults.as_slice() {
            return Err(BootError::DuplicateProvider {
                service: service.clone(),
                existing: (*first).clone(),
                duplicate: (*second).clone(),
            });
        }
        Ok(defaults)
    }

    /// Selects providers and computes the initialization order.
    ///
    /// - A hard requirement with no provider fails with
    ///   [`BootError::UnresolvedDependency`].
    /// - An optional requirement orders the requirer after the provider when
    ///   one exists and is otherwise ignored.
    /// - An extension requiring a service it also provides is not ordered
    ///   against itself.
    /// - A cycle fails with [`BootError::CyclicDependency`]; the reported path
    ///   reads "requires" from left to right.
    pub fn plan(&self) -> Result<LoadPlan, BootError> {
        let mut providers = BTreeMap::new();
        for service in self.claims.keys() {
            let selected: Vec<ExtensionName> =
                self.resolve_all(service)?.into_iter().cloned().collect();
            providers.insert(service.clone(), selected);
        }

        let count = self.descriptors.len();
        // requires[i] = indices of the extensions i depends on.
        let mut requires: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
        for (index, (name, descriptor)) in self.descriptors.iter().enumerate() {
            for requirement in descriptor.requires_list() {
                let selected = providers
                    .get(&requirement.service)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                if selected.is_empty() {
                    if requirement.optional {
                        continue;
                    }
                    return Err(BootError::UnresolvedDependency {
                        service: requirement.service.clone(),
                        required_by: Some(name.clone()),
                    });
                }
                for provider in selected {
                    if let Some(provider_index) = self.descriptors.get_index_of(provider) {
                        if provider_index != index {
                            requires[index].insert(provider_index);
                        }
                    }
                }
            }
        }

        let order = topological_order(&requires).map_err(|cycle| BootError::CyclicDependency {
            cycle: cycle
                .into_iter()
                .filter_map(|i| self.descriptors.get_index(i).map(|(name, _)| name.clone()))
                .collect(),
        })?;

        Ok(LoadPlan {
            order: order
                .into_iter()
                .filter_map(|i| self.descriptors.get_index(i).map(|(name, _)| name.clone()))
                .collect(),
            providers,
        })
    }
}

fn conflicts(a: ProviderKind, b: ProviderKind) -> bool {
    matches!(
        (a, b),
        (ProviderKind::Exclusive, ProviderKind::Exclusive | ProviderKind::Shared)
            | (ProviderKind::Shared, ProviderKind::Exclusive)
    )
}

/// Kahn's algorithm with the lowest ready index first. On failure returns a
/// cycle as a closed path of indices along "requires" edges.
fn topological_order(requires: &[BTreeSet<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let count = requires.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pending: Vec<usize> = vec![0; count];
    for (index, deps) in requires.iter().enumerate() {
        pending[index] = deps.len();
        for &dep in deps {
            dependents[dep].push(index);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == count {
        return Ok(order);
    }

    // Every unplaced node still waits on an unplaced dependency, so following
    // the lowest unplaced dependency from any unplaced node must revisit a node.
    let mut path: Vec<usize> = Vec::new();
    let mut current = (0..count).find(|&i| pending[i] > 0).unwrap_or(0);
    loop {
        if let Some(start) = path.iter().position(|&i| i == current) {
            let mut cycle = path.split_off(start);
            cycle.push(current);
            return Err(cycle);
        }
        path.push(current);
        match requires[current].iter().find(|&&dep| pending[dep] > 0) {
            Some(&dep) => current = dep,
            None => return Err(path),
        }
    }
}
