//! Property tests for provider selection and load ordering.

use boot::ExtensionRegistry;
use proptest::prelude::*;
use spi::{BootError, ExtensionDescriptor, ExtensionName, ProviderKind, ServiceName};

fn extension(index: usize) -> ExtensionName {
    ExtensionName::new(format!("ext-{index}")).unwrap()
}

fn service(index: usize) -> ServiceName {
    ServiceName::new(format!("svc-{index}")).unwrap()
}

/// A random acyclic graph: extension `i` provides `svc-i` and may require any
/// service of a lower index. Registration order is shuffled separately.
fn acyclic_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|count| {
        let edges = (0..count)
            .map(|i| proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i))
            .collect::<Vec<_>>();
        let order = Just((0..count).collect::<Vec<_>>()).prop_shuffle();
        (edges, order)
    })
}

fn descriptor(index: usize, requires: &[usize]) -> ExtensionDescriptor {
    let provider = ExtensionDescriptor::new(extension(index))
        .provides_service(service(index), ProviderKind::Exclusive);
    requires.iter().fold(provider, |descriptor, &dep| {
        descriptor.requires_service(service(dep), false)
    })
}

proptest! {
    #[test]
    fn every_provider_precedes_its_requirers((edges, registration) in acyclic_graph()) {
        let mut registry = ExtensionRegistry::new();
        for &index in &registration {
            registry.register(descriptor(index, &edges[index])).unwrap();
        }

        let plan = registry.plan().unwrap();
        prop_assert_eq!(plan.order().len(), edges.len());
        for (index, deps) in edges.iter().enumerate() {
            let requirer = plan.position(&extension(index)).unwrap();
            for &dep in deps {
                let provider = plan.position(&extension(dep)).unwrap();
                prop_assert!(provider < requirer, "ext-{} must precede ext-{}", dep, index);
            }
        }
    }

    #[test]
    fn plan_is_deterministic((edges, registration) in acyclic_graph()) {
        let build = || {
            let mut registry = ExtensionRegistry::new();
            for &index in &registration {
                registry.register(descriptor(index, &edges[index])).unwrap();
            }
            registry.plan().unwrap().order().to_vec()
        };
        prop_assert_eq!(build(), build());
    }

    #[test]
    fn exclusive_claims_conflict_in_any_order(
        first_shared in any::<bool>(),
        reversed in any::<bool>(),
    ) {
        let kind = if first_shared { ProviderKind::Shared } else { ProviderKind::Exclusive };
        let mut descriptors = vec![
            ExtensionDescriptor::new(extension(0)).provides_service(service(0), kind),
            ExtensionDescriptor::new(extension(1))
                .provides_service(service(0), ProviderKind::Exclusive),
        ];
        if reversed {
            descriptors.reverse();
        }

        let mut registry = ExtensionRegistry::new();
        let outcome = descriptors
            .into_iter()
            .try_for_each(|descriptor| registry.register(descriptor))
            .and_then(|()| registry.plan().map(|_| ()));
        let is_duplicate = matches!(outcome, Err(BootError::DuplicateProvider { .. }));
        prop_assert!(is_duplicate);
    }
}
