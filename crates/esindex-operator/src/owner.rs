use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use tracing::{Span, info, warn};

use crate::{crds::esindex::EsIndex, error::ReconcileError, store::ResourceStore};

/// Makes the owner of a Binding (typically the service instance it was
/// created for) the controller of the EsIndex, so deleting that owner
/// garbage-collects the index resource too.
pub struct OwnerLinker<'a> {
    store: &'a dyn ResourceStore,
    span: Span,
}

impl<'a> OwnerLinker<'a> {
    pub fn new(store: &'a dyn ResourceStore, span: Span) -> Self {
        Self { store, span }
    }

    /// Appends the binding's first owner reference to `target` and persists
    /// the result. Not idempotent: every call appends another entry.
    pub async fn link(
        &self,
        ns: &str,
        binding_name: &str,
        target: &EsIndex,
    ) -> Result<Vec<OwnerReference>, ReconcileError> {
        let binding = self
            .store
            .get_binding(ns, binding_name)
            .await?
            .ok_or_else(|| ReconcileError::BindingNotFound {
                namespace: ns.to_string(),
                name: binding_name.to_string(),
            })?;
        let Some(first) = binding.owner_references().first() else {
            warn!(parent: &self.span, binding = %binding_name, "binding has no owner reference to copy");
            return Err(ReconcileError::BindingHasNoOwner(binding_name.to_string()));
        };
        let mut refs = target.owner_references().to_vec();
        refs.push(controller_ref(first));
        self.store
            .set_owner_references(ns, &target.name_any(), refs.clone())
            .await?;
        info!(parent: &self.span, owner_kind = %first.kind, owner = %first.name, "owner reference set");
        Ok(refs)
    }
}

fn controller_ref(owner: &OwnerReference) -> OwnerReference {
    OwnerReference {
        api_version: owner.api_version.clone(),
        kind: owner.kind.clone(),
        name: owner.name.clone(),
        uid: owner.uid.clone(),
        controller: Some(true),
        block_owner_deletion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::binding::{Binding, BindingSpec};
    use crate::crds::esindex::EsIndexSpec;
    use crate::store::MockResourceStore;
    use std::sync::{Arc, Mutex};

    fn svc_owner() -> OwnerReference {
        OwnerReference {
            api_version: "ibmcloud.ibm.com/v1alpha1".into(),
            kind: "Service".into(),
            name: "svc1".into(),
            uid: "u1".into(),
            controller: None,
            block_owner_deletion: None,
        }
    }

    fn target(existing: Vec<OwnerReference>) -> EsIndex {
        let spec: EsIndexSpec = serde_yaml::from_str("indexName: logs\nbindingFrom:\n  name: b1\n").unwrap();
        let mut idx = EsIndex::new("logs", spec);
        idx.metadata.namespace = Some("team-a".into());
        idx.metadata.owner_references = Some(existing);
        idx
    }

    fn store_with(owners: Vec<OwnerReference>, written: Arc<Mutex<Vec<Vec<OwnerReference>>>>) -> MockResourceStore {
        let mut store = MockResourceStore::new();
        store.expect_get_binding().returning(move |_, name| {
            let mut b = Binding::new(name, BindingSpec::default());
            b.metadata.owner_references = Some(owners.clone());
            Ok(Some(b))
        });
        store
            .expect_set_owner_references()
            .returning(move |ns, name, refs| {
                assert_eq!(ns, "team-a");
                assert_eq!(name, "logs");
                written.lock().unwrap().push(refs);
                Ok(())
            });
        store
    }

    #[tokio::test]
    async fn copies_first_owner_as_controller() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let store = store_with(vec![svc_owner()], written.clone());
        let refs = OwnerLinker::new(&store, Span::none())
            .link("team-a", "b1", &target(vec![]))
            .await
            .unwrap();

        let expected = OwnerReference {
            controller: Some(true),
            ..svc_owner()
        };
        assert_eq!(refs, vec![expected.clone()]);
        assert_eq!(*written.lock().unwrap(), vec![vec![expected]]);
    }

    #[tokio::test]
    async fn appends_after_existing_entries() {
        let existing = OwnerReference {
            api_version: "v1".into(),
            kind: "ConfigMap".into(),
            name: "keeper".into(),
            uid: "k0".into(),
            ..Default::default()
        };
        let written = Arc::new(Mutex::new(Vec::new()));
        let store = store_with(vec![svc_owner()], written);
        let refs = OwnerLinker::new(&store, Span::none())
            .link("team-a", "b1", &target(vec![existing.clone()]))
            .await
            .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], existing);
        assert_eq!(refs[1].uid, "u1");
        assert_eq!(refs[1].controller, Some(true));
    }

    #[tokio::test]
    async fn binding_without_owner_is_an_error_and_writes_nothing() {
        let mut store = MockResourceStore::new();
        store
            .expect_get_binding()
            .returning(|_, name| Ok(Some(Binding::new(name, BindingSpec::default()))));
        store.expect_set_owner_references().never();
        let err = OwnerLinker::new(&store, Span::none())
            .link("team-a", "b1", &target(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::BindingHasNoOwner(_)));
    }

    #[tokio::test]
    async fn missing_binding_is_reported() {
        let mut store = MockResourceStore::new();
        store.expect_get_binding().returning(|_, _| Ok(None));
        let err = OwnerLinker::new(&store, Span::none())
            .link("team-a", "b1", &target(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::BindingNotFound { .. }));
    }
}
