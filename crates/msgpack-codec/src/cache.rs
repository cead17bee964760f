//! Process-wide schema cache.
//!
//! Maps a type's [`TypeId`] to its [`CodecPlan`]. Plans are built on first
//! use and never evicted.
//!
//! Builds go through a single build lock with a double-checked lookup, so
//! concurrent first uses of the same type produce one plan and the losers
//! wait for it. A build publishes every plan it created in one step, and
//! only after all of them are complete; a failed build publishes nothing.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::descriptor::{CodecPlan, Field, PlanRef, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::types::{MsgPackType, TypeHandle, TypeKind};

#[derive(Default)]
pub struct SchemaCache {
    plans: RwLock<HashMap<TypeId, PlanRef>>,
    build: Mutex<()>,
    builds: AtomicUsize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the plan for `T`, building it on first use.
    pub fn resolve<T: MsgPackType>(&self) -> Result<PlanRef> {
        self.resolve_handle(&TypeHandle::of::<T>())
    }

    pub fn resolve_handle(&self, handle: &TypeHandle) -> Result<PlanRef> {
        if let Some(plan) = self.lookup(handle.type_id()) {
            return Ok(plan);
        }

        let _guard = self.build.lock();
        if let Some(plan) = self.lookup(handle.type_id()) {
            return Ok(plan);
        }

        let mut describer = Describer::new(self);
        let plan = describer.resolve_handle(handle)?;
        let built = describer.pending;

        self.builds.fetch_add(built.len(), Ordering::Relaxed);
        tracing::debug!(
            root = handle.name(),
            plans = built.len(),
            "built codec plans"
        );
        self.plans.write().extend(built);
        Ok(plan)
    }

    /// Published plan for `id`, if any. Never blocks on a build in progress.
    pub fn lookup(&self, id: TypeId) -> Option<PlanRef> {
        self.plans.read().get(&id).cloned()
    }

    pub fn contains<T: MsgPackType>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some()
    }

    /// Number of published plans.
    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of plans ever built by this cache.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("plans", &self.len())
            .field("builds", &self.builds())
            .finish()
    }
}

/// Build context handed to [`MsgPackType::describe`].
///
/// Tracks the plans created by the current build. Asking for a type that is
/// already in progress returns its (not yet complete) plan, which is how
/// self-referential types terminate.
pub struct Describer<'c> {
    cache: &'c SchemaCache,
    pending: HashMap<TypeId, PlanRef>,
}

impl<'c> Describer<'c> {
    fn new(cache: &'c SchemaCache) -> Self {
        Self {
            cache,
            pending: HashMap::new(),
        }
    }

    /// Plan for a nested type.
    pub fn resolve<T: MsgPackType>(&mut self) -> Result<PlanRef> {
        self.resolve_handle(&TypeHandle::of::<T>())
    }

    /// A record field of type `T`.
    pub fn field<T: MsgPackType>(&mut self, name: &'static str) -> Result<Field> {
        Ok(Field {
            name,
            plan: self.resolve::<T>()?,
        })
    }

    fn resolve_handle(&mut self, handle: &TypeHandle) -> Result<PlanRef> {
        let id = handle.type_id();
        if let Some(plan) = self.cache.lookup(id) {
            return Ok(plan);
        }
        if let Some(plan) = self.pending.get(&id) {
            return Ok(Arc::clone(plan));
        }
        if handle.kind() == TypeKind::Abstract {
            return Err(CodecError::UnsupportedType {
                type_name: handle.name(),
                reason: "abstract type with no concrete binding",
            });
        }

        let plan = Arc::new(CodecPlan::pending(id, handle.name()));
        self.pending.insert(id, Arc::clone(&plan));
        let descriptor: TypeDescriptor = handle.describe(self)?;
        plan.complete(descriptor);
        Ok(plan)
    }
}
