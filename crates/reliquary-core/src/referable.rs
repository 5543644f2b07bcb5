// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! The capability shared by every object enrolled in the identity table.

use crate::error::{ResourceError, ResourceResult};
use crate::identity::{Identity, IdentityRegistry};
use crate::tag::TypeTag;
use std::any::Any;
use std::sync::Arc;

/// An object that owns exactly one [`Identity`] for its whole lifetime.
///
/// Implementors are created through [`IdentityRegistry::create`], which
/// registers a weak back-reference before the object becomes visible and hands
/// over an [`IdentityLease`](crate::identity::IdentityLease) that releases the
/// identity when the object is dropped. A copy never shares the original's
/// identity: [`Referable::try_clone`] must acquire a fresh one.
pub trait Referable: Any + Send + Sync {
    /// The identity acquired at construction.
    fn identity(&self) -> Identity;

    /// The interned kind of this object, unique across all `Referable` types.
    fn kind(&self) -> TypeTag;

    /// Produces an owned copy enrolled under a new identity.
    ///
    /// There is no generic way to copy an arbitrary object, so the default
    /// implementation fails with [`ResourceError::CloneNotSupported`] instead of
    /// returning a shallow copy.
    fn try_clone(&self, identities: &IdentityRegistry) -> ResourceResult<Arc<dyn Referable>> {
        let _ = identities;
        Err(ResourceError::CloneNotSupported(self.kind()))
    }

    /// Returns a reference to this object as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared handle into `Arc<dyn Any>` so it can be downcast with [`Arc::downcast`].
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
