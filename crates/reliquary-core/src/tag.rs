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


//! Interned resource kind names.

use ahash::AHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};

/// The process-wide set of interned names. Entries are leaked on purpose and
/// live until the process exits, so every `TypeTag` can hand out a `'static` name.
static INTERNED_NAMES: OnceLock<Mutex<AHashSet<&'static str>>> = OnceLock::new();

/// An interned, cheaply comparable name for a kind of resource (e.g. "Image", "Mesh").
///
/// Equal strings always intern to the same `TypeTag` within a process, so
/// equality and hashing operate on the interned pointer and never compare the
/// characters themselves.
#[derive(Clone, Copy)]
pub struct TypeTag(&'static str);

impl TypeTag {
    /// Interns `name` and returns its tag.
    pub fn new(name: &str) -> Self {
        let names = INTERNED_NAMES.get_or_init(|| Mutex::new(AHashSet::new()));
        // The set is never left half-updated, so a poisoned lock is still usable.
        let mut names = names.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = names.get(name) {
            return TypeTag(existing);
        }

        let interned: &'static str = Box::leak(name.to_owned().into_boxed_str());
        names.insert(interned);
        TypeTag(interned)
    }

    /// Returns the name this tag was interned from.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.as_ptr() as usize).hash(state);
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        TypeTag::new(name)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeTag").field(&self.0).finish()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(TypeTag::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_names_intern_to_same_tag() {
        let a = TypeTag::new("Image");
        let b = TypeTag::new(&String::from("Image"));

        assert_eq!(a, b);
        assert!(std::ptr::eq(a.name(), b.name()));
    }

    #[test]
    fn test_distinct_names_differ() {
        assert_ne!(TypeTag::new("Image"), TypeTag::new("Mesh"));
        assert_ne!(TypeTag::new("Image"), TypeTag::new("image"));
    }

    #[test]
    fn test_tags_work_as_hash_keys() {
        let mut set = HashSet::new();
        set.insert(TypeTag::new("Font"));
        set.insert(TypeTag::from("Font"));
        set.insert(TypeTag::new("Sound"));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&TypeTag::new("Sound")));
    }

    #[test]
    fn test_display_uses_name() {
        let tag = TypeTag::new("Mesh");
        assert_eq!(tag.to_string(), "Mesh");
        assert_eq!(format!("{tag:?}"), "TypeTag(\"Mesh\")");
    }
}
