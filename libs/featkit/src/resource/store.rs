use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Matcher, Resource, ResourceTree, TypeConstraint};
use crate::error::{AssemblyError, AssemblyResult};
use crate::validation::validate_resource_key;

/// One defined resource.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub key: String,
    pub value: Resource,
    pub defining_feature: String,
    pub is_contract_fulfillment: bool,
    /// Store-wide definition counter. Wildcard results are ordered by the
    /// defining feature's rank first, then by this counter.
    pub insertion_order: u64,
}

/// Options of a usage declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageOptions {
    pub required: bool,
    pub value_type: Option<TypeConstraint>,
}

impl UsageOptions {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            value_type: None,
        }
    }

    pub fn of_type<T: std::any::Any>(mut self) -> Self {
        self.value_type = Some(TypeConstraint::of::<T>());
        self
    }
}

/// The merged usage contract of every feature that declared a pattern.
#[derive(Debug, Clone)]
pub struct UsageContract {
    pub matcher: Matcher,
    pub required: bool,
    pub value_type: Option<TypeConstraint>,
    /// Declaring features, in declaration order.
    pub declared_by: Vec<String>,
    /// Feature that introduced `value_type`, used in conflict messages.
    typed_by: Option<String>,
}

impl UsageContract {
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }
}

/// Result of a lookup.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Exact key lookup.
    One(Option<Resource>),
    /// Wildcard lookup, in definition order.
    Many(Vec<Resource>),
    OneWithKey(Option<(String, Resource)>),
    ManyWithKeys(Vec<(String, Resource)>),
}

impl Resolved {
    pub fn is_empty(&self) -> bool {
        match self {
            Resolved::One(v) => v.is_none(),
            Resolved::OneWithKey(v) => v.is_none(),
            Resolved::Many(v) => v.is_empty(),
            Resolved::ManyWithKeys(v) => v.is_empty(),
        }
    }

    /// The single value of an exact lookup.
    pub fn one(&self) -> Option<&Resource> {
        match self {
            Resolved::One(v) => v.as_ref(),
            Resolved::OneWithKey(v) => v.as_ref().map(|(_, r)| r),
            _ => None,
        }
    }

    /// All resolved values regardless of shape.
    pub fn values(&self) -> Vec<&Resource> {
        match self {
            Resolved::One(v) => v.iter().collect(),
            Resolved::OneWithKey(v) => v.iter().map(|(_, r)| r).collect(),
            Resolved::Many(v) => v.iter().collect(),
            Resolved::ManyWithKeys(v) => v.iter().map(|(_, r)| r).collect(),
        }
    }

    /// Values that downcast to `T`; others are skipped.
    pub fn values_of<T: std::any::Any>(&self) -> Vec<&T> {
        self.values()
            .into_iter()
            .filter_map(|r| r.downcast_ref::<T>())
            .collect()
    }

    /// `(key, &T)` pairs of a keyed lookup.
    pub fn pairs_of<T: std::any::Any>(&self) -> Vec<(&str, &T)> {
        let pairs: Vec<&(String, Resource)> = match self {
            Resolved::OneWithKey(v) => v.iter().collect(),
            Resolved::ManyWithKeys(v) => v.iter().collect(),
            _ => Vec::new(),
        };
        pairs
            .into_iter()
            .filter_map(|(k, r)| r.downcast_ref::<T>().map(|v| (k.as_str(), v)))
            .collect()
    }
}

/// Definition and usage accumulation for one assembly run.
#[derive(Default)]
pub struct ResourceStore {
    entries: Vec<ResourceEntry>,
    index: HashMap<String, usize>,
    tree: ResourceTree,
    contracts: Vec<UsageContract>,
    contract_index: HashMap<String, usize>,
    matchers: Mutex<HashMap<String, Matcher>>,
    next_order: u64,
    feature_ranks: HashMap<String, usize>,
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.entries.iter().map(|e| e.key.as_str()).collect();
        let patterns: Vec<&str> = self.contracts.iter().map(|c| c.pattern()).collect();
        f.debug_struct("ResourceStore")
            .field("keys", &keys)
            .field("contracts", &patterns)
            .finish()
    }
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the resolution order of features up front, so a feature whose
    /// resources are defined late still resolves in its own position.
    /// Features never ranked sort after ranked ones.
    pub fn rank_features<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for (rank, name) in names.into_iter().enumerate() {
            self.feature_ranks.insert(name.to_string(), rank);
        }
    }

    pub fn define_resource(
        &mut self,
        key: &str,
        value: Resource,
        defining_feature: &str,
        is_contract_fulfillment: bool,
    ) -> AssemblyResult<()> {
        validate_resource_key(key)?;

        if let Some(&idx) = self.index.get(key) {
            return Err(AssemblyError::DuplicateResource {
                key: key.to_string(),
                feature: defining_feature.to_string(),
                prior: self.entries[idx].defining_feature.clone(),
            });
        }

        self.tree.insert(key, value.clone(), defining_feature)?;

        let entry = ResourceEntry {
            key: key.to_string(),
            value,
            defining_feature: defining_feature.to_string(),
            is_contract_fulfillment,
            insertion_order: self.next_order,
        };
        self.next_order += 1;
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);

        tracing::trace!(key, feature = defining_feature, "resource defined");
        Ok(())
    }

    pub fn declare_usage(
        &mut self,
        pattern: &str,
        options: UsageOptions,
        feature: &str,
    ) -> AssemblyResult<()> {
        if let Some(&idx) = self.contract_index.get(pattern) {
            let contract = &mut self.contracts[idx];
            match (&contract.value_type, &options.value_type) {
                (Some(existing), Some(requested)) if existing != requested => {
                    return Err(AssemblyError::ContractConflict {
                        pattern: pattern.to_string(),
                        existing: contract
                            .typed_by
                            .clone()
                            .unwrap_or_else(|| contract.declared_by.join(", ")),
                        feature: feature.to_string(),
                    });
                }
                (None, Some(requested)) => {
                    contract.value_type = Some(*requested);
                    contract.typed_by = Some(feature.to_string());
                }
                _ => {}
            }
            contract.required |= options.required;
            if !contract.declared_by.iter().any(|f| f == feature) {
                contract.declared_by.push(feature.to_string());
            }
            return Ok(());
        }

        let matcher = self.matcher(pattern)?;
        self.contract_index
            .insert(pattern.to_string(), self.contracts.len());
        self.contracts.push(UsageContract {
            matcher,
            required: options.required,
            value_type: options.value_type,
            declared_by: vec![feature.to_string()],
            typed_by: options.value_type.map(|_| feature.to_string()),
        });
        Ok(())
    }

    pub fn resolve(&self, pattern: &str) -> AssemblyResult<Resolved> {
        let matcher = self.matcher(pattern)?;
        if !matcher.is_wildcard() {
            let value = self.index.get(pattern).map(|&i| self.entries[i].value.clone());
            return Ok(Resolved::One(value));
        }
        Ok(Resolved::Many(
            self.matching(&matcher)
                .into_iter()
                .map(|e| e.value.clone())
                .collect(),
        ))
    }

    pub fn resolve_with_keys(&self, pattern: &str) -> AssemblyResult<Resolved> {
        let matcher = self.matcher(pattern)?;
        if !matcher.is_wildcard() {
            let pair = self
                .index
                .get(pattern)
                .map(|&i| (self.entries[i].key.clone(), self.entries[i].value.clone()));
            return Ok(Resolved::OneWithKey(pair));
        }
        Ok(Resolved::ManyWithKeys(
            self.matching(&matcher)
                .into_iter()
                .map(|e| (e.key.clone(), e.value.clone()))
                .collect(),
        ))
    }

    pub fn entry(&self, key: &str) -> Option<&ResourceEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn contracts(&self) -> &[UsageContract] {
        &self.contracts
    }

    pub fn contract(&self, pattern: &str) -> Option<&UsageContract> {
        self.contract_index.get(pattern).map(|&i| &self.contracts[i])
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    /// Cross-checks every usage contract against the defined resources.
    ///
    /// Must only run once all deferred resource payloads are expanded.
    pub fn validate_contracts(&self) -> AssemblyResult<()> {
        for contract in &self.contracts {
            let mut matched = false;
            for entry in self.matching(&contract.matcher) {
                matched = true;
                if let Some(expected) = &contract.value_type {
                    if !expected.admits(&entry.value) {
                        return Err(AssemblyError::ContractViolation {
                            message: format!(
                                "resource '{}' (defined by feature '{}') is a {} but usage contract '{}' (declared by {}) expects {}",
                                entry.key,
                                entry.defining_feature,
                                entry.value.type_name(),
                                contract.pattern(),
                                contract.declared_by.join(", "),
                                expected.type_name(),
                            ),
                        });
                    }
                }
            }
            if contract.required && !matched {
                return Err(AssemblyError::ContractViolation {
                    message: format!(
                        "required usage contract '{}' (declared by {}) is not fulfilled by any resource",
                        contract.pattern(),
                        contract.declared_by.join(", "),
                    ),
                });
            }
        }

        for entry in self.entries.iter().filter(|e| e.is_contract_fulfillment) {
            if !self.contracts.iter().any(|c| c.matcher.matches(&entry.key)) {
                return Err(AssemblyError::ContractViolation {
                    message: format!(
                        "resource '{}' (defined by feature '{}') fulfills a usage contract, but no feature declares a matching usage",
                        entry.key, entry.defining_feature,
                    ),
                });
            }
        }
        Ok(())
    }

    fn matching(&self, matcher: &Matcher) -> Vec<&ResourceEntry> {
        let mut found: Vec<&ResourceEntry> = self
            .entries
            .iter()
            .filter(|e| matcher.matches(&e.key))
            .collect();
        found.sort_by_key(|e| (self.rank_of(&e.defining_feature), e.insertion_order));
        found
    }

    fn rank_of(&self, feature: &str) -> usize {
        self.feature_ranks.get(feature).copied().unwrap_or(usize::MAX)
    }

    fn matcher(&self, pattern: &str) -> AssemblyResult<Matcher> {
        let mut cache = self.matchers.lock();
        if let Some(m) = cache.get(pattern) {
            return Ok(m.clone());
        }
        let m = Matcher::compile(pattern)?;
        cache.insert(pattern.to_string(), m.clone());
        Ok(m)
    }
}
