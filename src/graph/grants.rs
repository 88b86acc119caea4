// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::events::NamespacedName;
use crate::types::ReferenceGrant;
use kube::ResourceExt;

/// The referencing side of a cross-namespace reference
pub(crate) struct RefFrom<'a> {
    pub group: &'a str,
    pub kind: &'a str,
    pub namespace: &'a str,
}

/// The referenced side of a cross-namespace reference
pub(crate) struct RefTo<'a> {
    pub group: &'a str,
    pub kind: &'a str,
    pub name: &'a NamespacedName,
}

pub(crate) struct ReferenceGrantIndex<'a> {
    grants: Vec<&'a ReferenceGrant>,
}

impl<'a> ReferenceGrantIndex<'a> {
    pub fn new(grants: impl Iterator<Item = &'a ReferenceGrant>) -> Self {
        Self {
            grants: grants.collect(),
        }
    }

    /// Whether a reference is permitted. Same-namespace references always are; others need a
    /// ReferenceGrant in the target namespace naming both sides.
    pub fn allows(&self, from: &RefFrom<'_>, to: &RefTo<'_>) -> bool {
        if from.namespace == to.name.namespace {
            return true;
        }

        self.grants
            .iter()
            .filter(|grant| grant.namespace().as_deref() == Some(to.name.namespace.as_str()))
            .any(|grant| {
                let from_ok = grant.spec.from.iter().any(|f| {
                    f.group == from.group && f.kind == from.kind && f.namespace == from.namespace
                });
                let to_ok = grant.spec.to.iter().any(|t| {
                    t.group == to.group
                        && t.kind == to.kind
                        && t.name.as_deref().map_or(true, |n| n == to.name.name)
                });
                from_ok && to_ok
            })
    }
}
