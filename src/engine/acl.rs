//! Access control: permit/deny user and group columns of ACL rows → principal sets.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::engine::db_ops::Row;
use crate::utils::config::AclConsts;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Principal {
    pub name: String,
    pub namespace: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Acl {
    pub permit_users: BTreeSet<Principal>,
    pub deny_users: BTreeSet<Principal>,
    pub permit_groups: BTreeSet<Principal>,
    pub deny_groups: BTreeSet<Principal>,
}

impl Acl {
    pub fn is_empty(&self) -> bool {
        self.permit_users.is_empty()
            && self.deny_users.is_empty()
            && self.permit_groups.is_empty()
            && self.deny_groups.is_empty()
    }
}

/// ACL of one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocAcl {
    /// The ACL query returned no rows. Secure default: nobody is granted access.
    Empty,
    /// Union of all ACL rows. Sets may all be empty when every column was NULL.
    Principals(Acl),
}

/// Result column names read from ACL rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclColumns {
    pub permit_users: String,
    pub deny_users: String,
    pub permit_groups: String,
    pub deny_groups: String,
}

impl Default for AclColumns {
    fn default() -> Self {
        Self {
            permit_users: AclConsts::PERMIT_USERS.to_string(),
            deny_users: AclConsts::DENY_USERS.to_string(),
            permit_groups: AclConsts::PERMIT_GROUPS.to_string(),
            deny_groups: AclConsts::DENY_GROUPS.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AclResolver {
    columns: AclColumns,
    delimiter: String,
    namespace: String,
}

impl Default for AclResolver {
    fn default() -> Self {
        Self::new(
            AclColumns::default(),
            AclConsts::DEFAULT_DELIMITER,
            AclConsts::DEFAULT_NAMESPACE,
        )
    }
}

impl AclResolver {
    pub fn new(columns: AclColumns, delimiter: &str, namespace: &str) -> Self {
        Self {
            columns,
            delimiter: delimiter.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn columns(&self) -> &AclColumns {
        &self.columns
    }

    pub fn resolve(&self, rows: &[Row]) -> DocAcl {
        let Some(first) = rows.first() else {
            return DocAcl::Empty;
        };
        // Column presence is decided once from the result shape.
        let present = |name: &str| first.columns().contains(name).then(|| name.to_string());
        let cols = [
            present(&self.columns.permit_users),
            present(&self.columns.deny_users),
            present(&self.columns.permit_groups),
            present(&self.columns.deny_groups),
        ];

        let mut acl = Acl::default();
        for row in rows {
            let [pu, du, pg, dg] = &cols;
            self.add_from(row, pu.as_deref(), &mut acl.permit_users);
            self.add_from(row, du.as_deref(), &mut acl.deny_users);
            self.add_from(row, pg.as_deref(), &mut acl.permit_groups);
            self.add_from(row, dg.as_deref(), &mut acl.deny_groups);
        }
        DocAcl::Principals(acl)
    }

    fn add_from(&self, row: &Row, column: Option<&str>, into: &mut BTreeSet<Principal>) {
        let Some(value) = column.and_then(|c| row.string(c)) else {
            return;
        };
        into.extend(self.split_names(&value).map(|name| Principal {
            name,
            namespace: self.namespace.clone(),
        }));
    }

    /// Split one cell into trimmed names. An empty delimiter keeps the value whole.
    pub fn split_names<'a>(&'a self, value: &'a str) -> impl Iterator<Item = String> + 'a {
        let pieces: Vec<&str> = if self.delimiter.is_empty() {
            vec![value]
        } else {
            value.split(self.delimiter.as_str()).collect()
        };
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
