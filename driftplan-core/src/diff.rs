//! Differ and plan generator.
//!
//! Objects are matched by `(kind, qualified name)`. Matched pairs are compared
//! structurally; the resulting operations are ordered with Kahn's algorithm
//! over a dependency graph so that nothing is created before what it names
//! or dropped after it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::model::{
    Column, DatabaseObject, Index, ObjectKind, QualifiedName, SchemaModel, Table,
};

/// What happens to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Drop,
    Alter,
    Create,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Drop => write!(f, "Drop"),
            Action::Alter => write!(f, "Alter"),
            Action::Create => write!(f, "Create"),
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeOp {
    pub action: Action,
    pub kind: ObjectKind,
    pub name: QualifiedName,
    /// Human-readable description of what changed (alters and replacements).
    pub details: Vec<String>,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.action, self.kind, self.name)
    }
}

/// Ordered change operations turning the source schema into the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub operations: Vec<ChangeOp>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeOp> {
        self.operations.iter()
    }

    /// Number of operations with `action`.
    pub fn count(&self, action: Action) -> usize {
        self.operations.iter().filter(|op| op.action == action).count()
    }

    /// Plan lines, one per operation.
    pub fn lines(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.to_string()).collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() {
            return write!(f, "No changes detected");
        }
        for (i, op) in self.operations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// Differ switches.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Report a dropped and an added column with identical definitions at the
    /// same position as a rename.
    pub detect_renames: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            detect_renames: true,
        }
    }
}

/// Compare `source` against `target` with default options.
pub fn diff(source: &SchemaModel, target: &SchemaModel) -> Plan {
    diff_with(source, target, &DiffOptions::default())
}

/// Compare `source` against `target`. Never fails: anything not understood
/// structurally is compared as text.
pub fn diff_with(source: &SchemaModel, target: &SchemaModel, options: &DiffOptions) -> Plan {
    let mut nodes: Vec<Node<'_>> = Vec::new();

    for (position, object) in target.iter().enumerate() {
        let key = object.key();
        match source.get(&key) {
            None => nodes.push(Node::new(Action::Create, object, position, Vec::new())),
            Some(before) => {
                let details = compare(before, object, options);
                if details.is_empty() {
                    continue;
                }
                if key.kind.supports_alter() {
                    let mut node = Node::new(Action::Alter, object, position, details);
                    node.previous = Some(before);
                    nodes.push(node);
                } else {
                    let source_position = source.position(&key).unwrap_or(position);
                    nodes.push(Node::new(
                        Action::Drop,
                        before,
                        source_position,
                        vec!["replaced by changed definition".to_string()],
                    ));
                    nodes.push(Node::new(Action::Create, object, position, details));
                }
            }
        }
    }
    for (position, object) in source.iter().enumerate() {
        if !target.contains(&object.key()) {
            nodes.push(Node::new(Action::Drop, object, position, Vec::new()));
        }
    }

    let operations: Vec<ChangeOp> = order(&nodes)
        .into_iter()
        .map(|i| nodes[i].op.clone())
        .collect();
    log::info!(
        "Plan generated; operations={}, source_objects={}, target_objects={}",
        operations.len(),
        source.len(),
        target.len()
    );
    Plan { operations }
}

// ── ordering ──

/// An operation plus what ordering needs to know about it.
struct Node<'a> {
    op: ChangeOp,
    /// Source object for drops, target object otherwise.
    object: &'a DatabaseObject,
    /// Discovery position in the model `object` came from.
    position: usize,
    /// Source-side definition of an altered object.
    previous: Option<&'a DatabaseObject>,
}

impl<'a> Node<'a> {
    fn new(action: Action, object: &'a DatabaseObject, position: usize, details: Vec<String>) -> Self {
        Node {
            op: ChangeOp {
                action,
                kind: object.kind(),
                name: object.name().clone(),
                details,
            },
            object,
            position,
            previous: None,
        }
    }

    /// Drops first, then alters, then creates; discovery order within each.
    fn priority(&self) -> (Action, usize) {
        (self.op.action, self.position)
    }

    fn is_relation_named(&self, name: &QualifiedName) -> bool {
        self.op.kind.is_relation() && self.op.name == *name
    }
}

/// Topological order of `nodes` (indices), resolved with Kahn's algorithm and
/// a priority queue for ties. Cycles are broken by taking the highest-priority
/// blocked node.
fn order(nodes: &[Node<'_>]) -> Vec<usize> {
    let n = nodes.len();
    // edges[a] = nodes that must come after a
    let mut edges: Vec<HashSet<usize>> = vec![HashSet::new(); n];

    for (i, node) in nodes.iter().enumerate() {
        match node.op.action {
            Action::Create | Action::Alter => {
                // referents created first
                for dep in node.object.dependencies() {
                    for (j, other) in nodes.iter().enumerate() {
                        if j != i && other.op.action == Action::Create && other.is_relation_named(&dep) {
                            edges[j].insert(i);
                        }
                    }
                }
                // an alter releases the old definition's referents before they are dropped
                if let Some(previous) = node.previous {
                    for dep in previous.dependencies() {
                        for (j, other) in nodes.iter().enumerate() {
                            if j != i
                                && other.op.action == Action::Drop
                                && other.is_relation_named(&dep)
                                && !is_replaced(nodes, other)
                            {
                                edges[i].insert(j);
                            }
                        }
                    }
                }
            }
            Action::Drop => {
                // dependents dropped before their referent is dropped or altered
                for dep in node.object.dependencies() {
                    for (j, other) in nodes.iter().enumerate() {
                        if j != i && other.op.action != Action::Create && other.is_relation_named(&dep) {
                            edges[i].insert(j);
                        }
                    }
                }
                // a replacement's drop precedes its create
                for (j, other) in nodes.iter().enumerate() {
                    if other.op.action == Action::Create
                        && other.op.kind == node.op.kind
                        && other.op.name == node.op.name
                    {
                        edges[i].insert(j);
                    }
                }
            }
        }
    }

    let mut in_degree = vec![0usize; n];
    for targets in &edges {
        for &t in targets {
            in_degree[t] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<((Action, usize), usize)>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(|i| Reverse((nodes[i].priority(), i)))
        .collect();
    let mut emitted = vec![false; n];
    let mut sorted = Vec::with_capacity(n);

    while sorted.len() < n {
        let next = match ready.pop() {
            Some(Reverse((_, i))) => i,
            None => {
                // cycle: release the best remaining node
                let Some(i) = (0..n)
                    .filter(|&i| !emitted[i])
                    .min_by_key(|&i| (nodes[i].priority(), i))
                else {
                    break;
                };
                log::debug!("Breaking dependency cycle; operation={}", nodes[i].op);
                i
            }
        };
        if emitted[next] {
            continue;
        }
        emitted[next] = true;
        sorted.push(next);
        for &t in &edges[next] {
            in_degree[t] = in_degree[t].saturating_sub(1);
            if in_degree[t] == 0 && !emitted[t] {
                ready.push(Reverse((nodes[t].priority(), t)));
            }
        }
    }
    sorted
}

/// Whether `drop` is the first half of a Drop + Create replacement.
fn is_replaced(nodes: &[Node<'_>], drop: &Node<'_>) -> bool {
    nodes.iter().any(|n| {
        n.op.action == Action::Create && n.op.kind == drop.op.kind && n.op.name == drop.op.name
    })
}

// ── structural comparison ──

fn compare(before: &DatabaseObject, after: &DatabaseObject, options: &DiffOptions) -> Vec<String> {
    match (before, after) {
        (DatabaseObject::Table(a), DatabaseObject::Table(b)) => compare_tables(a, b, options),
        (DatabaseObject::Index(a), DatabaseObject::Index(b)) => compare_indexes(a, b),
        (DatabaseObject::View(a), DatabaseObject::View(b)) => {
            let mut details = Vec::new();
            if a.query != b.query {
                details.push("query changed".to_string());
            }
            if a.materialized != b.materialized {
                details.push(format!(
                    "materialized changed from {} to {}",
                    a.materialized, b.materialized
                ));
            }
            if a.columns != b.columns {
                details.push(format!(
                    "column list changed from ({}) to ({})",
                    a.columns.join(", "),
                    b.columns.join(", ")
                ));
            }
            details
        }
        (DatabaseObject::Trigger(a), DatabaseObject::Trigger(b)) => {
            let mut details = Vec::new();
            if a.table != b.table {
                details.push(format!("table changed from {} to {}", a.table, b.table));
            }
            if a.timing != b.timing {
                details.push(format!("timing changed from {} to {}", a.timing, b.timing));
            }
            if a.events != b.events {
                details.push(format!(
                    "events changed from {} to {}",
                    join_display(&a.events),
                    join_display(&b.events)
                ));
            }
            if a.body != b.body {
                details.push("body changed".to_string());
            }
            details
        }
        (DatabaseObject::Procedure(a), DatabaseObject::Procedure(b)) => {
            let mut details = Vec::new();
            if a.routine != b.routine {
                details.push(format!("routine kind changed from {} to {}", a.routine, b.routine));
            }
            if a.body != b.body {
                details.push("body changed".to_string());
            }
            details
        }
        (DatabaseObject::Alias(a), DatabaseObject::Alias(b)) => {
            if a.target != b.target {
                vec![format!("target changed from {} to {}", a.target, b.target)]
            } else {
                Vec::new()
            }
        }
        (DatabaseObject::VirtualTable(a), DatabaseObject::VirtualTable(b)) => {
            let mut details = Vec::new();
            if a.module != b.module {
                details.push(format!("module changed from {} to {}", a.module, b.module));
            }
            if a.args != b.args {
                details.push(format!(
                    "module arguments changed from ({}) to ({})",
                    a.args.join(", "),
                    b.args.join(", ")
                ));
            }
            details
        }
        (DatabaseObject::AuxiliaryTable(a), DatabaseObject::AuxiliaryTable(b)) => {
            let mut details = Vec::new();
            if a.base_table != b.base_table || a.column != b.column {
                details.push(format!(
                    "stored column changed from {}.{} to {}.{}",
                    a.base_table, a.column, b.base_table, b.column
                ));
            }
            if a.placement != b.placement {
                details.push(format!(
                    "placement changed from {} to {}",
                    or_none(a.placement.as_deref()),
                    or_none(b.placement.as_deref())
                ));
            }
            if a.part != b.part {
                details.push(format!(
                    "partition changed from {} to {}",
                    or_none(a.part.map(|p| p.to_string()).as_deref()),
                    or_none(b.part.map(|p| p.to_string()).as_deref())
                ));
            }
            details
        }
        (DatabaseObject::Raw(a), DatabaseObject::Raw(b)) => {
            if a.text != b.text {
                vec!["statement text changed".to_string()]
            } else {
                Vec::new()
            }
        }
        // keys include the kind, so mixed pairs cannot be matched
        _ => vec!["definition changed".to_string()],
    }
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn compare_tables(a: &Table, b: &Table, options: &DiffOptions) -> Vec<String> {
    let mut details = compare_columns(&a.columns, &b.columns, options);

    // constraints, as a multiset
    let mut matched = vec![false; b.constraints.len()];
    for constraint in &a.constraints {
        let hit = b
            .constraints
            .iter()
            .enumerate()
            .position(|(i, other)| !matched[i] && constraint.equivalent(other));
        match hit {
            Some(i) => matched[i] = true,
            None => details.push(format!("constraint dropped: {}", constraint)),
        }
    }
    for (i, constraint) in b.constraints.iter().enumerate() {
        if !matched[i] {
            details.push(format!("constraint added: {}", constraint));
        }
    }

    for index in &a.indexes {
        match b.indexes.iter().find(|i| i.name == index.name) {
            None => details.push(format!("index dropped: {}", index.name)),
            Some(other) => {
                for change in compare_indexes(index, other) {
                    details.push(format!("index {} {}", index.name, change));
                }
            }
        }
    }
    for index in &b.indexes {
        if !a.indexes.iter().any(|i| i.name == index.name) {
            details.push(format!("index added: {}", index));
        }
    }

    details.extend(a.storage.changes_to(&b.storage));

    if a.versioning.system_time != b.versioning.system_time {
        let describe = |p: &Option<(String, String)>| {
            p.as_ref()
                .map(|(s, e)| format!("({}, {})", s, e))
                .unwrap_or_else(|| "(none)".to_string())
        };
        details.push(format!(
            "system-time period changed from {} to {}",
            describe(&a.versioning.system_time),
            describe(&b.versioning.system_time)
        ));
    }
    if a.versioning.system_versioned != b.versioning.system_versioned {
        details.push(if b.versioning.system_versioned {
            "system versioning enabled".to_string()
        } else {
            "system versioning disabled".to_string()
        });
    }

    details.extend(compare_options(&a.options, &b.options));
    details
}

fn compare_columns(before: &[Column], after: &[Column], options: &DiffOptions) -> Vec<String> {
    let mut details = Vec::new();
    let mut dropped: Vec<&Column> = before
        .iter()
        .filter(|c| !after.iter().any(|o| o.name == c.name))
        .collect();
    let mut added: Vec<&Column> = after
        .iter()
        .filter(|c| !before.iter().any(|o| o.name == c.name))
        .collect();

    if options.detect_renames {
        let mut renamed = Vec::new();
        for old in &dropped {
            if let Some(new) = added
                .iter()
                .find(|new| new.ordinal == old.ordinal && new.same_definition(old))
            {
                renamed.push((old.name.clone(), new.name.clone()));
            }
        }
        for (old, new) in &renamed {
            details.push(format!("column {} renamed to {}", old, new));
            dropped.retain(|c| c.name != *old);
            added.retain(|c| c.name != *new);
        }
    }

    for column in &dropped {
        details.push(format!("column dropped: {}", column.name));
    }
    for column in &added {
        details.push(format!("column added: {}", column));
    }

    for old in before {
        let Some(new) = after.iter().find(|c| c.name == old.name) else {
            continue;
        };
        let name = &old.name;
        if old.data_type != new.data_type {
            details.push(format!(
                "column {} type changed from {} to {}",
                name, old.data_type, new.data_type
            ));
        }
        if old.nullable != new.nullable {
            details.push(if new.nullable {
                format!("column {} changed from NOT NULL to nullable", name)
            } else {
                format!("column {} changed from nullable to NOT NULL", name)
            });
        }
        if old.default != new.default {
            details.push(format!(
                "column {} default changed from {} to {}",
                name,
                or_none(old.default.as_deref()),
                or_none(new.default.as_deref())
            ));
        }
        if old.generation != new.generation {
            details.push(format!(
                "column {} generation changed from {} to {}",
                name, old.generation, new.generation
            ));
        }
        if old.attributes != new.attributes {
            details.push(format!(
                "column {} attributes changed from [{}] to [{}]",
                name,
                old.attributes.join(" "),
                new.attributes.join(" ")
            ));
        }
    }

    // relative order of the columns both sides keep
    let kept_before: Vec<&str> = before
        .iter()
        .filter(|c| after.iter().any(|o| o.name == c.name))
        .map(|c| c.name.as_str())
        .collect();
    let kept_after: Vec<&str> = after
        .iter()
        .filter(|c| before.iter().any(|o| o.name == c.name))
        .map(|c| c.name.as_str())
        .collect();
    if kept_before != kept_after {
        details.push(format!(
            "column order changed from ({}) to ({})",
            kept_before.join(", "),
            kept_after.join(", ")
        ));
    }
    details
}

fn compare_indexes(a: &Index, b: &Index) -> Vec<String> {
    let mut details = Vec::new();
    if a.table != b.table {
        details.push(format!("table changed from {} to {}", a.table, b.table));
    }
    if a.columns != b.columns {
        details.push(format!(
            "columns changed from ({}) to ({})",
            a.columns.join(", "),
            b.columns.join(", ")
        ));
    }
    if a.unique != b.unique {
        details.push(if b.unique {
            "made unique".to_string()
        } else {
            "no longer unique".to_string()
        });
    }
    if a.kind != b.kind {
        details.push(format!("kind changed from {} to {}", a.kind, b.kind));
    }
    if a.modifiers != b.modifiers {
        details.push(format!(
            "modifiers changed from [{}] to [{}]",
            a.modifiers.join(" "),
            b.modifiers.join(" ")
        ));
    }
    details.extend(a.storage.changes_to(&b.storage));
    details.extend(compare_options(&a.options, &b.options));
    details
}

fn compare_options(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> Vec<String> {
    let mut details = Vec::new();
    for (key, value) in a {
        match b.get(key) {
            None => details.push(format!("option {} removed", key)),
            Some(other) if other != value => details.push(format!(
                "option {} changed from {} to {}",
                key, value, other
            )),
            Some(_) => {}
        }
    }
    for (key, value) in b {
        if !a.contains_key(key) {
            if value.is_empty() {
                details.push(format!("option {} added", key));
            } else {
                details.push(format!("option {} added ({})", key, value));
            }
        }
    }
    details
}
