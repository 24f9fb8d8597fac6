//! The condition tree rendered into WHERE, HAVING and join predicates.

use crate::params::Binding;
use crate::sql::{Sql, SqlWriter};
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Literal substituted for criteria that fail to parse or screen.
pub const ALWAYS_FALSE: &str = "2=1";

/// Joins a condition to the sibling written before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }

    /// Case-insensitive parse of `AND` / `OR`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("and") {
            Some(Conjunction::And)
        } else if s.eq_ignore_ascii_case("or") {
            Some(Conjunction::Or)
        } else {
            None
        }
    }
}

/// A single comparison or literal clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub sql: Sql,
    pub conjunction: Conjunction,
}

impl Leaf {
    pub fn new(sql: Sql, conjunction: Conjunction) -> Self {
        Self { sql, conjunction }
    }

    /// A clause used verbatim, without bindings.
    pub fn literal(clause: impl Into<String>, conjunction: Conjunction) -> Self {
        Self::new(Sql::raw(clause), conjunction)
    }

    /// The value bound to this leaf's placeholder, if it has one.
    pub fn binding(&self) -> Option<&Binding> {
        self.sql.bindings().next()
    }
}

/// Ordered children joined by their own conjunctions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub conjunction: Conjunction,
    pub children: Vec<ConditionNode>,
}

impl Group {
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            conjunction,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: impl Into<ConditionNode>) {
        self.children.push(node.into());
    }

    pub fn is_empty(&self) -> bool {
        self.children.iter().all(ConditionNode::is_empty)
    }

    fn write_to(&self, w: &mut SqlWriter) {
        write_children(self.children.iter(), w);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(Leaf),
    Group(Group),
}

impl ConditionNode {
    pub fn conjunction(&self) -> Conjunction {
        match self {
            ConditionNode::Leaf(leaf) => leaf.conjunction,
            ConditionNode::Group(group) => group.conjunction,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConditionNode::Leaf(leaf) => leaf.sql.is_empty(),
            ConditionNode::Group(group) => group.is_empty(),
        }
    }

    /// Every binding in the tree, in document order.
    pub fn bindings(&self) -> Vec<&Binding> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a Binding>) {
        match self {
            ConditionNode::Leaf(leaf) => out.extend(leaf.sql.bindings()),
            ConditionNode::Group(group) => {
                for child in &group.children {
                    child.collect_bindings(out);
                }
            }
        }
    }

    /// Renames the `from` qualifier on every column in the tree.
    pub fn requalify(&mut self, from: &str, to: &str) {
        match self {
            ConditionNode::Leaf(leaf) => leaf.sql.requalify(from, to),
            ConditionNode::Group(group) => {
                for child in &mut group.children {
                    child.requalify(from, to);
                }
            }
        }
    }

    /// Writes the node, collecting bindings in placeholder order.
    pub fn write_to(&self, w: &mut SqlWriter) {
        match self {
            ConditionNode::Leaf(leaf) => w.push_sql(&leaf.sql),
            ConditionNode::Group(group) => group.write_to(w),
        }
    }
}

impl From<Leaf> for ConditionNode {
    fn from(value: Leaf) -> Self {
        ConditionNode::Leaf(value)
    }
}

impl From<Group> for ConditionNode {
    fn from(value: Group) -> Self {
        ConditionNode::Group(value)
    }
}

/// Writes non-empty children: the first without a conjunction, each later one
/// preceded by its own. Two or more written children are parenthesized.
fn write_children<'a>(children: impl Iterator<Item = &'a ConditionNode>, w: &mut SqlWriter) {
    let live: SmallVec<[&ConditionNode; 8]> = children.filter(|c| !c.is_empty()).collect();
    let wrap = live.len() > 1;
    if wrap {
        w.push_str("(");
    }
    for (i, child) in live.into_iter().enumerate() {
        if i > 0 {
            w.push_str(" ");
            w.push_str(child.conjunction().as_str());
            w.push_str(" ");
        }
        child.write_to(w);
    }
    if wrap {
        w.push_str(")");
    }
}

/// Condition groups of a WHERE or HAVING clause, keyed by group number.
///
/// Groups render in the order they were first used.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionSet {
    groups: IndexMap<usize, ConditionNode>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `node` to group `cond_group`, creating the group on first use.
    ///
    /// A new group takes the conjunction of the first node added to it.
    pub fn push(&mut self, cond_group: usize, node: ConditionNode) {
        let entry = self
            .groups
            .entry(cond_group)
            .or_insert_with(|| ConditionNode::Group(Group::new(node.conjunction())));
        if let ConditionNode::Group(group) = entry {
            group.push(node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(ConditionNode::is_empty)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn requalify(&mut self, from: &str, to: &str) {
        for node in self.groups.values_mut() {
            node.requalify(from, to);
        }
    }

    /// The whole set as one root group.
    pub fn to_node(&self) -> ConditionNode {
        ConditionNode::Group(Group {
            conjunction: Conjunction::And,
            children: self.groups.values().cloned().collect(),
        })
    }

    pub fn write_to(&self, w: &mut SqlWriter) {
        write_children(self.groups.values(), w);
    }
}
