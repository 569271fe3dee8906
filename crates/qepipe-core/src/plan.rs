//! Typed plan tree consumed by the pipe-syntax generator.
//!
//! A `PlanNode` is a closed variant over node kinds with the fields each kind
//! needs. Construction from a raw [`QepNode`] is the single place where
//! kind-required fields are checked, so the generator never probes for keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::qep::QepNode;

/// How a node relates to its parent in the plan tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentRelationship {
    Outer,
    Inner,
    Member,
    Subquery,
    InitPlan,
    SubPlan,
}

impl ParentRelationship {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Outer" => Some(Self::Outer),
            "Inner" => Some(Self::Inner),
            "Member" => Some(Self::Member),
            "Subquery" => Some(Self::Subquery),
            "InitPlan" => Some(Self::InitPlan),
            "SubPlan" => Some(Self::SubPlan),
            _ => None,
        }
    }

    pub fn subplan_kind(self) -> Option<SubplanKind> {
        match self {
            Self::InitPlan => Some(SubplanKind::InitPlan),
            Self::SubPlan => Some(SubplanKind::SubPlan),
            _ => None,
        }
    }
}

/// The two ways a separately computed sub-query is wired into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubplanKind {
    /// Computed once; hoisted into a `WITH` preamble.
    InitPlan,
    /// Re-evaluated per row; inlined where referenced.
    SubPlan,
}

impl fmt::Display for SubplanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubplanKind::InitPlan => f.write_str("InitPlan"),
            SubplanKind::SubPlan => f.write_str("SubPlan"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanDirection {
    Forward,
    Backward,
    NoMovement,
}

impl ScanDirection {
    /// `ORDER BY` direction keyword, if the scan reads in index order.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            ScanDirection::Forward => Some("ASC"),
            ScanDirection::Backward => Some("DESC"),
            ScanDirection::NoMovement => None,
        }
    }
}

impl FromStr for ScanDirection {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Forward" => Ok(ScanDirection::Forward),
            "Backward" => Ok(ScanDirection::Backward),
            "NoMovement" => Ok(ScanDirection::NoMovement),
            _ => Err(()),
        }
    }
}

/// Logical join kinds the generator can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinType {
    /// Pipe-syntax keyword introducing the right operand.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Semi => "WHERE EXISTS",
            JoinType::Anti => "WHERE NOT EXISTS",
        }
    }

    /// Semi/anti joins become existence tests rather than joins.
    pub fn is_existence_test(self) -> bool {
        matches!(self, JoinType::Semi | JoinType::Anti)
    }
}

impl FromStr for JoinType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Inner" => Ok(JoinType::Inner),
            "Left" => Ok(JoinType::Left),
            "Right" => Ok(JoinType::Right),
            "Full" => Ok(JoinType::Full),
            "Semi" => Ok(JoinType::Semi),
            "Anti" => Ok(JoinType::Anti),
            other => Err(Error::UnsupportedJoinKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetCommand {
    /// Plain concatenation of inputs (`Append`/`Merge Append`).
    Append,
    Union,
    Intersect,
    Except,
}

impl SetCommand {
    /// Parse a `Command` value such as `"Intersect All"` into command + ALL flag.
    pub fn parse(s: &str) -> Option<(Self, bool)> {
        let lower = s.trim().to_ascii_lowercase();
        let (head, all) = match lower.strip_suffix(" all") {
            Some(head) => (head, true),
            None => (lower.as_str(), false),
        };
        let cmd = match head {
            "union" => SetCommand::Union,
            "intersect" => SetCommand::Intersect,
            "except" => SetCommand::Except,
            _ => return None,
        };
        Some((cmd, all))
    }
}

/// Kind-specific payload of a plan node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Scan {
        relation: String,
        schema: Option<String>,
    },
    IndexScan {
        relation: String,
        schema: Option<String>,
        index_name: String,
        index_key: Vec<String>,
        direction: ScanDirection,
        index_only: bool,
    },
    BitmapIndexScan {
        index_name: String,
    },
    Aggregate {
        group_key: Vec<String>,
        strategy: Option<String>,
    },
    Sort {
        sort_key: Vec<String>,
    },
    Limit {
        /// Planner row estimate; used as the row cap (see DESIGN.md).
        row_estimate: f64,
    },
    Join {
        join_type: JoinType,
        join_on: Option<String>,
    },
    SetOp {
        command: SetCommand,
        all: bool,
        strategy: Option<String>,
    },
    Unique,
    Result,
    Hash,
    Unrecognized {
        node_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    /// Engine label, e.g. `"Hash Join"`; kept for diagnostics.
    pub node_type: String,
    pub kind: NodeKind,
    pub startup_cost: f64,
    pub total_cost: f64,
    pub output: Vec<String>,
    pub filters: Vec<String>,
    pub alias: Option<String>,
    pub relationship: Option<ParentRelationship>,
    pub subplan_name: Option<String>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(node_type: impl Into<String>, kind: NodeKind, total_cost: f64) -> Self {
        Self {
            node_type: node_type.into(),
            kind,
            startup_cost: 0.0,
            total_cost,
            output: Vec::new(),
            filters: Vec::new(),
            alias: None,
            relationship: None,
            subplan_name: None,
            children: Vec::new(),
        }
    }

    pub fn with_output<I, S>(mut self, output: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output = output.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_children(mut self, children: Vec<PlanNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_relationship(mut self, rel: ParentRelationship) -> Self {
        self.relationship = Some(rel);
        self
    }

    /// Mark this node as a named InitPlan/SubPlan.
    pub fn as_subplan(self, kind: SubplanKind, name: impl Into<String>) -> Self {
        let rel = match kind {
            SubplanKind::InitPlan => ParentRelationship::InitPlan,
            SubplanKind::SubPlan => ParentRelationship::SubPlan,
        };
        let mut node = self.with_relationship(rel);
        node.subplan_name = Some(name.into());
        node
    }

    pub fn subplan_kind(&self) -> Option<SubplanKind> {
        self.relationship.and_then(ParentRelationship::subplan_kind)
    }

    pub fn is_subplan(&self) -> bool {
        self.subplan_kind().is_some()
    }
}

impl TryFrom<QepNode> for PlanNode {
    type Error = Error;

    fn try_from(mut raw: QepNode) -> Result<Self> {
        let kind = classify(&mut raw)?;
        let node_type = raw.node_type;

        let total_cost = raw
            .total_cost
            .ok_or_else(|| Error::malformed(&node_type, "Total Cost"))?;

        let relationship = raw
            .parent_relationship
            .as_deref()
            .and_then(ParentRelationship::parse);
        let subplan_name = raw.subplan_name;
        if relationship.and_then(ParentRelationship::subplan_kind).is_some()
            && subplan_name.is_none()
        {
            return Err(Error::malformed(&node_type, "Subplan Name"));
        }

        let children = raw
            .plans
            .into_iter()
            .map(PlanNode::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(PlanNode {
            node_type,
            kind,
            startup_cost: raw.startup_cost.unwrap_or(0.0),
            total_cost,
            output: raw.output,
            filters: raw.filters,
            alias: raw.alias,
            relationship,
            subplan_name,
            children,
        })
    }
}

/// Pick the node kind, moving kind-specific fields out of `raw`.
fn classify(raw: &mut QepNode) -> Result<NodeKind> {
    let node_type = raw.node_type.clone();
    let required = |v: Option<String>, field: &'static str| {
        v.ok_or_else(|| Error::malformed(&node_type, field))
    };

    let kind = match node_type.as_str() {
        "Bitmap Index Scan" => NodeKind::BitmapIndexScan {
            index_name: required(raw.index_name.take(), "Index Name")?,
        },
        "Index Scan" | "Index Only Scan" => {
            let direction = required(raw.scan_direction.take(), "Scan Direction")?
                .parse::<ScanDirection>()
                .map_err(|_| Error::malformed(&node_type, "Scan Direction"))?;
            let index_key = raw
                .index_key
                .take()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::malformed(&node_type, "Index Key"))?;
            NodeKind::IndexScan {
                relation: required(raw.relation_name.take(), "Relation Name")?,
                schema: raw.schema.take(),
                index_name: required(raw.index_name.take(), "Index Name")?,
                index_key,
                direction,
                index_only: node_type == "Index Only Scan",
            }
        }
        "Aggregate" | "HashAggregate" | "GroupAggregate" | "Group" => NodeKind::Aggregate {
            group_key: std::mem::take(&mut raw.group_key),
            strategy: raw.strategy.take(),
        },
        "Sort" | "Incremental Sort" => sort_kind(raw)?,
        "Limit" => NodeKind::Limit {
            row_estimate: raw
                .plan_rows
                .ok_or_else(|| Error::malformed(&node_type, "Plan Rows"))?,
        },
        "Hash Join" | "Merge Join" | "Nested Loop" => join_kind(raw)?,
        "Append" | "Merge Append" => NodeKind::SetOp {
            command: SetCommand::Append,
            all: true,
            strategy: raw.strategy.take(),
        },
        "SetOp" | "HashSetOp" => {
            let command = required(raw.command.take(), "Command")?;
            let (command, suffix_all) = SetCommand::parse(&command)
                .ok_or_else(|| Error::malformed(&node_type, "Command"))?;
            NodeKind::SetOp {
                command,
                all: suffix_all || raw.all.unwrap_or(false),
                strategy: raw.strategy.take(),
            }
        }
        "Unique" => NodeKind::Unique,
        "Result" => NodeKind::Result,
        "Hash" => NodeKind::Hash,
        _ if raw.relation_name.is_some() => NodeKind::Scan {
            relation: required(raw.relation_name.take(), "Relation Name")?,
            schema: raw.schema.take(),
        },
        _ if raw.join_type.is_some() => join_kind(raw)?,
        _ if !raw.sort_key.is_empty() => sort_kind(raw)?,
        _ => NodeKind::Unrecognized {
            node_type: node_type.clone(),
        },
    };
    Ok(kind)
}

fn sort_kind(raw: &mut QepNode) -> Result<NodeKind> {
    if raw.sort_key.is_empty() {
        return Err(Error::malformed(&raw.node_type, "Sort Key"));
    }
    Ok(NodeKind::Sort {
        sort_key: std::mem::take(&mut raw.sort_key),
    })
}

fn join_kind(raw: &mut QepNode) -> Result<NodeKind> {
    let join_type = raw
        .join_type
        .take()
        .ok_or_else(|| Error::malformed(&raw.node_type, "Join Type"))?
        .parse::<JoinType>()?;
    Ok(NodeKind::Join {
        join_type,
        join_on: raw.join_on.take(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(node_type: &str) -> QepNode {
        let mut n = QepNode::new(node_type);
        n.total_cost = Some(1.5);
        n
    }

    #[test]
    fn join_without_type_is_malformed() {
        let err = PlanNode::try_from(raw("Hash Join")).unwrap_err();
        assert!(matches!(err, Error::MalformedPlan { field: "Join Type", .. }));
    }

    #[test]
    fn unknown_join_kind_is_unsupported() {
        let mut n = raw("Hash Join");
        n.join_type = Some("Right Anti".into());
        let err = PlanNode::try_from(n).unwrap_err();
        assert!(matches!(err, Error::UnsupportedJoinKind(k) if k == "Right Anti"));
    }

    #[test]
    fn missing_total_cost_is_malformed() {
        let mut n = raw("Result");
        n.total_cost = None;
        assert!(PlanNode::try_from(n).is_err());
    }

    #[test]
    fn relation_name_makes_a_scan() {
        let mut n = raw("CTE Scan");
        n.relation_name = Some("revenue0".into());
        n.alias = Some("r".into());
        let node = PlanNode::try_from(n).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Scan {
                relation: "revenue0".into(),
                schema: None
            }
        );
        assert_eq!(node.alias.as_deref(), Some("r"));
    }

    #[test]
    fn index_scan_requires_index_key() {
        let mut n = raw("Index Scan");
        n.relation_name = Some("orders".into());
        n.index_name = Some("orders_pkey".into());
        n.scan_direction = Some("Backward".into());
        assert!(matches!(
            PlanNode::try_from(n.clone()).unwrap_err(),
            Error::MalformedPlan { field: "Index Key", .. }
        ));

        n.index_key = Some(vec!["o_orderkey".into()]);
        let node = PlanNode::try_from(n).unwrap();
        match node.kind {
            NodeKind::IndexScan {
                direction,
                index_only,
                ..
            } => {
                assert_eq!(direction, ScanDirection::Backward);
                assert!(!index_only);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn set_command_suffix_carries_all() {
        assert_eq!(
            SetCommand::parse("Intersect All"),
            Some((SetCommand::Intersect, true))
        );
        assert_eq!(SetCommand::parse("Except"), Some((SetCommand::Except, false)));
        assert_eq!(SetCommand::parse("Merge"), None);
    }

    #[test]
    fn subplan_without_name_is_malformed() {
        let mut n = raw("Aggregate");
        n.parent_relationship = Some("SubPlan".into());
        assert!(matches!(
            PlanNode::try_from(n).unwrap_err(),
            Error::MalformedPlan { field: "Subplan Name", .. }
        ));
    }

    #[test]
    fn unrecognized_node_keeps_its_label() {
        let node = PlanNode::try_from(raw("Materialize")).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Unrecognized {
                node_type: "Materialize".into()
            }
        );
    }
}
