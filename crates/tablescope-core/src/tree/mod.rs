//! Query tree - the parts of a parsed query that table resolution looks at

mod lower;

pub use lower::{cte_names, lower_query, lower_statement};

use crate::error::Span;

/// A dotted name in table position, before anyone knows what it names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNameToken {
    text: String,
    span: Option<Span>,
}

impl RawNameToken {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Dot-separated parts of the name
    pub fn parts(&self) -> Vec<&str> {
        self.text.split('.').collect()
    }
}

impl std::fmt::Display for RawNameToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Node of a parsed query.
///
/// Only the shapes table resolution cares about are distinguished. `Other`
/// keeps the children that may still hold nested selects (set operations,
/// CTE bodies, subqueries in expressions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Select {
        from: Option<Box<QueryNode>>,
        nested: Vec<QueryNode>,
    },
    Join {
        left: Box<QueryNode>,
        right: Box<QueryNode>,
    },
    Aliased {
        operand: Box<QueryNode>,
        alias: String,
    },
    Identifier(RawNameToken),
    Other(Vec<QueryNode>),
}

impl QueryNode {
    pub fn select(from: Option<QueryNode>, nested: Vec<QueryNode>) -> Self {
        QueryNode::Select {
            from: from.map(Box::new),
            nested,
        }
    }

    pub fn join(left: QueryNode, right: QueryNode) -> Self {
        QueryNode::Join {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn aliased(operand: QueryNode, alias: impl Into<String>) -> Self {
        QueryNode::Aliased {
            operand: Box::new(operand),
            alias: alias.into(),
        }
    }

    pub fn ident(text: impl Into<String>) -> Self {
        QueryNode::Identifier(RawNameToken::new(text))
    }

    /// Direct children, in source order
    pub fn children(&self) -> Vec<&QueryNode> {
        match self {
            QueryNode::Select { from, nested } => {
                from.iter().map(|f| f.as_ref()).chain(nested.iter()).collect()
            }
            QueryNode::Join { left, right } => vec![left.as_ref(), right.as_ref()],
            QueryNode::Aliased { operand, .. } => vec![operand.as_ref()],
            QueryNode::Identifier(_) => Vec::new(),
            QueryNode::Other(children) => children.iter().collect(),
        }
    }
}
