//! Name resolver - collects the tables a query reads from

use indexmap::{IndexMap, IndexSet};

use crate::error::Span;
use crate::schema::TableName;
use crate::tree::{QueryNode, RawNameToken};

/// Tables referenced by one query
#[derive(Debug, Clone, Default)]
pub struct TableReferences {
    names: IndexSet<TableName>,
    spans: IndexMap<TableName, Span>,
    malformed: Vec<RawNameToken>,
}

impl TableReferences {
    /// Every well-formed table reference, in order of first appearance
    pub fn names(&self) -> &IndexSet<TableName> {
        &self.names
    }

    /// Names in table position with more than two parts
    pub fn malformed(&self) -> &[RawNameToken] {
        &self.malformed
    }

    /// Where a table was first referenced, if known
    pub fn span_of(&self, name: &TableName) -> Option<Span> {
        self.spans.get(name).copied()
    }
}

/// Walks a query tree and collects table references from every FROM clause
pub struct NameResolver {
    current_db: String,
    references: TableReferences,
}

impl NameResolver {
    /// Create a resolver qualifying one-part names with `current_db`
    pub fn new(current_db: &str) -> Self {
        Self {
            current_db: current_db.to_lowercase(),
            references: TableReferences::default(),
        }
    }

    /// Collect references from the whole tree, subqueries included
    pub fn resolve(mut self, root: &QueryNode) -> TableReferences {
        self.visit(root);
        self.references
    }

    fn visit(&mut self, node: &QueryNode) {
        if let QueryNode::Select { from: Some(from), .. } = node {
            self.collect_from(from);
        }
        for child in node.children() {
            self.visit(child);
        }
    }

    /// Table names in a FROM sub-tree
    fn collect_from(&mut self, node: &QueryNode) {
        match node {
            QueryNode::Identifier(token) => match token.parts().as_slice() {
                [table] => {
                    let name = TableName::new(&self.current_db, table);
                    self.add(name, token.span());
                }
                [db, table] => self.add(TableName::new(db, table), token.span()),
                _ => self.references.malformed.push(token.clone()),
            },
            QueryNode::Join { left, right } => {
                self.collect_from(left);
                self.collect_from(right);
            }
            // The alias itself names nothing in the catalog
            QueryNode::Aliased { operand, .. } => self.collect_from(operand),
            _ => {}
        }
    }

    fn add(&mut self, name: TableName, span: Option<Span>) {
        if let Some(span) = span {
            self.references.spans.entry(name.clone()).or_insert(span);
        }
        self.references.names.insert(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(refs: &TableReferences) -> Vec<String> {
        refs.names().iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_unqualified_uses_current_db() {
        let tree = QueryNode::select(Some(QueryNode::ident("Orders")), vec![]);
        let refs = NameResolver::new("Sales").resolve(&tree);
        assert_eq!(names(&refs), vec!["sales.orders"]);
    }

    #[test]
    fn test_qualified_ignores_current_db() {
        let tree = QueryNode::select(Some(QueryNode::ident("tpch.lineitem")), vec![]);
        let refs = NameResolver::new("default").resolve(&tree);
        assert_eq!(names(&refs), vec!["tpch.lineitem"]);
    }

    #[test]
    fn test_three_parts_are_malformed() {
        let tree = QueryNode::select(
            Some(QueryNode::join(
                QueryNode::ident("t"),
                QueryNode::aliased(QueryNode::ident("t.addr.street"), "s"),
            )),
            vec![],
        );
        let refs = NameResolver::new("default").resolve(&tree);
        assert_eq!(names(&refs), vec!["default.t"]);
        assert_eq!(refs.malformed().len(), 1);
        assert_eq!(refs.malformed()[0].text(), "t.addr.street");
    }

    #[test]
    fn test_self_join_yields_one_reference() {
        let tree = QueryNode::select(
            Some(QueryNode::join(
                QueryNode::aliased(QueryNode::ident("T"), "a"),
                QueryNode::aliased(QueryNode::ident("t"), "b"),
            )),
            vec![],
        );
        let refs = NameResolver::new("default").resolve(&tree);
        assert_eq!(names(&refs), vec!["default.t"]);
    }

    #[test]
    fn test_alias_is_not_a_table() {
        let tree = QueryNode::select(Some(QueryNode::aliased(QueryNode::ident("t"), "x")), vec![]);
        let refs = NameResolver::new("default").resolve(&tree);
        assert!(!refs.names().contains(&TableName::new("default", "x")));
    }

    #[test]
    fn test_nested_selects_contribute() {
        let subquery = QueryNode::select(Some(QueryNode::ident("inner_t")), vec![]);
        let derived = QueryNode::aliased(
            QueryNode::select(Some(QueryNode::ident("db2.derived_t")), vec![]),
            "d",
        );
        let tree = QueryNode::Other(vec![
            QueryNode::select(
                Some(QueryNode::join(QueryNode::ident("outer_t"), derived)),
                vec![subquery],
            ),
            QueryNode::select(None, vec![]),
        ]);
        let refs = NameResolver::new("default").resolve(&tree);
        assert_eq!(
            names(&refs),
            vec!["default.outer_t", "db2.derived_t", "default.inner_t"]
        );
    }

    #[test]
    fn test_missing_from_contributes_nothing() {
        let tree = QueryNode::select(None, vec![]);
        let refs = NameResolver::new("default").resolve(&tree);
        assert!(refs.names().is_empty());
        assert!(refs.malformed().is_empty());
    }

    #[test]
    fn test_first_span_is_kept() {
        let first = Span::with_location(1, 15, 1);
        let second = Span::with_location(1, 30, 1);
        let tree = QueryNode::select(
            Some(QueryNode::join(
                QueryNode::Identifier(RawNameToken::new("t").with_span(Some(first))),
                QueryNode::Identifier(RawNameToken::new("T").with_span(Some(second))),
            )),
            vec![],
        );
        let refs = NameResolver::new("default").resolve(&tree);
        assert_eq!(refs.span_of(&TableName::new("default", "t")), Some(first));
    }
}
