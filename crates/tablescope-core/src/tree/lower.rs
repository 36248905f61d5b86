//! Lowering from sqlparser's AST into the query tree

use std::collections::HashSet;
use std::convert::Infallible;
use std::ops::ControlFlow;

use sqlparser::ast::{
    ObjectName, Query, Select, SetExpr, Statement, TableAlias, TableFactor, TableWithJoins, Visit,
    Visitor,
};

use super::{QueryNode, RawNameToken};
use crate::error::Span;

/// Lower one parsed statement
pub fn lower_statement(stmt: &Statement) -> QueryNode {
    match stmt {
        Statement::Query(query) => lower_query(query),
        Statement::Insert(insert) => {
            QueryNode::Other(insert.source.iter().map(|q| lower_query(q)).collect())
        }
        Statement::Explain { statement, .. } => lower_statement(statement),
        Statement::CreateView { query, .. } => QueryNode::Other(vec![lower_query(query)]),
        // CREATE TABLE ... AS SELECT
        Statement::CreateTable(create) => {
            QueryNode::Other(create.query.iter().map(|q| lower_query(q)).collect())
        }
        _ => QueryNode::Other(Vec::new()),
    }
}

/// Lower a query; CTE bodies and subqueries outside the body become
/// siblings of the main body
pub fn lower_query(query: &Query) -> QueryNode {
    let mut children: Vec<QueryNode> = query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .map(|cte| lower_query(&cte.query))
        .collect();
    children.push(lower_set_expr(&query.body));

    let mut subqueries = SubqueryCollector::default();
    subqueries.collect(&query.order_by);
    subqueries.collect(&query.limit);
    subqueries.collect(&query.limit_by);
    subqueries.collect(&query.offset);
    subqueries.collect(&query.fetch);
    children.extend(subqueries.queries);

    match children.len() {
        1 => children.remove(0),
        _ => QueryNode::Other(children),
    }
}

fn lower_set_expr(set_expr: &SetExpr) -> QueryNode {
    match set_expr {
        SetExpr::Select(select) => lower_select(select),
        SetExpr::Query(query) => lower_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            QueryNode::Other(vec![lower_set_expr(left), lower_set_expr(right)])
        }
        SetExpr::Values(values) => {
            let mut subqueries = SubqueryCollector::default();
            subqueries.collect(values);
            QueryNode::Other(subqueries.queries)
        }
        _ => QueryNode::Other(Vec::new()),
    }
}

fn lower_select(select: &Select) -> QueryNode {
    let mut subqueries = SubqueryCollector::default();

    // Comma-separated FROM entries are cross joins
    let from = select
        .from
        .iter()
        .map(|table| lower_table_with_joins(table, &mut subqueries))
        .reduce(QueryNode::join);

    subqueries.collect(&select.projection);
    subqueries.collect(&select.lateral_views);
    subqueries.collect(&select.selection);
    subqueries.collect(&select.group_by);
    subqueries.collect(&select.cluster_by);
    subqueries.collect(&select.distribute_by);
    subqueries.collect(&select.sort_by);
    subqueries.collect(&select.having);
    subqueries.collect(&select.named_window);
    subqueries.collect(&select.qualify);

    QueryNode::select(from, subqueries.queries)
}

fn lower_table_with_joins(
    table: &TableWithJoins,
    subqueries: &mut SubqueryCollector,
) -> QueryNode {
    let mut node = lower_table_factor(&table.relation, subqueries);
    for join in &table.joins {
        let right = lower_table_factor(&join.relation, subqueries);
        subqueries.collect(&join.join_operator);
        node = QueryNode::join(node, right);
    }
    node
}

fn lower_table_factor(factor: &TableFactor, subqueries: &mut SubqueryCollector) -> QueryNode {
    match factor {
        TableFactor::Table {
            name, alias, args, ..
        } => {
            // Table-valued function call, not a table
            if args.is_some() {
                return QueryNode::Other(Vec::new());
            }
            with_alias(QueryNode::Identifier(name_token(name)), alias.as_ref())
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => with_alias(lower_query(subquery), alias.as_ref()),
        TableFactor::NestedJoin {
            table_with_joins,
            alias,
            ..
        } => with_alias(
            lower_table_with_joins(table_with_joins, subqueries),
            alias.as_ref(),
        ),
        _ => QueryNode::Other(Vec::new()),
    }
}

fn with_alias(node: QueryNode, alias: Option<&TableAlias>) -> QueryNode {
    match alias {
        Some(alias) => QueryNode::aliased(node, alias.name.value.clone()),
        None => node,
    }
}

/// Dotted token for an object name, spanning all of its parts
fn name_token(name: &ObjectName) -> RawNameToken {
    let text = name
        .0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".");
    let span = match (name.0.first(), name.0.last()) {
        (Some(first), Some(last)) => {
            let first = Span::from_sqlparser(&first.span);
            Some(first.union(&Span::from_sqlparser(&last.span)))
        }
        _ => None,
    };
    RawNameToken::new(text).with_span(span.filter(Span::has_location))
}

/// Names bound by WITH clauses anywhere in the statement, lower-cased
pub fn cte_names(stmt: &Statement) -> HashSet<String> {
    let mut collector = CteCollector::default();
    match stmt.visit(&mut collector) {
        ControlFlow::Continue(()) => {}
        ControlFlow::Break(never) => match never {},
    }
    collector.names
}

#[derive(Default)]
struct CteCollector {
    names: HashSet<String>,
}

impl Visitor for CteCollector {
    type Break = Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.names.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Lowers the outermost queries found while visiting expressions
#[derive(Default)]
struct SubqueryCollector {
    depth: usize,
    queries: Vec<QueryNode>,
}

impl SubqueryCollector {
    fn collect<T: Visit>(&mut self, node: &T) {
        match node.visit(self) {
            ControlFlow::Continue(()) => {}
            ControlFlow::Break(never) => match never {},
        }
    }
}

impl Visitor for SubqueryCollector {
    type Break = Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            self.queries.push(lower_query(query));
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.depth -= 1;
        ControlFlow::Continue(())
    }
}
