//! Table and function dependency extraction from SQL AST

use crate::references::{is_builtin_function, References};
use sqlparser::ast::{
    Expr, ObjectName, ObjectNamePart, Query, Statement, TableFactor, Visit, Visitor,
};
use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

/// Render an object name without identifier quoting (`"Sales".orders` → `Sales.orders`)
pub fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => ident.value.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Default)]
struct ReferenceVisitor {
    /// CTE names of every enclosing query, innermost last
    cte_scopes: Vec<HashSet<String>>,
    relations: BTreeSet<String>,
    table_functions: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl ReferenceVisitor {
    /// Whether an unqualified name refers to a CTE visible at this point
    fn is_cte(&self, name: &str) -> bool {
        if name.contains('.') {
            return false;
        }
        let name = name.to_lowercase();
        self.cte_scopes.iter().any(|scope| scope.contains(&name))
    }
}

impl Visitor for ReferenceVisitor {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        let names = query
            .with
            .iter()
            .flat_map(|with| &with.cte_tables)
            .map(|cte| cte.alias.name.value.to_lowercase())
            .collect();
        self.cte_scopes.push(names);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.cte_scopes.pop();
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let name = object_name_to_string(relation);
        if !self.is_cte(&name) {
            self.relations.insert(name);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table {
            name,
            args: Some(_),
            ..
        } = factor
        {
            self.table_functions.insert(object_name_to_string(name));
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(func) = expr {
            self.functions.insert(object_name_to_string(&func.name));
        }
        ControlFlow::Continue(())
    }
}

/// Extract table and user function references from a parsed statement.
///
/// Tables come from every relation in the tree (subqueries, joins, set
/// operations); names defined by a `WITH` clause are excluded inside the
/// query that defines them and its subqueries. Table-valued
/// function calls in `FROM` count as functions. Built-in functions are
/// dropped.
pub fn extract_dependencies(statement: &Statement) -> References {
    let mut visitor = ReferenceVisitor::default();
    let _ = statement.visit(&mut visitor);

    let ReferenceVisitor {
        relations,
        table_functions,
        functions,
        ..
    } = visitor;

    let tables = relations
        .into_iter()
        .filter(|name| !table_functions.contains(name))
        .collect();

    let functions = functions
        .into_iter()
        .chain(table_functions)
        .filter(|name| name.contains('.') || !is_builtin_function(name))
        .collect();

    References { tables, functions }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
