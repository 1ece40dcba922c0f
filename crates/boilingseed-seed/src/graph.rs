use std::collections::{BTreeMap, BTreeSet};

use boilingseed_core::toposort;

use crate::descriptor::{DescriptorSet, EntityName};
use crate::errors::SeedError;

/// Entity dependency graph. An edge `B -> A` means A references B and B is seeded first.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn build(descriptors: &DescriptorSet) -> Self {
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for descriptor in descriptors.iter() {
            let name = descriptor.name.as_str().to_string();
            dependents.entry(name.clone()).or_default();
            for fk in &descriptor.foreign_keys {
                dependents
                    .entry(fk.referenced.as_str().to_string())
                    .or_default()
                    .insert(name.clone());
            }
        }

        Self { dependents }
    }

    pub fn node_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    /// Deterministic stage order, or [`SeedError::SchemaCycle`] naming the entities on a cycle.
    pub fn topological_order(
        &self,
        descriptors: &DescriptorSet,
    ) -> Result<Vec<EntityName>, SeedError> {
        let order =
            toposort(&self.dependents).map_err(|entities| SeedError::SchemaCycle { entities })?;

        let by_key: BTreeMap<&str, &EntityName> = descriptors
            .iter()
            .map(|descriptor| (descriptor.name.as_str(), &descriptor.name))
            .collect();

        Ok(order
            .iter()
            .filter_map(|key| by_key.get(key.as_str()).map(|name| (*name).clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boilingseed_core::{
        Column, ColumnType, Constraint, DatabaseSchema, ForeignKey, Schema, Table, TableKind,
    };

    fn table(name: &str, references: &[&str]) -> Table {
        let mut columns = vec![Column {
            ordinal_position: 1,
            name: "id".to_string(),
            column_type: ColumnType::named("integer"),
            is_nullable: false,
            default: None,
            identity: None,
            generated: None,
        }];
        let mut constraints = Vec::new();
        for (idx, referenced) in references.iter().enumerate() {
            let column = format!("{referenced}_id");
            columns.push(Column {
                ordinal_position: idx as i16 + 2,
                name: column.clone(),
                column_type: ColumnType::named("integer"),
                is_nullable: false,
                default: None,
                identity: None,
                generated: None,
            });
            constraints.push(Constraint::ForeignKey(ForeignKey {
                name: None,
                columns: vec![column],
                referenced_schema: "public".to_string(),
                referenced_table: referenced.to_string(),
                referenced_columns: vec!["id".to_string()],
            }));
        }
        Table {
            name: name.to_string(),
            kind: TableKind::Table,
            columns,
            constraints,
        }
    }

    fn descriptors(tables: Vec<Table>) -> DescriptorSet {
        DescriptorSet::from_schema(&DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "public".to_string(),
                tables,
            }],
            enums: Vec::new(),
        })
        .expect("descriptors")
    }

    fn names(order: &[EntityName]) -> Vec<&str> {
        order.iter().map(EntityName::table).collect()
    }

    #[test]
    fn orders_bookstore_entities() {
        let set = descriptors(vec![
            table("book_tags", &["books"]),
            table("books", &["authors", "categories"]),
            table("categories", &[]),
            table("authors", &[]),
        ]);
        let graph = DependencyGraph::build(&set);
        assert_eq!(graph.edge_count(), 3);
        let order = graph.topological_order(&set).expect("acyclic");
        assert_eq!(names(&order), vec!["authors", "categories", "books", "book_tags"]);
    }

    #[test]
    fn every_entity_follows_its_references() {
        let set = descriptors(vec![
            table("d", &["b", "c"]),
            table("c", &["a"]),
            table("b", &["a"]),
            table("a", &[]),
            table("e", &["d", "a"]),
        ]);
        let order = DependencyGraph::build(&set)
            .topological_order(&set)
            .expect("acyclic");
        let position = |name: &str| {
            order
                .iter()
                .position(|entity| entity.table() == name)
                .expect("entity in order")
        };
        for descriptor in set.iter() {
            for fk in &descriptor.foreign_keys {
                assert!(position(fk.referenced.table()) < position(descriptor.name.table()));
            }
        }
    }

    #[test]
    fn reports_cycle_members() {
        let set = descriptors(vec![
            table("a", &["b"]),
            table("b", &["a"]),
            table("c", &["a"]),
            table("root", &[]),
        ]);
        let err = DependencyGraph::build(&set)
            .topological_order(&set)
            .unwrap_err();
        match err {
            SeedError::SchemaCycle { entities } => {
                assert_eq!(entities, vec!["public.a", "public.b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }
}
