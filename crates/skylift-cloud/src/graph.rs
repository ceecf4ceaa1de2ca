//! In-memory dependency graph of resources, built before anything is applied.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::resource::{Expr, Resource, ResourceKind};

/// `resource` must be applied after `depends_on`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub resource: String,
    pub depends_on: String,
}

/// A directed acyclic graph of resource descriptions plus named outputs.
///
/// Attribute references between resources become edges automatically when a
/// resource is added; ordering the backend cannot infer from references is
/// added with [`depend`](Self::depend). Every edge points at a resource that
/// was added earlier or is added explicitly, so the graph stays closed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    edges: BTreeSet<Edge>,
    outputs: BTreeMap<String, Expr>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `resource`; every resource it references must already be present.
    pub fn add(&mut self, resource: Resource) -> Result<(), GraphError> {
        if self.index.contains_key(&resource.id) {
            return Err(GraphError::DuplicateResource(resource.id));
        }
        for reference in resource.references() {
            if !self.index.contains_key(reference) {
                return Err(GraphError::UnknownResource {
                    resource: resource.id.clone(),
                    reference: reference.to_owned(),
                });
            }
        }

        let edges: Vec<Edge> = resource
            .references()
            .into_iter()
            .map(|reference| Edge {
                resource: resource.id.clone(),
                depends_on: reference.to_owned(),
            })
            .collect();
        self.edges.extend(edges);
        self.index.insert(resource.id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Declare that `resource` must be applied after `depends_on`.
    pub fn depend(&mut self, resource: &str, depends_on: &str) -> Result<(), GraphError> {
        for id in [resource, depends_on] {
            if !self.index.contains_key(id) {
                return Err(GraphError::UnknownResource {
                    resource: resource.to_owned(),
                    reference: id.to_owned(),
                });
            }
        }
        if resource == depends_on || self.reaches(depends_on, resource) {
            return Err(GraphError::Cycle {
                resource: resource.to_owned(),
                depends_on: depends_on.to_owned(),
            });
        }
        self.edges.insert(Edge {
            resource: resource.to_owned(),
            depends_on: depends_on.to_owned(),
        });
        Ok(())
    }

    /// Declare a named value the backend reports back after applying.
    pub fn output(&mut self, name: impl Into<String>, value: Expr) -> Result<(), GraphError> {
        let name = name.into();
        for reference in value.references() {
            if !self.index.contains_key(reference) {
                return Err(GraphError::UnknownResource {
                    resource: format!("output:{name}"),
                    reference: reference.to_owned(),
                });
            }
        }
        self.outputs.insert(name, value);
        Ok(())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// Resources whose kind matches `predicate`, in insertion order.
    pub fn filter<'a>(
        &'a self,
        predicate: impl Fn(&ResourceKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| predicate(&r.kind))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Direct dependencies of `id`.
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.resource == id)
            .map(|e| e.depends_on.as_str())
            .collect()
    }

    /// Whether `resource` has a direct edge to `depends_on`.
    pub fn depends_on(&self, resource: &str, depends_on: &str) -> bool {
        self.edges.contains(&Edge {
            resource: resource.to_owned(),
            depends_on: depends_on.to_owned(),
        })
    }

    /// Whether `from` transitively depends on `to`.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.dependencies(current));
            }
        }
        false
    }

    pub fn outputs(&self) -> &BTreeMap<String, Expr> {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Ids in an order where every resource follows its dependencies.
    ///
    /// Ties keep insertion order, so the result is deterministic.
    pub fn topological_order(&self) -> Result<Vec<&str>, GraphError> {
        let mut remaining: HashMap<&str, usize> = self
            .resources
            .iter()
            .map(|r| (r.id.as_str(), 0))
            .collect();
        for edge in &self.edges {
            if let Some(count) = remaining.get_mut(edge.resource.as_str()) {
                *count += 1;
            }
        }

        let mut order = Vec::with_capacity(self.resources.len());
        while order.len() < self.resources.len() {
            let next = self
                .resources
                .iter()
                .map(|r| r.id.as_str())
                .find(|id| remaining.get(id) == Some(&0));
            let Some(next) = next else {
                let stuck = self
                    .resources
                    .iter()
                    .map(|r| r.id.as_str())
                    .find(|id| remaining.contains_key(id));
                let Some(stuck) = stuck else { break };
                return Err(GraphError::Cycle {
                    resource: stuck.to_owned(),
                    depends_on: self.dependencies(stuck).join(", "),
                });
            };
            remaining.remove(next);
            for edge in self.edges.iter().filter(|e| e.depends_on == next) {
                if let Some(count) = remaining.get_mut(edge.resource.as_str()) {
                    *count -= 1;
                }
            }
            order.push(next);
        }
        Ok(order)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("resource '{0}' is declared twice")]
    DuplicateResource(String),

    #[error("resource '{resource}' references unknown resource '{reference}'")]
    UnknownResource { resource: String, reference: String },

    #[error("dependency of '{resource}' on '{depends_on}' would create a cycle")]
    Cycle {
        resource: String,
        depends_on: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attr, ObjectOwnership};

    fn bucket(id: &str) -> Resource {
        Resource::new(
            id,
            ResourceKind::Bucket {
                name: None,
                force_destroy: true,
                ownership: ObjectOwnership::BucketOwnerEnforced,
            },
        )
    }

    fn website(id: &str, bucket: &str) -> Resource {
        Resource::new(
            id,
            ResourceKind::WebsiteConfig {
                bucket: Expr::attr(bucket, Attr::Id),
                index_document: "index.html".to_owned(),
                error_document: None,
            },
        )
    }

    #[test]
    fn references_become_edges() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("site")).unwrap();
        graph.add(website("web", "site")).unwrap();

        assert!(graph.depends_on("web", "site"));
        assert_eq!(graph.dependencies("web"), vec!["site"]);
        assert!(graph.dependencies("site").is_empty());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("site")).unwrap();
        let err = graph.add(bucket("site")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateResource(id) if id == "site"));
    }

    #[test]
    fn reference_to_missing_resource_is_rejected() {
        let mut graph = ResourceGraph::new();
        let err = graph.add(website("web", "site")).unwrap_err();
        assert!(matches!(err, GraphError::UnknownResource { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn explicit_cycle_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("a")).unwrap();
        graph.add(bucket("b")).unwrap();
        graph.depend("a", "b").unwrap();

        assert!(matches!(graph.depend("b", "a"), Err(GraphError::Cycle { .. })));
        assert!(matches!(graph.depend("a", "a"), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn depend_on_unknown_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("a")).unwrap();
        assert!(matches!(
            graph.depend("a", "ghost"),
            Err(GraphError::UnknownResource { .. })
        ));
    }

    #[test]
    fn topological_order_respects_edges() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("late")).unwrap();
        graph.add(bucket("site")).unwrap();
        graph.add(website("web", "site")).unwrap();
        graph.depend("late", "web").unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["site", "web", "late"]);
    }

    #[test]
    fn transitive_reachability() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("a")).unwrap();
        graph.add(bucket("b")).unwrap();
        graph.add(bucket("c")).unwrap();
        graph.depend("c", "b").unwrap();
        graph.depend("b", "a").unwrap();

        assert!(graph.reaches("c", "a"));
        assert!(!graph.reaches("a", "c"));
        assert!(!graph.depends_on("c", "a"));
    }

    #[test]
    fn output_must_reference_known_resource() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("site")).unwrap();
        graph
            .output("url", Expr::attr("site", Attr::WebsiteEndpoint))
            .unwrap();
        assert!(graph.output("bad", Expr::attr("ghost", Attr::Url)).is_err());
        assert_eq!(graph.outputs().len(), 1);
    }

    #[test]
    fn serializes_resources_edges_and_outputs() {
        let mut graph = ResourceGraph::new();
        graph.add(bucket("site")).unwrap();
        graph.add(website("web", "site")).unwrap();
        graph
            .output("url", Expr::attr("site", Attr::WebsiteEndpoint))
            .unwrap();

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["resources"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"][0]["resource"], "web");
        assert_eq!(json["edges"][0]["depends_on"], "site");
        assert_eq!(json["outputs"]["url"]["ref"], "site");
        assert!(json.get("index").is_none());
    }
}
