use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::domain::{EvaluationConfig, FocusArea, FocusAreaId, ProgramId};

/// Inject the default evaluation config into every node (and nested child) that lacks one.
///
/// The default is keyed to the node's own id. Applying this twice changes nothing.
pub fn normalize(raw: Vec<FocusArea>) -> Vec<FocusArea> {
    raw.into_iter().map(normalize_node).collect()
}

fn normalize_node(mut area: FocusArea) -> FocusArea {
    if area.eval.is_none() {
        area.eval = Some(EvaluationConfig::default_for(area.id.clone()));
    }
    area.children = area.children.into_iter().map(normalize_node).collect();
    area
}

/// Parent focus areas that can be attached to a program.
///
/// Anything listed as another node's child is excluded even if the server also ships it at
/// the top level.
pub fn select_top_level(focus_areas: &[FocusArea]) -> Vec<FocusArea> {
    let nested: HashSet<&FocusAreaId> = focus_areas
        .iter()
        .flat_map(|area| area.children.iter())
        .filter_map(|child| child.id.as_ref())
        .collect();

    let mut seen = HashSet::new();
    focus_areas
        .iter()
        .filter(|area| area.is_parent && area.is_top_level())
        .filter(|area| match &area.id {
            Some(id) => !nested.contains(id) && seen.insert(id.clone()),
            None => false,
        })
        .cloned()
        .collect()
}

/// One focus area inside a [`FocusAreaTree`]; children are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusAreaNode {
    pub id: FocusAreaId,
    pub program_id: Option<ProgramId>,
    pub name: String,
    pub objective: Option<String>,
    pub description: Option<String>,
    pub criteria: Option<String>,
    pub is_parent: bool,
    pub parent_id: Option<FocusAreaId>,
    pub children: Vec<FocusAreaId>,
    pub eval: EvaluationConfig,
}

impl FocusAreaNode {
    fn from_area(area: &FocusArea, id: FocusAreaId, parent_id: Option<FocusAreaId>) -> Self {
        let eval = area
            .eval
            .clone()
            .unwrap_or_else(|| EvaluationConfig::default_for(Some(id.clone())));
        Self {
            id,
            program_id: area.program_id.clone(),
            name: area.name.clone(),
            objective: area.objective.clone(),
            description: area.description.clone(),
            criteria: area.criteria.clone(),
            is_parent: area.is_parent,
            parent_id,
            children: Vec::new(),
            eval,
        }
    }

    fn to_area(&self, children: Vec<FocusArea>) -> FocusArea {
        FocusArea {
            id: Some(self.id.clone()),
            program_id: self.program_id.clone(),
            name: self.name.clone(),
            objective: self.objective.clone(),
            description: self.description.clone(),
            criteria: self.criteria.clone(),
            is_parent: self.is_parent,
            parent_id: self.parent_id.clone(),
            children,
            eval: Some(self.eval.clone()),
        }
    }
}

/// Arena-indexed two-level focus area tree.
///
/// Nodes live in an id map; parents keep the ordered ids of their children and `roots`
/// keeps the ordered top-level ids. Every node carries an evaluation config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusAreaTree {
    nodes: HashMap<FocusAreaId, FocusAreaNode>,
    roots: Vec<FocusAreaId>,
}

impl FocusAreaTree {
    pub fn from_focus_areas(areas: &[FocusArea]) -> Self {
        let mut tree = Self::default();

        for area in areas {
            let Some(id) = area.id.clone() else {
                warn!(name = %area.name, "dropping focus area without an id");
                continue;
            };
            if !area.is_parent && !area.children.is_empty() {
                warn!(%id, "dropping children of a focus area that is not a parent");
            }

            if !tree.nodes.contains_key(&id) {
                tree.nodes.insert(
                    id.clone(),
                    FocusAreaNode::from_area(area, id.clone(), area.parent_id.clone()),
                );
                tree.roots.push(id.clone());
            }

            if area.is_parent {
                for child in &area.children {
                    tree.insert_nested(&id, child);
                }
            }
        }

        tree.attach_flat_children();
        tree
    }

    fn insert_nested(&mut self, parent_id: &FocusAreaId, child: &FocusArea) {
        let Some(child_id) = child.id.clone() else {
            warn!(%parent_id, name = %child.name, "dropping child focus area without an id");
            return;
        };
        if !child.children.is_empty() {
            warn!(%child_id, "focus areas nest two levels deep; dropping grandchildren");
        }

        // A child listed both nested and flat keeps its nested representation.
        let node = FocusAreaNode::from_area(child, child_id.clone(), Some(parent_id.clone()));
        if let Some(previous) = self.nodes.insert(child_id.clone(), node) {
            if let Some(old_parent) = previous.parent_id.filter(|old| old != parent_id) {
                if let Some(old) = self.nodes.get_mut(&old_parent) {
                    old.children.retain(|id| id != &child_id);
                }
            }
        }
        self.roots.retain(|root| root != &child_id);

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            if !parent.children.contains(&child_id) {
                parent.children.push(child_id);
            }
        }
    }

    /// Top-level entries that name an existing parent are moved under it.
    fn attach_flat_children(&mut self) {
        let flat: Vec<(FocusAreaId, FocusAreaId)> = self
            .roots
            .iter()
            .filter_map(|id| {
                let node = self.nodes.get(id)?;
                let parent_id = node.parent_id.clone()?;
                let parent = self.nodes.get(&parent_id)?;
                (parent.is_parent && parent.parent_id.is_none())
                    .then(|| (id.clone(), parent_id))
            })
            .collect();

        for (child_id, parent_id) in flat {
            self.roots.retain(|root| root != &child_id);
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                if !parent.children.contains(&child_id) {
                    parent.children.push(child_id);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &FocusAreaId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &FocusAreaId) -> Option<&FocusAreaNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &FocusAreaNode> + '_ {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children(&self, id: &FocusAreaId) -> impl Iterator<Item = &FocusAreaNode> + '_ {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Ids of top-level parents, in display order.
    pub fn selectable_ids(&self) -> Vec<FocusAreaId> {
        self.roots()
            .filter(|node| node.is_parent)
            .map(|node| node.id.clone())
            .collect()
    }

    /// Replace one node's config in place. Returns `false` if the node is not in the tree.
    pub fn set_eval(&mut self, id: &FocusAreaId, config: EvaluationConfig) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.eval = config;
                true
            }
            None => false,
        }
    }

    /// Rebuild the nested wire representation.
    pub fn to_focus_areas(&self) -> Vec<FocusArea> {
        self.roots()
            .map(|root| {
                let children = self
                    .children(&root.id)
                    .map(|child| child.to_area(Vec::new()))
                    .collect();
                root.to_area(children)
            })
            .collect()
    }
}
