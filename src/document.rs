//! Persisted form of a forest.
//!
//! Documents are read with `json5` so hand-written files may carry comments
//! and trailing commas. Cached layout numbers are optional; when present
//! they seed the forest as fresh geometry until the first edit.

use crate::config::{LayoutConfig, StyleConfig};
use crate::error::{DocumentError, ForestError};
use crate::forest::{Forest, NodeId};
use crate::geometry::Point;
use crate::label::{Label, TextRun};
use crate::layout::{ConnectorKind, hit_region};
use crate::mdom::{CubicPath, MdomEdge};
use crate::style::{Alignment, TextStyle};
use crate::taint::Taint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub trees: Vec<NodeDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mdoms: Vec<MdomDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Only needed when an mdom entry refers to the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Missing labels get the configured default text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelDoc>,
    #[serde(default)]
    pub connector: ConnectorKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daughters: Vec<NodeDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelDoc {
    /// Plain text in the default style; `\n` separates lines.
    Text(String),
    Rich(RichLabelDoc),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichLabelDoc {
    pub runs: Vec<RunDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDoc {
    pub text: String,
    #[serde(default)]
    pub line: usize,
    /// SVG style attribute applied on top of the default style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSeed {
    pub inner_width: f32,
    pub outer_width: f32,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<ConnectorSeed>,
}

/// Connector endpoints in the mother frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSeed {
    pub start: Point,
    pub end: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner: Option<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdomDoc {
    pub mother: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daughter: Option<String>,
    /// Path data, `M x,y c .. .. .. c .. .. ..`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

#[derive(Debug)]
pub struct LoadedDocument {
    pub forest: Forest,
    /// Node handles by document id.
    pub ids: BTreeMap<String, NodeId>,
}

impl Document {
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        Ok(json5::from_str(input)?)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn build(&self, style: &StyleConfig, layout: &LayoutConfig) -> Result<LoadedDocument, DocumentError> {
        let mut builder = Builder {
            forest: Forest::new(),
            ids: BTreeMap::new(),
            seeds: Vec::new(),
            style,
        };
        for root_doc in &self.trees {
            let label = builder.label(root_doc);
            let tree = builder.forest.create_tree(label);
            let root = builder
                .forest
                .tree(tree)
                .map(|t| t.root())
                .ok_or(ForestError::UnknownTree(tree))?;
            builder.register(root, root_doc)?;
            for daughter in &root_doc.daughters {
                builder.add_subtree(root, daughter)?;
            }
        }

        let Builder {
            mut forest,
            ids,
            seeds,
            ..
        } = builder;
        for (id, seed) in seeds {
            apply_seed(&mut forest, id, &seed, layout);
        }

        for (index, doc) in self.mdoms.iter().enumerate() {
            let resolve = |name: &String| {
                ids.get(name).copied().ok_or_else(|| DocumentError::DanglingReference {
                    index,
                    id: name.clone(),
                })
            };
            let mother = resolve(&doc.mother)?;
            let daughter = doc.daughter.as_ref().map(resolve).transpose()?;
            let parsed = match doc.d.as_deref() {
                Some(data) => match CubicPath::parse(data) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        tracing::warn!(index, %err, "malformed mdom path; using the default curve");
                        None
                    }
                },
                None => None,
            };
            let id = forest.next_mdom_id();
            let mut edge = MdomEdge::new(
                id,
                mother,
                parsed.unwrap_or_else(|| CubicPath::unconnected(Point::ORIGIN, layout.unconnected_mdom_height)),
            );
            edge.daughter = daughter;
            edge.needs_anchor = parsed.is_none();
            forest.mdoms.push(edge);
        }

        tracing::debug!(trees = self.trees.len(), nodes = forest.node_count(), "built forest from document");
        Ok(LoadedDocument { forest, ids })
    }

    /// Serializes a forest. Node ids are assigned in pre-order as `n0`,
    /// `n1`, ... and layout seeds are written for fresh nodes only.
    pub fn from_forest(forest: &Forest, include_layout: bool) -> Self {
        let mut names = HashMap::new();
        for tree in forest.trees() {
            assign_names(forest, tree.root(), &mut names);
        }
        let trees = forest
            .trees()
            .iter()
            .filter_map(|tree| node_doc(forest, tree.root(), &names, include_layout))
            .collect();
        let mdoms = forest
            .mdoms()
            .iter()
            .filter_map(|edge| {
                Some(MdomDoc {
                    mother: names.get(&edge.mother())?.clone(),
                    daughter: edge.daughter().and_then(|d| names.get(&d).cloned()),
                    d: Some(edge.path().to_path_data()),
                })
            })
            .collect();
        Self { trees, mdoms }
    }
}

struct Builder<'a> {
    forest: Forest,
    ids: BTreeMap<String, NodeId>,
    seeds: Vec<(NodeId, LayoutSeed)>,
    style: &'a StyleConfig,
}

impl Builder<'_> {
    fn label(&self, doc: &NodeDoc) -> Label {
        let style = self.style;
        match &doc.label {
            None => Label::plain(&style.default_text, &style.text_style, style.alignment),
            Some(LabelDoc::Text(text)) => Label::plain(text, &style.text_style, style.alignment),
            Some(LabelDoc::Rich(rich)) => {
                let runs = rich
                    .runs
                    .iter()
                    .map(|run| {
                        let run_style = match run.style.as_deref() {
                            Some(css) => TextStyle::parse_css(css, &style.text_style),
                            None => style.text_style.clone(),
                        };
                        TextRun::new(run.text.clone(), run_style, run.line)
                    })
                    .collect();
                let mut label = Label::new(runs, rich.alignment.unwrap_or(style.alignment));
                label.visible = rich.visible;
                label
            }
        }
    }

    fn register(&mut self, node: NodeId, doc: &NodeDoc) -> Result<(), DocumentError> {
        if let Some(name) = &doc.id
            && self.ids.insert(name.clone(), node).is_some()
        {
            return Err(DocumentError::DuplicateId(name.clone()));
        }
        if let Some(seed) = &doc.layout {
            self.seeds.push((node, seed.clone()));
        }
        Ok(())
    }

    fn add_subtree(&mut self, mother: NodeId, doc: &NodeDoc) -> Result<(), DocumentError> {
        let label = self.label(doc);
        let node = self.forest.insert_daughter_at(mother, usize::MAX, label, doc.connector)?;
        self.register(node, doc)?;
        for daughter in &doc.daughters {
            self.add_subtree(node, daughter)?;
        }
        Ok(())
    }
}

/// Trusts persisted geometry. Daughters without a persisted connector stay
/// stale so the next redraw derives one.
fn apply_seed(forest: &mut Forest, id: NodeId, seed: &LayoutSeed, layout: &LayoutConfig) {
    let Some(node) = forest.node_mut(id) else {
        return;
    };
    node.inner_width = seed.inner_width;
    node.outer_width = seed.outer_width;
    node.translate = Point::new(seed.x, seed.y);
    if node.mother.is_none() {
        node.taint = Taint::Fresh;
        return;
    }
    let Some(connector) = &seed.connector else {
        return;
    };
    node.connector.start = connector.start;
    node.connector.end = connector.end;
    node.connector.corner = match node.connector.kind {
        ConnectorKind::Triangle => connector.corner,
        ConnectorKind::Line => None,
    };
    node.connector.frame_offset = -node.translate;
    node.connector.hit = hit_region(&node.connector, layout);
    node.taint = Taint::Fresh;
}

fn assign_names(forest: &Forest, id: NodeId, names: &mut HashMap<NodeId, String>) {
    let next = format!("n{}", names.len());
    names.insert(id, next);
    if let Some(node) = forest.node(id) {
        for daughter in node.daughters() {
            assign_names(forest, *daughter, names);
        }
    }
}

fn node_doc(forest: &Forest, id: NodeId, names: &HashMap<NodeId, String>, include_layout: bool) -> Option<NodeDoc> {
    let node = forest.node(id)?;
    let label = node.label();
    let runs = label
        .runs()
        .iter()
        .map(|run| RunDoc {
            text: run.text.clone(),
            line: run.line,
            style: Some(run.style.to_css()),
        })
        .collect();
    let layout = (include_layout && node.taint().is_fresh()).then(|| {
        let connector = node.connector();
        LayoutSeed {
            inner_width: node.inner_width(),
            outer_width: node.outer_width(),
            x: node.translate().x,
            y: node.translate().y,
            connector: node.mother().map(|_| ConnectorSeed {
                start: connector.start,
                end: connector.end,
                corner: connector.corner,
            }),
        }
    });
    Some(NodeDoc {
        id: names.get(&id).cloned(),
        label: Some(LabelDoc::Rich(RichLabelDoc {
            runs,
            alignment: Some(label.alignment()),
            visible: label.is_visible(),
        })),
        connector: node.connector().kind,
        daughters: node
            .daughters()
            .iter()
            .filter_map(|d| node_doc(forest, *d, names, include_layout))
            .collect(),
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        // comments and trailing commas are fine
        trees: [
            {
                id: "s",
                label: "S",
                daughters: [
                    { id: "np", label: "NP", connector: "triangle" },
                    {
                        label: { runs: [{ text: "V", line: 0 }, { text: "bar", line: 1, style: "font-style:italic;" }], alignment: "left" },
                        daughters: [{ id: "t", label: { runs: [{ text: "t" }], visible: false } }],
                    },
                ],
            },
            {},
        ],
        mdoms: [{ mother: "np", daughter: "t", d: "M 0,0 c 0,0 0,10 0,10 c 0,0 0,10 0,10" }],
    }"#;

    #[test]
    fn builds_nested_trees() {
        let doc = Document::parse(SAMPLE).unwrap();
        let loaded = doc.build(&StyleConfig::default(), &LayoutConfig::default()).unwrap();
        let forest = &loaded.forest;
        assert_eq!(forest.trees().len(), 2);
        assert_eq!(forest.node_count(), 5);

        let np = forest.get(loaded.ids["np"]).unwrap();
        assert_eq!(np.connector().kind, ConnectorKind::Triangle);
        let s = forest.get(loaded.ids["s"]).unwrap();
        let vbar = forest.get(s.daughters()[1]).unwrap();
        assert_eq!(vbar.label().text(), "V\nbar");
        assert_eq!(vbar.label().alignment(), Alignment::Left);
        assert!(vbar.label().runs()[1].style.italic);
        assert!(!forest.get(loaded.ids["t"]).unwrap().label().is_visible());

        let second_root = forest.trees()[1].root();
        assert_eq!(forest.get(second_root).unwrap().label().text(), "x");

        let edge = &forest.mdoms()[0];
        assert_eq!(edge.daughter(), Some(loaded.ids["t"]));
        assert_eq!(edge.path().end(), Point::new(0.0, 20.0));
        assert!(!edge.needs_anchor);
    }

    #[test]
    fn dangling_and_duplicate_ids_are_rejected() {
        let doc = Document::parse(r#"{ trees: [{ label: "S" }], mdoms: [{ mother: "nope" }] }"#).unwrap();
        let err = doc.build(&StyleConfig::default(), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, DocumentError::DanglingReference { index: 0, .. }));

        let doc = Document::parse(r#"{ trees: [{ id: "a", daughters: [{ id: "a" }] }] }"#).unwrap();
        let err = doc.build(&StyleConfig::default(), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateId(ref id) if id == "a"));
    }

    #[test]
    fn malformed_path_falls_back_to_default_curve() {
        let doc = Document::parse(r#"{ trees: [{ id: "a" }], mdoms: [{ mother: "a", d: "M 0,0 c 1,2" }] }"#).unwrap();
        let loaded = doc.build(&StyleConfig::default(), &LayoutConfig::default()).unwrap();
        let edge = &loaded.forest.mdoms()[0];
        assert!(edge.needs_anchor);
        assert_eq!(edge.path().end(), Point::new(0.0, 35.0));
    }

    #[test]
    fn seeds_mark_nodes_fresh() {
        let doc = Document::parse(
            r#"{ trees: [{ label: "S", layout: { innerWidth: 20, outerWidth: 20, x: 0, y: 0 },
                daughters: [
                    { label: "a", layout: { innerWidth: 5, outerWidth: 5, x: -15, y: 35,
                        connector: { start: { x: 0, y: 11 }, end: { x: -15, y: 24 } } } },
                    { label: "b", layout: { innerWidth: 5, outerWidth: 5, x: 15, y: 35 } },
                ] }] }"#,
        )
        .unwrap();
        let loaded = doc.build(&StyleConfig::default(), &LayoutConfig::default()).unwrap();
        let forest = &loaded.forest;
        let root = forest.get(forest.trees()[0].root()).unwrap();
        let a = forest.get(root.daughters()[0]).unwrap();
        let b = forest.get(root.daughters()[1]).unwrap();
        assert!(root.taint().is_fresh());
        assert!(a.taint().is_fresh());
        assert!(a.label().taint().is_stale());
        assert_eq!(a.connector().frame_offset, Point::new(15.0, -35.0));
        assert!(b.taint().is_stale());
    }

    #[test]
    fn saved_document_rebuilds_the_same_structure() {
        let loaded = Document::parse(SAMPLE)
            .unwrap()
            .build(&StyleConfig::default(), &LayoutConfig::default())
            .unwrap();
        let saved = Document::from_forest(&loaded.forest, false);
        let json = saved.to_json().unwrap();
        let reloaded = Document::parse(&json)
            .unwrap()
            .build(&StyleConfig::default(), &LayoutConfig::default())
            .unwrap();
        let texts = |forest: &Forest| -> Vec<String> { forest.nodes().map(|(_, n)| n.label().text()).collect() };
        assert_eq!(texts(&loaded.forest), texts(&reloaded.forest));
        assert_eq!(reloaded.forest.mdoms().len(), 1);
        assert_eq!(saved.trees[0].id.as_deref(), Some("n0"));
    }
}
