use crate::forest::Forest;
use crate::geometry::{Point, Rect};
use crate::layout::ConnectorKind;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Computed geometry of a forest in absolute coordinates.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub bounds: Option<Rect>,
    pub trees: Vec<TreeDump>,
    pub nodes: Vec<NodeDump>,
    pub mdoms: Vec<MdomDump>,
}

#[derive(Debug, Serialize)]
pub struct TreeDump {
    pub id: String,
    pub root: String,
    pub x: f32,
    pub depth: usize,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub tree: String,
    pub mother: Option<String>,
    pub depth: usize,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub inner_width: f32,
    pub outer_width: f32,
    pub label_width: f32,
    pub label_height: f32,
    pub rect: Rect,
    pub connector: Option<ConnectorDump>,
    pub stale: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub kind: ConnectorKind,
    pub points: Vec<[f32; 2]>,
    pub hit_rotation: f32,
}

#[derive(Debug, Serialize)]
pub struct MdomDump {
    pub id: String,
    pub mother: String,
    pub daughter: Option<String>,
    pub d: String,
    pub control_points: Vec<[f32; 2]>,
}

fn pair(p: Point) -> [f32; 2] {
    [p.x, p.y]
}

impl LayoutDump {
    pub fn from_forest(forest: &Forest) -> Self {
        let trees = forest
            .trees()
            .iter()
            .map(|tree| TreeDump {
                id: tree.id().to_string(),
                root: tree.root().to_string(),
                x: tree.x(),
                depth: tree.depth(),
            })
            .collect();

        let nodes = forest
            .nodes()
            .map(|(id, node)| {
                let origin = forest.absolute_position(id).unwrap_or_default();
                let mother_origin = node.mother().and_then(|m| forest.absolute_position(m));
                let connector = mother_origin.map(|m| ConnectorDump {
                    kind: node.connector().kind,
                    points: node.connector().points().into_iter().map(|p| pair(p + m)).collect(),
                    hit_rotation: node.connector().hit.rotation,
                });
                NodeDump {
                    id: id.to_string(),
                    tree: node.tree().to_string(),
                    mother: node.mother().map(|m| m.to_string()),
                    depth: node.depth(),
                    label: node.label().text(),
                    x: origin.x,
                    y: origin.y,
                    inner_width: node.inner_width(),
                    outer_width: node.outer_width(),
                    label_width: node.label().metrics().width,
                    label_height: node.label().metrics().height,
                    rect: node.rect().translated(origin),
                    connector,
                    stale: node.taint().is_stale(),
                }
            })
            .collect();

        let mdoms = forest
            .mdoms()
            .iter()
            .map(|edge| MdomDump {
                id: edge.id().to_string(),
                mother: edge.mother().to_string(),
                daughter: edge.daughter().map(|d| d.to_string()),
                d: edge.path().to_path_data(),
                control_points: edge.path().control_polygon().into_iter().map(pair).collect(),
            })
            .collect();

        LayoutDump {
            bounds: forest.bounds(),
            trees,
            nodes,
            mdoms,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout.
pub fn write_layout_dump(path: Option<&Path>, forest: &Forest) -> anyhow::Result<()> {
    let dump = LayoutDump::from_forest(forest);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
