//! Text output writers driven by [`rtfem_core::Model::compute_outputs`]:
//! a point-probe time series (one row per accepted step) and a per-date
//! spatial snapshot (one row per node). Both evaluate outputs at a node by
//! picking the first element that carries it and replaying the same
//! `ElementCtx` construction the assembler uses for tangent/residual calls.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use rtfem_core::{Element, ElementCtx, Mesh, NamedOutput, OutputPoint, INACTIVE};
use rtfem_solver::{Solution, TermBuffer};

use crate::error::IoError;

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn find_owning_element(mesh: &Mesh, node_id: u64) -> Option<(usize, &Element, usize)> {
    mesh.elements()
        .iter()
        .enumerate()
        .find_map(|(idx, element)| element.nodes.iter().position(|&n| n == node_id).map(|local| (idx, element, local)))
}

fn evaluate_outputs(
    mesh: &Mesh,
    solution: &Solution,
    explicit: &[TermBuffer],
    element_idx: usize,
    element: &Element,
    local_node_idx: usize,
) -> Result<Vec<NamedOutput>, IoError> {
    let model = mesh.models.get(&element.model_name)?;
    let material = mesh.materials.material_for_element(element.id);
    let Some(material) = material else {
        return Ok(vec![]);
    };
    let node_coords: Vec<[f64; 3]> =
        element.nodes.iter().map(|&id| mesh.node(id).expect("checked at numbering").coords).collect();
    let local_unknowns: Vec<f64> = (0..element.local_dof_count())
        .map(|i| {
            let (_, col) = element.dof_map.get(i);
            if col == INACTIVE { 0.0 } else { solution.unknowns[col as usize] }
        })
        .collect();
    let mut constant_scratch = solution.constant[element_idx].as_slice().to_vec();
    let ctx = ElementCtx {
        element_id: element.id,
        node_coords: &node_coords,
        material,
        t: solution.t,
        dt: 0.0,
        unknowns_current: &local_unknowns,
        unknowns_previous: &local_unknowns,
        implicit_current: &mut [],
        implicit_previous: solution.implicit[element_idx].as_slice(),
        explicit_current: &mut [],
        explicit_previous: explicit[element_idx].as_slice(),
        constant: &mut constant_scratch,
    };
    let point = OutputPoint { local_index: local_node_idx };
    Ok(model.compute_outputs(&ctx, &point))
}

/// Appends one row per accepted step to a CSV-like file: `t` followed by
/// every probed node's declared quantities, in `compute_outputs` order. The
/// header is written from the first call's column set.
pub struct PointSeriesWriter {
    file: File,
    nodes: Vec<u64>,
    header_written: bool,
}

impl PointSeriesWriter {
    pub fn create(path: impl AsRef<Path>, nodes: Vec<u64>) -> Result<Self, IoError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        Ok(Self { file: File::create(path)?, nodes, header_written: false })
    }

    pub fn write_step(&mut self, mesh: &Mesh, solution: &Solution, explicit: &[TermBuffer]) -> Result<(), IoError> {
        let mut columns: Vec<(String, f64)> = Vec::new();
        for &node_id in &self.nodes {
            let Some((idx, element, local)) = find_owning_element(mesh, node_id) else { continue };
            for out in evaluate_outputs(mesh, solution, explicit, idx, element, local)? {
                columns.push((format!("node{node_id}:{}", out.name), out.value));
            }
        }

        if !self.header_written {
            let header: Vec<&str> = std::iter::once("t").chain(columns.iter().map(|(name, _)| name.as_str())).collect();
            writeln!(self.file, "{}", header.join(","))?;
            self.header_written = true;
        }

        let mut row = solution.t.to_string();
        for (_, value) in &columns {
            row.push(',');
            row.push_str(&value.to_string());
        }
        writeln!(self.file, "{row}")?;
        Ok(())
    }
}

/// Writes a one-shot snapshot of every node's declared quantities at the
/// solution's current time, one `node,quantity,value` row per output.
pub fn write_spatial_snapshot(path: impl AsRef<Path>, mesh: &Mesh, solution: &Solution, explicit: &[TermBuffer]) -> Result<(), IoError> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let mut node_ids: Vec<u64> = mesh.nodes().map(|n| n.id).collect();
    node_ids.sort_unstable();

    let mut body = String::from("node,quantity,value\n");
    for node_id in node_ids {
        let Some((idx, element, local)) = find_owning_element(mesh, node_id) else { continue };
        for out in evaluate_outputs(mesh, solution, explicit, idx, element, local)? {
            body.push_str(&format!("{node_id},{},{}\n", out.name, out.value));
        }
    }
    fs::write(path, body)?;
    Ok(())
}
