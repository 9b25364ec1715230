//! Binary restart snapshots: a compact header describing the mesh shape a
//! payload was written for, followed by the raw little-endian arrays from
//! [`SolutionRing::store_current`]. Loading checks every shape field against
//! the current mesh and fails rather than silently reinterpreting bytes.

use std::fs;
use std::path::Path;

use rtfem_solver::{Problem, SolutionRing};

use crate::error::IoError;

const MAGIC: &[u8; 4] = b"RTFM";
const VERSION: u32 = 1;

struct RestartHeader {
    t: f64,
    node_count: u64,
    element_count: u64,
    term_counts: Vec<(u32, u32, u32)>,
    num_dofs: u64,
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, IoError> {
    let end = *offset + 4;
    let chunk = bytes.get(*offset..end).ok_or_else(|| IoError::Payload("truncated header".to_string()))?;
    *offset = end;
    Ok(u32::from_le_bytes(chunk.try_into().unwrap()))
}

fn read_u64(bytes: &[u8], offset: &mut usize) -> Result<u64, IoError> {
    let end = *offset + 8;
    let chunk = bytes.get(*offset..end).ok_or_else(|| IoError::Payload("truncated header".to_string()))?;
    *offset = end;
    Ok(u64::from_le_bytes(chunk.try_into().unwrap()))
}

fn read_f64(bytes: &[u8], offset: &mut usize) -> Result<f64, IoError> {
    let end = *offset + 8;
    let chunk = bytes.get(*offset..end).ok_or_else(|| IoError::Payload("truncated header".to_string()))?;
    *offset = end;
    Ok(f64::from_le_bytes(chunk.try_into().unwrap()))
}

fn write_header(out: &mut Vec<u8>, header: &RestartHeader) {
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&header.t.to_le_bytes());
    out.extend_from_slice(&header.node_count.to_le_bytes());
    out.extend_from_slice(&header.element_count.to_le_bytes());
    out.extend_from_slice(&header.num_dofs.to_le_bytes());
    for &(i, e, c) in &header.term_counts {
        out.extend_from_slice(&i.to_le_bytes());
        out.extend_from_slice(&e.to_le_bytes());
        out.extend_from_slice(&c.to_le_bytes());
    }
}

fn read_header(bytes: &[u8]) -> Result<(RestartHeader, usize), IoError> {
    if bytes.len() < 4 || &bytes[0..4] != MAGIC {
        return Err(IoError::BadMagic);
    }
    let mut offset = 4usize;
    let version = read_u32(bytes, &mut offset)?;
    if version != VERSION {
        return Err(IoError::UnsupportedVersion(version));
    }
    let t = read_f64(bytes, &mut offset)?;
    let node_count = read_u64(bytes, &mut offset)?;
    let element_count = read_u64(bytes, &mut offset)?;
    let num_dofs = read_u64(bytes, &mut offset)?;
    let mut term_counts = Vec::with_capacity(element_count as usize);
    for _ in 0..element_count {
        let i = read_u32(bytes, &mut offset)?;
        let e = read_u32(bytes, &mut offset)?;
        let c = read_u32(bytes, &mut offset)?;
        term_counts.push((i, e, c));
    }
    Ok((RestartHeader { t, node_count, element_count, term_counts, num_dofs }, offset))
}

fn header_for(problem: &Problem, ring: &SolutionRing) -> RestartHeader {
    let sizes = problem.element_term_sizes();
    RestartHeader {
        t: ring.current().t,
        node_count: problem.mesh.statistics().node_count as u64,
        element_count: sizes.len() as u64,
        term_counts: sizes.iter().map(|&(i, e, c)| (i as u32, e as u32, c as u32)).collect(),
        num_dofs: problem.mesh.num_dofs() as u64,
    }
}

/// Writes `ring`'s current state to `path`.
pub fn save_restart(path: impl AsRef<Path>, problem: &Problem, ring: &SolutionRing) -> Result<(), IoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut out = Vec::new();
    write_header(&mut out, &header_for(problem, ring));
    out.extend_from_slice(&ring.store_current());
    fs::write(path, out)?;
    log::info!("wrote restart snapshot to {} at t={}", path.display(), ring.current().t);
    Ok(())
}

/// Loads a snapshot written by [`save_restart`] into `ring`'s current slot.
/// Fails if node count, element count, per-element term counts, or DOF count
/// disagree with `problem`'s mesh.
pub fn load_restart(path: impl AsRef<Path>, problem: &Problem, ring: &mut SolutionRing) -> Result<(), IoError> {
    let bytes = fs::read(path)?;
    let (header, payload_offset) = read_header(&bytes)?;

    let sizes = problem.element_term_sizes();
    let expected_nodes = problem.mesh.statistics().node_count as u64;
    if header.node_count != expected_nodes {
        return Err(IoError::Mismatch(format!("node count {} != mesh's {expected_nodes}", header.node_count)));
    }
    if header.element_count as usize != sizes.len() {
        return Err(IoError::Mismatch(format!("element count {} != mesh's {}", header.element_count, sizes.len())));
    }
    let expected_dofs = problem.mesh.num_dofs() as u64;
    if header.num_dofs != expected_dofs {
        return Err(IoError::Mismatch(format!("dof count {} != mesh's {expected_dofs}", header.num_dofs)));
    }
    for (idx, (&(i, e, c), &(hi, he, hc))) in sizes.iter().zip(header.term_counts.iter()).enumerate() {
        if (i as u32, e as u32, c as u32) != (hi, he, hc) {
            return Err(IoError::Mismatch(format!(
                "element {idx} term counts ({hi},{he},{hc}) != mesh's ({i},{e},{c})"
            )));
        }
    }

    ring.load_current(&bytes[payload_offset..]).map_err(IoError::Payload)?;
    log::info!("loaded restart snapshot from {} at t={}", path.display(), header.t);
    Ok(())
}
