//! PLY loader for voxel meshes
//!
//! Voxel editors export every visible voxel face as a quad of four
//! consecutive vertices carrying `x y z red green blue`. This loader reads
//! those vertices (ASCII PLY, or a bare list of six numbers per vertex) and
//! reconstructs one box per occupied cell.

use std::collections::HashMap;

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::scene::entities::Color;

/// Decimal places kept when stripping floating residue before flooring
const NOISE_SCALE: f64 = 1e6;

/// Mesh import errors
#[derive(Error, Debug)]
pub enum MeshError {
    /// Structure does not describe whole, axis-aligned quad faces
    #[error("malformed mesh: {0}")]
    Malformed(String),
    /// A token is not a number
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// One vertex of the exported mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// Vertex position
    pub position: Vec3,
    /// Colour in the 0..1 range
    pub color: [f64; 3],
}

/// A reconstructed voxel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedBox {
    /// Integer cell, stored as floats for direct use as a box position
    pub position: Vec3,
    /// Colour taken from the face that first claimed the cell
    pub color: Color,
}

/// Result of reconstructing boxes from a mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshImport {
    /// One box per occupied cell, in first-seen order
    pub boxes: Vec<ImportedBox>,
    /// Faces that claimed an occupied cell with a different colour
    pub color_conflicts: usize,
}

#[derive(Debug, Default)]
struct VertexLayout {
    count: usize,
    properties: Vec<(String, String)>,
}

impl VertexLayout {
    fn index_of(&self, names: &[&str]) -> Option<usize> {
        self.properties.iter().position(|(_, name)| names.contains(&name.as_str()))
    }
}

/// Reader for voxel meshes exported as PLY
pub struct PlyLoader;

impl PlyLoader {
    /// Read vertices from PLY text or a bare number list
    pub fn parse_vertices(text: &str) -> Result<Vec<MeshVertex>, MeshError> {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let first = normalized.lines().map(str::trim).find(|l| !l.is_empty());
        match first {
            None => Ok(Vec::new()),
            Some("ply") => Self::parse_ply(&normalized),
            Some(_) => Self::parse_raw(&normalized),
        }
    }

    /// Rebuild boxes from quad-face vertices
    pub fn boxes_from_vertices(vertices: &[MeshVertex]) -> Result<MeshImport, MeshError> {
        if vertices.len() % 4 != 0 {
            return Err(MeshError::Malformed(format!(
                "{} vertices do not form whole quad faces",
                vertices.len()
            )));
        }

        let mut import = MeshImport::default();
        let mut seen: HashMap<[i64; 3], Color> = HashMap::new();

        for (face_index, face) in vertices.chunks_exact(4).enumerate() {
            let cell = Self::face_cell(face)
                .map_err(|reason| MeshError::Malformed(format!("face {face_index}: {reason}")))?;
            let [r, g, b] = face[0].color;
            let color = Color::new(r, g, b, 1.0);

            match seen.get(&cell) {
                Some(existing) if *existing != color => import.color_conflicts += 1,
                Some(_) => {}
                None => {
                    seen.insert(cell, color);
                    import.boxes.push(ImportedBox {
                        position: Vec3::new(cell[0] as f64, cell[1] as f64, cell[2] as f64),
                        color,
                    });
                }
            }
        }

        if import.color_conflicts > 0 {
            log::warn!(
                "{} mesh face(s) disagreed on the colour of an occupied cell; first colour kept",
                import.color_conflicts
            );
        }
        Ok(import)
    }

    /// Parse and rebuild in one step
    pub fn load_boxes(text: &str) -> Result<MeshImport, MeshError> {
        let vertices = Self::parse_vertices(text)?;
        Self::boxes_from_vertices(&vertices)
    }

    fn parse_ply(text: &str) -> Result<Vec<MeshVertex>, MeshError> {
        let mut lines = text.lines().enumerate();
        let mut layout = VertexLayout::default();
        let mut in_vertex_element = false;
        let mut header_closed = false;

        for (_, line) in lines.by_ref() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                ["end_header"] => {
                    header_closed = true;
                    break;
                }
                ["format", kind, ..] if *kind != "ascii" => {
                    return Err(MeshError::Malformed(format!("unsupported PLY format: {kind}")));
                }
                ["element", "vertex", count] => {
                    layout.count = count
                        .parse()
                        .map_err(|_| MeshError::Malformed(format!("bad vertex count: {count}")))?;
                    in_vertex_element = true;
                }
                ["element", ..] => in_vertex_element = false,
                ["property", kind, name] if in_vertex_element => {
                    layout.properties.push(((*kind).to_string(), (*name).to_string()));
                }
                _ => {}
            }
        }

        if !header_closed {
            return Err(MeshError::Malformed("missing end_header".to_string()));
        }

        let column = |names: &[&str]| {
            layout
                .index_of(names)
                .ok_or_else(|| MeshError::Malformed(format!("vertex has no {} property", names[0])))
        };
        let columns = [
            column(&["x"])?,
            column(&["y"])?,
            column(&["z"])?,
            column(&["red", "r"])?,
            column(&["green", "g"])?,
            column(&["blue", "b"])?,
        ];
        let color_scale = match layout.properties[columns[3]].0.as_str() {
            "uchar" | "uint8" | "char" | "int8" => 1.0 / 255.0,
            _ => 1.0,
        };

        // The declared count is untrusted; grow with the lines actually present
        let mut vertices = Vec::new();
        for (line_index, line) in lines.filter(|(_, l)| !l.trim().is_empty()).take(layout.count) {
            let values = Self::parse_numbers(line, line_index + 1)?;
            if values.len() < layout.properties.len() {
                return Err(MeshError::Malformed(format!(
                    "line {}: expected {} values, found {}",
                    line_index + 1,
                    layout.properties.len(),
                    values.len()
                )));
            }
            vertices.push(MeshVertex {
                position: Vec3::new(values[columns[0]], values[columns[1]], values[columns[2]]),
                color: [
                    values[columns[3]] * color_scale,
                    values[columns[4]] * color_scale,
                    values[columns[5]] * color_scale,
                ],
            });
        }

        if vertices.len() < layout.count {
            return Err(MeshError::Malformed(format!(
                "header declares {} vertices, found {}",
                layout.count,
                vertices.len()
            )));
        }
        Ok(vertices)
    }

    fn parse_raw(text: &str) -> Result<Vec<MeshVertex>, MeshError> {
        let mut values = Vec::new();
        for (line_index, line) in text.lines().enumerate() {
            values.extend(Self::parse_numbers(line, line_index + 1)?);
        }
        if values.len() % 6 != 0 {
            return Err(MeshError::Malformed(format!(
                "{} numbers is not a whole number of 6-value vertices",
                values.len()
            )));
        }
        Ok(values
            .chunks_exact(6)
            .map(|v| MeshVertex {
                position: Vec3::new(v[0], v[1], v[2]),
                color: [v[3], v[4], v[5]],
            })
            .collect())
    }

    fn parse_numbers(line: &str, line_number: usize) -> Result<Vec<f64>, MeshError> {
        line.split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| MeshError::Parse {
                    line: line_number,
                    message: format!("invalid number {token:?}"),
                })
            })
            .collect()
    }

    /// Cell of the voxel behind a quad face.
    ///
    /// The face plane is the axis shared by the first three vertices. Faces are
    /// wound counter-clockwise seen from outside, so the voxel sits on the
    /// opposite side of the winding normal.
    fn face_cell(face: &[MeshVertex]) -> Result<[i64; 3], String> {
        let p: Vec<Vec3> = face.iter().map(|v| v.position).collect();
        let axis = (0..3)
            .find(|&a| p[0][a] == p[1][a] && p[1][a] == p[2][a])
            .ok_or_else(|| "face is not axis-aligned".to_string())?;
        if p[3][axis] != p[0][axis] {
            return Err("fourth vertex leaves the face plane".to_string());
        }

        let extent = |a: usize| {
            let (lo, hi) = p.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v[a]), hi.max(v[a]))
            });
            (lo, hi - lo)
        };
        let in_plane: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
        let step = in_plane.iter().map(|&a| extent(a).1).fold(0.0, f64::max);
        if step <= 0.0 {
            return Err("degenerate face".to_string());
        }

        let mut cell = [0_i64; 3];
        for &a in &in_plane {
            cell[a] = grid_floor(extent(a).0 / step);
        }
        let normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
        let plane_cell = grid_floor(p[0][axis] / step);
        cell[axis] = if normal[axis] > 0.0 { plane_cell - 1 } else { plane_cell };
        Ok(cell)
    }
}

fn grid_floor(value: f64) -> i64 {
    ((value * NOISE_SCALE).round() / NOISE_SCALE).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The six outward-wound faces of a unit voxel at `(cx, cy, cz)`
    fn cube_faces(cx: f64, cy: f64, cz: f64, rgb: [u8; 3]) -> Vec<String> {
        let (x0, y0, z0) = (cx, cy, cz);
        let (x1, y1, z1) = (cx + 1.0, cy + 1.0, cz + 1.0);
        let quads = [
            // +X
            [(x1, y0, z0), (x1, y1, z0), (x1, y1, z1), (x1, y0, z1)],
            // -X
            [(x0, y0, z0), (x0, y0, z1), (x0, y1, z1), (x0, y1, z0)],
            // +Y
            [(x0, y1, z0), (x0, y1, z1), (x1, y1, z1), (x1, y1, z0)],
            // -Y
            [(x0, y0, z0), (x1, y0, z0), (x1, y0, z1), (x0, y0, z1)],
            // +Z
            [(x0, y0, z1), (x1, y0, z1), (x1, y1, z1), (x0, y1, z1)],
            // -Z
            [(x0, y0, z0), (x0, y1, z0), (x1, y1, z0), (x1, y0, z0)],
        ];
        quads
            .iter()
            .flat_map(|quad| quad.iter())
            .map(|(x, y, z)| format!("{x} {y} {z} {} {} {}", rgb[0], rgb[1], rgb[2]))
            .collect()
    }

    fn ply(vertex_lines: &[String]) -> String {
        let mut text = format!(
            "ply\nformat ascii 1.0\nelement vertex {}\n\
             property float x\nproperty float y\nproperty float z\n\
             property uchar red\nproperty uchar green\nproperty uchar blue\nelement face {}\n\
             property list uchar int vertex_indices\nend_header\n",
            vertex_lines.len(),
            vertex_lines.len() / 4
        );
        for line in vertex_lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_every_face_of_a_cube_maps_to_its_cell() {
        let lines = cube_faces(2.0, 3.0, -1.0, [255, 0, 0]);
        let vertices: Vec<MeshVertex> = lines
            .iter()
            .flat_map(|l| PlyLoader::parse_raw(l).unwrap())
            .collect();
        for face in vertices.chunks_exact(4) {
            assert_eq!(PlyLoader::face_cell(face).unwrap(), [2, 3, -1]);
        }
    }

    #[test]
    fn test_ply_import_dedups_cells() {
        let mut lines = cube_faces(0.0, 0.0, 0.0, [255, 0, 0]);
        lines.extend(cube_faces(1.0, 0.0, 0.0, [0, 0, 255]));
        let import = PlyLoader::load_boxes(&ply(&lines)).unwrap();

        assert_eq!(import.boxes.len(), 2);
        assert_eq!(import.boxes[0].position, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(import.boxes[0].color, Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(import.boxes[1].position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(import.boxes[1].color, Color::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(import.color_conflicts, 0);
    }

    #[test]
    fn test_conflicting_colours_keep_first() {
        let mut lines = cube_faces(0.0, 0.0, 0.0, [255, 0, 0]);
        lines.extend(cube_faces(0.0, 0.0, 0.0, [0, 255, 0]));
        let import = PlyLoader::load_boxes(&ply(&lines)).unwrap();
        assert_eq!(import.boxes.len(), 1);
        assert_eq!(import.boxes[0].color, Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(import.color_conflicts, 6);
    }

    #[test]
    fn test_scaled_voxels() {
        // Voxel of size 2 occupying [4,6] on every axis
        let face = "4 4 4 1 1 1\n4 4 6 1 1 1\n4 6 6 1 1 1\n4 6 4 1 1 1";
        let import = PlyLoader::load_boxes(face).unwrap();
        assert_eq!(import.boxes[0].position, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_partial_face_is_malformed() {
        let mut lines = cube_faces(0.0, 0.0, 0.0, [255, 255, 255]);
        lines.pop();
        let result = PlyLoader::load_boxes(&ply(&lines));
        assert!(matches!(result, Err(MeshError::Malformed(_))));
    }

    #[test]
    fn test_missing_vertex_lines_are_malformed() {
        let lines = cube_faces(0.0, 0.0, 0.0, [255, 255, 255]);
        let mut text = ply(&lines);
        text = text.replace("element vertex 24", "element vertex 28");
        assert!(matches!(PlyLoader::load_boxes(&text), Err(MeshError::Malformed(_))));
    }

    #[test]
    fn test_oversized_vertex_count_is_malformed() {
        let lines = cube_faces(0.0, 0.0, 0.0, [255, 255, 255]);
        let text = ply(&lines[..1])
            .replace("element vertex 1\n", "element vertex 100000000000000000\n");
        match PlyLoader::load_boxes(&text) {
            Err(MeshError::Malformed(message)) => assert!(message.contains("found 1")),
            other => panic!("expected malformed mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_end_header() {
        let text = "ply\nformat ascii 1.0\nelement vertex 0\n";
        assert!(matches!(PlyLoader::parse_vertices(text), Err(MeshError::Malformed(_))));
    }

    #[test]
    fn test_binary_ply_rejected() {
        let text = "ply\nformat binary_little_endian 1.0\nend_header\n";
        assert!(matches!(PlyLoader::parse_vertices(text), Err(MeshError::Malformed(_))));
    }

    #[test]
    fn test_skewed_face_is_malformed() {
        let face = "0 0 0 1 1 1\n1 1 0 1 1 1\n1 1 1 1 1 1\n0 0 1 1 1 1";
        assert!(matches!(PlyLoader::load_boxes(face), Err(MeshError::Malformed(_))));
    }

    #[test]
    fn test_raw_blob_must_be_whole_vertices() {
        assert!(matches!(PlyLoader::parse_vertices("1 2 3 4 5"), Err(MeshError::Malformed(_))));
        assert!(matches!(PlyLoader::parse_vertices("1 2 x 4 5 6"), Err(MeshError::Parse { .. })));
        assert!(PlyLoader::parse_vertices("   \n").unwrap().is_empty());
    }
}
