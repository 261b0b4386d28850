use glam::Vec3;
use std::path::Path;

use super::AssetError;
use crate::scene::{Aabb, SceneNode};

struct Group {
    name: String,
    points: Vec<Vec3>,
}

/// Reads vertex positions of a Wavefront OBJ file. Each `o`/`g` statement
/// starts a child node; vertices before the first one go into a node named
/// after the file.
pub(super) fn parse(path: &str, bytes: &[u8]) -> Result<SceneNode, AssetError> {
    let text = String::from_utf8_lossy(bytes);
    let name = Path::new(path)
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("obj")
        .to_string();

    let mut groups = vec![Group {
        name: name.clone(),
        points: Vec::new(),
    }];
    for (index, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0f32; 3];
                for coord in coords.iter_mut() {
                    let token = tokens.next().ok_or_else(|| AssetError::ParseObj {
                        path: path.to_string(),
                        line: index + 1,
                        reason: "vertex needs three coordinates".to_string(),
                    })?;
                    *coord = token
                        .parse::<f32>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .ok_or_else(|| AssetError::ParseObj {
                            path: path.to_string(),
                            line: index + 1,
                            reason: format!("invalid coordinate {:?}", token),
                        })?;
                }
                if let Some(group) = groups.last_mut() {
                    group.points.push(Vec3::from_array(coords));
                }
            }
            Some("o") | Some("g") => {
                let group_name: Vec<&str> = tokens.collect();
                groups.push(Group {
                    name: if group_name.is_empty() {
                        format!("group_{}", groups.len())
                    } else {
                        group_name.join(" ")
                    },
                    points: Vec::new(),
                });
            }
            _ => {}
        }
    }

    let mut root = SceneNode::new(name);
    let mut groups = groups.into_iter();
    if let Some(loose) = groups.next() {
        root.bounds = Aabb::from_points(loose.points);
    }
    for group in groups {
        let mut child = SceneNode::new(group.name);
        child.bounds = Aabb::from_points(group.points);
        root.children.push(child);
    }
    Ok(root)
}
