use crate::core::geometry::{Orientation, Segment};

/// Column separators in points from the x of every vertical rule.
///
/// Positions closer than `buffer` pixels to their neighbour are chained into one cluster
/// and replaced by the cluster mean.
pub fn column_separators(segments: &[Segment], buffer: i32, horizontal_ratio: f32) -> Vec<f32> {
    let mut xs: Vec<i32> = segments
        .iter()
        .filter(|s| s.orientation() == Some(Orientation::Vertical))
        .map(|s| s.x1)
        .collect();
    xs.sort_unstable();

    let mut clusters: Vec<Vec<i32>> = Vec::new();
    for x in xs {
        match clusters.last_mut() {
            Some(cluster) if cluster.last().is_some_and(|&last| x - last < buffer) => {
                cluster.push(x)
            }
            _ => clusters.push(vec![x]),
        }
    }

    clusters
        .iter()
        .map(|c| c.iter().sum::<i32>() as f32 / c.len() as f32 * horizontal_ratio)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merges_nearby_rules() {
        let segments = [
            Segment::vertical(100, 0, 300),
            Segment::vertical(104, 0, 300),
            Segment::vertical(400, 0, 300),
            Segment::horizontal(50, 0, 500),
        ];
        assert_eq!(column_separators(&segments, 10, 0.5), vec![51.0, 200.0]);
    }

    #[test]
    fn no_vertical_rules_no_separators() {
        assert!(column_separators(&[Segment::horizontal(5, 0, 10)], 10, 1.0).is_empty());
    }
}
