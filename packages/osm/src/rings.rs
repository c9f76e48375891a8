//! Assembles relation member ways into closed rings.
//!
//! Multipolygon and boundary relations split their outlines across many
//! ways, each sharing endpoints with its neighbours in no particular
//! order or direction. Segments are joined end to end (reversing as
//! needed) until no more joins are possible; chains whose first and last
//! coordinates meet become rings.

use geo::{Coord, LineString, MultiPolygon, Polygon};

/// A ring needs at least three distinct vertices plus the closing one.
const MIN_RING_LEN: usize = 4;

#[derive(Debug, PartialEq, Eq)]
enum Join {
    Tail,
    Head,
    ReverseTail,
    ReverseHead,
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= MIN_RING_LEN && coords.first() == coords.last()
}

fn find_join(chain: &[Coord<f64>], segment: &[Coord<f64>]) -> Option<Join> {
    let (chain_first, chain_last) = (chain.first()?, chain.last()?);
    let (seg_first, seg_last) = (segment.first()?, segment.last()?);

    if chain_last == seg_first {
        Some(Join::Tail)
    } else if chain_first == seg_last {
        Some(Join::Head)
    } else if chain_last == seg_last {
        Some(Join::ReverseTail)
    } else if chain_first == seg_first {
        Some(Join::ReverseHead)
    } else {
        None
    }
}

fn join(chain: &mut Vec<Coord<f64>>, segment: &[Coord<f64>], how: &Join) {
    match how {
        Join::Tail => chain.extend_from_slice(&segment[1..]),
        Join::Head => {
            let mut joined = segment[..segment.len() - 1].to_vec();
            joined.append(chain);
            *chain = joined;
        }
        Join::ReverseTail => chain.extend(segment[..segment.len() - 1].iter().rev()),
        Join::ReverseHead => {
            let mut joined: Vec<Coord<f64>> = segment[1..].iter().rev().copied().collect();
            joined.append(chain);
            *chain = joined;
        }
    }
}

/// One pass: attach each segment to the first open chain it touches.
fn chain_once(segments: Vec<Vec<Coord<f64>>>) -> Vec<Vec<Coord<f64>>> {
    let mut chains: Vec<Vec<Coord<f64>>> = Vec::new();

    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        let target = chains.iter_mut().find_map(|chain| {
            if is_closed(chain) {
                return None;
            }
            find_join(chain, &segment).map(|how| (chain, how))
        });
        match target {
            Some((chain, how)) => join(chain, &segment, &how),
            None => chains.push(segment),
        }
    }

    chains
}

/// Joins `segments` into closed rings. Segments that never close are
/// dropped.
#[must_use]
pub fn assemble_rings(segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut chains = segments;
    loop {
        let before = chains.len();
        chains = chain_once(chains);
        if chains.len() == before {
            break;
        }
    }

    let (closed, open): (Vec<_>, Vec<_>) = chains.into_iter().partition(|c| is_closed(c));
    if !open.is_empty() {
        log::debug!("Dropped {} unclosed ring fragment(s)", open.len());
    }

    closed.into_iter().map(LineString::new).collect()
}

/// Builds polygons from outer and inner segments. Each inner ring is
/// attached to the first outer ring whose polygon contains it.
#[must_use]
pub fn assemble_multi_polygon(
    outer: Vec<Vec<Coord<f64>>>,
    inner: Vec<Vec<Coord<f64>>>,
) -> MultiPolygon<f64> {
    use geo::Contains;

    let mut polygons: Vec<Polygon<f64>> = assemble_rings(outer)
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();

    for hole in assemble_rings(inner) {
        if let Some(polygon) = polygons
            .iter_mut()
            .find(|p| Polygon::new(p.exterior().clone(), vec![]).contains(&hole))
        {
            polygon.interiors_push(hole);
        } else {
            log::debug!("Dropped inner ring outside every outer ring");
        }
    }

    MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn seg(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| c(x, y)).collect()
    }

    #[test]
    fn closed_way_is_its_own_ring() {
        let rings = assemble_rings(vec![seg(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 0.0),
        ])]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].0.len(), 4);
    }

    #[test]
    fn joins_tail_to_head() {
        let rings = assemble_rings(vec![
            seg(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            seg(&[(1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
        ]);
        assert_eq!(rings.len(), 1);
        assert_eq!(
            rings[0].0,
            seg(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)])
        );
    }

    #[test]
    fn joins_reversed_segments() {
        let rings = assemble_rings(vec![
            seg(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            seg(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
        ]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].0.len(), 5);
        assert_eq!(rings[0].0.first(), rings[0].0.last());
    }

    #[test]
    fn joins_out_of_order_segments() {
        let rings = assemble_rings(vec![
            seg(&[(1.0, 1.0), (0.0, 1.0)]),
            seg(&[(0.0, 0.0), (1.0, 0.0)]),
            seg(&[(1.0, 0.0), (1.0, 1.0)]),
            seg(&[(0.0, 1.0), (0.0, 0.0)]),
        ]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].0.len(), 5);
    }

    #[test]
    fn unclosed_chains_are_dropped() {
        let rings = assemble_rings(vec![seg(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])]);
        assert!(rings.is_empty());
    }

    #[test]
    fn separate_rings_stay_separate() {
        let rings = assemble_rings(vec![
            seg(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            seg(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 5.0)]),
        ]);
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn inner_ring_becomes_a_hole() {
        let outer = vec![seg(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ])];
        let inner = vec![seg(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])];

        let multi = assemble_multi_polygon(outer, inner);
        assert_eq!(multi.0.len(), 1);
        assert_eq!(multi.0[0].interiors().len(), 1);
    }
}
